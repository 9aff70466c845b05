// src/exec/runner.rs

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::candidate::Candidate;
use crate::config::RenderSection;
use crate::engine::policy::ViewSet;

/// How one external render process finished.
///
/// Two failure channels are reported separately: a code returned through
/// normal exit, and abnormal termination seen by the supervision layer
/// (signal death, lost process). Either one is enough to classify.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: Option<i64>,
    pub crashed_by_signal: bool,
    pub timed_out: bool,
    /// Full stdout of the process; also streamed to the log live.
    pub stdout_log: String,
}

/// Supervises exactly one render process per [`execute`](TaskRunner::execute)
/// call. No internal retries; a retry is a new scheduler pass.
pub struct TaskRunner {
    command: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl TaskRunner {
    pub fn from_config(render: &RenderSection) -> Self {
        Self {
            command: render.command.clone(),
            args: render.args.clone(),
            timeout: render.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Argument list for one job, with template placeholders expanded.
    fn job_args(&self, candidate: &Candidate, views: &ViewSet) -> Vec<String> {
        self.args
            .iter()
            .map(|a| {
                a.replace("{scene}", &candidate.source_path.to_string_lossy())
                    .replace("{output}", &candidate.output_dir.to_string_lossy())
                    .replace("{views}", &views.to_string())
            })
            .collect()
    }

    /// Launch the render process for one candidate and wait for it.
    ///
    /// Stdout and stderr are streamed line-by-line as they arrive, on
    /// background read tasks that are joined before this returns, so the
    /// caller never overlaps two processes. If a timeout is configured
    /// and expires, the child is killed and the outcome marked
    /// `timed_out`.
    pub async fn execute(&self, candidate: &Candidate, views: &ViewSet) -> Result<ProcessOutcome> {
        let asset = candidate.asset_id();
        let args = self.job_args(candidate, views);

        info!(
            asset = %asset,
            cmd = %self.command,
            views = %views,
            "starting render process"
        );

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning render process for '{asset}'"))?;

        let stdout_handle = spawn_stdout_reader(child.stdout.take(), asset.clone());
        let stderr_handle = spawn_stderr_reader(child.stderr.take(), asset.clone());

        let (status, timed_out) = match self.timeout {
            None => (
                child
                    .wait()
                    .await
                    .with_context(|| format!("waiting for render process of '{asset}'"))?,
                false,
            ),
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => (
                    status.with_context(|| format!("waiting for render process of '{asset}'"))?,
                    false,
                ),
                Err(_) => {
                    warn!(asset = %asset, timeout_secs = limit.as_secs(), "render timed out, killing process");
                    child
                        .kill()
                        .await
                        .with_context(|| format!("killing timed-out render process of '{asset}'"))?;
                    let status = child
                        .wait()
                        .await
                        .with_context(|| format!("reaping timed-out render process of '{asset}'"))?;
                    (status, true)
                }
            },
        };

        // Drain the readers so the full log is captured before returning.
        let stdout_log = stdout_handle.await.unwrap_or_default();
        let _ = stderr_handle.await;

        let exit_code = status.code().map(i64::from);
        let crashed_by_signal = abnormal_termination(&status);

        info!(
            asset = %asset,
            exit_code = ?exit_code,
            crashed_by_signal,
            timed_out,
            "render process exited"
        );

        Ok(ProcessOutcome {
            exit_code,
            crashed_by_signal,
            timed_out,
            stdout_log,
        })
    }
}

/// Stream stdout lines to the live log as they arrive and collect them.
fn spawn_stdout_reader(
    stdout: Option<impl AsyncRead + Unpin + Send + 'static>,
    asset: String,
) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut collected = String::new();
        let Some(stdout) = stdout else {
            return collected;
        };
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(asset = %asset, "render: {}", line);
            collected.push_str(&line);
            collected.push('\n');
        }
        collected
    })
}

/// Always consume stderr so pipe buffers never fill; log at debug.
fn spawn_stderr_reader(
    stderr: Option<impl AsyncRead + Unpin + Send + 'static>,
    asset: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(stderr) = stderr else { return };
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(asset = %asset, "render stderr: {}", line);
        }
    })
}

#[cfg(unix)]
fn abnormal_termination(status: &std::process::ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal().is_some()
}

#[cfg(not(unix))]
fn abnormal_termination(status: &std::process::ExitStatus) -> bool {
    // Without signal reporting, a missing exit code is the only hint the
    // supervision layer gives us.
    status.code().is_none()
}
