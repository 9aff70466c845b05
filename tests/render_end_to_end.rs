// tests/render_end_to_end.rs

//! Drives the scheduler through a full batch against the in-memory
//! ledger, with a real child process standing in for the renderer.

use std::error::Error;
use std::path::Path;

mod common;

use common::{client_for, FakeLedger};
use previewpipe::candidate::{Candidate, Category};
use previewpipe::config::{ClassifierSection, RenderSection};
use previewpipe::engine::{Classifier, FailureLog, RerunPolicy, Scheduler, SchedulerOptions};
use previewpipe::exec::TaskRunner;
use tokio::sync::watch;

type TestResult = Result<(), Box<dyn Error>>;

const HEADER: &[&str] = &[
    "Type",
    "Asset",
    "Path",
    "Crashed",
    "Front",
    "Previously Rendered",
    "Date And Time",
    "Blame",
];

fn candidates(dir: &Path) -> Vec<Candidate> {
    ["p_new_rig", "p_burnt_rig", "p_done_rig"]
        .iter()
        .map(|stem| Candidate {
            source_path: dir.join(format!("{stem}.ma")),
            output_dir: dir.to_path_buf(),
            category: Category::Props,
        })
        .collect()
}

fn shell_runner(script: &str) -> TaskRunner {
    TaskRunner::from_config(&RenderSection {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        timeout_secs: None,
        scene_suffix: "_rig.ma".to_string(),
    })
}

fn scheduler(
    ledger: previewpipe::ledger::LedgerClient,
    runner: TaskRunner,
    failures: FailureLog,
) -> (Scheduler, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(false);
    let scheduler = Scheduler::new(
        ledger,
        runner,
        Classifier::new(ClassifierSection::default()),
        failures,
        rx,
    );
    (scheduler, tx)
}

#[tokio::test]
async fn crashed_only_reruns_exactly_the_crashed_row() -> TestResult {
    let dir = tempfile::tempdir()?;
    let fake = FakeLedger::with_tab(
        "Props",
        vec![
            HEADER.to_vec(),
            vec!["prop", "p_burnt_rig", "", "Yes", "Yes", "", "", ""],
            vec!["prop", "p_done_rig", "", "No", "Yes", "front", "", ""],
        ],
    );

    let (mut scheduler, _tx) = scheduler(
        client_for(&fake),
        shell_runner("exit 0"),
        FailureLog::new(dir.path().join("failures.log")),
    );

    let stats = scheduler
        .run(
            &candidates(dir.path()),
            SchedulerOptions {
                policy: RerunPolicy::CrashedOnly,
                include_deleted: false,
            },
        )
        .await?;

    // p_new_rig has no row, p_done_rig is clean; only the crash reruns.
    assert_eq!(stats.rendered, 1);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.failed, 0);
    assert!(!stats.cancelled);

    let rows = fake.tab("Props");
    assert_eq!(rows.len(), 3, "rerun must update in place, not append");
    let burnt = &rows[1];
    assert_eq!(burnt[1], "p_burnt_rig");
    assert_eq!(burnt[3], "No");
    assert_eq!(burnt[5], "front");
    assert!(!burnt[6].is_empty(), "timestamp is stamped on the rewrite");

    let failures = std::fs::read_to_string(dir.path().join("failures.log"))?;
    assert!(failures.is_empty());
    Ok(())
}

#[tokio::test]
async fn new_only_appends_rows_for_unknown_candidates() -> TestResult {
    let dir = tempfile::tempdir()?;
    let fake = FakeLedger::with_tab(
        "Props",
        vec![
            HEADER.to_vec(),
            vec!["prop", "p_done_rig", "", "No", "Yes", "front", "", ""],
        ],
    );

    let (mut scheduler, _tx) = scheduler(
        client_for(&fake),
        shell_runner("exit 0"),
        FailureLog::new(dir.path().join("failures.log")),
    );

    let stats = scheduler
        .run(
            &candidates(dir.path()),
            SchedulerOptions {
                policy: RerunPolicy::NewOnly,
                include_deleted: false,
            },
        )
        .await?;

    assert_eq!(stats.rendered, 2);
    assert_eq!(stats.skipped, 1);

    let rows = fake.tab("Props");
    assert_eq!(rows.len(), 4);
    let appended: Vec<&str> = rows[1..].iter().map(|r| r[1].as_str()).collect();
    assert!(appended.contains(&"p_new_rig"));
    assert!(appended.contains(&"p_burnt_rig"));
    for row in &rows[1..] {
        if row[1] != "p_done_rig" {
            assert_eq!(row[0], "prop");
            assert_eq!(row[3], "No");
            assert!(row[2].ends_with(".ma"));
        }
    }
    Ok(())
}

#[tokio::test]
async fn failing_render_records_the_note_and_marks_the_row_crashed() -> TestResult {
    let dir = tempfile::tempdir()?;
    let fake = FakeLedger::with_tab("Props", vec![HEADER.to_vec()]);

    // 211 is the unknown-scene-data code in the default table.
    let (mut scheduler, _tx) = scheduler(
        client_for(&fake),
        shell_runner("exit 211"),
        FailureLog::new(dir.path().join("failures.log")),
    );

    let batch = vec![Candidate {
        source_path: dir.path().join("p_broken_rig.ma"),
        output_dir: dir.path().to_path_buf(),
        category: Category::Props,
    }];
    let stats = scheduler
        .run(
            &batch,
            SchedulerOptions {
                policy: RerunPolicy::NewOnly,
                include_deleted: false,
            },
        )
        .await?;

    assert_eq!(stats.rendered, 0);
    assert_eq!(stats.failed, 1);

    // The failure still lands in the ledger, marked crashed, with no
    // previously-rendered views claimed.
    let rows = fake.tab("Props");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "p_broken_rig");
    assert_eq!(rows[1][3], "Yes");
    assert_eq!(rows[1][5], "");

    let failures = std::fs::read_to_string(dir.path().join("failures.log"))?;
    assert_eq!(failures, "p_broken_rig --- UNKNOWN SCENE DATA\n");
    Ok(())
}

#[tokio::test]
async fn summary_hand_off_fills_the_count_columns() -> TestResult {
    let dir = tempfile::tempdir()?;
    let fake = FakeLedger::with_tab(
        "Props",
        vec![vec![
            "Type",
            "Asset",
            "Crashed",
            "Polycount",
            "Number Of Textures",
            "Missing Textures",
            "Date And Time",
            "Blame",
        ]],
    );

    let summary = dir.path().join("p_new_rig_summary.json");
    std::fs::write(
        &summary,
        r#"{"asset":"p_new_rig","type":"prop","polycount":4242,"num_textures":7,"missing_textures":true}"#,
    )?;

    let (mut scheduler, _tx) = scheduler(
        client_for(&fake),
        shell_runner("exit 0"),
        FailureLog::new(dir.path().join("failures.log")),
    );

    let batch = vec![Candidate {
        source_path: dir.path().join("p_new_rig.ma"),
        output_dir: dir.path().to_path_buf(),
        category: Category::Props,
    }];
    let stats = scheduler
        .run(
            &batch,
            SchedulerOptions {
                policy: RerunPolicy::NewOnly,
                include_deleted: false,
            },
        )
        .await?;
    assert_eq!(stats.rendered, 1);

    let rows = fake.tab("Props");
    assert_eq!(rows[1][3], "4242");
    assert_eq!(rows[1][4], "7");
    assert_eq!(rows[1][5], "Yes");
    // Consumed on success so a later run cannot report stale counts.
    assert!(!summary.exists());
    Ok(())
}

#[tokio::test]
async fn shutdown_before_the_queue_halts_it() -> TestResult {
    let dir = tempfile::tempdir()?;
    let fake = FakeLedger::with_tab("Props", vec![HEADER.to_vec()]);

    let (mut scheduler, tx) = scheduler(
        client_for(&fake),
        shell_runner("exit 0"),
        FailureLog::new(dir.path().join("failures.log")),
    );
    tx.send(true)?;

    let stats = scheduler
        .run(
            &candidates(dir.path()),
            SchedulerOptions {
                policy: RerunPolicy::NewOnly,
                include_deleted: false,
            },
        )
        .await?;

    assert!(stats.cancelled);
    assert_eq!(stats.rendered, 0);
    assert_eq!(fake.write_count(), 0);
    Ok(())
}
