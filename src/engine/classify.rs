// src/engine/classify.rs

//! Maps a finished render process onto a closed outcome taxonomy.
//!
//! The rules form an ordered table; the first matching rule wins. Which
//! exit codes mean what is configuration ([`ClassifierSection`]), not
//! knowledge baked into this module.

use crate::config::ClassifierSection;
use crate::exec::ProcessOutcome;

/// Everything a render job can come back as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    /// The render timed out and was killed. Only reachable when a
    /// timeout is configured.
    Timeout,
    /// The default render layer was unusable.
    BadDefaultLayer,
    /// The scene contained data the renderer did not understand.
    UnknownSceneData,
    /// Hard crash, typically on oversized textures or geometry.
    LargeResourceCrash,
    /// Any other non-zero exit.
    OtherPluginError,
}

impl JobOutcome {
    pub fn is_success(self) -> bool {
        self == JobOutcome::Success
    }

    /// Note written to the failures record for this outcome.
    pub fn failure_note(self) -> &'static str {
        match self {
            JobOutcome::Success => "OK",
            JobOutcome::Timeout => "RENDER TIMED OUT",
            JobOutcome::BadDefaultLayer => "BAD DEFAULT RENDER LAYER",
            JobOutcome::UnknownSceneData => "UNKNOWN SCENE DATA",
            JobOutcome::LargeResourceCrash => "LARGE RESOURCE CRASH",
            JobOutcome::OtherPluginError => "PLUGIN OR OTHER ERROR",
        }
    }
}

pub struct Classifier {
    table: ClassifierSection,
}

impl Classifier {
    pub fn new(table: ClassifierSection) -> Self {
        Self { table }
    }

    /// First matching rule wins:
    /// timeout, signal death, exit 0, layer codes, data codes, crash
    /// codes / negative codes, everything else.
    pub fn classify(&self, outcome: &ProcessOutcome) -> JobOutcome {
        if outcome.timed_out {
            return JobOutcome::Timeout;
        }
        if outcome.crashed_by_signal {
            return JobOutcome::LargeResourceCrash;
        }

        let Some(code) = outcome.exit_code else {
            // No code and no signal report: the supervision layer lost
            // track of the process, treat it like a hard crash.
            return JobOutcome::LargeResourceCrash;
        };

        if code == 0 {
            return JobOutcome::Success;
        }
        if contains_code(&self.table.layer_codes, code) {
            return JobOutcome::BadDefaultLayer;
        }
        if contains_code(&self.table.data_codes, code) {
            return JobOutcome::UnknownSceneData;
        }
        if code < 0 || contains_code(&self.table.crash_codes, code) {
            return JobOutcome::LargeResourceCrash;
        }
        JobOutcome::OtherPluginError
    }
}

/// Exit codes above 2^31 come back sign-wrapped on some platforms;
/// compare both the raw value and its unsigned 32-bit rendering.
fn contains_code(codes: &[i64], code: i64) -> bool {
    if codes.contains(&code) {
        return true;
    }
    if code < 0 {
        let unsigned = i64::from(code as i32 as u32);
        return codes.contains(&unsigned);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(code: i64) -> ProcessOutcome {
        ProcessOutcome {
            exit_code: Some(code),
            crashed_by_signal: false,
            timed_out: false,
            stdout_log: String::new(),
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(ClassifierSection::default())
    }

    #[test]
    fn exit_zero_is_success() {
        assert_eq!(classifier().classify(&outcome(0)), JobOutcome::Success);
    }

    #[test]
    fn negative_codes_are_large_resource_crashes() {
        assert_eq!(
            classifier().classify(&outcome(-11)),
            JobOutcome::LargeResourceCrash
        );
    }

    #[test]
    fn known_crash_codes_match_raw_and_sign_wrapped() {
        let c = classifier();
        assert_eq!(
            c.classify(&outcome(3221225477)),
            JobOutcome::LargeResourceCrash
        );
        // 3221225477 as a wrapped i32
        assert_eq!(
            c.classify(&outcome(i64::from(3221225477u32 as i32))),
            JobOutcome::LargeResourceCrash
        );
    }

    #[test]
    fn layer_and_data_codes_use_the_configured_table() {
        let c = classifier();
        assert_eq!(c.classify(&outcome(206)), JobOutcome::BadDefaultLayer);
        assert_eq!(c.classify(&outcome(211)), JobOutcome::UnknownSceneData);
    }

    #[test]
    fn unrecognized_positive_codes_are_plugin_errors() {
        assert_eq!(
            classifier().classify(&outcome(42)),
            JobOutcome::OtherPluginError
        );
    }

    #[test]
    fn signal_death_beats_exit_code() {
        let o = ProcessOutcome {
            exit_code: Some(0),
            crashed_by_signal: true,
            timed_out: false,
            stdout_log: String::new(),
        };
        assert_eq!(classifier().classify(&o), JobOutcome::LargeResourceCrash);
    }

    #[test]
    fn timeout_beats_everything() {
        let o = ProcessOutcome {
            exit_code: Some(0),
            crashed_by_signal: true,
            timed_out: true,
            stdout_log: String::new(),
        };
        assert_eq!(classifier().classify(&o), JobOutcome::Timeout);
    }
}
