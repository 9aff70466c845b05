// src/config/validate.rs

use anyhow::{anyhow, Result};

use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - `[render].command` is non-empty
/// - the `{scene}` placeholder appears somewhere in the render args
/// - `[render].timeout_secs`, if set, is non-zero
/// - the classifier code lists do not overlap each other or zero
///
/// It does **not**:
/// - verify the ledger or catalog endpoints are reachable
/// - check that catalog folder ids exist (the upload step reports that)
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_render(cfg)?;
    validate_classifier(cfg)?;
    Ok(())
}

fn validate_render(cfg: &ConfigFile) -> Result<()> {
    if cfg.render.command.trim().is_empty() {
        return Err(anyhow!("[render].command must not be empty"));
    }

    if !cfg.render.args.iter().any(|a| a.contains("{scene}")) {
        return Err(anyhow!(
            "[render].args must contain a {{scene}} placeholder, got {:?}",
            cfg.render.args
        ));
    }

    if cfg.render.timeout_secs == Some(0) {
        return Err(anyhow!(
            "[render].timeout_secs must be >= 1 when set (omit it to disable the timeout)"
        ));
    }

    Ok(())
}

fn validate_classifier(cfg: &ConfigFile) -> Result<()> {
    let c = &cfg.classifier;
    let groups: [(&str, &[i64]); 3] = [
        ("layer_codes", &c.layer_codes),
        ("data_codes", &c.data_codes),
        ("crash_codes", &c.crash_codes),
    ];

    for (name, codes) in groups {
        if codes.contains(&0) {
            return Err(anyhow!(
                "[classifier].{name} must not contain 0 (exit 0 is always success)"
            ));
        }
    }

    for (i, (name_a, codes_a)) in groups.iter().enumerate() {
        for (name_b, codes_b) in groups.iter().skip(i + 1) {
            if let Some(dup) = codes_a.iter().find(|c| codes_b.contains(c)) {
                return Err(anyhow!(
                    "exit code {dup} appears in both [classifier].{name_a} and [classifier].{name_b}"
                ));
            }
        }
    }

    Ok(())
}
