//! Local developer replay harness.
//!
//! Reads a captured push event from a JSON file and runs it through the
//! pipeline with the log-only delivery stand-in, so the whole
//! verify/decrypt/fan-out path can be exercised without a front door or a
//! broker. Event files use the same shape the front door produces, so a
//! request captured in production replays unmodified.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::pipeline;
use crate::request::PushRequest;

/// Applies `VAR=VAL` overrides to the process environment.
///
/// Called before config parsing so replayed events can pin secrets and flags
/// without touching the shell environment.
pub fn apply_env_overrides(overrides: &[String]) -> Result<()> {
    for pair in overrides {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("invalid env override '{pair}'; expected VAR=VAL");
        };
        std::env::set_var(name, value);
    }
    Ok(())
}

/// Loads the event file and runs it through the pipeline once.
pub async fn run(event_file: &Path, config: &Config) -> Result<()> {
    let data = std::fs::read_to_string(event_file)
        .with_context(|| format!("error reading event file {}", event_file.display()))?;
    let event: PushRequest = serde_json::from_str(&data).context("event unmarshal failed")?;

    let response = pipeline::handle(&event, config).await;
    log::info!("[Replay] {} {}", response.status_code, response.body);
    Ok(())
}
