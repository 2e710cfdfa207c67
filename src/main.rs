// src/main.rs
//! ld-events
//!
//! Reads newline-delimited JSON events from stdin and delivers them to the
//! configured collector in one bulk request when input ends.
//!
//! Usage: `ld-events [config.toml]`; `LD_EVENTS_*` variables override the file.

use anyhow::{Context, Result};
use ld_events::observability::init_tracing;
use ld_events::{EventProcessor, ProcessorConfig};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing::{info, warn};

fn main() -> Result<()> {
    init_tracing()?;

    info!("Starting ld-events v{}", ld_events::VERSION);

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config =
        ProcessorConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    let processor: EventProcessor =
        EventProcessor::from_config(&config).context("Failed to create event processor")?;

    let stdin = io::stdin();
    for (lineno, line) in stdin.lock().lines().enumerate() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str(&line) {
            Ok(event) => {
                if !processor.send_event(event) {
                    warn!("Event queue full, dropping event on line {}", lineno + 1);
                }
            }
            Err(e) => warn!("Skipping malformed event on line {}: {}", lineno + 1, e),
        }
    }

    let stats = processor.stats();
    info!(
        "Read {} events ({} dropped, {:.1}%), delivering to {}",
        stats.accepted,
        stats.rejected,
        stats.rejection_rate(),
        processor.endpoint()
    );

    if processor.close() {
        info!("Events delivered");
    } else {
        warn!("Event delivery failed");
    }

    Ok(())
}
