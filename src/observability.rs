// src/observability.rs
//! Logging setup for the binary
//!
//! The library only emits `tracing` events and `metrics` counters; installing
//! a subscriber or exporter is left to the application.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Set to `1` or `true` for JSON log lines
pub const LOG_JSON_ENV: &str = "LD_EVENTS_LOG_JSON";

/// Initialize tracing from `RUST_LOG` (default `info`)
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var(LOG_JSON_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}
