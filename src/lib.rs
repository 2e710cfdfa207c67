// src/lib.rs
//! Buffered event delivery
//!
//! Application code hands events to an [`EventProcessor`], which keeps them
//! in memory and ships them as a single JSON array to the collector's bulk
//! endpoint when flushed or released.
//!
//! # Architecture
//!
//! - **events**: queue, connection management, request framing, transport
//! - **observability**: tracing setup for the binary
//! - **utils**: configuration and errors
//!
//! # Example
//!
//! ```no_run
//! use ld_events::{Endpoint, EventProcessor, ProcessorOptions};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # fn main() -> ld_events::Result<()> {
//! let options = ProcessorOptions::new("sdk-key")
//!     .with_endpoint(Endpoint::new("localhost", 8030, false))
//!     .with_capacity(100)
//!     .with_write_timeout(Some(Duration::from_secs(5)));
//! let processor: EventProcessor = EventProcessor::new(options)?;
//!
//! processor.enqueue(json!({"kind": "feature", "key": "new-checkout"}));
//! processor.close();
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod observability;
pub mod utils;

// Re-export commonly used types
pub use events::{Endpoint, EventProcessor, ProcessorOptions, QueueStats};
pub use utils::config::ProcessorConfig;
pub use utils::errors::{EventsError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
