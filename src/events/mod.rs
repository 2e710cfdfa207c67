// src/events/mod.rs
//! Event buffering and delivery
//!
//! This module ships application events to the bulk events endpoint:
//!
//! - **Event Queue**: ordered in-memory buffer with a capacity bound
//! - **Connection**: lazy plain/TLS connections with sticky failure
//! - **Request Builder**: raw HTTP/1.1 framing of the JSON payload
//! - **Transport**: partial-write tolerant send with a single retry
//! - **Processor**: flush orchestration and end-of-life delivery
//!
//! # Architecture
//!
//! ```text
//! Application → enqueue() → EventQueue
//!                               │ flush()
//!                               ▼
//!                    ConnectionManager::acquire()
//!                               ▼
//!                  RequestBuilder::build(JSON array)
//!                               ▼
//!               Transport::send (retry once, from byte 0)
//!                               ▼
//!                  POST /api/events/bulk
//! ```

pub mod connection;
pub mod event_queue;
pub mod processor;
pub mod request_builder;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

// Re-export commonly used types
pub use connection::{Connection, ConnectionManager, Connector, Endpoint, TcpConnector};
pub use event_queue::{EventQueue, QueueStats};
pub use processor::{EventProcessor, ProcessorOptions};
pub use request_builder::{encode_payload, RequestBuilder, BULK_EVENTS_PATH};
pub use transport::{SendOutcome, Transport};
