// src/utils/errors.rs
//! Error types for the event delivery path
//!
//! Every internal layer returns [`Result`]. The public flush/enqueue boundary
//! reduces these to booleans and sends the detail to the log.

use thiserror::Error;

/// Errors raised while buffering or delivering events
#[derive(Debug, Error)]
pub enum EventsError {
    /// A connection to the collector could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A previous connection failure is still in effect
    #[error("Connection unavailable: {0}")]
    CircuitOpen(String),

    /// The request could not be written to the connection
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// The queued events could not be encoded as JSON
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// The configured base URI does not name a reachable endpoint
    #[error("Invalid base URI: {0}")]
    InvalidBaseUri(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EventsError>;
