// src/events/transport.rs
//! Partial-write tolerant request sender with a single retry
//!
//! A request is written in a loop, advancing by however many bytes each write
//! reports. An error or a zero-length write means the peer is gone: the
//! connection is closed and, if a retry is still allowed, a fresh connection is
//! acquired and the whole request is resent from byte zero. There are never
//! more than two attempts per send.
//!
//! Writes are only bounded by the socket write timeout, if one was configured
//! on the connector. Without it a stalled peer blocks the caller.

use crate::events::connection::{Connection, ConnectionManager};
use crate::utils::errors::{EventsError, Result};
use std::io::{ErrorKind, Write};
use tracing::{debug, error, warn};

/// Upper bound on write attempts for a single request
pub const MAX_ATTEMPTS: usize = 2;

/// Result of handing a request to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written on the first connection
    Sent,

    /// Written after reconnecting once
    RetriedSent,

    /// Not written
    Failed,
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, SendOutcome::Failed)
    }
}

/// Writes framed requests to collector connections
#[derive(Debug, Default, Clone, Copy)]
pub struct Transport;

impl Transport {
    pub fn new() -> Self {
        Self
    }

    /// Write `request` to `connection`.
    ///
    /// On failure, and only when `allow_retry` is set, a new connection is
    /// taken from `connections` and the full request is written again.
    pub fn send(
        &self,
        connections: &mut ConnectionManager,
        connection: Box<dyn Connection>,
        request: &[u8],
        allow_retry: bool,
    ) -> SendOutcome {
        let attempts = if allow_retry { MAX_ATTEMPTS } else { 1 };
        let mut connection = connection;

        for attempt in 1..=attempts {
            match write_request(connection.as_mut(), request) {
                Ok(()) => {
                    debug!("Wrote {} byte request on attempt {}", request.len(), attempt);
                    return if attempt == 1 {
                        SendOutcome::Sent
                    } else {
                        SendOutcome::RetriedSent
                    };
                }
                Err(e) => {
                    connection.close();
                    drop(connection);

                    if attempt == attempts {
                        error!("Event delivery failed: {}", e);
                        return SendOutcome::Failed;
                    }

                    warn!("Write failed ({}), retrying send", e);
                    metrics::counter!("flush_retries_total").increment(1);

                    connection = match connections.acquire() {
                        Ok(fresh) => fresh,
                        Err(e) => {
                            error!("Unable to open connection for retry: {}", e);
                            return SendOutcome::Failed;
                        }
                    };
                }
            }
        }

        SendOutcome::Failed
    }
}

/// Write the whole buffer, treating an error or a zero-length write as a
/// closed connection
fn write_request(connection: &mut dyn Connection, request: &[u8]) -> Result<()> {
    let total = request.len();
    let mut written = 0;

    while written < total {
        match connection.write(&request[written..]) {
            Ok(0) => {
                return Err(EventsError::WriteFailed(format!(
                    "connection closed after {} of {} bytes",
                    written, total
                )));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(EventsError::WriteFailed(format!(
                    "{} after {} of {} bytes",
                    e, written, total
                )));
            }
        }
    }

    connection
        .flush()
        .map_err(|e| EventsError::WriteFailed(format!("flush failed: {}", e)))
}
