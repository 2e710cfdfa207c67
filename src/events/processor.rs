// src/events/processor.rs
//! Event processor: buffering plus flush orchestration
//!
//! `enqueue` only touches the in-memory queue. `flush` acquires a connection,
//! frames everything queued into one bulk request and hands it to the
//! transport. A successful flush drains the delivered batch; a failed flush
//! leaves the queue as it was.
//!
//! Dropping the processor flushes once, unless [`EventProcessor::close`]
//! already did.

use crate::events::connection::{ConnectionManager, Connector, Endpoint, TcpConnector};
use crate::events::event_queue::{EventQueue, QueueStats};
use crate::events::request_builder::{RequestBuilder, DEFAULT_CLIENT_NAME};
use crate::events::transport::Transport;
use crate::utils::config::ProcessorConfig;
use crate::utils::errors::{EventsError, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Validated settings for an [`EventProcessor`]
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub api_key: String,
    pub endpoint: Endpoint,
    pub capacity: usize,
    pub connect_timeout: Duration,

    /// Socket write timeout for the connector built by [`EventProcessor::new`];
    /// unbounded when `None`
    pub write_timeout: Option<Duration>,
    pub reconnect_cooldown: Option<Duration>,
    pub client_name: String,
    pub version: String,
}

impl ProcessorOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: Endpoint::default(),
            capacity: 1000,
            connect_timeout: Duration::from_secs(3),
            write_timeout: None,
            reconnect_cooldown: None,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            version: crate::VERSION.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_reconnect_cooldown(mut self, cooldown: Option<Duration>) -> Self {
        self.reconnect_cooldown = cooldown;
        self
    }

    /// Reject settings the socket layer cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(EventsError::ConfigError("api_key must be set".to_string()));
        }

        // A zero socket timeout is an error at the OS level
        if self.connect_timeout.is_zero() {
            return Err(EventsError::ConfigError(
                "connect_timeout must be greater than 0".to_string(),
            ));
        }

        if self.write_timeout.is_some_and(|t| t.is_zero()) {
            return Err(EventsError::ConfigError(
                "write_timeout must be greater than 0".to_string(),
            ));
        }

        if self.client_name.is_empty() || self.client_name.contains(char::is_whitespace) {
            return Err(EventsError::ConfigError(format!(
                "Invalid client_name: {:?}",
                self.client_name
            )));
        }

        Ok(())
    }
}

/// Everything a flush needs besides the queue
struct Delivery {
    connections: ConnectionManager,
    requests: RequestBuilder,
    transport: Transport,
}

/// Buffers events and delivers them to the bulk events endpoint
pub struct EventProcessor<E: Serialize = serde_json::Value> {
    queue: Mutex<EventQueue<E>>,

    /// Held for the whole of a flush, so flushes never overlap
    delivery: Mutex<Delivery>,

    closed: bool,
}

impl<E: Serialize> EventProcessor<E> {
    /// Processor writing to real sockets
    pub fn new(options: ProcessorOptions) -> Result<Self> {
        let connector = TcpConnector::new().with_write_timeout(options.write_timeout);
        Self::with_connector(options, Box::new(connector))
    }

    /// Build from the configuration layer
    pub fn from_config(config: &ProcessorConfig) -> Result<Self> {
        Self::new(config.options()?)
    }

    /// Processor using a custom connector. `options.write_timeout` is left to
    /// the connector.
    pub fn with_connector(
        options: ProcessorOptions,
        connector: Box<dyn Connector>,
    ) -> Result<Self> {
        options.validate()?;

        info!(
            "Event processor targeting {} (capacity {})",
            options.endpoint, options.capacity
        );

        let requests = RequestBuilder::new(
            options.endpoint.host.clone(),
            options.api_key,
            &options.client_name,
            &options.version,
        );
        let connections =
            ConnectionManager::new(options.endpoint, options.connect_timeout, connector)
                .with_reconnect_cooldown(options.reconnect_cooldown);

        Ok(Self {
            queue: Mutex::new(EventQueue::new(options.capacity)),
            delivery: Mutex::new(Delivery {
                connections,
                requests,
                transport: Transport::new(),
            }),
            closed: false,
        })
    }

    /// Queue an event for the next flush. Returns `false` when the queue is
    /// full; the event is not kept.
    pub fn enqueue(&self, event: E) -> bool {
        let accepted = self.queue.lock().enqueue(event);
        if accepted {
            metrics::counter!("events_enqueued_total").increment(1);
        } else {
            metrics::counter!("events_dropped_total").increment(1);
        }
        accepted
    }

    /// Same as [`enqueue`](Self::enqueue)
    pub fn send_event(&self, event: E) -> bool {
        self.enqueue(event)
    }

    /// Deliver everything queued in a single request.
    ///
    /// Returns `true` when there was nothing to send or the request was fully
    /// written, `false` otherwise. Never panics or returns an error.
    pub fn flush(&self) -> bool {
        let mut delivery = self.delivery.lock();
        let Delivery {
            connections,
            requests,
            transport,
        } = &mut *delivery;

        if self.queue.lock().is_empty() {
            debug!("No events to flush");
            return true;
        }

        let connection = match connections.acquire() {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Unable to open connection, events kept for a later flush: {}", e);
                metrics::counter!("flush_failures_total").increment(1);
                return false;
            }
        };

        let start = Instant::now();
        let batch = self.queue.lock().take_batch();

        let request = match requests.build_for(&batch) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to encode {} events: {}", batch.len(), e);
                self.queue.lock().restore_batch(batch);
                metrics::counter!("flush_failures_total").increment(1);
                return false;
            }
        };

        let outcome = transport.send(connections, connection, &request, true);

        if outcome.is_success() {
            self.queue.lock().mark_delivered(batch.len());
            metrics::counter!("events_flushed_total").increment(batch.len() as u64);
            debug!(
                "Flushed {} events ({:?}) in {:?}",
                batch.len(),
                outcome,
                start.elapsed()
            );
            true
        } else {
            warn!("Flush of {} events failed, events kept", batch.len());
            self.queue.lock().restore_batch(batch);
            metrics::counter!("flush_failures_total").increment(1);
            false
        }
    }

    /// Flush once and release the processor
    pub fn close(mut self) -> bool {
        self.closed = true;
        self.flush()
    }

    /// Number of events currently queued
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.lock().stats()
    }

    /// Whether a connection failure has disabled delivery
    pub fn connection_failed(&self) -> bool {
        self.delivery.lock().connections.is_failed()
    }

    pub fn endpoint(&self) -> Endpoint {
        self.delivery.lock().connections.endpoint().clone()
    }
}

impl<E: Serialize> Drop for EventProcessor<E> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if !self.flush() {
            warn!("Final flush on drop did not deliver {} events", self.len());
        }
    }
}
