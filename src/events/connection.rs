// src/events/connection.rs
//! Lazy connection management for the bulk events endpoint
//!
//! A [`ConnectionManager`] opens one plain or TLS stream per flush attempt.
//! The first failed attempt trips a sticky flag: from then on `acquire` fails
//! without touching the network, unless a reconnect cooldown is configured.

use crate::utils::errors::{EventsError, Result};
use once_cell::sync::OnceCell;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::fmt;
use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default collector host
pub const DEFAULT_HOST: &str = "app.launchdarkly.com";

/// Default collector port (TLS)
pub const DEFAULT_PORT: u16 = 443;

/// Where events are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }

    /// Resolve a base URI such as `https://events.example.com:8443`.
    ///
    /// `https` selects TLS; any other scheme is plain. A missing port
    /// falls back to 443 or 80 accordingly.
    pub fn from_base_uri(base_uri: &str) -> Result<Self> {
        let url = url::Url::parse(base_uri)
            .map_err(|e| EventsError::InvalidBaseUri(format!("{}: {}", base_uri, e)))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| EventsError::InvalidBaseUri(format!("{}: missing host", base_uri)))?
            .to_string();

        let tls = url.scheme() == "https";
        let port = url.port().unwrap_or(if tls { 443 } else { 80 });

        Ok(Self { host, port, tls })
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls {
            "tls"
        } else {
            "tcp"
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, true)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

/// A writable stream to the collector
pub trait Connection: Write + Send {
    /// Close the stream; errors are ignored
    fn close(&mut self) {}
}

impl Connection for TcpStream {
    fn close(&mut self) {
        let _ = self.shutdown(Shutdown::Both);
    }
}

impl Connection for StreamOwned<ClientConnection, TcpStream> {
    fn close(&mut self) {
        // Never drive a pending handshake from here; it could block on reads
        if !self.conn.is_handshaking() {
            self.conn.send_close_notify();
            while self.conn.wants_write() {
                if self.conn.write_tls(&mut self.sock).is_err() {
                    break;
                }
            }
        }
        let _ = self.sock.shutdown(Shutdown::Both);
    }
}

/// Opens connections to an endpoint
pub trait Connector: Send {
    fn connect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Box<dyn Connection>>;
}

/// Connector backed by `std::net::TcpStream`, wrapped in rustls for TLS
/// endpoints
pub struct TcpConnector {
    tls_config: OnceCell<Arc<ClientConfig>>,
    write_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self {
            tls_config: OnceCell::new(),
            write_timeout: None,
        }
    }

    /// Use a caller-supplied TLS client configuration
    pub fn with_tls_config(config: Arc<ClientConfig>) -> Self {
        Self {
            tls_config: OnceCell::with_value(config),
            write_timeout: None,
        }
    }

    /// Bound each socket write. `None` leaves writes unbounded.
    pub fn with_write_timeout(mut self, write_timeout: Option<Duration>) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    fn tls_config(&self) -> Result<Arc<ClientConfig>> {
        self.tls_config
            .get_or_try_init(|| {
                let mut roots = RootCertStore::empty();
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

                let provider = Arc::new(rustls::crypto::ring::default_provider());
                let config = ClientConfig::builder_with_provider(provider)
                    .with_safe_default_protocol_versions()
                    .map_err(|e| EventsError::ConfigError(format!("TLS setup failed: {}", e)))?
                    .with_root_certificates(roots)
                    .with_no_client_auth();

                Ok(Arc::new(config))
            })
            .cloned()
    }

    fn open_stream(&self, endpoint: &Endpoint, timeout: Duration) -> Result<TcpStream> {
        let addrs = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| {
                EventsError::ConnectionFailed(format!("Failed to resolve {}: {}", endpoint, e))
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_write_timeout(self.write_timeout)?;
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(EventsError::ConnectionFailed(match last_error {
            Some(e) => format!("Failed to connect to {}: {}", endpoint, e),
            None => format!("No addresses found for {}", endpoint),
        }))
    }

    /// Complete the TLS handshake within `timeout` per socket operation, so a
    /// peer that never speaks TLS counts as a connection failure
    fn handshake(
        &self,
        endpoint: &Endpoint,
        conn: &mut ClientConnection,
        stream: &mut TcpStream,
        timeout: Duration,
    ) -> Result<()> {
        let handshake_failed = |e: std::io::Error| {
            EventsError::ConnectionFailed(format!("TLS handshake with {} failed: {}", endpoint, e))
        };

        stream.set_read_timeout(Some(timeout)).map_err(handshake_failed)?;
        stream.set_write_timeout(Some(timeout)).map_err(handshake_failed)?;

        while conn.is_handshaking() {
            conn.complete_io(stream).map_err(handshake_failed)?;
        }

        stream.set_read_timeout(None).map_err(handshake_failed)?;
        stream
            .set_write_timeout(self.write_timeout)
            .map_err(handshake_failed)?;

        debug!("TLS handshake with {} complete", endpoint);
        Ok(())
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TcpConnector {
    fn connect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Box<dyn Connection>> {
        let mut stream = self.open_stream(endpoint, timeout)?;

        if !endpoint.tls {
            return Ok(Box::new(stream));
        }

        let server_name = ServerName::try_from(endpoint.host.clone()).map_err(|e| {
            EventsError::ConnectionFailed(format!("Invalid TLS server name {}: {}", endpoint.host, e))
        })?;
        let mut conn = ClientConnection::new(self.tls_config()?, server_name)
            .map_err(|e| EventsError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;

        self.handshake(endpoint, &mut conn, &mut stream, timeout)?;

        Ok(Box::new(StreamOwned::new(conn, stream)))
    }
}

/// Opens connections on demand and remembers failure
pub struct ConnectionManager {
    endpoint: Endpoint,
    connect_timeout: Duration,
    connector: Box<dyn Connector>,

    /// Set by the first failed attempt
    failed_at: Option<Instant>,

    /// When set, a failure only blocks attempts for this long
    reconnect_cooldown: Option<Duration>,

    /// Connection attempts that reached the connector
    attempts: u64,
}

impl ConnectionManager {
    pub fn new(endpoint: Endpoint, connect_timeout: Duration, connector: Box<dyn Connector>) -> Self {
        Self {
            endpoint,
            connect_timeout,
            connector,
            failed_at: None,
            reconnect_cooldown: None,
            attempts: 0,
        }
    }

    /// Allow a new attempt once `cooldown` has passed since the last failure
    pub fn with_reconnect_cooldown(mut self, cooldown: Option<Duration>) -> Self {
        if let Some(cooldown) = cooldown {
            info!("Reconnect cooldown set to {:?}", cooldown);
        }
        self.reconnect_cooldown = cooldown;
        self
    }

    /// Open a writable connection, or fail fast if a prior attempt failed
    pub fn acquire(&mut self) -> Result<Box<dyn Connection>> {
        if let Some(failed_at) = self.failed_at {
            match self.reconnect_cooldown {
                Some(cooldown) if failed_at.elapsed() >= cooldown => {
                    info!("Reconnect cooldown elapsed, retrying {}", self.endpoint);
                    self.failed_at = None;
                }
                _ => {
                    return Err(EventsError::CircuitOpen(format!(
                        "{} failed previously",
                        self.endpoint
                    )));
                }
            }
        }

        self.attempts += 1;
        debug!("Opening connection to {}", self.endpoint);

        match self.connector.connect(&self.endpoint, self.connect_timeout) {
            Ok(connection) => Ok(connection),
            Err(e) => {
                error!("Unable to open connection to {}: {}", self.endpoint, e);
                if self.reconnect_cooldown.is_none() {
                    warn!("Event delivery disabled for the rest of this client's lifetime");
                }
                metrics::counter!("connection_failures_total").increment(1);
                self.failed_at = Some(Instant::now());
                Err(e)
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed_at.is_some()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}
