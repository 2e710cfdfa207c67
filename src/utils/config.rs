// src/utils/config.rs
//! Processor configuration
//!
//! Values come from an optional TOML file, then `LD_EVENTS_*` environment
//! variables, then built-in defaults.

use crate::events::connection::Endpoint;
use crate::events::processor::ProcessorOptions;
use crate::events::request_builder::DEFAULT_CLIENT_NAME;
use crate::utils::errors::{EventsError, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LD_EVENTS";

/// Raw configuration as loaded from file and environment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// SDK key sent in the `Authorization` header
    pub api_key: String,

    /// Collector base URI; the default collector is used when unset
    pub base_uri: Option<String>,

    /// Queue bound (see `EventQueue` for the admission rule)
    pub capacity: usize,

    /// Connect timeout (milliseconds)
    pub timeout_ms: u64,

    /// Per-write socket timeout (milliseconds); unbounded when unset
    pub write_timeout_ms: Option<u64>,

    /// Retry connecting this long after a failure (milliseconds); a failure
    /// is permanent when unset
    pub reconnect_cooldown_ms: Option<u64>,

    /// Client name for the `User-Agent` header
    pub client_name: String,

    /// Client version for the `User-Agent` header
    pub version: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_uri: None,
            capacity: 1000,
            timeout_ms: 3000,
            write_timeout_ms: None,
            reconnect_cooldown_ms: None,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

impl ProcessorConfig {
    /// Load configuration, reading `path` first when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration from {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| EventsError::ConfigError(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(EventsError::ConfigError("api_key must be set".to_string()));
        }

        if self.timeout_ms == 0 {
            return Err(EventsError::ConfigError(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.write_timeout_ms == Some(0) {
            return Err(EventsError::ConfigError(
                "write_timeout_ms must be greater than 0".to_string(),
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

    /// Resolve the collector endpoint
    pub fn endpoint(&self) -> Result<Endpoint> {
        match &self.base_uri {
            Some(uri) => Endpoint::from_base_uri(uri),
            None => Ok(Endpoint::default()),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }

    pub fn reconnect_cooldown(&self) -> Option<Duration> {
        self.reconnect_cooldown_ms.map(Duration::from_millis)
    }

    /// Validated processor settings
    pub fn options(&self) -> Result<ProcessorOptions> {
        self.validate()?;

        Ok(ProcessorOptions {
            api_key: self.api_key.clone(),
            endpoint: self.endpoint()?,
            capacity: self.capacity,
            connect_timeout: self.connect_timeout(),
            write_timeout: self.write_timeout(),
            reconnect_cooldown: self.reconnect_cooldown(),
            client_name: self.client_name.clone(),
            version: self.version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_with_key() -> ProcessorConfig {
        ProcessorConfig {
            api_key: "sdk-123".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert!(config.write_timeout().is_none());
        assert!(config.reconnect_cooldown().is_none());
        assert_eq!(config.endpoint().unwrap(), Endpoint::default());
    }

    #[test]
    fn test_validation() {
        assert!(ProcessorConfig::default().validate().is_err());
        assert!(config_with_key().validate().is_ok());

        let zero_timeout = ProcessorConfig {
            timeout_ms: 0,
            ..config_with_key()
        };
        assert!(zero_timeout.validate().is_err());

        let zero_write_timeout = ProcessorConfig {
            write_timeout_ms: Some(0),
            ..config_with_key()
        };
        assert!(zero_write_timeout.validate().is_err());

        let bad_name = ProcessorConfig {
            client_name: "Rust Client".to_string(),
            ..config_with_key()
        };
        assert!(bad_name.validate().is_err());
    }

    #[test]
    fn test_options_resolve_base_uri() {
        let config = ProcessorConfig {
            base_uri: Some("http://localhost:8030".to_string()),
            reconnect_cooldown_ms: Some(500),
            write_timeout_ms: Some(750),
            ..config_with_key()
        };

        let options = config.options().unwrap();
        assert_eq!(options.endpoint, Endpoint::new("localhost", 8030, false));
        assert_eq!(options.reconnect_cooldown, Some(Duration::from_millis(500)));
        assert_eq!(options.write_timeout, Some(Duration::from_millis(750)));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_malformed_base_uri_rejected() {
        let config = ProcessorConfig {
            base_uri: Some("::not-a-uri".to_string()),
            ..config_with_key()
        };
        assert!(matches!(config.options(), Err(EventsError::InvalidBaseUri(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
api_key = "sdk-from-file"
base_uri = "https://events.example.com"
capacity = 5
timeout_ms = 250
"#
        )
        .unwrap();

        let config = ProcessorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.api_key, "sdk-from-file");
        assert_eq!(config.capacity, 5);
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.endpoint().unwrap(),
            Endpoint::new("events.example.com", 443, true)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = ProcessorConfig::load(Some(Path::new("/nonexistent/ld-events.toml")));
        assert!(matches!(result, Err(EventsError::ConfigError(_))));
    }
}
