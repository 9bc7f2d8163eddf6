//! Configuration resolution
//!
//! Turns the loosely-typed key/value bundle handed to `initialize` into a
//! validated [`ConnectionConfig`]. No network access happens here.

mod coerce;
mod duration;

pub use duration::{parse_duration_str, parse_duration_value};

use crate::{Error, Result};
use coerce::Fields;
use serde_json::{Map, Value};
use std::time::Duration;

/// Default InfluxDB HTTP port
pub const DEFAULT_PORT: &str = "8086";

/// Default connect timeout, as written in configuration
pub const DEFAULT_CONNECT_TIMEOUT: &str = "5s";

/// Resolved connection configuration
#[derive(Clone, Default)]
pub struct ConnectionConfig {
    /// Server host name or address
    pub host: String,
    /// Server port (default: "8086")
    pub port: String,
    /// Bearer token used for every API call
    pub token: String,
    /// Organization identifier (opaque to this crate)
    pub organization: String,
    /// Default bucket identifier (opaque to this crate)
    pub default_bucket: String,
    /// Whether to talk TLS to the server
    pub tls: bool,
    /// Skip server certificate verification
    pub insecure_tls: bool,
    /// Minimum TLS version name, e.g. `tls12` (empty = protocol default)
    pub tls_min_version: String,
    /// PEM bundle holding certificate, key and CA blocks
    pub pem_bundle: String,
    /// Certificate bundle as issued by the PKI backend, in JSON form
    pub pem_json: String,
    /// Timeout for establishing the connection (default: 5s)
    pub connect_timeout: Duration,
    /// The configuration map exactly as supplied
    pub raw: Map<String, Value>,
}

impl ConnectionConfig {
    /// Decode and validate a raw configuration map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a field cannot be coerced to its
    /// declared type, if `host` or `token` is empty, if `token` cannot be sent
    /// in an HTTP header, or if `connect_timeout` is not a valid duration.
    pub fn from_raw(raw: &Map<String, Value>) -> Result<Self> {
        let fields = Fields::new(raw);

        let string = |key: &str| -> Result<String> { Ok(fields.string(key)?.unwrap_or_default()) };
        let boolean = |key: &str| -> Result<bool> { Ok(fields.boolean(key)?.unwrap_or(false)) };

        let host = string("host")?;
        let token = string("token")?;
        let mut port = string("port")?;
        if port.is_empty() {
            port = DEFAULT_PORT.to_string();
        }

        let connect_timeout = match fields.get("connect_timeout") {
            Some(value) => parse_duration_value(value),
            None => parse_duration_str(DEFAULT_CONNECT_TIMEOUT),
        }
        .map_err(|e| Error::Validation(format!("invalid connect_timeout: {}", e)))?;

        let config = Self {
            host,
            port,
            token,
            organization: string("organization")?,
            default_bucket: string("default_bucket")?,
            tls: boolean("tls")?,
            insecure_tls: boolean("insecure_tls")?,
            tls_min_version: string("tls_min_version")?,
            pem_bundle: string("pem_bundle")?,
            pem_json: string("pem_json")?,
            connect_timeout,
            raw: raw.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Validation("host cannot be empty".into()));
        }
        if self.token.is_empty() {
            return Err(Error::Validation("token cannot be empty".into()));
        }
        crate::connection::authorization_header(&self.token)?;
        Ok(())
    }

    /// Base URL of the server's HTTP API
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("{}://[{}]:{}", scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", scheme, self.host, self.port)
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &redact(&self.token))
            .field("organization", &self.organization)
            .field("default_bucket", &self.default_bucket)
            .field("tls", &self.tls)
            .field("insecure_tls", &self.insecure_tls)
            .field("tls_min_version", &self.tls_min_version)
            .field("pem_bundle", &redact(&self.pem_bundle))
            .field("pem_json", &redact(&self.pem_json))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            ConnectionConfig::from_raw(&raw(json!({"host": "127.0.0.1", "token": "tkn-1"})))
                .unwrap();
        assert_eq!(config.port, "8086");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(!config.tls);
        assert!(!config.insecure_tls);
        assert!(config.tls_min_version.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = ConnectionConfig::from_raw(&raw(json!({
            "host": "influx.internal",
            "token": "tkn-1",
            "port": 9999,
            "organization": "ACME",
            "default_bucket": "telegraf",
            "tls": "true",
            "insecure_tls": 1,
            "tls_min_version": "tls12",
            "connect_timeout": "30s",
            "extra": ["ignored"]
        })))
        .unwrap();
        assert_eq!(config.port, "9999");
        assert_eq!(config.organization, "ACME");
        assert_eq!(config.default_bucket, "telegraf");
        assert!(config.tls);
        assert!(config.insecure_tls);
        assert_eq!(config.tls_min_version, "tls12");
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.raw.contains_key("extra"));
    }

    #[test]
    fn test_missing_host() {
        let err = ConnectionConfig::from_raw(&raw(json!({"token": "tkn-1"}))).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("host")));
    }

    #[test]
    fn test_missing_token() {
        let err = ConnectionConfig::from_raw(&raw(json!({"host": "db", "token": ""}))).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("token")));
    }

    #[test]
    fn test_token_not_valid_in_header() {
        let err = ConnectionConfig::from_raw(&raw(json!({"host": "db", "token": "tkn\n1"})))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("HTTP header")));
    }

    #[test]
    fn test_invalid_connect_timeout() {
        let err = ConnectionConfig::from_raw(&raw(json!({
            "host": "db", "token": "t", "connect_timeout": "eventually"
        })))
        .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("connect_timeout")));
    }

    #[test]
    fn test_nested_value_rejected() {
        let err = ConnectionConfig::from_raw(&raw(json!({
            "host": "db", "token": "t", "port": {"value": 1}
        })))
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_null_timeout_uses_default() {
        let config = ConnectionConfig::from_raw(&raw(json!({
            "host": "db", "token": "t", "connect_timeout": null
        })))
        .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_base_url() {
        let mut config =
            ConnectionConfig::from_raw(&raw(json!({"host": "db", "token": "t"}))).unwrap();
        assert_eq!(config.base_url(), "http://db:8086");
        config.tls = true;
        assert_eq!(config.base_url(), "https://db:8086");
        config.host = "::1".into();
        assert_eq!(config.base_url(), "https://[::1]:8086");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ConnectionConfig::from_raw(&raw(json!({
            "host": "db", "token": "super-secret", "pem_bundle": "-----BEGIN"
        })))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("BEGIN"));
        assert!(debug.contains("<redacted>"));
    }
}
