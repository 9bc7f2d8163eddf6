//! Dialing the server and the API surface of an established connection

use super::TlsConfig;
use crate::auth::{Authorization, AuthorizationList};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Everything needed to open a connection
#[derive(Clone)]
pub struct DialTarget {
    /// `http(s)://host:port`
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: String,
    /// Bound on establishing the TCP/TLS connection (zero = none)
    pub connect_timeout: Duration,
    /// TLS settings; `None` for plaintext
    pub tls: Option<TlsConfig>,
}

impl std::fmt::Debug for DialTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialTarget")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("tls", &self.tls)
            .finish()
    }
}

/// Operations this crate needs from a live connection
pub trait InfluxApi: Send + Sync + 'static {
    /// Liveness probe
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Every authorization visible to the connection's token
    fn authorizations(&self) -> impl Future<Output = Result<Vec<Authorization>>> + Send;

    /// Release the connection. Later calls on this handle fail.
    fn close(&self) -> Result<()>;
}

/// Opens connections
pub trait Dialer: Send + Sync + 'static {
    /// Handle type produced by a successful dial
    type Client: InfluxApi;

    /// Open a connection to `target`
    fn dial(&self, target: &DialTarget) -> impl Future<Output = Result<Self::Client>> + Send;
}

/// `Authorization: Token <token>` header value, marked sensitive
pub(crate) fn authorization_header(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Token {}", token)).map_err(|_| {
        Error::Validation("token contains characters not allowed in an HTTP header".into())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Dials the InfluxDB HTTP API
#[derive(Debug, Clone, Default)]
pub struct HttpDialer;

impl Dialer for HttpDialer {
    type Client = HttpClient;

    async fn dial(&self, target: &DialTarget) -> Result<HttpClient> {
        HttpClient::connect(target)
    }
}

/// HTTP connection to an InfluxDB server
#[derive(Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    closed: AtomicBool,
}

impl HttpClient {
    /// Build a client for `target`. No request is sent.
    pub fn connect(target: &DialTarget) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization_header(&target.token)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("influxdb-producer/", env!("CARGO_PKG_VERSION")))
            .no_proxy();
        if !target.connect_timeout.is_zero() {
            builder = builder.connect_timeout(target.connect_timeout);
        }
        if let Some(tls) = &target.tls {
            builder = builder.use_preconfigured_tls((*tls.client_config()).clone());
        }

        let http = builder
            .build()
            .map_err(|e| Error::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: target.base_url.trim_end_matches('/').to_string(),
            closed: AtomicBool::new(false),
        })
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, authenticated with the configured token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] once the handle has been closed.
    pub fn http(&self) -> Result<&reqwest::Client> {
        self.ensure_open()?;
        Ok(&self.http)
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Connection("connection has been closed".into()));
        }
        Ok(())
    }
}

impl InfluxApi for HttpClient {
    async fn ping(&self) -> Result<()> {
        self.ensure_open()?;
        self.http
            .get(self.url("/ping"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Connection(format!("error checking cluster status: {}", e)))?;
        Ok(())
    }

    async fn authorizations(&self) -> Result<Vec<Authorization>> {
        self.ensure_open()?;
        let list: AuthorizationList = self
            .http
            .get(self.url("/api/v2/authorizations"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Introspection(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Introspection(format!("unexpected response body: {}", e)))?;
        Ok(list.authorizations)
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::Connection("connection already closed".into()));
        }
        Ok(())
    }
}
