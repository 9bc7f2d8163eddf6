//! Connection producer
//!
//! Owns the validated configuration and the single cached connection.
//! Every operation runs under one async mutex, so at most one
//! dial-and-verify sequence is in flight per producer.

use super::state::ProducerState;
use super::tls::{TlsConfig, TlsVersion};
use super::transport::{DialTarget, Dialer, HttpDialer, InfluxApi};
use crate::auth;
use crate::certs::{self, CertificateBundle};
use crate::config::ConnectionConfig;
use crate::metrics::{counters, histograms, labels};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::Instrument;

/// Placeholder substituted for the token in logs
pub const TOKEN_PLACEHOLDER: &str = "[token]";
/// Placeholder substituted for the PEM bundle in logs
pub const PEM_BUNDLE_PLACEHOLDER: &str = "[pem_bundle]";
/// Placeholder substituted for the PEM JSON in logs
pub const PEM_JSON_PLACEHOLDER: &str = "[pem_json]";

/// Input to [`ConnectionProducer::initialize`]
#[derive(Clone, Default)]
pub struct InitializeRequest {
    /// Raw configuration bundle
    pub config: Map<String, Value>,
    /// Connect and verify the token before returning
    pub verify_connection: bool,
}

/// Output of [`ConnectionProducer::initialize`]
#[derive(Clone, Default)]
pub struct InitializeResponse {
    /// The accepted configuration, unmodified, for the caller to persist
    pub config: Map<String, Value>,
}

impl std::fmt::Debug for InitializeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializeRequest")
            .field("config", &Redacted(&self.config))
            .field("verify_connection", &self.verify_connection)
            .finish()
    }
}

impl std::fmt::Debug for InitializeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializeResponse")
            .field("config", &Redacted(&self.config))
            .finish()
    }
}

/// Raw configuration with secret values masked
struct Redacted<'a>(&'a Map<String, Value>);

impl std::fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const SECRET_KEYS: [&str; 3] = ["token", "pem_bundle", "pem_json"];
        let mut map = f.debug_map();
        for (key, value) in self.0 {
            if SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                map.entry(key, &"<redacted>");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

struct Settings {
    config: ConnectionConfig,
    certs: CertificateBundle,
}

struct Inner<C> {
    state: ProducerState,
    settings: Option<Settings>,
    client: Option<Arc<C>>,
}

/// Lazily connects to InfluxDB and caches the verified connection
pub struct ConnectionProducer<D: Dialer = HttpDialer> {
    dialer: D,
    inner: Mutex<Inner<D::Client>>,
}

impl ConnectionProducer<HttpDialer> {
    /// Producer that talks to the InfluxDB HTTP API
    pub fn new() -> Self {
        Self::with_dialer(HttpDialer)
    }
}

impl Default for ConnectionProducer<HttpDialer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dialer> ConnectionProducer<D> {
    /// Database type name reported to the serving layer
    pub const TYPE: &'static str = "influxdbv2";

    /// Producer using a custom dialer
    pub fn with_dialer(dialer: D) -> Self {
        Self {
            dialer,
            inner: Mutex::new(Inner {
                state: ProducerState::Uninitialized,
                settings: None,
                client: None,
            }),
        }
    }

    /// Validate and store a configuration.
    ///
    /// Nothing is stored unless the configuration and certificate material
    /// are valid. A connection cached for a previous configuration is closed.
    /// With `verify_connection`, a full connect is attempted before returning;
    /// if it fails the producer stays initialized without a connection.
    pub async fn initialize(&self, req: InitializeRequest) -> Result<InitializeResponse> {
        let span = tracing::info_span!("initialize", verify = req.verify_connection);
        async {
            let mut inner = self.inner.lock().await;

            let mut config = ConnectionConfig::from_raw(&req.config)?;
            let certs = certs::assemble(&mut config)?;
            tracing::debug!(host = %config.host, port = %config.port, tls = config.tls, "configuration accepted");

            inner.state.transition(ProducerState::Initialized)?;
            if let Some(stale) = inner.client.take() {
                if let Err(e) = stale.close() {
                    tracing::debug!(error = %e, "ignoring error closing previous connection");
                }
            }
            inner.settings = Some(Settings { config, certs });

            if req.verify_connection {
                self.connect_locked(&mut inner).await?;
            }

            Ok(InitializeResponse { config: req.config })
        }
        .instrument(span)
        .await
    }

    /// Return the cached connection, establishing and verifying it first if needed.
    ///
    /// # Errors
    ///
    /// * [`Error::NotInitialized`] before [`initialize`](Self::initialize)
    /// * [`Error::Config`] / [`Error::Parse`] if TLS settings are unusable
    /// * [`Error::Connection`] if the dial or liveness probe fails
    /// * [`Error::Introspection`] if the authorization listing cannot be read
    /// * [`Error::InsufficientPermissions`] if the token lacks a required grant
    pub async fn connection(&self) -> Result<Arc<D::Client>> {
        let mut inner = self.inner.lock().await;
        self.connect_locked(&mut inner).await
    }

    /// Close and forget the cached connection. Always succeeds.
    pub async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if let Some(client) = inner.client.take() {
            if let Err(e) = client.close() {
                tracing::debug!(error = %e, "ignoring error while closing connection");
            }
            tracing::debug!("connection closed");
        }

        match inner.state {
            ProducerState::Connected => inner.state.transition(ProducerState::Initialized)?,
            ProducerState::Uninitialized => {
                tracing::warn!("close called on an uninitialized connection producer")
            }
            ProducerState::Initialized => {}
        }
        Ok(())
    }

    /// Map of secret literals to their log placeholders.
    ///
    /// Covers the token, PEM bundle and PEM JSON. Empty values are omitted.
    pub async fn secret_values(&self) -> HashMap<String, String> {
        let inner = self.inner.lock().await;
        let Some(settings) = inner.settings.as_ref() else {
            return HashMap::new();
        };

        let config = &settings.config;
        [
            (&config.token, TOKEN_PLACEHOLDER),
            (&config.pem_bundle, PEM_BUNDLE_PLACEHOLDER),
            (&config.pem_json, PEM_JSON_PLACEHOLDER),
        ]
        .into_iter()
        .filter(|(secret, _)| !secret.is_empty())
        .map(|(secret, placeholder)| (secret.clone(), placeholder.to_string()))
        .collect()
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ProducerState {
        self.inner.lock().await.state
    }

    /// The accepted configuration, if any
    pub async fn config(&self) -> Option<ConnectionConfig> {
        let inner = self.inner.lock().await;
        inner.settings.as_ref().map(|s| s.config.clone())
    }

    async fn connect_locked(&self, inner: &mut Inner<D::Client>) -> Result<Arc<D::Client>> {
        let settings = inner.settings.as_ref().ok_or(Error::NotInitialized)?;

        if let Some(client) = &inner.client {
            counters::cache_hit();
            tracing::debug!("reusing cached connection");
            return Ok(Arc::clone(client));
        }

        let span = tracing::info_span!(
            "connect",
            host = %settings.config.host,
            port = %settings.config.port,
            tls = settings.config.tls
        );
        let client = self.establish(settings).instrument(span).await?;

        inner.state.transition(ProducerState::Connected)?;
        inner.client = Some(Arc::clone(&client));
        Ok(client)
    }

    /// TLS build, dial, probe, permission check. Nothing is kept on failure.
    async fn establish(&self, settings: &Settings) -> Result<Arc<D::Client>> {
        counters::connection_attempted();
        let started = Instant::now();
        let config = &settings.config;

        let tls = if config.tls {
            Some(build_tls(config, &settings.certs).map_err(|e| failed(labels::REASON_TLS_CONFIG, e))?)
        } else {
            None
        };

        let target = DialTarget {
            base_url: config.base_url(),
            token: config.token.clone(),
            connect_timeout: config.connect_timeout,
            tls,
        };
        let limit = config.connect_timeout;

        let client = bounded(limit, self.dialer.dial(&target), || {
            Error::Connection(format!("timed out connecting to {}", target.base_url))
        })
        .await
        .map_err(|e| failed(labels::REASON_DIAL, e))?;

        if let Err(e) = bounded(limit, client.ping(), || {
            Error::Connection("timed out checking cluster status".into())
        })
        .await
        {
            discard(&client);
            return Err(failed(labels::REASON_PROBE, e));
        }

        let verified = bounded(limit, auth::verify_token(&client, &config.token), || {
            Error::Introspection("timed out listing authorizations".into())
        })
        .await;
        if let Err(e) = verified {
            discard(&client);
            let reason = if e.is_permission_error() {
                labels::REASON_PERMISSION
            } else {
                labels::REASON_INTROSPECTION
            };
            return Err(failed(reason, e));
        }

        let elapsed = started.elapsed();
        counters::connection_established();
        histograms::connect_duration(elapsed.as_millis() as u64);
        tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "connection established");
        Ok(Arc::new(client))
    }
}

fn build_tls(config: &ConnectionConfig, certs: &CertificateBundle) -> Result<TlsConfig> {
    // Configurations stored before tls_min_version existed leave it empty.
    let min_version = if config.tls_min_version.is_empty() {
        None
    } else {
        Some(config.tls_min_version.parse::<TlsVersion>()?)
    };

    TlsConfig::builder()
        .certificate_bundle(certs.clone())
        .danger_accept_invalid_certs(config.insecure_tls)
        .min_version(min_version)
        .build()
}

/// Run `fut` under `limit`; a zero limit means no bound.
async fn bounded<T, F>(limit: Duration, fut: F, on_timeout: impl FnOnce() -> Error) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if limit.is_zero() {
        return fut.await;
    }
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

fn discard<C: InfluxApi>(client: &C) {
    if let Err(e) = client.close() {
        tracing::debug!(error = %e, "ignoring error closing rejected connection");
    }
}

fn failed(reason: &'static str, err: Error) -> Error {
    counters::connection_failed(reason);
    tracing::warn!(reason, error = %err, "connection attempt failed");
    err
}
