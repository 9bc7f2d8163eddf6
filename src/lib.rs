//! Connection producer for InfluxDB 2.x
//!
//! Turns a loosely-typed configuration bundle into a validated connection to
//! an InfluxDB server. The producer resolves configuration, assembles TLS
//! material from PEM or PKI JSON input, connects lazily, and checks that the
//! token may manage users and organizations before handing the connection out.
//!
//! # Example
//!
//! ```ignore
//! use influxdb_producer::{ConnectionProducer, InitializeRequest};
//! use serde_json::json;
//!
//! let producer = ConnectionProducer::new();
//! let config = json!({ "host": "influxdb.local", "token": "my-token" });
//! producer
//!     .initialize(InitializeRequest {
//!         config: config.as_object().cloned().unwrap_or_default(),
//!         verify_connection: true,
//!     })
//!     .await?;
//!
//! let conn = producer.connection().await?;
//! let buckets = conn.http()?.get(conn.url("/api/v2/buckets")).send().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod certs;
pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;

pub use auth::TokenPermissions;
pub use certs::CertificateBundle;
pub use config::ConnectionConfig;
pub use connection::{
    ConnectionProducer, Dialer, HttpClient, HttpDialer, InfluxApi, InitializeRequest,
    InitializeResponse, ProducerState,
};
pub use error::{Error, Result};
