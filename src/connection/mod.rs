//! Connection management
//!
//! This module handles:
//! * The producer that owns configuration and the cached connection
//! * Lifecycle state machine enforcement
//! * TLS configuration
//! * Dialing and the API surface of a live connection

mod producer;
mod state;
mod tls;
mod transport;

pub use producer::{
    ConnectionProducer, InitializeRequest, InitializeResponse, PEM_BUNDLE_PLACEHOLDER,
    PEM_JSON_PLACEHOLDER, TOKEN_PLACEHOLDER,
};
pub use state::ProducerState;
pub use tls::{TlsConfig, TlsConfigBuilder, TlsVersion};
pub use transport::{DialTarget, Dialer, HttpClient, HttpDialer, InfluxApi};

pub(crate) use transport::authorization_header;
