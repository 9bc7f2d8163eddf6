//! TLS client configuration for connections to InfluxDB.
//!
//! Builds a rustls `ClientConfig` from assembled certificate material, the
//! insecure-mode flag and an optional minimum protocol version.

use crate::certs::CertificateBundle;
use crate::{Error, Result};
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::sync::Arc;

static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Minimum TLS protocol version, as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.0 (rustls floors this to 1.2)
    Tls10,
    /// TLS 1.1 (rustls floors this to 1.2)
    Tls11,
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// Protocol versions the client will offer
    pub fn protocol_versions(&self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            Self::Tls13 => TLS13_ONLY,
            Self::Tls10 | Self::Tls11 | Self::Tls12 => rustls::DEFAULT_VERSIONS,
        }
    }
}

impl std::fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tls10 => write!(f, "tls10"),
            Self::Tls11 => write!(f, "tls11"),
            Self::Tls12 => write!(f, "tls12"),
            Self::Tls13 => write!(f, "tls13"),
        }
    }
}

impl std::str::FromStr for TlsVersion {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tls10" => Ok(Self::Tls10),
            "tls11" => Ok(Self::Tls11),
            "tls12" => Ok(Self::Tls12),
            "tls13" => Ok(Self::Tls13),
            _ => Err(Error::Config(format!(
                "invalid 'tls_min_version' in config: '{}': expected tls10, tls11, tls12, or tls13",
                s
            ))),
        }
    }
}

/// Compiled TLS settings for one connection attempt
#[derive(Clone)]
pub struct TlsConfig {
    min_version: Option<TlsVersion>,
    client_identity: bool,
    danger_accept_invalid_certs: bool,
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Create a new TLS configuration builder.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Get the rustls ClientConfig for this TLS configuration.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Configured minimum version, `None` for the protocol default.
    pub fn min_version(&self) -> Option<TlsVersion> {
        self.min_version
    }

    /// Whether a client certificate is presented to the server.
    pub fn has_client_identity(&self) -> bool {
        self.client_identity
    }

    /// Check if invalid certificates are accepted.
    pub fn danger_accept_invalid_certs(&self) -> bool {
        self.danger_accept_invalid_certs
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("min_version", &self.min_version)
            .field("client_identity", &self.client_identity)
            .field(
                "danger_accept_invalid_certs",
                &self.danger_accept_invalid_certs,
            )
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Builder for TLS configuration.
#[derive(Default)]
pub struct TlsConfigBuilder {
    bundle: CertificateBundle,
    min_version: Option<TlsVersion>,
    danger_accept_invalid_certs: bool,
}

impl TlsConfigBuilder {
    /// Use the given certificate material.
    ///
    /// CA certificates replace the platform trust store; a certificate and
    /// key pair is presented as the client identity.
    pub fn certificate_bundle(mut self, bundle: CertificateBundle) -> Self {
        self.bundle = bundle;
        self
    }

    /// Set the minimum protocol version (`None` = protocol default).
    pub fn min_version(mut self, version: Option<TlsVersion>) -> Self {
        self.min_version = version;
        self
    }

    /// ⚠️ **DANGER**: Accept any server certificate.
    ///
    /// Handshake signatures are still checked, but the certificate chain and
    /// host name are not. Only for servers with self-signed certificates.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }

    /// Build the TLS configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the certificate material cannot be loaded
    /// and [`Error::Config`] if rustls rejects the resulting settings.
    pub fn build(self) -> Result<TlsConfig> {
        self.bundle.validate()?;

        if matches!(self.min_version, Some(TlsVersion::Tls10 | TlsVersion::Tls11)) {
            tracing::warn!(
                requested = ?self.min_version,
                "TLS versions below 1.2 are not supported; using TLS 1.2 as the minimum"
            );
        }

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let versions = self
            .min_version
            .map(|v| v.protocol_versions())
            .unwrap_or(rustls::DEFAULT_VERSIONS);

        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_protocol_versions(versions)
            .map_err(|e| Error::Config(format!("unsupported TLS settings: {}", e)))?;

        let builder = if self.danger_accept_invalid_certs {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(danger::AcceptAnyCert::new(provider)))
        } else {
            builder.with_root_certificates(self.root_store()?)
        };

        let client_identity = self.bundle.has_client_identity();
        let client_config = if client_identity {
            let certs = load_certificates(&self.bundle.certificate)?;
            let key = load_private_key(&self.bundle.private_key)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| Error::Config(format!("invalid client certificate: {}", e)))?
        } else {
            builder.with_no_client_auth()
        };

        Ok(TlsConfig {
            min_version: self.min_version,
            client_identity,
            danger_accept_invalid_certs: self.danger_accept_invalid_certs,
            client_config: Arc::new(client_config),
        })
    }

    /// Trust the bundle's CA certificates, or the platform roots without them.
    fn root_store(&self) -> Result<RootCertStore> {
        let mut store = RootCertStore::empty();

        if !self.bundle.ca_chain.is_empty() || !self.bundle.issuing_ca.is_empty() {
            let cas = std::iter::once(&self.bundle.issuing_ca)
                .chain(self.bundle.ca_chain.iter())
                .filter(|pem| !pem.is_empty());
            for pem in cas {
                for cert in load_certificates(pem)? {
                    store
                        .add(cert)
                        .map_err(|e| Error::Parse(format!("invalid CA certificate: {}", e)))?;
                }
            }
            return Ok(store);
        }

        let result = rustls_native_certs::load_native_certs();
        let _ = store.add_parsable_certificates(result.certs);
        if store.is_empty() {
            tracing::debug!(
                errors = result.errors.len(),
                "no platform root certificates found; using bundled webpki roots"
            );
            store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }
        Ok(store)
    }
}

fn load_certificates(pem: &str) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::Cursor::new(pem.as_bytes());
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Parse(format!("failed to parse certificate: {}", e)))?;
    if certs.is_empty() {
        return Err(Error::Parse("no certificate found in PEM data".into()));
    }
    Ok(certs)
}

fn load_private_key(pem: &str) -> Result<PrivateKeyDer<'static>> {
    let mut reader = std::io::Cursor::new(pem.as_bytes());
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| Error::Parse(format!("failed to parse private key: {}", e)))?
        .ok_or_else(|| Error::Parse("no private key found in PEM data".into()))
}

mod danger {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, Error, SignatureScheme};
    use std::sync::Arc;

    /// Accepts any server certificate but still verifies handshake signatures.
    #[derive(Debug)]
    pub struct AcceptAnyCert {
        provider: Arc<CryptoProvider>,
    }

    impl AcceptAnyCert {
        pub fn new(provider: Arc<CryptoProvider>) -> Self {
            Self { provider }
        }
    }

    impl ServerCertVerifier for AcceptAnyCert {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            verify_tls12_signature(
                message,
                cert,
                dss,
                &self.provider.signature_verification_algorithms,
            )
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            verify_tls13_signature(
                message,
                cert,
                dss,
                &self.provider.signature_verification_algorithms,
            )
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.provider
                .signature_verification_algorithms
                .supported_schemes()
        }
    }
}
