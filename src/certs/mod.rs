//! Certificate assembly
//!
//! TLS identity material may arrive as a PKI JSON document or as a PEM
//! bundle. Either form is reduced to one canonical [`CertificateBundle`].

mod pem;
mod pki_json;

pub use pem::parse_pem_bundle;
pub use pki_json::parse_pki_json;

use crate::config::ConnectionConfig;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Where certificate material came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateSource<'a> {
    /// JSON document as issued by the PKI backend
    PkiJson(&'a str),
    /// Concatenated PEM blocks
    PemBundle(&'a str),
    /// No material supplied
    None,
}

impl<'a> CertificateSource<'a> {
    /// Pick the certificate input to use. The JSON form wins when both are set.
    pub fn select(config: &'a ConnectionConfig) -> Self {
        match (config.pem_json.is_empty(), config.pem_bundle.is_empty()) {
            (false, false) => {
                tracing::warn!("both pem_json and pem_bundle are set; using pem_json");
                Self::PkiJson(&config.pem_json)
            }
            (false, true) => Self::PkiJson(&config.pem_json),
            (true, false) => Self::PemBundle(&config.pem_bundle),
            (true, true) => Self::None,
        }
    }
}

/// Canonical certificate material, all PEM encoded
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CertificateBundle {
    /// Client certificate
    pub certificate: String,
    /// Private key for `certificate`
    pub private_key: String,
    /// CA that issued `certificate`
    pub issuing_ca: String,
    /// Every CA certificate supplied, issuing CA first
    pub ca_chain: Vec<String>,
}

impl CertificateBundle {
    /// No material at all
    pub fn is_empty(&self) -> bool {
        self.certificate.is_empty() && self.issuing_ca.is_empty() && self.ca_chain.is_empty()
    }

    /// A client certificate and its key are present
    pub fn has_client_identity(&self) -> bool {
        !self.certificate.is_empty() && !self.private_key.is_empty()
    }

    /// Certificate requires key and key requires certificate
    pub fn validate(&self) -> Result<()> {
        if !self.certificate.is_empty() && self.private_key.is_empty() {
            return Err(Error::Parse(
                "found certificate for TLS authentication but no private key".into(),
            ));
        }
        if self.certificate.is_empty() && !self.private_key.is_empty() {
            return Err(Error::Parse(
                "found private key for TLS authentication but no certificate".into(),
            ));
        }
        Ok(())
    }

    /// SHA-256 fingerprint of the client certificate, colon separated
    pub fn fingerprint(&self) -> Option<String> {
        let blocks = pem::read_blocks(&self.certificate).ok()?;
        let der = blocks.into_iter().find_map(|b| match b {
            pem::PemBlock::Certificate(c) => Some(c),
            pem::PemBlock::PrivateKey(_) => None,
        })?;
        let digest = Sha256::digest(der.as_ref());
        Some(
            digest
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(":"),
        )
    }
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("certificate", &self.fingerprint())
            .field(
                "private_key",
                &if self.private_key.is_empty() { "" } else { "<redacted>" },
            )
            .field("ca_certificates", &self.ca_chain.len())
            .finish()
    }
}

/// Derive certificate material from the configuration.
///
/// When material is found, `config.tls` is switched on. Otherwise the
/// configured value is left alone and an empty bundle is returned.
pub fn assemble(config: &mut ConnectionConfig) -> Result<CertificateBundle> {
    let bundle = match CertificateSource::select(config) {
        CertificateSource::PkiJson(json) => parse_pki_json(json)?,
        CertificateSource::PemBundle(pem) => parse_pem_bundle(pem).map_err(|e| match e {
            Error::Parse(msg) => Error::Parse(format!("error parsing the given PEM information: {}", msg)),
            other => other,
        })?,
        CertificateSource::None => return Ok(CertificateBundle::default()),
    };

    bundle.validate()?;
    config.tls = true;
    tracing::debug!(
        fingerprint = ?bundle.fingerprint(),
        ca_certificates = bundle.ca_chain.len(),
        "certificate material assembled"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CA: &str = include_str!("../../tests/fixtures/ca.pem");
    const CLIENT_CERT: &str = include_str!("../../tests/fixtures/client.pem");
    const CLIENT_KEY: &str = include_str!("../../tests/fixtures/client.key");

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            host: "db".into(),
            token: "t".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_material_keeps_tls_flag() {
        let mut cfg = config();
        let bundle = assemble(&mut cfg).unwrap();
        assert!(bundle.is_empty());
        assert!(!cfg.tls);

        let mut cfg = config();
        cfg.tls = true;
        assemble(&mut cfg).unwrap();
        assert!(cfg.tls);
    }

    #[test]
    fn test_pem_bundle_enables_tls() {
        let mut cfg = config();
        cfg.pem_bundle = format!("{}{}{}", CLIENT_CERT, CLIENT_KEY, CA);
        let bundle = assemble(&mut cfg).unwrap();
        assert!(cfg.tls);
        assert!(bundle.has_client_identity());
    }

    #[test]
    fn test_json_takes_precedence() {
        let mut cfg = config();
        cfg.pem_json = json!({ "issuing_ca": CA }).to_string();
        cfg.pem_bundle = format!("{}{}", CLIENT_CERT, CLIENT_KEY);
        let bundle = assemble(&mut cfg).unwrap();
        assert!(!bundle.has_client_identity());
        assert_eq!(
            CertificateSource::select(&cfg),
            CertificateSource::PkiJson(&cfg.pem_json)
        );
    }

    #[test]
    fn test_failure_leaves_tls_untouched() {
        let mut cfg = config();
        cfg.pem_bundle = CLIENT_CERT.to_string() + "garbage";
        cfg.pem_json = json!({ "certificate": CLIENT_CERT }).to_string();
        assert!(matches!(assemble(&mut cfg), Err(Error::Parse(_))));
        assert!(!cfg.tls);
    }

    #[test]
    fn test_pem_error_is_prefixed() {
        let mut cfg = config();
        cfg.pem_bundle = CLIENT_KEY.to_string();
        let err = assemble(&mut cfg).unwrap_err();
        assert!(err.to_string().contains("error parsing the given PEM information"));
    }

    #[test]
    fn test_certificate_without_key_rejected_in_both_forms() {
        let mut cfg = config();
        cfg.pem_bundle = format!("{}{}", CLIENT_CERT, CA);
        let err = assemble(&mut cfg).unwrap_err();
        assert!(err.to_string().contains("no private key"), "{}", err);
        assert!(!cfg.tls);

        let mut cfg = config();
        cfg.pem_json = json!({ "certificate": CLIENT_CERT, "issuing_ca": CA }).to_string();
        let err = assemble(&mut cfg).unwrap_err();
        assert!(err.to_string().contains("no private key"), "{}", err);
        assert!(!cfg.tls);
    }

    #[test]
    fn test_fingerprint_and_debug() {
        let bundle = parse_pem_bundle(&format!("{}{}", CLIENT_CERT, CLIENT_KEY)).unwrap();
        let fp = bundle.fingerprint().unwrap();
        assert_eq!(fp.split(':').count(), 32);
        let debug = format!("{:?}", bundle);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[test]
    fn test_validate_guards_identity() {
        let bundle = CertificateBundle {
            certificate: CLIENT_CERT.into(),
            ..Default::default()
        };
        assert!(bundle.validate().is_err());
        let bundle = CertificateBundle {
            private_key: CLIENT_KEY.into(),
            ..Default::default()
        };
        assert!(bundle.validate().is_err());
    }
}
