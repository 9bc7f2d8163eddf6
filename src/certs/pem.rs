//! PEM block reading and canonical re-encoding

use super::CertificateBundle;
use crate::{Error, Result};
use ::pem::{EncodeConfig, LineEnding, Pem};
use rustls_pemfile::Item;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use x509_parser::prelude::{FromDer, X509Certificate};

/// A PEM block this crate understands
#[derive(Debug)]
pub(crate) enum PemBlock {
    Certificate(CertificateDer<'static>),
    PrivateKey(PrivateKeyDer<'static>),
}

/// Read every PEM block in `input`, in order.
///
/// Text outside of PEM armour is ignored. Blocks that are neither
/// certificates nor private keys are rejected.
pub(crate) fn read_blocks(input: &str) -> Result<Vec<PemBlock>> {
    let mut reader = std::io::Cursor::new(input.as_bytes());
    let mut blocks = Vec::new();

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => blocks.push(PemBlock::Certificate(cert)),
            Ok(Some(Item::Pkcs1Key(key))) => blocks.push(PemBlock::PrivateKey(key.into())),
            Ok(Some(Item::Pkcs8Key(key))) => blocks.push(PemBlock::PrivateKey(key.into())),
            Ok(Some(Item::Sec1Key(key))) => blocks.push(PemBlock::PrivateKey(key.into())),
            Ok(Some(_)) => {
                return Err(Error::Parse(
                    "unsupported PEM block; only certificates and private keys are accepted"
                        .into(),
                ))
            }
            Ok(None) => break,
            Err(e) => return Err(Error::Parse(format!("malformed PEM data: {}", e))),
        }
    }

    Ok(blocks)
}

/// Parse a concatenated PEM bundle.
///
/// Certificates are classified by their basic constraints: CA certificates
/// form the chain, in order, and at most one end-entity certificate is the
/// client certificate. The client certificate and the private key must be
/// given together.
pub fn parse_pem_bundle(input: &str) -> Result<CertificateBundle> {
    let blocks = read_blocks(input)?;
    if blocks.is_empty() {
        return Err(Error::Parse("no data found in PEM bundle".into()));
    }

    let mut key = None;
    let mut leaf = None;
    let mut chain = Vec::new();
    for block in blocks {
        match block {
            PemBlock::PrivateKey(k) => {
                if key.is_some() {
                    return Err(Error::Parse(
                        "more than one PEM block is a private key; provide only one".into(),
                    ));
                }
                key = Some(k);
            }
            PemBlock::Certificate(c) => {
                if is_ca(&c)? {
                    chain.push(c);
                    continue;
                }
                if leaf.is_some() {
                    return Err(Error::Parse(
                        "more than one PEM block is a non-CA certificate; provide only one".into(),
                    ));
                }
                leaf = Some(c);
            }
        }
    }

    let mut bundle = CertificateBundle::default();
    if let Some(leaf) = &leaf {
        bundle.certificate = encode_certificate(leaf);
    }
    if let Some(key) = &key {
        bundle.private_key = encode_private_key(key)?;
    }
    bundle.ca_chain = chain.iter().map(encode_certificate).collect();
    bundle.issuing_ca = bundle.ca_chain.first().cloned().unwrap_or_default();
    bundle.validate()?;
    Ok(bundle)
}

/// Whether the certificate's basic constraints mark it as a CA
fn is_ca(cert: &CertificateDer<'_>) -> Result<bool> {
    let (_, parsed) = X509Certificate::from_der(cert.as_ref())
        .map_err(|e| Error::Parse(format!("invalid certificate: {}", e)))?;
    let constraints = parsed
        .basic_constraints()
        .map_err(|e| Error::Parse(format!("invalid basic constraints: {}", e)))?;
    Ok(constraints.map(|ext| ext.value.ca).unwrap_or(false))
}

/// Encode a DER certificate as PEM
pub(crate) fn encode_certificate(cert: &CertificateDer<'_>) -> String {
    encode(Pem::new("CERTIFICATE", cert.as_ref()))
}

/// Encode a DER private key as PEM, keeping its original encoding
pub(crate) fn encode_private_key(key: &PrivateKeyDer<'_>) -> Result<String> {
    let label = match key {
        PrivateKeyDer::Pkcs1(_) => "RSA PRIVATE KEY",
        PrivateKeyDer::Sec1(_) => "EC PRIVATE KEY",
        PrivateKeyDer::Pkcs8(_) => "PRIVATE KEY",
        _ => return Err(Error::Parse("unsupported private key encoding".into())),
    };
    Ok(encode(Pem::new(label, key.secret_der())))
}

fn encode(block: Pem) -> String {
    ::pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}
