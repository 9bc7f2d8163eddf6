//! Certificate bundles in the JSON shape emitted by a PKI issuing backend

use super::pem::{encode_certificate, encode_private_key, read_blocks, PemBlock};
use super::CertificateBundle;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

const FORMAT_HINT: &str =
    "it must be in the format of the output of the PKI backend certificate issuing command";

/// Bundle fields as issued. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
struct IssuedBundle {
    #[serde(default)]
    certificate: String,
    #[serde(default)]
    private_key: String,
    #[serde(default)]
    issuing_ca: String,
    #[serde(default)]
    ca_chain: Vec<String>,
}

impl IssuedBundle {
    fn is_empty(&self) -> bool {
        self.certificate.is_empty()
            && self.private_key.is_empty()
            && self.issuing_ca.is_empty()
            && self.ca_chain.is_empty()
    }
}

/// Parse a JSON certificate bundle.
///
/// Accepts either the full issuing response (`{"data": {...}}`) or the bare
/// bundle object.
pub fn parse_pki_json(input: &str) -> Result<CertificateBundle> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| Error::Parse(format!("could not parse given JSON; {}: {}", FORMAT_HINT, e)))?;

    let object = match value.get("data") {
        Some(data) if data.is_object() => data.clone(),
        _ => value,
    };
    let issued: IssuedBundle = serde_json::from_value(object)
        .map_err(|e| Error::Parse(format!("could not parse given JSON; {}: {}", FORMAT_HINT, e)))?;
    if issued.is_empty() {
        return Err(Error::Parse(format!(
            "unable to parse out of either secret data or a secret object; {}",
            FORMAT_HINT
        )));
    }

    let mut bundle = CertificateBundle::default();

    if !issued.certificate.is_empty() {
        let mut certs = certificates("certificate", &issued.certificate)?;
        if certs.len() != 1 {
            return Err(Error::Parse(
                "'certificate' must hold exactly one certificate".into(),
            ));
        }
        bundle.certificate = certs.remove(0);
    }

    if !issued.private_key.is_empty() {
        let mut keys = Vec::new();
        for block in read_blocks(&issued.private_key)? {
            match block {
                PemBlock::PrivateKey(key) => keys.push(key),
                PemBlock::Certificate(_) => {
                    return Err(Error::Parse(
                        "'private_key' contains a certificate block".into(),
                    ))
                }
            }
        }
        if keys.len() != 1 {
            return Err(Error::Parse(
                "'private_key' must hold exactly one private key".into(),
            ));
        }
        bundle.private_key = encode_private_key(&keys[0])?;
    }

    let issuing = if issued.issuing_ca.is_empty() {
        Vec::new()
    } else {
        certificates("issuing_ca", &issued.issuing_ca)?
    };
    for entry in &issued.ca_chain {
        bundle.ca_chain.extend(certificates("ca_chain", entry)?);
    }
    if bundle.ca_chain.is_empty() {
        bundle.ca_chain = issuing.clone();
    }
    bundle.issuing_ca = issuing
        .first()
        .or_else(|| bundle.ca_chain.first())
        .cloned()
        .unwrap_or_default();

    bundle.validate()?;
    Ok(bundle)
}

/// Canonical PEM for every certificate block in `pem`
fn certificates(field: &str, pem: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for block in read_blocks(pem)? {
        match block {
            PemBlock::Certificate(cert) => out.push(encode_certificate(&cert)),
            PemBlock::PrivateKey(_) => {
                return Err(Error::Parse(format!(
                    "'{}' contains a private key block",
                    field
                )))
            }
        }
    }
    if out.is_empty() {
        return Err(Error::Parse(format!(
            "'{}' does not contain a PEM certificate",
            field
        )));
    }
    Ok(out)
}
