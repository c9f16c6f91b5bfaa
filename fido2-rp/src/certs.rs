//! X.509 certificates, revocation lists and the trust store used to anchor attestation chains.

use std::{
    sync::OnceLock,
    time::{SystemTime, UNIX_EPOCH},
};

use fido2_rp_types::Bytes;
use indexmap::IndexMap;
use x509_parser::{certificate::X509Certificate, prelude::FromDer, x509::X509Name};

use crate::{
    crypto::CryptoProvider,
    keys::{is_pem, CoseAlgorithm, Jwk, Key},
    Error, Result,
};

mod crl;
mod extensions;
mod manager;

#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
mod tests;

pub use self::{
    crl::Crl,
    extensions::{AltName, CertExtension, ExtensionValue},
    manager::CertManager,
};

/// A distinguished name flattened into attribute name -> value, in certificate order.
pub type Name = IndexMap<String, String>;

/// Readable names for the distinguished name attributes seen in attestation certificates.
fn attribute_name(oid: &str) -> String {
    match oid {
        "2.5.4.3" => "common-name",
        "2.5.4.4" => "surname",
        "2.5.4.5" => "serial-number",
        "2.5.4.6" => "country-name",
        "2.5.4.7" => "locality-name",
        "2.5.4.8" => "state-or-province-name",
        "2.5.4.9" => "street-address",
        "2.5.4.10" => "organization-name",
        "2.5.4.11" => "organizational-unit-name",
        "2.5.4.12" => "title",
        "1.2.840.113549.1.9.1" => "email-address",
        "2.23.133.2.1" => "tcg-at-tpm-manufacturer",
        "2.23.133.2.2" => "tcg-at-tpm-model",
        "2.23.133.2.3" => "tcg-at-tpm-version",
        other => other,
    }
    .to_owned()
}

pub(crate) fn flatten_name(name: &X509Name<'_>) -> Name {
    name.iter_attributes()
        .map(|attr| {
            let value = attr
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|_| data_encoding::HEXLOWER.encode(attr.attr_value().as_bytes()));
            (attribute_name(&attr.attr_type().to_id_string()), value)
        })
        .collect()
}

/// Common name when there is one, the full distinguished name otherwise.
fn identifier(name: &Name, dn: &str) -> String {
    name.get("common-name")
        .cloned()
        .unwrap_or_else(|| dn.to_owned())
}

fn signature_algorithm(oid: &str) -> Option<CoseAlgorithm> {
    match oid {
        "1.2.840.113549.1.1.5" => Some(CoseAlgorithm::Rs1),
        "1.2.840.113549.1.1.11" => Some(CoseAlgorithm::Rs256),
        "1.2.840.113549.1.1.12" => Some(CoseAlgorithm::Rs384),
        "1.2.840.113549.1.1.13" => Some(CoseAlgorithm::Rs512),
        "1.2.840.10045.4.3.2" => Some(CoseAlgorithm::Es256),
        "1.2.840.10045.4.3.3" => Some(CoseAlgorithm::Es384),
        "1.2.840.10045.4.3.4" => Some(CoseAlgorithm::Es512),
        "1.3.101.112" => Some(CoseAlgorithm::EdDsa),
        _ => None,
    }
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or_default()
}

/// An immutable, parsed X.509 certificate.
///
/// The DER is kept verbatim; the name, serial and validity are read once on construction and
/// the extensions are decoded the first time they are asked for.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Bytes,
    version: u32,
    serial_number: String,
    subject: Name,
    subject_dn: String,
    issuer: Name,
    issuer_dn: String,
    not_before: i64,
    not_after: i64,
    signature_oid: String,
    extensions: OnceLock<IndexMap<String, CertExtension>>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Parse a DER encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::format(format!("couldn't parse certificate: {e}")))?;

        Ok(Self {
            version: cert.version().0 + 1,
            serial_number: data_encoding::HEXLOWER.encode(cert.raw_serial()),
            subject: flatten_name(cert.subject()),
            subject_dn: cert.subject().to_string(),
            issuer: flatten_name(cert.issuer()),
            issuer_dn: cert.issuer().to_string(),
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            signature_oid: cert.signature_algorithm.algorithm.to_id_string(),
            der: Bytes::from(der),
            extensions: OnceLock::new(),
        })
    }

    /// Parse a PEM encoded certificate.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
            .map_err(|e| Error::format(format!("couldn't parse certificate PEM: {e}")))?;
        if pem.label != "CERTIFICATE" {
            return Err(Error::format(format!(
                "expected a CERTIFICATE PEM block, got {}",
                pem.label
            )));
        }
        Self::from_der(&pem.contents)
    }

    fn parsed(&self) -> Result<X509Certificate<'_>> {
        X509Certificate::from_der(&self.der)
            .map(|(_, cert)| cert)
            .map_err(|e| Error::format(format!("couldn't parse certificate: {e}")))
    }

    /// The DER encoding.
    pub fn der(&self) -> &Bytes {
        &self.der
    }

    /// Certificate version as numbered by X.509: 1, 2 or 3.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Serial number, lower case hex.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Subject attributes.
    pub fn subject(&self) -> &Name {
        &self.subject
    }

    /// Issuer attributes.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Key under which the [`CertManager`] stores this certificate.
    pub fn identifier(&self) -> String {
        identifier(&self.subject, &self.subject_dn)
    }

    /// The [`identifier`](Self::identifier) of the issuing certificate.
    pub fn issuer_identifier(&self) -> String {
        identifier(&self.issuer, &self.issuer_dn)
    }

    /// Whether the issuer and subject names are the same.
    pub fn is_self_issued(&self) -> bool {
        self.subject_dn == self.issuer_dn
    }

    /// Start of the validity period, in seconds since the epoch.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of the validity period, in seconds since the epoch.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    /// Whether the certificate is valid at the given time.
    pub fn is_valid_at(&self, unix_seconds: i64) -> bool {
        (self.not_before..=self.not_after).contains(&unix_seconds)
    }

    /// The subject public key.
    pub fn public_key(&self) -> Result<Key> {
        let cert = self.parsed()?;
        Key::from_spki_der(cert.public_key().raw)
    }

    /// The subject public key as a JWK.
    pub fn public_key_jwk(&self) -> Result<Jwk> {
        Ok(self.public_key()?.public_key().to_jwk())
    }

    /// Decoded extensions keyed by name, or by OID when the extension is not recognized.
    pub fn extensions(&self) -> &IndexMap<String, CertExtension> {
        self.extensions.get_or_init(|| match self.parsed() {
            Ok(cert) => extensions::decode(cert.extensions()),
            Err(_) => IndexMap::new(),
        })
    }

    /// A single decoded extension.
    pub fn extension(&self, name: &str) -> Option<&CertExtension> {
        self.extensions().get(name)
    }

    /// Whether basic constraints mark this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        matches!(
            self.extension("basic-constraints").map(|ext| &ext.value),
            Some(ExtensionValue::BasicConstraints { ca: true, .. })
        )
    }

    /// Algorithm the issuer signed this certificate with.
    pub fn signature_algorithm(&self) -> Result<CoseAlgorithm> {
        signature_algorithm(&self.signature_oid).ok_or_else(|| {
            Error::verification(format!(
                "unsupported certificate signature algorithm: {}",
                self.signature_oid
            ))
        })
    }

    /// Check that `issuer` signed this certificate.
    ///
    /// When no issuer is given it is looked up by [`issuer_identifier`](Self::issuer_identifier)
    /// in `manager`.
    pub async fn verify(
        &self,
        issuer: Option<&Certificate>,
        manager: Option<&CertManager>,
        crypto: &dyn CryptoProvider,
    ) -> Result<()> {
        let found;
        let issuer = match issuer {
            Some(issuer) => issuer,
            None => {
                found = manager
                    .and_then(|m| m.get_cert(&self.issuer_identifier()))
                    .ok_or_else(|| {
                        Error::verification("Please provide issuer certificate as a parameter")
                    })?;
                &found
            }
        };

        if issuer.subject_dn != self.issuer_dn {
            return Err(Error::verification(format!(
                "certificate '{}' was not issued by '{}'",
                self.identifier(),
                issuer.identifier()
            )));
        }

        let alg = self.signature_algorithm()?;
        let key = issuer.public_key()?;
        let (tbs, signature) = {
            let cert = self.parsed()?;
            let tbs: &[u8] = cert.tbs_certificate.as_ref();
            (tbs.to_vec(), cert.signature_value.data.to_vec())
        };

        if crypto
            .verify(key.public_key(), alg, &signature, &tbs)
            .await?
        {
            Ok(())
        } else {
            Err(Error::verification(format!(
                "certificate signature verification failed for '{}'",
                self.identifier()
            )))
        }
    }
}

impl TryFrom<&str> for Certificate {
    type Error = Error;

    /// Accepts PEM or the base64 / base64url encoded DER found in `x5c` arrays and metadata.
    fn try_from(value: &str) -> Result<Self> {
        if is_pem(value) {
            Self::from_pem(value)
        } else {
            let der = Bytes::try_from(value)?;
            Self::from_der(&der)
        }
    }
}
