//! Authenticator metadata as a source of attestation trust anchors.
//!
//! Downloading and validating a metadata service table of contents is out of scope; callers load
//! entries they trust into a [`MetadataCollection`] (or implement [`MetadataLookup`] over their
//! own store) and hand it to the [`Verifier`](crate::Verifier).

use fido2_rp_types::authenticator::Aaguid;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{certs::Certificate, Result};

/// Resolves the attestation root certificates published for an authenticator model.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
pub trait MetadataLookup: Send + Sync {
    /// Root certificates for `aaguid`, empty when the model is unknown.
    fn attestation_roots(&self, aaguid: &Aaguid) -> Vec<Certificate>;
}

/// The subset of a metadata statement the verifier consumes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataStatement {
    /// Authenticator model identifier, hyphenated hex.
    pub aaguid: String,

    /// Human readable model name.
    #[serde(default)]
    pub description: String,

    /// Base64 DER encoded root certificates.
    #[serde(default)]
    pub attestation_root_certificates: Vec<String>,
}

/// A metadata entry with its root certificates parsed.
#[derive(Debug, Clone)]
pub struct MetadataEntry {
    /// Authenticator model identifier.
    pub aaguid: Aaguid,
    /// Human readable model name.
    pub description: String,
    /// Trust anchors for attestations made by this model.
    pub attestation_root_certificates: Vec<Certificate>,
}

impl TryFrom<MetadataStatement> for MetadataEntry {
    type Error = crate::Error;

    fn try_from(statement: MetadataStatement) -> Result<Self> {
        let attestation_root_certificates = statement
            .attestation_root_certificates
            .iter()
            .map(|cert| Certificate::try_from(cert.as_str()))
            .collect::<Result<_>>()?;
        let aaguid = statement.aaguid.parse().map_err(|_| {
            crate::Error::format(format!("invalid metadata AAGUID: {}", statement.aaguid))
        })?;
        Ok(Self {
            aaguid,
            description: statement.description,
            attestation_root_certificates,
        })
    }
}

/// In-memory [`MetadataLookup`].
#[derive(Debug, Default)]
pub struct MetadataCollection {
    entries: IndexMap<Aaguid, MetadataEntry>,
}

impl MetadataCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for its AAGUID.
    pub fn add_entry(&mut self, entry: MetadataEntry) {
        log::debug!("adding metadata entry for {}", entry.aaguid);
        self.entries.insert(entry.aaguid, entry);
    }

    /// Parse a metadata statement JSON document and add it.
    pub fn add_statement_json(&mut self, json: &str) -> Result<()> {
        let statement: MetadataStatement = serde_json::from_str(json)
            .map_err(|e| crate::Error::format(format!("invalid metadata statement: {e}")))?;
        self.add_entry(statement.try_into()?);
        Ok(())
    }

    /// The entry for `aaguid`.
    pub fn find_entry(&self, aaguid: &Aaguid) -> Option<&MetadataEntry> {
        self.entries.get(aaguid)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries have been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataLookup for MetadataCollection {
    fn attestation_roots(&self, aaguid: &Aaguid) -> Vec<Certificate> {
        self.find_entry(aaguid)
            .map(|entry| entry.attestation_root_certificates.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use fido2_rp_types::encoding;

    use super::*;
    use crate::certs::fixtures::{AAGUID, ROOT_CA};

    #[test]
    fn collection_lookup() {
        let root = Certificate::from_pem(ROOT_CA).unwrap();
        let json = serde_json::json!({
            "aaguid": Aaguid::from(AAGUID).to_string(),
            "description": "FIDO2 RP Test Authenticator",
            "attestationRootCertificates": [encoding::base64_padded(root.der())],
        });

        let mut collection = MetadataCollection::new();
        assert!(collection.is_empty());
        collection
            .add_statement_json(&json.to_string())
            .expect("valid statement");
        assert_eq!(collection.len(), 1);

        let entry = collection.find_entry(&Aaguid::from(AAGUID)).unwrap();
        assert_eq!(entry.description, "FIDO2 RP Test Authenticator");
        assert_eq!(
            collection.attestation_roots(&Aaguid::from(AAGUID)),
            vec![root]
        );
        assert!(collection
            .attestation_roots(&Aaguid::new_empty())
            .is_empty());
    }

    #[test]
    fn rejects_bad_certificates() {
        let json = serde_json::json!({
            "aaguid": Aaguid::from(AAGUID).to_string(),
            "attestationRootCertificates": ["not base64 !"],
        });
        MetadataCollection::new()
            .add_statement_json(&json.to_string())
            .expect_err("invalid root certificate");
    }
}
