use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;

use super::{unix_now, Certificate, Crl};
use crate::{crypto::CryptoProvider, Error, Result};

/// Trust store of root and intermediate certificates plus revocation lists.
///
/// Lookups take a shared lock, so many verifications can read the store at once while an
/// update waits for exclusive access.
#[derive(Debug, Default)]
pub struct CertManager {
    certs: RwLock<IndexMap<String, Certificate>>,
    crls: RwLock<Vec<Crl>>,
}

impl CertManager {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate, replacing any earlier one with the same identifier. Returns `true`
    /// when a previous certificate was replaced.
    pub fn add_cert(&self, cert: Certificate) -> bool {
        let mut certs = self.certs.write().unwrap_or_else(PoisonError::into_inner);
        certs.insert(cert.identifier(), cert).is_some()
    }

    /// A snapshot of every stored certificate keyed by identifier.
    pub fn get_certs(&self) -> IndexMap<String, Certificate> {
        self.certs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up a certificate by [`Certificate::identifier`].
    pub fn get_cert(&self, identifier: &str) -> Option<Certificate> {
        self.certs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier)
            .cloned()
    }

    /// Look up a certificate by its lower case hex serial number.
    pub fn get_cert_by_serial(&self, serial: &str) -> Option<Certificate> {
        self.certs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|cert| cert.serial_number().eq_ignore_ascii_case(serial))
            .cloned()
    }

    /// Drop every certificate and revocation list.
    pub fn remove_all(&self) {
        self.certs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.crls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Add a revocation list consulted by every chain verification.
    pub fn add_crl(&self, crl: Crl) {
        self.crls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(crl);
    }

    fn is_revoked(&self, cert: &Certificate, crls: &[Crl]) -> bool {
        crls.iter().any(|crl| crl.is_revoked(cert))
            || self
                .crls
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|crl| crl.is_revoked(cert))
    }

    /// The root that issued `cert`, looked up by issuer identifier in `roots` first and then in
    /// this store.
    pub fn find_anchor(&self, cert: &Certificate, roots: &[Certificate]) -> Option<Certificate> {
        let issuer_identifier = cert.issuer_identifier();
        roots
            .iter()
            .find(|root| root.identifier() == issuer_identifier)
            .cloned()
            .or_else(|| self.get_cert(&issuer_identifier))
    }

    /// Verify a chain ordered leaf first.
    ///
    /// Every certificate must be currently valid and not revoked by `crls` or the stored lists,
    /// each one must be signed by the next, and the last one must either be one of `roots` or be
    /// signed by a root found in `roots` or in this store.
    pub async fn verify_cert_chain(
        &self,
        chain: &[Certificate],
        roots: &[Certificate],
        crls: &[Crl],
        crypto: &dyn CryptoProvider,
    ) -> Result<()> {
        let Some(last) = chain.last() else {
            return Err(Error::type_error("certificate chain must not be empty"));
        };

        let now = unix_now();
        for cert in chain {
            if !cert.is_valid_at(now) {
                return Err(Error::verification(format!(
                    "certificate '{}' is expired or not yet valid",
                    cert.identifier()
                )));
            }
            if self.is_revoked(cert, crls) {
                log::debug!("certificate {} is revoked", cert.serial_number());
                return Err(Error::verification("certificate revoked"));
            }
        }

        for pair in chain.windows(2) {
            let (cert, issuer) = (&pair[0], &pair[1]);
            if !issuer.is_ca() {
                return Err(Error::verification(format!(
                    "certificate '{}' in chain is not a CA",
                    issuer.identifier()
                )));
            }
            cert.verify(Some(issuer), None, crypto).await?;
        }

        if roots.contains(last) {
            return Ok(());
        }

        match self.find_anchor(last, roots) {
            Some(root) if root == *last => Ok(()),
            Some(root) => last.verify(Some(&root), None, crypto).await,
            None => Err(Error::verification(
                "no trusted root certificate found for chain",
            )),
        }
    }
}
