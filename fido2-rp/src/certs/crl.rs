use std::collections::BTreeSet;

use fido2_rp_types::Bytes;
use x509_parser::{prelude::FromDer, revocation_list::CertificateRevocationList};

use super::{flatten_name, identifier, Certificate};
use crate::{Error, Result};

/// A certificate revocation list, reduced to its issuer and the revoked serial numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crl {
    der: Bytes,
    issuer_identifier: String,
    issuer_dn: String,
    revoked: BTreeSet<String>,
}

impl Crl {
    /// Parse a DER encoded CRL.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, crl) = CertificateRevocationList::from_der(der)
            .map_err(|e| Error::format(format!("couldn't parse CRL: {e}")))?;

        let issuer_dn = crl.issuer().to_string();
        Ok(Self {
            der: Bytes::from(der),
            issuer_identifier: identifier(&flatten_name(crl.issuer()), &issuer_dn),
            issuer_dn,
            revoked: crl
                .iter_revoked_certificates()
                .map(|revoked| data_encoding::HEXLOWER.encode(revoked.raw_serial()))
                .collect(),
        })
    }

    /// Parse a PEM encoded CRL.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
            .map_err(|e| Error::format(format!("couldn't parse CRL PEM: {e}")))?;
        if pem.label != "X509 CRL" {
            return Err(Error::format(format!(
                "expected an X509 CRL PEM block, got {}",
                pem.label
            )));
        }
        Self::from_der(&pem.contents)
    }

    /// The DER encoding.
    pub fn der(&self) -> &Bytes {
        &self.der
    }

    /// Identifier of the certificate that issued this list.
    pub fn issuer_identifier(&self) -> &str {
        &self.issuer_identifier
    }

    /// Revoked serial numbers, lower case hex.
    pub fn revoked_serials(&self) -> impl Iterator<Item = &str> {
        self.revoked.iter().map(String::as_str)
    }

    /// Whether this list, issued by the certificate's issuer, revokes `cert`.
    pub fn is_revoked(&self, cert: &Certificate) -> bool {
        self.issuer_dn == cert.issuer_dn && self.revoked.contains(cert.serial_number())
    }
}
