//! # FIDO2 Relying Party
//!
//! Server side verification of WebAuthn ceremonies. A [`Verifier`] takes the credential a
//! browser posted back after `navigator.credentials.create()` or `navigator.credentials.get()`
//! together with the [`Expectations`] of the relying party, and either returns a fully audited
//! result or an [`Error`] naming the check that failed.
//!
//! Issuing options, storing credentials and talking to a metadata service are left to the
//! caller. What this crate does:
//!
//! * parse `clientDataJSON`, attestation objects and authenticator data;
//! * verify the attestation statement of a new credential (`none`, `fido-u2f`, `packed`, `tpm`,
//!   `android-safetynet`, or a format registered through [`AttestationRegistry`]);
//! * verify assertion signatures and signature counters;
//! * journal every checked field on an [`Audit`] so a result is never returned with a field
//!   left unverified.
//!
//! ```no_run
//! # async fn register(response: fido2_rp_types::webauthn::CreatedPublicKeyCredential) -> fido2_rp::Result<()> {
//! use fido2_rp::{Config, Expectations, Factor, Verifier};
//!
//! let verifier = Verifier::new(Config::default())?;
//! let expectations = Expectations::attestation("https://example.com", "c2VydmVyIGNoYWxsZW5nZQ", Factor::Either);
//! let result = verifier.attestation_result(&response, expectations).await?;
//! let pem = &result.authnr_data().credential_public_key_pem;
//! # Ok(())
//! # }
//! ```
//!
//! All cryptography goes through the [`CryptoProvider`](crypto::CryptoProvider) capability,
//! [`RustCrypto`](crypto::RustCrypto) by default.

mod audit;
mod error;
mod expectations;
mod result;
mod validator;

pub mod attestation;
pub mod certs;
pub mod crypto;
pub mod extensions;
pub mod keys;
pub mod mds;
pub mod origin;

use fido2_rp_types::webauthn::{AuthenticatedPublicKeyCredential, CreatedPublicKeyCredential};
use serde::{Deserialize, Serialize};

use crate::{
    certs::CertManager,
    crypto::{CryptoProvider, RustCrypto},
    mds::MetadataLookup,
};

pub use self::{
    attestation::{AttestationFormat, AttestationRegistry, AttestationStatement},
    audit::{Audit, Field},
    error::{Error, ErrorKind, Result},
    expectations::{Ceremony, ExpectedFlag, Expectations, Factor},
    extensions::{Extension, ExtensionRegistry},
    result::{
        AssertionAuthnrData, AssertionResult, AttestationAuthnrData, AttestationResult,
        ClientDataResult,
    },
};

#[cfg(feature = "testable")]
pub use self::{crypto::MockCryptoProvider, mds::MockMetadataLookup};

/// Smallest accepted [`Config::challenge_size`].
pub const MIN_CHALLENGE_SIZE: usize = 32;

/// Whether certificate based attestation must chain to a known root.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationTrust {
    /// Chains without a known root are accepted after their internal links verify, and a
    /// warning is recorded on the audit.
    #[default]
    Optional,
    /// Chains must end in a root from the metadata lookup or the certificate manager.
    Required,
}

/// Settings shared by every verification a [`Verifier`] performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Ceremony timeout in milliseconds. Also the maximum age of a SafetyNet attestation.
    pub timeout: u64,
    /// RP ID used when expectations do not name one.
    pub rp_id: Option<String>,
    /// Relying party display name.
    pub rp_name: String,
    /// Minimum decoded length of an expected challenge, in bytes.
    pub challenge_size: usize,
    /// COSE algorithm identifiers accepted for new credentials.
    pub crypto_params: Vec<i64>,
    /// Attestation trust policy.
    pub attestation_trust: AttestationTrust,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: 60_000,
            rp_id: None,
            rp_name: "Anonymous Service".into(),
            challenge_size: 64,
            crypto_params: vec![-7, -257],
            attestation_trust: AttestationTrust::default(),
        }
    }
}

impl Config {
    /// Reject settings no verification could work with.
    pub fn validate(&self) -> Result<()> {
        if self.challenge_size < MIN_CHALLENGE_SIZE {
            return Err(Error::type_error(format!(
                "challenge size too small, must be {MIN_CHALLENGE_SIZE} or greater"
            )));
        }
        if self.crypto_params.is_empty() {
            return Err(Error::type_error(
                "cryptoParams must have at least one element",
            ));
        }
        if let Some(rp_id) = &self.rp_id {
            origin::check_rp_id(rp_id).map_err(Error::into_type_error)?;
        }
        Ok(())
    }
}

/// Verifies registration and authentication responses.
///
/// A verifier holds no per-ceremony state and can be shared between concurrent requests.
pub struct Verifier {
    pub(crate) config: Config,
    pub(crate) crypto: Box<dyn CryptoProvider>,
    pub(crate) metadata: Option<Box<dyn MetadataLookup>>,
    pub(crate) cert_manager: CertManager,
    pub(crate) attestation_formats: AttestationRegistry,
    pub(crate) extensions: ExtensionRegistry,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("config", &self.config)
            .field("metadata", &self.metadata.is_some())
            .field("cert_manager", &self.cert_manager)
            .field("attestation_formats", &self.attestation_formats)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    /// A verifier using [`RustCrypto`], the default attestation formats, an empty certificate
    /// store and no metadata.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            crypto: Box::new(RustCrypto),
            metadata: None,
            cert_manager: CertManager::new(),
            attestation_formats: AttestationRegistry::with_defaults(),
            extensions: ExtensionRegistry::new(),
        })
    }

    /// Use a different cryptographic capability.
    pub fn with_crypto(mut self, crypto: impl CryptoProvider + 'static) -> Self {
        self.crypto = Box::new(crypto);
        self
    }

    /// Resolve attestation roots through `metadata`.
    pub fn with_metadata(mut self, metadata: impl MetadataLookup + 'static) -> Self {
        self.metadata = Some(Box::new(metadata));
        self
    }

    /// The settings in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Trusted roots and revocation lists. The store locks internally, so it can be updated
    /// while the verifier is shared.
    pub fn cert_manager(&self) -> &CertManager {
        &self.cert_manager
    }

    /// The attestation formats, for registering additional ones.
    pub fn attestation_formats_mut(&mut self) -> &mut AttestationRegistry {
        &mut self.attestation_formats
    }

    /// The extension validators.
    pub fn extensions_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.extensions
    }

    /// Verify the response to `navigator.credentials.create()`.
    pub async fn attestation_result(
        &self,
        response: &CreatedPublicKeyCredential,
        expectations: Expectations,
    ) -> Result<AttestationResult> {
        log::debug!("verifying attestation for credential {}", response.id);
        let result = validator::verify_attestation(self, response, expectations).await?;
        log::debug!(
            "attestation verified: fmt {}, {} fields checked",
            result.authnr_data.fmt,
            result.audit.journal.len()
        );
        Ok(result)
    }

    /// Verify the response to `navigator.credentials.get()`.
    pub async fn assertion_result(
        &self,
        response: &AuthenticatedPublicKeyCredential,
        expectations: Expectations,
    ) -> Result<AssertionResult> {
        log::debug!("verifying assertion for credential {}", response.id);
        let result = validator::verify_assertion(self, response, expectations).await?;
        log::debug!(
            "assertion verified: counter {}, {} fields checked",
            result.authnr_data.counter,
            result.audit.journal.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.timeout, 60_000);
        assert_eq!(config.rp_name, "Anonymous Service");
        assert_eq!(config.challenge_size, 64);
        assert_eq!(config.crypto_params, vec![-7, -257]);
        assert_eq!(config.attestation_trust, AttestationTrust::Optional);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn config_rejects_unusable_settings() {
        let config = Config {
            challenge_size: 16,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "challenge size too small, must be 32 or greater"
        );

        let config = Config {
            crypto_params: Vec::new(),
            ..Default::default()
        };
        assert_eq!(
            Verifier::new(config).unwrap_err().to_string(),
            "cryptoParams must have at least one element"
        );
    }

    #[test]
    fn config_from_json() {
        let config: Config = serde_json::from_str(
            r#"{ "rpId": "example.com", "attestationTrust": "required", "cryptoParams": [-7] }"#,
        )
        .expect("valid config");
        assert_eq!(config.rp_id.as_deref(), Some("example.com"));
        assert_eq!(config.attestation_trust, AttestationTrust::Required);
        assert_eq!(config.crypto_params, vec![-7]);
        assert_eq!(config.timeout, 60_000);
    }
}
