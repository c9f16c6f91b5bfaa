//! Attestation statement formats.
//!
//! An attestation object names its statement format in `fmt`. The [`AttestationRegistry`] maps
//! that name to an [`AttestationFormat`] which first turns the generic CBOR `attStmt` map into a
//! typed [`AttestationStatement`] and later validates it against the authenticator data.
//!
//! The supported formats are:
//! * [`none`][NoneFormat]
//! * [`fido-u2f`][FidoU2f]
//! * [`packed`][Packed]
//! * [`tpm`][Tpm]
//! * [`android-safetynet`][AndroidSafetyNet]
//!
//! Callers may register additional formats; their statements are kept as
//! [`AttestationStatement::Custom`].

use ciborium::value::Value;
use fido2_rp_types::{
    authenticator::{Aaguid, AttestedCredentialData, AuthenticatorData},
    Bytes,
};
use indexmap::IndexMap;

use crate::{
    audit::{Audit, Field},
    certs::{CertManager, Certificate, ExtensionValue},
    crypto::CryptoProvider,
    keys::{CoseAlgorithm, Key, PublicKey},
    mds::MetadataLookup,
    AttestationTrust, Config, Error, Result,
};

mod android_safetynet;
mod fido_u2f;
mod none;
mod packed;
mod tpm;

#[cfg(test)]
mod tests;

pub use self::{
    android_safetynet::{AndroidSafetyNet, SafetyNetStatement},
    fido_u2f::{FidoU2f, FidoU2fStatement},
    none::NoneFormat,
    packed::{Packed, PackedStatement},
    tpm::{Tpm, TpmStatement},
};

/// A parsed attestation statement.
#[derive(Debug, Clone, PartialEq)]
pub enum AttestationStatement {
    /// `none`: no attestation.
    None,
    /// `fido-u2f`
    FidoU2f(FidoU2fStatement),
    /// `packed`
    Packed(PackedStatement),
    /// `tpm`
    Tpm(TpmStatement),
    /// `android-safetynet`
    AndroidSafetyNet(SafetyNetStatement),
    /// A statement of a format registered by the caller.
    Custom {
        /// The format identifier.
        fmt: String,
        /// The statement entries, keyed by their text labels.
        fields: IndexMap<String, Value>,
    },
}

impl AttestationStatement {
    /// The format identifier this statement belongs to.
    pub fn fmt(&self) -> &str {
        match self {
            AttestationStatement::None => "none",
            AttestationStatement::FidoU2f(_) => "fido-u2f",
            AttestationStatement::Packed(_) => "packed",
            AttestationStatement::Tpm(_) => "tpm",
            AttestationStatement::AndroidSafetyNet(_) => "android-safetynet",
            AttestationStatement::Custom { fmt, .. } => fmt,
        }
    }

    /// The statement fields that end up in the result's authenticator data and must be
    /// journaled by the format's validator.
    pub fn fields(&self) -> Vec<Field> {
        match self {
            AttestationStatement::None => Vec::new(),
            AttestationStatement::FidoU2f(_) => vec![Field::Sig, Field::X5c],
            AttestationStatement::Packed(stmt) => {
                let mut fields = vec![Field::Alg, Field::Sig];
                if stmt.x5c.is_some() {
                    fields.push(Field::X5c);
                }
                fields
            }
            AttestationStatement::Tpm(_) => vec![
                Field::Ver,
                Field::Alg,
                Field::X5c,
                Field::Sig,
                Field::CertInfo,
                Field::PubArea,
            ],
            AttestationStatement::AndroidSafetyNet(_) => vec![Field::Ver, Field::Response],
            AttestationStatement::Custom { fields, .. } => {
                fields.keys().cloned().map(Field::Other).collect()
            }
        }
    }
}

/// Everything a format needs to validate its statement.
pub struct AttestationContext<'a> {
    /// The statement produced by [`AttestationFormat::parse`].
    pub statement: &'a AttestationStatement,
    /// The parsed authenticator data of the attestation object.
    pub auth_data: &'a AuthenticatorData,
    /// SHA-256 of the raw `clientDataJSON`.
    pub client_data_hash: &'a [u8],
    /// The credential public key from the attested credential data.
    pub credential_key: &'a Key,
    /// Journal of validated fields.
    pub audit: &'a mut Audit,
    /// Verifier configuration.
    pub config: &'a Config,
    /// Trust store consulted for attestation roots.
    pub cert_manager: &'a CertManager,
    /// Source of per-model attestation roots.
    pub metadata: Option<&'a dyn MetadataLookup>,
    /// Cryptographic capability.
    pub crypto: &'a dyn CryptoProvider,
}

impl AttestationContext<'_> {
    /// The attested credential data, which every attestation carries.
    pub fn attested_credential(&self) -> Result<&AttestedCredentialData> {
        self.auth_data
            .attested_credential_data
            .as_ref()
            .ok_or_else(|| Error::verification("authenticator data is missing attested credential data"))
    }

    /// The authenticator model identifier, or the zero AAGUID.
    pub fn aaguid(&self) -> Aaguid {
        self.auth_data
            .attested_credential_data
            .as_ref()
            .map(|acd| acd.aaguid)
            .unwrap_or_else(Aaguid::new_empty)
    }

    /// `authenticatorData ‖ clientDataHash`, the message most formats sign.
    pub fn signed_data(&self) -> Vec<u8> {
        let mut data = self.auth_data.raw().to_vec();
        data.extend_from_slice(self.client_data_hash);
        data
    }

    /// Verify `signature` and fail with a message prefixed by `fmt` when it does not match.
    pub async fn verify_signature(
        &self,
        fmt: &str,
        key: &PublicKey,
        alg: CoseAlgorithm,
        signature: &[u8],
        data: &[u8],
    ) -> Result<()> {
        if self.crypto.verify(key, alg, signature, data).await? {
            Ok(())
        } else {
            Err(Error::verification(format!("{fmt}: signature verification failed")))
        }
    }

    /// When `cert` carries the FIDO AAGUID extension, it must be non-critical and name the
    /// authenticator's AAGUID.
    pub fn check_aaguid_extension(&self, fmt: &str, cert: &Certificate) -> Result<()> {
        let Some(ext) = cert.extension("fido-aaguid") else {
            return Ok(());
        };
        if ext.critical {
            return Err(Error::verification(format!(
                "{fmt}: AAGUID extension must not be critical"
            )));
        }
        match &ext.value {
            ExtensionValue::FidoAaguid(aaguid) if *aaguid == self.aaguid() => Ok(()),
            _ => Err(Error::verification(format!(
                "{fmt}: certificate AAGUID does not match authenticator AAGUID"
            ))),
        }
    }

    /// Anchor an attestation chain (leaf first).
    ///
    /// Roots come from the metadata lookup for this AAGUID and from the trust store. Without a
    /// root the chain's own links are still checked and, unless trust is
    /// [`Required`](AttestationTrust::Required), a warning is recorded instead of an error.
    pub async fn verify_trust(&mut self, chain: &[Certificate]) -> Result<()> {
        let Some(last) = chain.last() else {
            return Err(Error::type_error("certificate chain must not be empty"));
        };

        let roots = self
            .metadata
            .map(|metadata| metadata.attestation_roots(&self.aaguid()))
            .unwrap_or_default();

        if roots.contains(last) || self.cert_manager.find_anchor(last, &roots).is_some() {
            self.cert_manager
                .verify_cert_chain(chain, &roots, &[], self.crypto)
                .await?;
            self.audit.set_info("attestation-trust", "verified");
            return Ok(());
        }

        if self.config.attestation_trust == AttestationTrust::Required {
            return Err(Error::verification(
                "no trusted root certificate found for chain",
            ));
        }

        self.cert_manager
            .verify_cert_chain(chain, std::slice::from_ref(last), &[], self.crypto)
            .await?;
        self.audit
            .set_warning("attestation-trust", "no trusted root certificate found for chain");
        Ok(())
    }
}

/// An attestation statement format.
#[async_trait::async_trait]
pub trait AttestationFormat: Send + Sync {
    /// The `fmt` identifier this format handles.
    fn fmt(&self) -> &str;

    /// Check the shape of `attStmt` and convert it into a typed statement.
    fn parse(&self, att_stmt: &[(Value, Value)]) -> Result<AttestationStatement>;

    /// Validate the statement in `ctx`, journaling every statement field that was checked and
    /// recording the attestation type under the `attestation-type` info key.
    async fn validate(&self, ctx: &mut AttestationContext<'_>) -> Result<()>;
}

/// The attestation formats a verifier accepts, keyed by `fmt`.
pub struct AttestationRegistry {
    formats: IndexMap<String, Box<dyn AttestationFormat>>,
}

impl std::fmt::Debug for AttestationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.formats.keys()).finish()
    }
}

impl Default for AttestationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AttestationRegistry {
    /// A registry without any format.
    pub fn empty() -> Self {
        Self {
            formats: IndexMap::new(),
        }
    }

    /// A registry with every built-in format.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let defaults: [Box<dyn AttestationFormat>; 5] = [
            Box::new(NoneFormat),
            Box::new(FidoU2f),
            Box::new(Packed),
            Box::new(Tpm),
            Box::new(AndroidSafetyNet),
        ];
        for format in defaults {
            registry
                .formats
                .insert(format.fmt().to_owned(), format);
        }
        registry
    }

    /// Register a format. Formats are never replaced.
    pub fn add(&mut self, format: Box<dyn AttestationFormat>) -> Result<()> {
        let fmt = format.fmt().to_owned();
        if self.formats.contains_key(&fmt) {
            return Err(Error::type_error(format!(
                "can't add format: '{fmt}' already exists"
            )));
        }
        self.formats.insert(fmt, format);
        Ok(())
    }

    /// Remove every format, including the built-in ones.
    pub fn delete_all(&mut self) {
        self.formats.clear();
    }

    /// The format registered for `fmt`.
    pub fn get(&self, fmt: &str) -> Option<&dyn AttestationFormat> {
        self.formats.get(fmt).map(AsRef::as_ref)
    }

    /// The registered format identifiers, in registration order.
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    fn lookup(&self, fmt: &str) -> Result<&dyn AttestationFormat> {
        self.get(fmt).ok_or_else(|| {
            Error::verification(format!("no support for attestation format: {fmt}"))
        })
    }

    /// Parse `att_stmt` with the format registered for `fmt`.
    pub fn parse(&self, fmt: &str, att_stmt: &[(Value, Value)]) -> Result<AttestationStatement> {
        self.lookup(fmt)?.parse(att_stmt)
    }

    /// Validate the statement in `ctx` and journal `fmt`.
    pub async fn validate(&self, ctx: &mut AttestationContext<'_>) -> Result<()> {
        let format = self.lookup(ctx.statement.fmt())?;
        format.validate(ctx).await?;
        ctx.audit.record(Field::Fmt);
        Ok(())
    }
}

/// Text keyed view of an `attStmt` map that only admits a fixed set of keys.
pub(crate) struct StatementMap<'a> {
    fmt: &'static str,
    entries: IndexMap<&'a str, &'a Value>,
}

impl<'a> StatementMap<'a> {
    pub(crate) fn new(
        fmt: &'static str,
        att_stmt: &'a [(Value, Value)],
        allowed: &[&str],
    ) -> Result<Self> {
        let mut entries = IndexMap::new();
        for (key, value) in att_stmt {
            let key = key
                .as_text()
                .ok_or_else(|| Error::format(format!("{fmt}: attStmt keys must be strings")))?;
            if !allowed.contains(&key) {
                return Err(Error::format(format!(
                    "{fmt}: unexpected attStmt field '{key}'"
                )));
            }
            entries.insert(key, value);
        }
        Ok(Self { fmt, entries })
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn bytes(&self, name: &str) -> Result<Bytes> {
        self.entries
            .get(name)
            .and_then(|value| value.as_bytes())
            .map(|bytes| Bytes::from(bytes.as_slice()))
            .ok_or_else(|| {
                Error::format(format!(
                    "{}: expected attStmt '{name}' to be a byte string",
                    self.fmt
                ))
            })
    }

    pub(crate) fn text(&self, name: &str) -> Result<String> {
        self.entries
            .get(name)
            .and_then(|value| value.as_text())
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::format(format!(
                    "{}: expected attStmt '{name}' to be a non-empty string",
                    self.fmt
                ))
            })
    }

    pub(crate) fn alg(&self) -> Result<CoseAlgorithm> {
        let alg = self
            .entries
            .get("alg")
            .and_then(|value| value.as_integer())
            .and_then(|alg| i64::try_from(alg).ok())
            .ok_or_else(|| {
                Error::format(format!(
                    "{}: expected attStmt 'alg' to be a COSE algorithm",
                    self.fmt
                ))
            })?;
        CoseAlgorithm::from_cose(alg)
            .ok_or_else(|| Error::format(format!("{}: unsupported algorithm: {alg}", self.fmt)))
    }

    /// The `x5c` chain, `None` when absent. A present chain must hold at least one
    /// certificate.
    pub(crate) fn x5c(&self) -> Result<Option<Vec<Certificate>>> {
        let Some(value) = self.entries.get("x5c") else {
            return Ok(None);
        };
        let invalid = || {
            Error::format(format!(
                "{}: expected attStmt 'x5c' to be an array of certificates",
                self.fmt
            ))
        };
        let certs = value
            .as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|cert| {
                cert.as_bytes()
                    .ok_or_else(invalid)
                    .and_then(|der| Certificate::from_der(der))
            })
            .collect::<Result<Vec<_>>>()?;
        if certs.is_empty() {
            return Err(invalid());
        }
        Ok(Some(certs))
    }
}

pub(crate) fn wrong_statement(fmt: &str) -> Error {
    Error::type_error(format!(
        "{fmt}: attestation statement was not produced by this format"
    ))
}
