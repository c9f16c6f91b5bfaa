//! The audit journal: which parsed fields a verification actually checked.
//!
//! Every validator records the fields it examined. Once the battery has run, the journal must
//! cover every field of the parsed client data and authenticator data, and nothing else, before
//! a result is handed out.

use std::{collections::BTreeSet, fmt};

use indexmap::IndexMap;

/// Name of a field in the parsed client data or authenticator data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum Field {
    // client data
    Challenge,
    Origin,
    Type,
    TokenBinding,
    CrossOrigin,
    RawClientDataJson,
    RawId,
    /// A client data member without a dedicated validator, such as `clientExtensions`.
    ClientDataMember(String),

    // authenticator data
    Fmt,
    RawAuthnrData,
    Transports,
    RpIdHash,
    Flags,
    Counter,
    Aaguid,
    CredIdLen,
    CredId,
    CredentialPublicKeyCose,
    CredentialPublicKeyJwk,
    CredentialPublicKeyPem,
    WebAuthnExtensions,
    Sig,
    UserHandle,

    // attestation statements
    Alg,
    X5c,
    Ver,
    CertInfo,
    PubArea,
    Response,

    /// A statement field of a caller registered attestation format.
    Other(String),
}

impl Field {
    /// The field name as it appears in error messages.
    pub fn name(&self) -> &str {
        match self {
            Field::Challenge => "challenge",
            Field::Origin => "origin",
            Field::Type => "type",
            Field::TokenBinding => "tokenBinding",
            Field::CrossOrigin => "crossOrigin",
            Field::RawClientDataJson => "rawClientDataJson",
            Field::RawId => "rawId",
            Field::ClientDataMember(name) => name,
            Field::Fmt => "fmt",
            Field::RawAuthnrData => "rawAuthnrData",
            Field::Transports => "transports",
            Field::RpIdHash => "rpIdHash",
            Field::Flags => "flags",
            Field::Counter => "counter",
            Field::Aaguid => "aaguid",
            Field::CredIdLen => "credIdLen",
            Field::CredId => "credId",
            Field::CredentialPublicKeyCose => "credentialPublicKeyCose",
            Field::CredentialPublicKeyJwk => "credentialPublicKeyJwk",
            Field::CredentialPublicKeyPem => "credentialPublicKeyPem",
            Field::WebAuthnExtensions => "webAuthnExtensions",
            Field::Sig => "sig",
            Field::UserHandle => "userHandle",
            Field::Alg => "alg",
            Field::X5c => "x5c",
            Field::Ver => "ver",
            Field::CertInfo => "certInfo",
            Field::PubArea => "pubArea",
            Field::Response => "response",
            Field::Other(name) => name,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Record of a verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audit {
    pub(crate) valid_expectations: bool,
    pub(crate) valid_request: bool,
    pub(crate) complete: bool,
    pub(crate) journal: BTreeSet<Field>,
    pub(crate) warning: IndexMap<String, String>,
    pub(crate) info: IndexMap<String, String>,
}

impl Audit {
    /// Whether the expectations were checked.
    pub fn valid_expectations(&self) -> bool {
        self.valid_expectations
    }

    /// Whether the shape of the request was checked.
    pub fn valid_request(&self) -> bool {
        self.valid_request
    }

    /// Whether every field was validated. Always `true` on a returned result.
    pub fn complete(&self) -> bool {
        self.complete
    }

    /// Fields that were validated.
    pub fn journal(&self) -> &BTreeSet<Field> {
        &self.journal
    }

    /// Non-fatal anomalies, such as unknown extensions.
    pub fn warning(&self) -> &IndexMap<String, String> {
        &self.warning
    }

    /// Facts learned while validating, such as `attestation-type` or `counter-supported`.
    pub fn info(&self) -> &IndexMap<String, String> {
        &self.info
    }

    /// Mark `field` as validated. Attestation formats registered by callers use this to journal
    /// their statement fields.
    pub fn record(&mut self, field: Field) {
        self.journal.insert(field);
    }

    /// Record a fact about the verification.
    pub fn set_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.info.insert(key.into(), value.into());
    }

    /// Record and log a non-fatal anomaly.
    pub fn set_warning(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        log::warn!("{key}: {value}");
        self.warning.insert(key, value);
    }
}
