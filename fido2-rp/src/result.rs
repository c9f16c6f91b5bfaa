//! The outcome of a successful verification.
//!
//! A result is only ever constructed after every field listed by its `fields()` methods has been
//! validated, so holding one means the whole response was checked.

use ciborium::value::Value;
use fido2_rp_types::{
    authenticator::{Aaguid, Flags},
    webauthn::{ClientData, ClientDataType},
    Bytes,
};
use indexmap::IndexMap;

use crate::{
    attestation::AttestationStatement,
    audit::{Audit, Field},
    expectations::Expectations,
    keys::Jwk,
};

/// The client data fields a result exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDataResult {
    /// base64url challenge as reported by the client.
    pub challenge: String,
    /// Origin as reported by the client.
    pub origin: String,
    /// Ceremony type.
    pub ty: ClientDataType,
    /// Token binding object, if the client sent one.
    pub token_binding: Option<serde_json::Value>,
    /// `crossOrigin`, if the client sent it.
    pub cross_origin: Option<bool>,
    /// Members no validator interprets, in the order the client sent them.
    pub unknown_keys: IndexMap<String, serde_json::Value>,
    /// The exact `clientDataJSON` bytes.
    pub raw_client_data_json: Bytes,
    /// The credential ID the response was posted with.
    pub raw_id: Bytes,
}

impl ClientDataResult {
    pub(crate) fn new(client_data: ClientData, raw_id: Bytes) -> Self {
        let ClientData { collected, raw } = client_data;
        Self {
            challenge: collected.challenge,
            origin: collected.origin,
            ty: collected.ty,
            token_binding: collected.token_binding,
            cross_origin: collected.cross_origin,
            unknown_keys: collected.unknown_keys,
            raw_client_data_json: raw,
            raw_id,
        }
    }

    /// Fields that must be validated: one per member the client sent, plus the raw bytes and
    /// the credential ID.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Challenge, Field::Origin, Field::Type];
        if self.token_binding.is_some() {
            fields.push(Field::TokenBinding);
        }
        if self.cross_origin.is_some() {
            fields.push(Field::CrossOrigin);
        }
        fields.extend(
            self.unknown_keys
                .keys()
                .map(|key| Field::ClientDataMember(key.clone())),
        );
        fields.extend([Field::RawClientDataJson, Field::RawId]);
        fields
    }
}

/// Authenticator data of a registration, together with the attestation statement.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationAuthnrData {
    /// Attestation statement format identifier.
    pub fmt: String,
    /// The parsed attestation statement.
    pub statement: AttestationStatement,
    /// The exact authenticator data bytes.
    pub raw_authnr_data: Bytes,
    /// Transports reported by the client.
    pub transports: Option<Vec<String>>,
    /// SHA-256 of the RP ID the credential is scoped to.
    pub rp_id_hash: Bytes,
    /// Authenticator data flags.
    pub flags: Flags,
    /// Initial signature counter.
    pub counter: u32,
    /// Authenticator model.
    pub aaguid: Aaguid,
    /// Declared credential ID length.
    pub cred_id_len: u16,
    /// The new credential's ID.
    pub cred_id: Bytes,
    /// The credential public key as COSE bytes.
    pub credential_public_key_cose: Bytes,
    /// The credential public key as a JWK.
    pub credential_public_key_jwk: Jwk,
    /// The credential public key as PEM, for storing and for later assertions.
    pub credential_public_key_pem: String,
    /// Authenticator extension outputs.
    pub web_authn_extensions: Option<Vec<(Value, Value)>>,
}

impl AttestationAuthnrData {
    /// Fields that must be validated: `fmt`, the statement fields, then the authenticator data.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Fmt];
        fields.extend(self.statement.fields());
        fields.extend([
            Field::RawAuthnrData,
            Field::Transports,
            Field::RpIdHash,
            Field::Flags,
            Field::Counter,
            Field::Aaguid,
            Field::CredIdLen,
            Field::CredId,
            Field::CredentialPublicKeyCose,
            Field::CredentialPublicKeyJwk,
            Field::CredentialPublicKeyPem,
        ]);
        if self.web_authn_extensions.is_some() {
            fields.push(Field::WebAuthnExtensions);
        }
        fields
    }
}

/// Authenticator data of an authentication.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionAuthnrData {
    /// SHA-256 of the RP ID.
    pub rp_id_hash: Bytes,
    /// Authenticator data flags.
    pub flags: Flags,
    /// Signature counter, to be stored for the next assertion.
    pub counter: u32,
    /// The assertion signature.
    pub sig: Bytes,
    /// User handle returned by the authenticator.
    pub user_handle: Option<Bytes>,
    /// The exact authenticator data bytes.
    pub raw_authnr_data: Bytes,
    /// Authenticator extension outputs.
    pub web_authn_extensions: Option<Vec<(Value, Value)>>,
}

impl AssertionAuthnrData {
    /// Fields that must be validated.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = vec![
            Field::RpIdHash,
            Field::Flags,
            Field::Counter,
            Field::Sig,
            Field::UserHandle,
            Field::RawAuthnrData,
        ];
        if self.web_authn_extensions.is_some() {
            fields.push(Field::WebAuthnExtensions);
        }
        fields
    }
}

/// A verified registration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationResult {
    pub(crate) audit: Audit,
    pub(crate) client_data: ClientDataResult,
    pub(crate) authnr_data: AttestationAuthnrData,
    pub(crate) expectations: Expectations,
}

impl AttestationResult {
    /// What was validated.
    pub fn audit(&self) -> &Audit {
        &self.audit
    }

    /// The client data.
    pub fn client_data(&self) -> &ClientDataResult {
        &self.client_data
    }

    /// The authenticator data and attestation statement.
    pub fn authnr_data(&self) -> &AttestationAuthnrData {
        &self.authnr_data
    }

    /// The expectations the response was checked against.
    pub fn expectations(&self) -> &Expectations {
        &self.expectations
    }
}

/// A verified authentication.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionResult {
    pub(crate) audit: Audit,
    pub(crate) client_data: ClientDataResult,
    pub(crate) authnr_data: AssertionAuthnrData,
    pub(crate) expectations: Expectations,
}

impl AssertionResult {
    /// What was validated.
    pub fn audit(&self) -> &Audit {
        &self.audit
    }

    /// The client data.
    pub fn client_data(&self) -> &ClientDataResult {
        &self.client_data
    }

    /// The authenticator data.
    pub fn authnr_data(&self) -> &AssertionAuthnrData {
        &self.authnr_data
    }

    /// The expectations the response was checked against.
    pub fn expectations(&self) -> &Expectations {
        &self.expectations
    }
}
