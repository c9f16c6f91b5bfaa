use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Bytes;

/// Reasons `clientDataJSON` could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientDataError {
    /// The bytes are not UTF-8 JSON of the expected shape.
    #[error("couldn't parse clientDataJson: {0}")]
    Json(String),
}

/// The client data represents the contextual bindings of both the Relying Party and the client.
/// It is a key-value mapping whose values can be any JSON type.
///
/// The structure is parsed leniently: keys unknown to this library are kept in
/// [`CollectedClientData::unknown_keys`] and the token binding is kept as raw JSON so that its
/// shape can be checked and reported by the verifier.
///
/// <https://w3c.github.io/webauthn/#dictionary-client-data>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    /// [`ClientDataType::Create`] when creating new credentials, [`ClientDataType::Get`] when
    /// getting an assertion from an existing credential.
    #[serde(rename = "type")]
    pub ty: ClientDataType,

    /// This member contains the base64url encoding of the challenge provided by the Relying Party.
    pub challenge: String,

    /// This member contains the fully qualified origin of the requester, as provided to the
    /// authenticator by the client, in the syntax defined by [RFC6454].
    ///
    /// [RFC6454]: https://www.rfc-editor.org/rfc/rfc6454
    pub origin: String,

    /// This OPTIONAL member contains information about the state of the Token Binding protocol
    /// used when communicating with the Relying Party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_binding: Option<serde_json::Value>,

    /// This OPTIONAL member contains the inverse of the sameOriginWithAncestors argument value that
    /// was passed into the internal method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,

    /// Keys unknown to this library, in the order they appeared.
    #[serde(flatten)]
    pub unknown_keys: IndexMap<String, serde_json::Value>,
}

impl CollectedClientData {
    /// Parse `clientDataJSON`.
    pub fn from_slice(v: &[u8]) -> Result<Self, ClientDataError> {
        serde_json::from_slice(v).map_err(|e| ClientDataError::Json(e.to_string()))
    }
}

/// Used to limit the values of [`CollectedClientData::ty`] and serializes to static strings.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ClientDataType {
    /// Serializes to the string `"webauthn.create"`
    #[serde(rename = "webauthn.create")]
    #[strum(serialize = "webauthn.create")]
    Create,

    /// Serializes to the string `"webauthn.get"`
    #[serde(rename = "webauthn.get")]
    #[strum(serialize = "webauthn.get")]
    Get,
}

/// `clientDataJSON` together with the exact bytes it was parsed from. The bytes are hashed into
/// every signature, so they are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientData {
    /// The parsed JSON.
    pub collected: CollectedClientData,

    /// The bytes `collected` was parsed from.
    pub raw: Bytes,
}

impl ClientData {
    /// Parse and keep the raw bytes.
    pub fn from_bytes(raw: Bytes) -> Result<Self, ClientDataError> {
        let collected = CollectedClientData::from_slice(&raw)?;
        Ok(Self { collected, raw })
    }
}
