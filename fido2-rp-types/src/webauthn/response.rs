use serde::{Deserialize, Serialize};

use crate::Bytes;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::AuthenticatorAssertionResponse {}
    impl Sealed for super::AuthenticatorAttestationResponse {}
}

/// Marker trait for response types
pub trait AuthenticatorResponse: sealed::Sealed {}

impl AuthenticatorResponse for AuthenticatorAssertionResponse {}
impl AuthenticatorResponse for AuthenticatorAttestationResponse {}

/// A credential as posted back to the relying party after `navigator.credentials.create()` or
/// `navigator.credentials.get()`.
///
/// It is recommended to use the type aliases depending on which response you are expecting:
/// * Credential Creation: [CreatedPublicKeyCredential]
/// * Credential assertion: [AuthenticatedPublicKeyCredential]
///
/// <https://w3c.github.io/webauthn/#iface-pkcredential>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredential<R: AuthenticatorResponse> {
    /// The credential ID, usually the base64url encoding of [Self::raw_id].
    pub id: String,

    /// The raw bytes of the credential ID.
    pub raw_id: Bytes,

    /// Always `public-key`, kept as text so that other values can be reported.
    #[serde(rename = "type", default = "public_key")]
    pub ty: String,

    /// This contains the authenticator's response to the client's request to either:
    /// * create a public key in which case it is of type [AuthenticatorAttestationResponse] or
    /// * generate an authentication assertion in which case it is of type [AuthenticatorAssertionResponse]
    pub response: R,
}

fn public_key() -> String {
    "public-key".into()
}

/// The response to the successful creation of a PublicKeyCredential
pub type CreatedPublicKeyCredential = PublicKeyCredential<AuthenticatorAttestationResponse>;

/// The response to the successful assertion of a PublicKeyCredential
pub type AuthenticatedPublicKeyCredential = PublicKeyCredential<AuthenticatorAssertionResponse>;

/// The authenticator's response to a request to create a new public key credential.
///
/// <https://w3c.github.io/webauthn/#iface-authenticatorattestationresponse>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    /// The JSON serialization of the client data. The exact bytes must be preserved since the
    /// hash of the serialized client data has been computed over them.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Bytes,

    /// The CBOR encoded attestation object.
    pub attestation_object: Bytes,

    /// The transports the authenticator is believed to support, if reported. Kept as the client
    /// sent them: newer clients report names this library does not know, see
    /// [`AuthenticatorTransport`](crate::webauthn::AuthenticatorTransport) for the known ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

/// The authenticator's response to a request to generate an authentication assertion.
///
/// <https://w3c.github.io/webauthn/#iface-authenticatorassertionresponse>
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    /// The JSON serialization of the client data.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Bytes,

    /// The authenticator data returned by the authenticator.
    pub authenticator_data: Bytes,

    /// The raw signature returned from the authenticator.
    pub signature: Bytes,

    /// The user handle returned from the authenticator, or null if the authenticator did not
    /// return a user handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<Bytes>,
}
