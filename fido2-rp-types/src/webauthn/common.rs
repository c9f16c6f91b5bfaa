use serde::{Deserialize, Serialize};

use crate::Bytes;

/// This enumeration defines the valid credential types.
///
/// <https://w3c.github.io/webauthn/#enumdef-publickeycredentialtype>
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PublicKeyCredentialType {
    /// Currently the only type defined is a `PublicKey` meaning the public counterpart of an
    /// asymmetric key pair.
    #[default]
    #[serde(rename = "public-key")]
    #[strum(serialize = "public-key")]
    PublicKey,
}

/// Authenticators may implement various transports for communicating with clients. These are
/// hints a client reports on registration and a relying party echoes back in its allow lists.
///
/// <https://w3c.github.io/webauthn/#enum-transport>
#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthenticatorTransport {
    /// Removable USB.
    Usb,

    /// Near Field Communication (NFC).
    Nfc,

    /// Bluetooth Smart (Bluetooth Low Energy / BLE).
    Ble,

    /// A combination of (often separate) data-transport and proximity mechanisms, for example
    /// a phone used to sign in on a desktop.
    #[serde(alias = "cable")]
    Hybrid,

    /// A client device-specific transport, i.e. a platform authenticator.
    Internal,
}

impl AuthenticatorTransport {
    /// Whether this transport may appear in a relying party supplied allow list.
    pub fn is_allow_list_transport(&self) -> bool {
        !matches!(self, AuthenticatorTransport::Hybrid)
    }
}

/// Identifies a specific public key credential, as used in allow lists.
///
/// <https://w3c.github.io/webauthn/#dictdef-publickeycredentialdescriptor>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialDescriptor {
    /// This member contains the type of the public key credential the caller is referring to.
    /// It is kept as text so an unexpected value can be reported rather than dropped.
    #[serde(rename = "type")]
    pub ty: String,

    /// This member contains the credential ID of the public key credential the caller is referring to.
    pub id: Bytes,

    /// This OPTIONAL member contains a hint as to how the client might communicate with the
    /// authenticator holding the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

impl PublicKeyCredentialDescriptor {
    /// Describe a `public-key` credential with the given ID.
    pub fn new(id: impl Into<Bytes>) -> Self {
        Self {
            ty: PublicKeyCredentialType::PublicKey.to_string(),
            id: id.into(),
            transports: None,
        }
    }

    /// Attach transport hints.
    pub fn with_transports(mut self, transports: Vec<AuthenticatorTransport>) -> Self {
        self.transports = Some(transports);
        self
    }
}
