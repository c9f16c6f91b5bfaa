//! Types produced by an authenticator: the binary [`AuthenticatorData`] structure, its [`Flags`],
//! the [`Aaguid`] and the CBOR [`AttestationObject`] that wraps them during registration.
//!
//! <https://w3c.github.io/webauthn/#sctn-authenticator-data>

mod aaguid;
mod attestation_object;
mod data;
mod flags;

pub use self::{aaguid::*, attestation_object::*, data::*, flags::*};
