//! # FIDO2 Relying Party Types
//!
//! Rust type definitions for the payloads a WebAuthn relying party receives from a client:
//! `clientDataJSON`, attestation objects, authenticator data and the credential responses that
//! carry them.
//!
//! Everything in this crate establishes *structure* only. Verifying signatures, certificates and
//! expectations is the job of the `fido2-rp` crate.

mod utils;

pub mod authenticator;
pub mod webauthn;

// Re-exports
pub use utils::{
    bytes::{Bytes, NotBase64Encoded},
    crypto, encoding,
};
