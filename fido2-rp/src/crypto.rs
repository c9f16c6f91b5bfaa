//! The cryptographic capability the verifier depends on.
//!
//! Verification never reaches for ambient cryptography: every digest, signature check and random
//! value goes through the [`CryptoProvider`] handed to the [`Verifier`](crate::Verifier).
//! [`RustCrypto`] is the default implementation.

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use rand::RngCore;
use rsa::Pkcs1v15Sign;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::{
    keys::{CoseAlgorithm, PublicKey},
    Error, Result,
};

/// Digest algorithms used by the supported signature schemes and attestation formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum HashAlgorithm {
    /// SHA-1, only seen in legacy RSA keys and TPM name algorithms.
    #[strum(serialize = "SHA1")]
    Sha1,
    /// SHA-256
    #[strum(serialize = "SHA256")]
    Sha256,
    /// SHA-384
    #[strum(serialize = "SHA384")]
    Sha384,
    /// SHA-512
    #[strum(serialize = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// Length of the digest in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn pkcs1v15(&self) -> Pkcs1v15Sign {
        match self {
            HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

/// Pluggable cryptographic capability.
///
/// Digests and signature checks may be backed by hardware or a remote service, so they are
/// asynchronous. Implementations must be safe to share between concurrent verifications.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
#[async_trait::async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Hash `data` with `alg`.
    async fn digest(&self, alg: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>>;

    /// Check `signature` over `data` with `key` using `alg`.
    ///
    /// Returns `Ok(false)` for a well formed request whose signature does not verify, and an
    /// error when `alg` cannot be used with `key`.
    async fn verify(
        &self,
        key: &PublicKey,
        alg: CoseAlgorithm,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool>;

    /// Cryptographically secure random bytes.
    fn random(&self, len: usize) -> Vec<u8>;
}

/// [`CryptoProvider`] backed by the RustCrypto crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCrypto;

#[async_trait::async_trait]
impl CryptoProvider for RustCrypto {
    async fn digest(&self, alg: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        Ok(alg.digest(data))
    }

    async fn verify(
        &self,
        key: &PublicKey,
        alg: CoseAlgorithm,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool> {
        let mismatch = || {
            Error::verification(format!(
                "algorithm {alg} cannot be used with a {} key",
                key.key_type()
            ))
        };

        match (key, alg.hash()) {
            (PublicKey::P256(pk), Some(hash)) if alg.is_ecdsa() => {
                let Ok(sig) = p256::ecdsa::Signature::from_der(signature) else {
                    return Ok(false);
                };
                let vk = p256::ecdsa::VerifyingKey::from(pk);
                Ok(vk.verify_prehash(&hash.digest(data), &sig).is_ok())
            }
            (PublicKey::P384(pk), Some(hash)) if alg.is_ecdsa() => {
                let Ok(sig) = p384::ecdsa::Signature::from_der(signature) else {
                    return Ok(false);
                };
                let vk = p384::ecdsa::VerifyingKey::from(pk);
                Ok(vk.verify_prehash(&hash.digest(data), &sig).is_ok())
            }
            (PublicKey::Rsa(pk), Some(hash)) if alg.is_rsa() => Ok(pk
                .verify(hash.pkcs1v15(), &hash.digest(data), signature)
                .is_ok()),
            (PublicKey::Ed25519(vk), None) if alg == CoseAlgorithm::EdDsa => {
                let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(vk.verify_strict(data, &sig).is_ok())
            }
            _ => Err(mismatch()),
        }
    }

    fn random(&self, len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut data);
        data
    }
}
