//! Conversion between the three ways a public key shows up during verification: COSE keys in
//! authenticator data, JWKs in JWS headers and metadata, and PEM/SPKI in certificates and in a
//! relying party's credential store.

use fido2_rp_types::{encoding, Bytes};
use p256::{
    elliptic_curve::sec1::ToEncodedPoint,
    pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding},
};
use rsa::{traits::PublicKeyParts, BigUint, RsaPublicKey};

use crate::{Error, Result};

mod cose;
mod jwk;


pub use self::{cose::CoseAlgorithm, jwk::Jwk};

/// A materialized public key, ready to verify signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// NIST P-256
    P256(p256::PublicKey),
    /// NIST P-384
    P384(p384::PublicKey),
    /// RSA
    Rsa(RsaPublicKey),
    /// Ed25519
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl PublicKey {
    /// Short name of the key type, for error messages.
    pub fn key_type(&self) -> &'static str {
        match self {
            PublicKey::P256(_) => "P-256",
            PublicKey::P384(_) => "P-384",
            PublicKey::Rsa(_) => "RSA",
            PublicKey::Ed25519(_) => "Ed25519",
        }
    }

    /// Import a PEM encoded SubjectPublicKeyInfo.
    ///
    /// SPKI does not say which signature algorithm a key is used with, so the key types are
    /// tried in order: P-256, RSA, P-384, Ed25519.
    pub fn from_pem(pem: &str) -> Result<Self> {
        if let Ok(key) = p256::PublicKey::from_public_key_pem(pem) {
            return Ok(PublicKey::P256(key));
        }
        if let Ok(key) = RsaPublicKey::from_public_key_pem(pem) {
            return Ok(PublicKey::Rsa(key));
        }
        if let Ok(key) = p384::PublicKey::from_public_key_pem(pem) {
            return Ok(PublicKey::P384(key));
        }
        if let Ok(key) = ed25519_dalek::VerifyingKey::from_public_key_pem(pem) {
            return Ok(PublicKey::Ed25519(key));
        }
        Err(Error::format("couldn't import PEM public key"))
    }

    /// Import a DER encoded SubjectPublicKeyInfo, negotiating the key type like [`Self::from_pem`].
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        if let Ok(key) = p256::PublicKey::from_public_key_der(der) {
            return Ok(PublicKey::P256(key));
        }
        if let Ok(key) = RsaPublicKey::from_public_key_der(der) {
            return Ok(PublicKey::Rsa(key));
        }
        if let Ok(key) = p384::PublicKey::from_public_key_der(der) {
            return Ok(PublicKey::P384(key));
        }
        if let Ok(key) = ed25519_dalek::VerifyingKey::from_public_key_der(der) {
            return Ok(PublicKey::Ed25519(key));
        }
        Err(Error::format("unsupported SubjectPublicKeyInfo"))
    }

    /// Materialize the public part of a JWK.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let member = |name: &str, value: &Option<String>| -> Result<Vec<u8>> {
            let value = value
                .as_deref()
                .ok_or_else(|| Error::format(format!("JWK is missing '{name}'")))?;
            encoding::try_from_base64url(value)
                .ok_or_else(|| Error::format(format!("JWK member '{name}' is not base64url")))
        };

        match (jwk.kty.as_str(), jwk.crv.as_deref()) {
            ("EC", Some(crv @ ("P-256" | "P-384"))) => {
                let sec1: Vec<u8> = std::iter::once(0x04)
                    .chain(member("x", &jwk.x)?)
                    .chain(member("y", &jwk.y)?)
                    .collect();
                let invalid = |_| Error::format("invalid EC public key");
                if crv == "P-256" {
                    p256::PublicKey::from_sec1_bytes(&sec1)
                        .map(PublicKey::P256)
                        .map_err(invalid)
                } else {
                    p384::PublicKey::from_sec1_bytes(&sec1)
                        .map(PublicKey::P384)
                        .map_err(invalid)
                }
            }
            ("OKP", Some("Ed25519")) => {
                let x: [u8; 32] = member("x", &jwk.x)?
                    .try_into()
                    .map_err(|_| Error::format("invalid Ed25519 public key"))?;
                ed25519_dalek::VerifyingKey::from_bytes(&x)
                    .map(PublicKey::Ed25519)
                    .map_err(|_| Error::format("invalid Ed25519 public key"))
            }
            ("RSA", _) => {
                let n = BigUint::from_bytes_be(&member("n", &jwk.n)?);
                let e = BigUint::from_bytes_be(&member("e", &jwk.e)?);
                RsaPublicKey::new(n, e)
                    .map(PublicKey::Rsa)
                    .map_err(|e| Error::format(format!("invalid RSA public key: {e}")))
            }
            (kty, crv) => Err(Error::format(format!(
                "unsupported key type: {kty} {}",
                crv.unwrap_or_default()
            ))),
        }
    }

    /// Export as PEM encoded SubjectPublicKeyInfo, ending in exactly one newline.
    pub fn to_pem(&self) -> Result<String> {
        let pem = match self {
            PublicKey::P256(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::P384(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::Rsa(key) => key.to_public_key_pem(LineEnding::LF),
            PublicKey::Ed25519(key) => key.to_public_key_pem(LineEnding::LF),
        }
        .map_err(|e| Error::format(format!("couldn't export public key: {e}")))?;
        Ok(normalize_pem(&pem))
    }

    /// Export the public members as a JWK without an `alg`.
    pub fn to_jwk(&self) -> Jwk {
        let (kty, crv, x, y) = match self {
            PublicKey::P256(key) => {
                let point = key.to_encoded_point(false);
                let (x, y) = (point.x().map(|x| x.to_vec()), point.y().map(|y| y.to_vec()));
                ("EC", "P-256", x, y)
            }
            PublicKey::P384(key) => {
                let point = key.to_encoded_point(false);
                let (x, y) = (point.x().map(|x| x.to_vec()), point.y().map(|y| y.to_vec()));
                ("EC", "P-384", x, y)
            }
            PublicKey::Ed25519(key) => ("OKP", "Ed25519", Some(key.as_bytes().to_vec()), None),
            PublicKey::Rsa(key) => {
                return Jwk {
                    kty: "RSA".into(),
                    n: Some(encoding::base64url(&key.n().to_bytes_be())),
                    e: Some(encoding::base64url(&key.e().to_bytes_be())),
                    ..Default::default()
                }
            }
        };
        Jwk {
            kty: kty.into(),
            crv: Some(crv.into()),
            x: x.map(|x| encoding::base64url(&x)),
            y: y.map(|y| encoding::base64url(&y)),
            ..Default::default()
        }
    }

    /// The uncompressed SEC1 point `0x04 ‖ x ‖ y` of an EC key.
    pub fn sec1_uncompressed(&self) -> Option<Vec<u8>> {
        match self {
            PublicKey::P256(key) => Some(key.to_encoded_point(false).as_bytes().to_vec()),
            PublicKey::P384(key) => Some(key.to_encoded_point(false).as_bytes().to_vec()),
            _ => None,
        }
    }

    /// Whether `alg` can be used with this key.
    pub fn supports(&self, alg: CoseAlgorithm) -> bool {
        match self {
            PublicKey::P256(_) | PublicKey::P384(_) => alg.is_ecdsa(),
            PublicKey::Rsa(_) => alg.is_rsa(),
            PublicKey::Ed25519(_) => alg == CoseAlgorithm::EdDsa,
        }
    }
}

/// Make sure a PEM ends in exactly one newline.
fn normalize_pem(pem: &str) -> String {
    let mut pem = pem.trim_end().to_owned();
    pem.push('\n');
    pem
}

/// Whether `value` looks like a PEM encoded public key or certificate.
pub fn is_pem(value: &str) -> bool {
    let value = value.trim();
    let Some(body) = value
        .strip_prefix("-----BEGIN ")
        .and_then(|rest| rest.split_once("-----"))
        .map(|(_, body)| body)
    else {
        return false;
    };
    let Some((body, _)) = body.rsplit_once("-----END ") else {
        return false;
    };
    value.ends_with("-----")
        && body
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
}

/// The representation a [`Key`] was imported from.
#[derive(Debug, Clone, PartialEq)]
enum KeySource {
    Pem(String),
    Spki(Bytes),
    Jwk(Jwk),
    Cose { bytes: Bytes, jwk: Jwk },
}

/// A public key together with the representation it was imported from.
///
/// Exports never make up data: a JWK is only available when the key came from a JWK or a COSE
/// key, and COSE bytes only when the key came from COSE bytes. PEM can always be exported since
/// it is derived from the materialized key.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    source: KeySource,
    public_key: PublicKey,
    alg: Option<CoseAlgorithm>,
}

impl Key {
    /// Import a COSE_Key.
    pub fn from_cose(bytes: &[u8]) -> Result<Self> {
        let jwk = cose::cose_to_jwk(bytes)?;
        let public_key = PublicKey::from_jwk(&jwk)?;
        let alg = jwk.alg.as_deref().and_then(CoseAlgorithm::from_name);
        Ok(Self {
            source: KeySource::Cose {
                bytes: Bytes::from(bytes),
                jwk,
            },
            public_key,
            alg,
        })
    }

    /// Import a JWK. The `alg` member may use either COSE style or JOSE names.
    pub fn from_jwk(jwk: Jwk) -> Result<Self> {
        let public_key = PublicKey::from_jwk(&jwk)?;
        let alg = match jwk.alg.as_deref() {
            Some(name) => Some(
                CoseAlgorithm::from_name(name)
                    .ok_or_else(|| Error::format(format!("unknown JWK algorithm: {name}")))?,
            ),
            None => None,
        };
        Ok(Self {
            source: KeySource::Jwk(jwk),
            public_key,
            alg,
        })
    }

    /// Import a PEM encoded public key. See [`PublicKey::from_pem`] for how the key type is
    /// chosen.
    pub fn from_pem(pem: &str) -> Result<Self> {
        if !is_pem(pem) {
            return Err(Error::format("expected a PEM encoded public key"));
        }
        Ok(Self {
            public_key: PublicKey::from_pem(pem)?,
            source: KeySource::Pem(normalize_pem(pem)),
            alg: None,
        })
    }

    /// Import a DER encoded SubjectPublicKeyInfo, as found in certificates.
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            public_key: PublicKey::from_spki_der(der)?,
            source: KeySource::Spki(Bytes::from(der)),
            alg: None,
        })
    }

    /// The algorithm named when the key was imported, if any.
    pub fn alg(&self) -> Option<CoseAlgorithm> {
        self.alg
    }

    /// The materialized key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// The JWK this key was imported from, directly or through COSE.
    pub fn to_jwk(&self) -> Result<Jwk> {
        match &self.source {
            KeySource::Jwk(jwk) | KeySource::Cose { jwk, .. } => Ok(jwk.clone()),
            KeySource::Pem(_) | KeySource::Spki(_) => {
                Err(Error::format("No key information available"))
            }
        }
    }

    /// The COSE bytes this key was imported from.
    pub fn to_cose(&self) -> Result<Bytes> {
        match &self.source {
            KeySource::Cose { bytes, .. } => Ok(bytes.clone()),
            _ => Err(Error::format("Key to Cose is not implemented.")),
        }
    }

    /// PEM encoded SubjectPublicKeyInfo. A key imported from PEM returns that PEM.
    pub fn to_pem(&self) -> Result<String> {
        match &self.source {
            KeySource::Pem(pem) => Ok(pem.clone()),
            _ => self.public_key.to_pem(),
        }
    }
}
