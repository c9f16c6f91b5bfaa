use std::fmt;

use ciborium::value::Value;
use coset::iana::{self, EnumI64};
use fido2_rp_types::encoding;

use crate::{crypto::HashAlgorithm, keys::Jwk, Error, Result};

/// The COSE signature algorithms a credential or certificate may use.
///
/// <https://www.iana.org/assignments/cose/cose.xhtml#algorithms>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseAlgorithm {
    /// ECDSA with SHA-256 (-7)
    Es256,
    /// EdDSA (-8)
    EdDsa,
    /// ECDSA with SHA-384 (-35)
    Es384,
    /// ECDSA with SHA-512 (-36)
    Es512,
    /// RSASSA-PKCS1-v1_5 with SHA-256 (-257)
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384 (-258)
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512 (-259)
    Rs512,
    /// RSASSA-PKCS1-v1_5 with SHA-1 (-65535)
    Rs1,
}

impl CoseAlgorithm {
    const ALL: [CoseAlgorithm; 8] = [
        CoseAlgorithm::Es256,
        CoseAlgorithm::EdDsa,
        CoseAlgorithm::Es384,
        CoseAlgorithm::Es512,
        CoseAlgorithm::Rs256,
        CoseAlgorithm::Rs384,
        CoseAlgorithm::Rs512,
        CoseAlgorithm::Rs1,
    ];

    fn iana(&self) -> iana::Algorithm {
        match self {
            CoseAlgorithm::Es256 => iana::Algorithm::ES256,
            CoseAlgorithm::EdDsa => iana::Algorithm::EdDSA,
            CoseAlgorithm::Es384 => iana::Algorithm::ES384,
            CoseAlgorithm::Es512 => iana::Algorithm::ES512,
            CoseAlgorithm::Rs256 => iana::Algorithm::RS256,
            CoseAlgorithm::Rs384 => iana::Algorithm::RS384,
            CoseAlgorithm::Rs512 => iana::Algorithm::RS512,
            CoseAlgorithm::Rs1 => iana::Algorithm::RS1,
        }
    }

    /// Resolve a COSE algorithm identifier.
    pub fn from_cose(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.to_cose() == value)
    }

    /// The COSE algorithm identifier.
    pub fn to_cose(&self) -> i64 {
        self.iana().to_i64()
    }

    /// The signature-and-hash name used in JWKs produced from COSE keys.
    pub fn name(&self) -> &'static str {
        match self {
            CoseAlgorithm::Es256 => "ECDSA_w_SHA256",
            CoseAlgorithm::EdDsa => "EdDSA",
            CoseAlgorithm::Es384 => "ECDSA_w_SHA384",
            CoseAlgorithm::Es512 => "ECDSA_w_SHA512",
            CoseAlgorithm::Rs256 => "RSASSA-PKCS1-v1_5_w_SHA256",
            CoseAlgorithm::Rs384 => "RSASSA-PKCS1-v1_5_w_SHA384",
            CoseAlgorithm::Rs512 => "RSASSA-PKCS1-v1_5_w_SHA512",
            CoseAlgorithm::Rs1 => "RSASSA-PKCS1-v1_5_w_SHA1",
        }
    }

    /// The JOSE name, as found in JWS headers.
    pub fn jose_name(&self) -> &'static str {
        match self {
            CoseAlgorithm::Es256 => "ES256",
            CoseAlgorithm::EdDsa => "EdDSA",
            CoseAlgorithm::Es384 => "ES384",
            CoseAlgorithm::Es512 => "ES512",
            CoseAlgorithm::Rs256 => "RS256",
            CoseAlgorithm::Rs384 => "RS384",
            CoseAlgorithm::Rs512 => "RS512",
            CoseAlgorithm::Rs1 => "RS1",
        }
    }

    /// Resolve either a [`name`](Self::name) or a [`jose_name`](Self::jose_name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == name || alg.jose_name() == name)
    }

    /// The digest used by this algorithm. EdDSA hashes internally and has none.
    pub fn hash(&self) -> Option<HashAlgorithm> {
        match self {
            CoseAlgorithm::Es256 | CoseAlgorithm::Rs256 => Some(HashAlgorithm::Sha256),
            CoseAlgorithm::Es384 | CoseAlgorithm::Rs384 => Some(HashAlgorithm::Sha384),
            CoseAlgorithm::Es512 | CoseAlgorithm::Rs512 => Some(HashAlgorithm::Sha512),
            CoseAlgorithm::Rs1 => Some(HashAlgorithm::Sha1),
            CoseAlgorithm::EdDsa => None,
        }
    }

    /// Whether this is an ECDSA algorithm.
    pub fn is_ecdsa(&self) -> bool {
        matches!(
            self,
            CoseAlgorithm::Es256 | CoseAlgorithm::Es384 | CoseAlgorithm::Es512
        )
    }

    /// Whether this is an RSASSA-PKCS1-v1_5 algorithm.
    pub fn is_rsa(&self) -> bool {
        matches!(
            self,
            CoseAlgorithm::Rs256 | CoseAlgorithm::Rs384 | CoseAlgorithm::Rs512 | CoseAlgorithm::Rs1
        )
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::from_cose(value)
            .ok_or_else(|| Error::format(format!("unknown COSE algorithm: {value}")))
    }
}

/// Names of the `crv` values.
fn curve_name(value: i64) -> Option<&'static str> {
    match iana::EllipticCurve::from_i64(value)? {
        iana::EllipticCurve::P_256 => Some("P-256"),
        iana::EllipticCurve::P_384 => Some("P-384"),
        iana::EllipticCurve::P_521 => Some("P-521"),
        iana::EllipticCurve::X25519 => Some("X25519"),
        iana::EllipticCurve::X448 => Some("X448"),
        iana::EllipticCurve::Ed25519 => Some("Ed25519"),
        iana::EllipticCurve::Ed448 => Some("Ed448"),
        _ => None,
    }
}

fn key_type_name(value: i64) -> Option<&'static str> {
    match iana::KeyType::from_i64(value)? {
        iana::KeyType::OKP => Some("OKP"),
        iana::KeyType::EC2 => Some("EC"),
        iana::KeyType::RSA => Some("RSA"),
        _ => None,
    }
}

/// Name of a key type specific label. EC2 and OKP keys share the `crv`/`x`/`d` labels.
fn key_parameter_name(kty: &str, label: i64) -> Option<&'static str> {
    match kty {
        "EC" => match iana::Ec2KeyParameter::from_i64(label)? {
            iana::Ec2KeyParameter::Crv => Some("crv"),
            iana::Ec2KeyParameter::X => Some("x"),
            iana::Ec2KeyParameter::Y => Some("y"),
            iana::Ec2KeyParameter::D => Some("d"),
            _ => None,
        },
        "OKP" => match iana::OkpKeyParameter::from_i64(label)? {
            iana::OkpKeyParameter::Crv => Some("crv"),
            iana::OkpKeyParameter::X => Some("x"),
            iana::OkpKeyParameter::D => Some("d"),
            _ => None,
        },
        "RSA" => match iana::RsaKeyParameter::from_i64(label)? {
            iana::RsaKeyParameter::N => Some("n"),
            iana::RsaKeyParameter::E => Some("e"),
            iana::RsaKeyParameter::D => Some("d"),
            iana::RsaKeyParameter::P => Some("p"),
            iana::RsaKeyParameter::Q => Some("q"),
            iana::RsaKeyParameter::DP => Some("dp"),
            iana::RsaKeyParameter::DQ => Some("dq"),
            iana::RsaKeyParameter::QInv => Some("qi"),
            iana::RsaKeyParameter::Other => Some("oth"),
            iana::RsaKeyParameter::RI => Some("r_i"),
            iana::RsaKeyParameter::DI => Some("d_i"),
            iana::RsaKeyParameter::TI => Some("t_i"),
            _ => None,
        },
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    value.as_integer().and_then(|i| i64::try_from(i).ok())
}

fn as_base64url(name: &str, value: &Value) -> Result<String> {
    value
        .as_bytes()
        .map(|b| encoding::base64url(b))
        .ok_or_else(|| Error::format(format!("COSE key parameter '{name}' must be a byte string")))
}

/// Loose JSON rendering of CBOR values that do not map onto a JWK member directly.
fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Integer(i) => i64::try_from(*i)
            .map(serde_json::Value::from)
            .unwrap_or(serde_json::Value::Null),
        Value::Bytes(b) => serde_json::Value::String(encoding::base64url(b)),
        Value::Text(t) => serde_json::Value::String(t.clone()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::Text(t) => t.clone(),
                        other => to_json(other).to_string(),
                    };
                    (key, to_json(v))
                })
                .collect(),
        ),
        _ => serde_json::Value::Null,
    }
}

/// Convert a COSE_Key map into a JWK.
///
/// Labels specific to a key type cannot be named before `kty` is known, so they are set aside
/// and resolved once the whole map has been read.
pub(crate) fn cose_to_jwk(bytes: &[u8]) -> Result<Jwk> {
    let value: Value = ciborium::de::from_reader(bytes)
        .map_err(|e| Error::format(format!("couldn't parse COSE key CBOR: {e}")))?;
    let Value::Map(entries) = value else {
        return Err(Error::format("COSE key must be a CBOR map"));
    };

    let mut jwk = Jwk::default();
    let mut deferred = Vec::new();
    for (label, value) in &entries {
        let label = as_i64(label)
            .ok_or_else(|| Error::format("COSE key labels must be integers"))?;
        match iana::KeyParameter::from_i64(label) {
            Some(iana::KeyParameter::Kty) => {
                let kty = as_i64(value)
                    .and_then(key_type_name)
                    .ok_or_else(|| Error::format(format!("unknown COSE key type: {value:?}")))?;
                jwk.kty = kty.to_owned();
            }
            Some(iana::KeyParameter::Kid) => jwk.kid = Some(as_base64url("kid", value)?),
            Some(iana::KeyParameter::Alg) => {
                let alg = as_i64(value)
                    .ok_or_else(|| Error::format("COSE key 'alg' must be an integer"))?;
                jwk.alg = Some(CoseAlgorithm::try_from(alg)?.name().to_owned());
            }
            Some(iana::KeyParameter::KeyOps) => {
                jwk.other.insert("key_ops".into(), to_json(value));
            }
            Some(iana::KeyParameter::BaseIv) => {
                jwk.other
                    .insert("base_iv".into(), as_base64url("base_iv", value)?.into());
            }
            _ => deferred.push((label, value)),
        }
    }

    if jwk.kty.is_empty() {
        return Err(Error::format("COSE key is missing 'kty'"));
    }

    for (label, value) in deferred {
        let name = key_parameter_name(&jwk.kty, label).ok_or_else(|| {
            Error::format(format!("unknown COSE key label: {} {label}", jwk.kty))
        })?;
        match name {
            "crv" => {
                let crv = as_i64(value)
                    .and_then(curve_name)
                    .ok_or_else(|| Error::format(format!("unknown COSE curve: {value:?}")))?;
                jwk.crv = Some(crv.to_owned());
            }
            "x" => jwk.x = Some(as_base64url(name, value)?),
            "y" => jwk.y = Some(as_base64url(name, value)?),
            "d" => jwk.d = Some(as_base64url(name, value)?),
            "n" => jwk.n = Some(as_base64url(name, value)?),
            "e" => jwk.e = Some(as_base64url(name, value)?),
            "p" => jwk.p = Some(as_base64url(name, value)?),
            "q" => jwk.q = Some(as_base64url(name, value)?),
            "dp" => jwk.dp = Some(as_base64url(name, value)?),
            "dq" => jwk.dq = Some(as_base64url(name, value)?),
            "qi" => jwk.qi = Some(as_base64url(name, value)?),
            _ => {
                jwk.other.insert(name.to_owned(), to_json(value));
            }
        }
    }

    Ok(jwk)
}
