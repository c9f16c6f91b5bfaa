use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A JSON Web Key ([RFC7517]) holding a public (or, when transcoded from a full COSE key,
/// private) key.
///
/// Members without a dedicated field are kept in [`Jwk::other`].
///
/// [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type: `EC`, `RSA` or `OKP`.
    pub kty: String,

    /// Algorithm name, either a COSE style name such as `ECDSA_w_SHA256` or a JOSE name such as
    /// `ES256`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Curve name for `EC` and `OKP` keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// X coordinate (EC) or public key (OKP), base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// Y coordinate, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Private exponent or scalar, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// RSA modulus, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// RSA first prime factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,

    /// RSA second prime factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    /// RSA first factor CRT exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,

    /// RSA second factor CRT exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,

    /// RSA first CRT coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,

    /// Key identifier, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Any other member.
    #[serde(flatten)]
    pub other: IndexMap<String, serde_json::Value>,
}

impl Jwk {
    /// Number of members this key serializes to.
    pub fn member_count(&self) -> usize {
        [
            &self.alg, &self.crv, &self.x, &self.y, &self.d, &self.n, &self.e, &self.p, &self.q,
            &self.dp, &self.dq, &self.qi, &self.kid,
        ]
        .into_iter()
        .filter(|member| member.is_some())
        .count()
            + 1
            + self.other.len()
    }
}
