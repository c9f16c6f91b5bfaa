use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// An Authenticator Attestation GUID is a 128-bit identifier.
///
/// It indicates the type (e.g. make and model) of an authenticator and is the key used to find
/// an authenticator's metadata, including its attestation root certificates. Authenticators that
/// do not attest, or only self attest, usually report an AAGUID made of `0`s.
///
/// [RFC4122]: https://www.rfc-editor.org/rfc/rfc4122
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Aaguid(pub [u8; Self::LEN]);

impl Aaguid {
    /// Length in bytes of an AAGUID.
    pub const LEN: usize = 16;

    /// Generate empty AAGUID
    pub const fn new_empty() -> Self {
        Self([0; 16])
    }

    /// Whether this is the all-zero AAGUID.
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 16]
    }

    /// Read an AAGUID from the first 16 bytes of `bytes`, returning `None` when it is shorter.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.get(..Self::LEN)?.try_into().ok().map(Aaguid)
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Aaguid {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl From<[u8; 16]> for Aaguid {
    fn from(inner: [u8; 16]) -> Self {
        Aaguid(inner)
    }
}

/// Formats as a hyphenated UUID, the form metadata statements use.
impl fmt::Display for Aaguid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Parses the hyphenated (or plain) hex form.
impl FromStr for Aaguid {
    type Err = data_encoding::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.replace('-', "").to_ascii_lowercase();
        let bytes = data_encoding::HEXLOWER.decode(hex.as_bytes())?;
        bytes
            .as_slice()
            .try_into()
            .map(Aaguid)
            .map_err(|_| data_encoding::DecodeError {
                position: bytes.len(),
                kind: data_encoding::DecodeKind::Length,
            })
    }
}

impl Serialize for Aaguid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Aaguid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct AaguidVisitior;
        impl<'de> serde::de::Visitor<'de> for AaguidVisitior {
            type Value = Aaguid;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "A byte string of {} bytes long", Aaguid::LEN)
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.try_into().map(Aaguid).map_err(|_| {
                    E::custom(format!("Byte string of len {}, is not of len 16", v.len()))
                })
            }
        }
        deserializer.deserialize_bytes(AaguidVisitior)
    }
}
