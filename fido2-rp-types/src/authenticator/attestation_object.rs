use ciborium::value::Value;

use crate::Bytes;

/// Reasons a byte buffer is not a well formed attestation object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestationObjectError {
    /// The buffer is not CBOR or not a map.
    #[error("couldn't parse attestationObject CBOR")]
    Cbor,

    /// The `fmt` entry is missing or not text.
    #[error("expected attestation CBOR to contain a 'fmt' string")]
    Format,

    /// The `attStmt` entry is missing or not a map.
    #[error("expected attestation CBOR to contain a 'attStmt' object")]
    Statement,

    /// The `authData` entry is missing or not a byte string.
    #[error("expected attestation CBOR to contain a 'authData' byte sequence")]
    AuthData,
}

/// The CBOR envelope returned by an authenticator on registration.
///
/// Only the envelope is parsed here: the attestation statement stays a generic CBOR map until
/// the format named by [`AttestationObject::fmt`] interprets it, and the authenticator data stays
/// raw bytes until [`AuthenticatorData::from_slice`](crate::authenticator::AuthenticatorData::from_slice)
/// parses it.
///
/// <https://w3c.github.io/webauthn/#sctn-attestation>
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    /// The attestation statement format identifier.
    pub fmt: String,

    /// The format specific attestation statement.
    pub att_stmt: Vec<(Value, Value)>,

    /// The raw authenticator data.
    pub auth_data: Bytes,
}

impl AttestationObject {
    /// Decode the envelope from its CBOR representation.
    pub fn from_slice(v: &[u8]) -> Result<Self, AttestationObjectError> {
        let value: Value =
            ciborium::de::from_reader(v).map_err(|_| AttestationObjectError::Cbor)?;
        let Value::Map(entries) = value else {
            return Err(AttestationObjectError::Cbor);
        };

        let mut fmt = None;
        let mut att_stmt = None;
        let mut auth_data = None;
        for (key, value) in entries {
            match (key.as_text(), value) {
                (Some("fmt"), Value::Text(text)) => fmt = Some(text),
                (Some("attStmt"), Value::Map(map)) => att_stmt = Some(map),
                (Some("authData"), Value::Bytes(bytes)) => auth_data = Some(bytes),
                _ => {}
            }
        }

        Ok(Self {
            fmt: fmt.ok_or(AttestationObjectError::Format)?,
            att_stmt: att_stmt.ok_or(AttestationObjectError::Statement)?,
            auth_data: auth_data.ok_or(AttestationObjectError::AuthData)?.into(),
        })
    }

    /// Encode the envelope back to CBOR.
    pub fn to_vec(&self) -> Vec<u8> {
        let value = Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text(self.fmt.clone())),
            (
                Value::Text("attStmt".into()),
                Value::Map(self.att_stmt.clone()),
            ),
            (
                Value::Text("authData".into()),
                Value::Bytes(self.auth_data.to_vec()),
            ),
        ]);
        let mut bytes = Vec::new();
        // writing into a Vec cannot fail
        let _ = ciborium::ser::into_writer(&value, &mut bytes);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip() {
        let object = AttestationObject {
            fmt: "none".into(),
            att_stmt: Vec::new(),
            auth_data: vec![1, 2, 3].into(),
        };
        let parsed = AttestationObject::from_slice(&object.to_vec()).expect("valid envelope");
        assert_eq!(parsed, object);
    }

    #[test]
    fn missing_fields_are_reported() {
        let value = Value::Map(vec![(Value::Text("fmt".into()), Value::Integer(1.into()))]);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&value, &mut bytes).unwrap();
        assert_eq!(
            AttestationObject::from_slice(&bytes),
            Err(AttestationObjectError::Format)
        );

        assert_eq!(
            AttestationObject::from_slice(&[0x01]),
            Err(AttestationObjectError::Cbor)
        );
        assert_eq!(
            AttestationObject::from_slice(&[0xff, 0x00]),
            Err(AttestationObjectError::Cbor)
        );
    }
}
