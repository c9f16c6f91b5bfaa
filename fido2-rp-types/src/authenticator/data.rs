use std::io::Cursor;

use ciborium::value::Value;

use crate::{
    authenticator::{Aaguid, Flags},
    Bytes,
};

#[cfg(test)]
mod tests;

/// Length of the fixed header: rpIdHash (32 bytes) + flags (1 byte) + counter (4 bytes).
const HEADER_LEN: usize = 37;

/// Length of the fixed part of the attested credential data: AAGUID (16 bytes) + credential ID
/// length (2 bytes).
const ATTESTED_HEADER_LEN: usize = Aaguid::LEN + 2;

/// Reasons a byte buffer is not a well formed authenticator data structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticatorDataError {
    /// Fewer bytes than the fixed 37 byte header.
    #[error("authenticator data too short: expected at least 37 bytes, got {0}")]
    TooShort(usize),

    /// The AT flag is set but the AAGUID and credential ID length do not fit.
    #[error("authenticator data truncated: attested credential data flag set but only {0} bytes remain")]
    TruncatedAttestedCredentialData(usize),

    /// The credential ID is shorter than its declared length.
    #[error("credId length mismatch: credIdLen is {expected} but only {actual} bytes remain")]
    CredentialIdLength {
        /// Declared credential ID length.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The credential public key is not a single well formed CBOR value.
    #[error("couldn't decode credential public key CBOR: {0}")]
    PublicKey(String),

    /// The extension data is not a well formed CBOR map.
    #[error("couldn't decode authenticator extensions CBOR: {0}")]
    Extensions(String),

    /// Bytes are left over after every flagged structure was read.
    #[error("authenticator data has {0} unexpected trailing bytes")]
    TrailingData(usize),
}

/// The authenticator data structure encodes contextual bindings made by the authenticator:
/// which relying party the credential is scoped to, whether the user was present or verified,
/// the signature counter, and during registration the credential itself.
///
/// The original bytes are kept alongside the parsed fields since every signature an
/// authenticator produces covers them verbatim.
///
/// <https://w3c.github.io/webauthn/#sctn-authenticator-data>
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    raw: Bytes,

    /// SHA-256 hash of the RP ID the credential is scoped to.
    rp_id_hash: [u8; 32],

    /// The flags representing the information of this credential. See [Flags] for more information.
    pub flags: Flags,

    /// Signature counter, 32-bit unsigned big-endian integer.
    pub counter: u32,

    /// Present when [`Flags::AT`] is set. See [AttestedCredentialData] for more information.
    pub attested_credential_data: Option<AttestedCredentialData>,

    /// Extension-defined authenticator data, present when [`Flags::ED`] is set. This is a CBOR
    /// map with extension identifiers as keys and authenticator extension outputs as values.
    ///
    /// The map entries are kept as the generic `Value` since `Value` does not implement `Hash`.
    pub extensions: Option<Vec<(Value, Value)>>,
}

impl AuthenticatorData {
    /// Parse authenticator data from its binary representation.
    ///
    /// Parsing is strictly positional. The credential public key is read as exactly one CBOR
    /// value, whatever follows it is treated as the extension map.
    pub fn from_slice(v: &[u8]) -> Result<Self, AuthenticatorDataError> {
        if v.len() < HEADER_LEN {
            return Err(AuthenticatorDataError::TooShort(v.len()));
        }

        let (rp_id_hash, rest) = v.split_at(32);
        let (flag_byte, rest) = rest.split_at(1);
        let (counter, mut rest) = rest.split_at(4);

        let flags = Flags::from_byte(flag_byte[0]);

        let attested_credential_data = if flags.contains(Flags::AT) {
            let (acd, remaining) = AttestedCredentialData::split_from(rest)?;
            rest = remaining;
            Some(acd)
        } else {
            None
        };

        let extensions = if flags.contains(Flags::ED) {
            let (map, consumed) = decode_one(rest).map_err(AuthenticatorDataError::Extensions)?;
            rest = &rest[consumed..];
            match map {
                Value::Map(entries) => Some(entries),
                _ => {
                    return Err(AuthenticatorDataError::Extensions(
                        "extensions are not a map".into(),
                    ))
                }
            }
        } else {
            None
        };

        if !rest.is_empty() {
            return Err(AuthenticatorDataError::TrailingData(rest.len()));
        }

        let mut hash = [0; 32];
        hash.copy_from_slice(rp_id_hash);
        let mut count = [0; 4];
        count.copy_from_slice(counter);

        Ok(AuthenticatorData {
            raw: Bytes::from(v),
            rp_id_hash: hash,
            flags,
            counter: u32::from_be_bytes(count),
            attested_credential_data,
            extensions,
        })
    }

    /// Get read access to the RP ID hash
    pub fn rp_id_hash(&self) -> &[u8] {
        &self.rp_id_hash
    }

    /// The exact bytes this structure was parsed from.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
}

/// Decode exactly one CBOR value from the start of `bytes`, returning it with the number of
/// bytes it occupied.
fn decode_one(bytes: &[u8]) -> Result<(Value, usize), String> {
    let mut reader = Cursor::new(bytes);
    let value: Value = ciborium::de::from_reader(&mut reader).map_err(|e| e.to_string())?;
    let consumed = usize::try_from(reader.position()).map_err(|e| e.to_string())?;
    Ok((value, consumed))
}

/// Attested credential data is a variable-length byte array added to the authenticator data when
/// generating an attestation object for a credential
///
/// <https://w3c.github.io/webauthn/#attested-credential-data>
#[derive(Debug, Clone, PartialEq)]
pub struct AttestedCredentialData {
    /// The AAGUID of the authenticator.
    pub aaguid: Aaguid,

    /// The credential ID. Its length always fits in a u16 since it was read after a 2 byte
    /// length prefix.
    credential_id: Bytes,

    /// The credential public key encoded as a COSE_Key, exactly as it appeared in the
    /// authenticator data.
    credential_public_key: Bytes,
}

impl AttestedCredentialData {
    fn split_from(v: &[u8]) -> Result<(Self, &[u8]), AuthenticatorDataError> {
        if v.len() < ATTESTED_HEADER_LEN {
            return Err(AuthenticatorDataError::TruncatedAttestedCredentialData(
                v.len(),
            ));
        }
        let (aaguid, rest) = v.split_at(Aaguid::LEN);
        let (cred_len, rest) = rest.split_at(2);
        let cred_len = usize::from(u16::from_be_bytes([cred_len[0], cred_len[1]]));

        if rest.len() < cred_len {
            return Err(AuthenticatorDataError::CredentialIdLength {
                expected: cred_len,
                actual: rest.len(),
            });
        }
        let (credential_id, rest) = rest.split_at(cred_len);

        let (_, consumed) = decode_one(rest).map_err(AuthenticatorDataError::PublicKey)?;
        let (credential_public_key, rest) = rest.split_at(consumed);

        let aaguid = Aaguid::from_slice(aaguid).unwrap_or_default();

        Ok((
            Self {
                aaguid,
                credential_id: Bytes::from(credential_id),
                credential_public_key: Bytes::from(credential_public_key),
            },
            rest,
        ))
    }

    /// The credential ID.
    pub fn credential_id(&self) -> &Bytes {
        &self.credential_id
    }

    /// The declared length of the credential ID.
    pub fn credential_id_len(&self) -> u16 {
        // the length was read from a u16 prefix
        u16::try_from(self.credential_id.len()).unwrap_or(u16::MAX)
    }

    /// The COSE encoded credential public key bytes.
    pub fn credential_public_key(&self) -> &Bytes {
        &self.credential_public_key
    }
}
