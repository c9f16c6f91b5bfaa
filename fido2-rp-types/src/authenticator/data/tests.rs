use super::*;
use crate::{crypto::sha256, encoding};

/// authData of a "none" attestation produced by a platform authenticator for `localhost`.
const NONE_AUTH_DATA: &str = "SZYN5YgOjGh0NBcPZHZgW4_krrmihjLHmVzzuoMdl2NBAAAAAAAAAAAAAAAAAAAAAAAAAAAAogAIot1erBqGqM1u02zWmJSWieW6_E6wX0V56H2TupdrLnN2ubbf1xbhZBQP-Xmm1PNEtT1tJuCGe_QUtpEDu2XLstr39BEoNfBkyxtZqOWEpCHai9ieOHoLfuq3I-zXnUhMMWv7rsVGAbRzZ0kKg5raFAHzPS0li5euQYylWTRlKfWqN95jEnVX0ENGx83uvSVULywX_Dk4mVKibDripqalHKUBAgMmIAEhWCC7Ec3dbp6GnRVZcpow2J7UnzYxUkIVlhJxq7vijXtzHyJYINvWORMuLuVhlluDBTCmoCTxCYiI8xNVBRWSEYTIasrD";

fn header(flags: u8, counter: u32) -> Vec<u8> {
    sha256(b"localhost")
        .into_iter()
        .chain(std::iter::once(flags))
        .chain(counter.to_be_bytes())
        .collect()
}

#[test]
fn parses_attested_credential_data() {
    let bytes = encoding::try_from_base64url(NONE_AUTH_DATA).unwrap();
    let auth_data = AuthenticatorData::from_slice(&bytes).expect("valid authenticator data");

    assert_eq!(auth_data.rp_id_hash(), sha256(b"localhost"));
    assert_eq!(auth_data.flags, Flags::UP | Flags::AT);
    assert_eq!(auth_data.counter, 0);
    assert_eq!(auth_data.raw().len(), 294);
    assert_eq!(auth_data.extensions, None);

    let acd = auth_data.attested_credential_data.expect("AT flag is set");
    assert!(acd.aaguid.is_empty());
    assert_eq!(acd.credential_id_len(), 162);
    assert_eq!(acd.credential_id()[..6], [0x00, 0x08, 0xa2, 0xdd, 0x5e, 0xac]);
    assert_eq!(acd.credential_public_key().len(), 77);
    assert_eq!(acd.credential_public_key()[0], 0xa5);
}

#[test]
fn parses_assertion_header() {
    let bytes = header(0x01, 363);
    let auth_data = AuthenticatorData::from_slice(&bytes).expect("valid authenticator data");
    assert_eq!(auth_data.flags, Flags::UP);
    assert_eq!(auth_data.counter, 363);
    assert!(auth_data.attested_credential_data.is_none());
}

#[test]
fn rejects_short_input() {
    let bytes = header(0x01, 1);
    assert_eq!(
        AuthenticatorData::from_slice(&bytes[..36]),
        Err(AuthenticatorDataError::TooShort(36))
    );
}

#[test]
fn rejects_truncated_attested_credential_data() {
    let mut bytes = header(0x41, 0);
    bytes.extend_from_slice(&[0; 10]);
    assert_eq!(
        AuthenticatorData::from_slice(&bytes),
        Err(AuthenticatorDataError::TruncatedAttestedCredentialData(10))
    );
}

#[test]
fn credential_id_length_must_match() {
    let mut bytes = header(0x41, 0);
    bytes.extend_from_slice(&[0; 16]);
    bytes.extend_from_slice(&100_u16.to_be_bytes());
    bytes.extend_from_slice(&[7; 10]);
    assert_eq!(
        AuthenticatorData::from_slice(&bytes),
        Err(AuthenticatorDataError::CredentialIdLength {
            expected: 100,
            actual: 10
        })
    );
}

#[test]
fn malformed_public_key_is_a_parse_error() {
    let mut bytes = header(0x41, 0);
    bytes.extend_from_slice(&[0; 16]);
    bytes.extend_from_slice(&2_u16.to_be_bytes());
    bytes.extend_from_slice(&[1, 2]);
    bytes.push(0x1c);
    assert!(matches!(
        AuthenticatorData::from_slice(&bytes),
        Err(AuthenticatorDataError::PublicKey(_))
    ));
}

#[test]
fn extensions_follow_the_public_key() {
    let bytes = encoding::try_from_base64url(NONE_AUTH_DATA).unwrap();
    let mut bytes = bytes;
    bytes[32] |= 0x80;
    // {"credProtect": 2}
    bytes.extend_from_slice(&[0xa1, 0x6b]);
    bytes.extend_from_slice(b"credProtect");
    bytes.push(0x02);

    let auth_data = AuthenticatorData::from_slice(&bytes).expect("valid authenticator data");
    let extensions = auth_data.extensions.expect("ED flag is set");
    assert_eq!(
        extensions,
        vec![(Value::Text("credProtect".into()), Value::Integer(2.into()))]
    );
    assert_eq!(
        auth_data
            .attested_credential_data
            .unwrap()
            .credential_public_key()
            .len(),
        77
    );
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = header(0x01, 0);
    bytes.extend_from_slice(&[0xa0]);
    assert_eq!(
        AuthenticatorData::from_slice(&bytes),
        Err(AuthenticatorDataError::TrailingData(1))
    );
}
