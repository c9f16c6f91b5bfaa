//! The validator batteries run for each ceremony.
//!
//! Every check journals the fields it examined on the [`Audit`]. After the battery,
//! [`validate_audit`] compares the journal to the fields of the parsed client data and
//! authenticator data, so a field that slipped through unchecked fails the verification.

use std::collections::BTreeSet;

use fido2_rp_types::{
    authenticator::{AttestationObject, AuthenticatorData, Flags},
    encoding,
    webauthn::{
        AuthenticatedPublicKeyCredential, AuthenticatorTransport, ClientData, ClientDataType,
        CreatedPublicKeyCredential, PublicKeyCredentialDescriptor,
    },
    Bytes,
};

use crate::{
    attestation::AttestationContext,
    audit::{Audit, Field},
    crypto::{CryptoProvider, HashAlgorithm},
    expectations::{validate_expectations, Ceremony, ExpectedFlag, Expectations},
    extensions::{ExtensionContext, ExtensionRegistry},
    keys::{is_pem, CoseAlgorithm, Key, PublicKey},
    origin::{origin_host, rp_id_host},
    result::{
        AssertionAuthnrData, AssertionResult, AttestationAuthnrData, AttestationResult,
        ClientDataResult,
    },
    Config, Error, Result, Verifier,
};


/// Log which check failed before handing the error on.
fn check<T>(name: &str, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        log::debug!("{name} validation failed: {e}");
        e
    })
}

// Request shape

pub(crate) fn validate_create_request(
    audit: &mut Audit,
    response: &CreatedPublicKeyCredential,
) -> Result<()> {
    validate_credential_ids(&response.id, &response.raw_id, &response.ty)?;
    if response.response.client_data_json.is_empty() {
        return Err(Error::type_error("expected 'clientDataJSON' to be non-empty"));
    }
    if response.response.attestation_object.is_empty() {
        return Err(Error::type_error("expected 'attestationObject' to be non-empty"));
    }
    audit.valid_request = true;
    Ok(())
}

pub(crate) fn validate_assertion_response(
    audit: &mut Audit,
    response: &AuthenticatedPublicKeyCredential,
) -> Result<()> {
    validate_credential_ids(&response.id, &response.raw_id, &response.ty)?;
    if response.response.client_data_json.is_empty() {
        return Err(Error::type_error("expected 'clientDataJSON' to be non-empty"));
    }
    if response.response.authenticator_data.is_empty() {
        return Err(Error::type_error("expected 'authenticatorData' to be non-empty"));
    }
    if response.response.signature.is_empty() {
        return Err(Error::type_error("expected 'signature' to be non-empty"));
    }
    audit.valid_request = true;
    Ok(())
}

fn validate_credential_ids(id: &str, raw_id: &Bytes, ty: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::type_error("expected 'id' to be a non-empty string"));
    }
    if raw_id.is_empty() {
        return Err(Error::type_error("expected 'rawId' to be non-empty"));
    }
    if ty != "public-key" {
        return Err(Error::type_error(format!(
            "expected credential type to be 'public-key', got: {ty}"
        )));
    }
    if Bytes::try_from(id).ok().as_ref() != Some(raw_id) {
        return Err(Error::type_error(
            "expected 'id' to be the base64url encoding of 'rawId'",
        ));
    }
    Ok(())
}

// Client data

pub(crate) fn validate_raw_client_data_json(
    audit: &mut Audit,
    client_data: &ClientDataResult,
) -> Result<()> {
    if client_data.raw_client_data_json.is_empty() {
        return Err(Error::verification("clientData clientDataJson was empty"));
    }
    audit.record(Field::RawClientDataJson);
    Ok(())
}

pub(crate) fn validate_origin(
    audit: &mut Audit,
    client_data: &ClientDataResult,
    expected: &str,
) -> Result<()> {
    if client_data.origin != expected {
        return Err(Error::verification(
            "clientData origin did not match expected origin",
        ));
    }
    audit.record(Field::Origin);
    Ok(())
}

pub(crate) fn validate_type(
    audit: &mut Audit,
    client_data: &ClientDataResult,
    ceremony: Ceremony,
) -> Result<()> {
    match (ceremony, client_data.ty) {
        (Ceremony::Attestation, ClientDataType::Create)
        | (Ceremony::Assertion, ClientDataType::Get) => {}
        (Ceremony::Attestation, other) => {
            return Err(Error::verification(format!(
                "clientData type should be 'webauthn.create', got: {other}"
            )))
        }
        (Ceremony::Assertion, _) => {
            return Err(Error::verification(
                "clientData type should be 'webauthn.get'",
            ))
        }
    }
    audit.record(Field::Type);
    Ok(())
}

pub(crate) fn validate_challenge(
    audit: &mut Audit,
    client_data: &ClientDataResult,
    expected: &str,
) -> Result<()> {
    if !encoding::is_base64url(&client_data.challenge) {
        return Err(Error::verification(
            "clientData challenge was not properly encoded base64url",
        ));
    }
    let received = encoding::to_base64url(&client_data.challenge);
    if received.is_none() || received != encoding::to_base64url(expected) {
        return Err(Error::verification("clientData challenge mismatch"));
    }
    audit.record(Field::Challenge);
    Ok(())
}

pub(crate) fn validate_token_binding(
    audit: &mut Audit,
    client_data: &ClientDataResult,
) -> Result<()> {
    if let Some(token_binding) = &client_data.token_binding {
        let serde_json::Value::Object(map) = token_binding else {
            return Err(Error::verification(format!(
                "tokenBinding must be an object, got: {token_binding}"
            )));
        };
        if map.keys().any(|key| key != "status" && key != "id") {
            return Err(Error::verification("tokenBinding had too many keys"));
        }
        match map.get("status").and_then(serde_json::Value::as_str) {
            Some("supported" | "not-supported") => {}
            status => {
                return Err(Error::verification(format!(
                    "tokenBinding status should be 'not-supported' or 'supported', got: {}",
                    status.unwrap_or_default()
                )))
            }
        }
        audit.record(Field::TokenBinding);
    }
    Ok(())
}

pub(crate) fn validate_cross_origin(
    audit: &mut Audit,
    client_data: &ClientDataResult,
    allowed: bool,
) -> Result<()> {
    if let Some(cross_origin) = client_data.cross_origin {
        if cross_origin && !allowed {
            return Err(Error::verification(
                "clientData crossOrigin was true but cross-origin requests are not allowed",
            ));
        }
        audit.record(Field::CrossOrigin);
    }
    Ok(())
}

/// Members without a validator of their own are accepted, but each one is journaled and reported
/// as a warning.
pub(crate) fn validate_client_data_members(audit: &mut Audit, client_data: &ClientDataResult) {
    for key in client_data.unknown_keys.keys() {
        audit.set_warning(
            format!("clientData-{key}"),
            "clientData member is not interpreted",
        );
        audit.record(Field::ClientDataMember(key.clone()));
    }
}

// Credential identity

/// `cred_id` is the credential ID from the attested credential data, only present on
/// registration. The allow list applies to both ceremonies.
pub(crate) fn validate_id(
    audit: &mut Audit,
    raw_id: &Bytes,
    cred_id: Option<&Bytes>,
    allow_credentials: Option<&[PublicKeyCredentialDescriptor]>,
) -> Result<()> {
    if cred_id.is_some_and(|cred_id| cred_id != raw_id) {
        return Err(Error::verification("id and credId were not the same"));
    }
    if let Some(allow) = allow_credentials {
        if !allow.iter().any(|descriptor| descriptor.id == *raw_id) {
            return Err(Error::verification(
                "Credential ID does not match any value in allowCredentials",
            ));
        }
    }
    audit.record(Field::RawId);
    Ok(())
}

// Authenticator data

pub(crate) fn validate_raw_authnr_data(audit: &mut Audit, raw: &Bytes) -> Result<()> {
    if raw.is_empty() {
        return Err(Error::verification("authnrData rawAuthnrData was empty"));
    }
    audit.record(Field::RawAuthnrData);
    Ok(())
}

pub(crate) async fn validate_rp_id_hash(
    audit: &mut Audit,
    rp_id_hash: &[u8],
    expectations: &Expectations,
    crypto: &dyn CryptoProvider,
) -> Result<()> {
    let host = match (&expectations.rp_id, &expectations.origin) {
        (Some(rp_id), _) => rp_id_host(rp_id),
        (None, Some(origin)) => origin_host(origin)?,
        (None, None) => {
            return Err(Error::type_error(
                "expectation did not contain value for 'origin'",
            ))
        }
    };
    let expected = crypto.digest(HashAlgorithm::Sha256, host.as_bytes()).await?;
    if rp_id_hash != expected.as_slice() {
        return Err(Error::verification("authnrData rpIdHash mismatch"));
    }
    audit.record(Field::RpIdHash);
    Ok(())
}

pub(crate) fn validate_flags(
    audit: &mut Audit,
    flags: Flags,
    expected: &BTreeSet<ExpectedFlag>,
) -> Result<()> {
    let up = flags.contains(Flags::UP);
    let uv = flags.contains(Flags::UV);
    let uv_without_up = || {
        Error::verification(
            "expected User Presence (UP) flag to be set if User Verification (UV) is set",
        )
    };

    for flag in expected {
        let bit = match flag {
            ExpectedFlag::UserPresentOrVerified => {
                if uv && !up {
                    return Err(uv_without_up());
                }
                if !up {
                    return Err(Error::verification(
                        "expected User Presence (UP) or User Verification (UV) flag to be set and neither was",
                    ));
                }
                continue;
            }
            ExpectedFlag::UserVerified => {
                if uv && !up {
                    return Err(uv_without_up());
                }
                Flags::UV
            }
            ExpectedFlag::UserPresent => Flags::UP,
            ExpectedFlag::AttestedCredentialData => Flags::AT,
            ExpectedFlag::ExtensionData => Flags::ED,
        };
        if !flags.contains(bit) {
            return Err(Error::verification(format!(
                "expected flag was not set: {flag}"
            )));
        }
    }
    audit.record(Field::Flags);
    Ok(())
}

pub(crate) fn validate_counter(audit: &mut Audit, counter: u32, prev_counter: u32) -> Result<()> {
    if counter == 0 && prev_counter == 0 {
        log::warn!("authenticator does not support signature counters");
        audit.set_info("counter-supported", "false");
    } else {
        audit.set_info("counter-supported", "true");
        if counter <= prev_counter {
            return Err(Error::verification("counter rollback detected"));
        }
    }
    audit.record(Field::Counter);
    Ok(())
}

pub(crate) fn validate_extensions(
    audit: &mut Audit,
    outputs: Option<&[(ciborium::value::Value, ciborium::value::Value)]>,
    registry: &ExtensionRegistry,
    ctx: &ExtensionContext,
) -> Result<()> {
    if let Some(outputs) = outputs {
        registry.validate_all(outputs, ctx, audit)?;
        audit.record(Field::WebAuthnExtensions);
    }
    Ok(())
}

// Attestation only

fn validate_aaguid(audit: &mut Audit, authnr_data: &AttestationAuthnrData) -> Result<()> {
    if authnr_data.aaguid.as_bytes().len() != 16 {
        return Err(Error::verification("authnrData AAGUID was wrong length"));
    }
    audit.record(Field::Aaguid);
    Ok(())
}

fn validate_cred_id(audit: &mut Audit, authnr_data: &AttestationAuthnrData) -> Result<()> {
    if authnr_data.cred_id.is_empty()
        || usize::from(authnr_data.cred_id_len) != authnr_data.cred_id.len()
    {
        return Err(Error::verification("authnrData credId was wrong length"));
    }
    audit.record(Field::CredIdLen);
    audit.record(Field::CredId);
    Ok(())
}

fn validate_public_key(
    audit: &mut Audit,
    authnr_data: &AttestationAuthnrData,
    key: &Key,
    config: &Config,
) -> Result<()> {
    if authnr_data.credential_public_key_cose.is_empty() {
        return Err(Error::verification(
            "authnrData credentialPublicKeyCose was empty",
        ));
    }
    if authnr_data.credential_public_key_jwk.member_count() < 2 {
        return Err(Error::verification(
            "authnrData credentialPublicKeyJwk was malformatted",
        ));
    }
    if !is_pem(&authnr_data.credential_public_key_pem) {
        return Err(Error::verification(
            "authnrData credentialPublicKeyPem was malformatted",
        ));
    }

    let alg = key
        .alg()
        .ok_or_else(|| Error::verification("credential public key does not name an algorithm"))?;
    if !config.crypto_params.contains(&alg.to_cose()) {
        return Err(Error::verification(format!(
            "credential public key algorithm {alg} is not allowed by cryptoParams"
        )));
    }

    audit.record(Field::CredentialPublicKeyCose);
    audit.record(Field::CredentialPublicKeyJwk);
    audit.record(Field::CredentialPublicKeyPem);
    Ok(())
}

fn validate_initial_counter(audit: &mut Audit) {
    // any u32 is acceptable for a new credential
    audit.record(Field::Counter);
}

fn validate_transports(audit: &mut Audit, transports: Option<&[String]>) {
    for name in transports.into_iter().flatten() {
        if name.parse::<AuthenticatorTransport>().is_err() {
            audit.set_warning(format!("transport-{name}"), "unknown transport");
        }
    }
    audit.record(Field::Transports);
}

// Assertion only

/// The signature algorithm an assertion made with `key` uses.
fn assertion_algorithm(key: &PublicKey) -> CoseAlgorithm {
    match key {
        PublicKey::P256(_) => CoseAlgorithm::Es256,
        PublicKey::P384(_) => CoseAlgorithm::Es384,
        PublicKey::Rsa(_) => CoseAlgorithm::Rs256,
        PublicKey::Ed25519(_) => CoseAlgorithm::EdDsa,
    }
}

pub(crate) async fn validate_assertion_signature(
    audit: &mut Audit,
    authnr_data: &AssertionAuthnrData,
    client_data: &ClientDataResult,
    public_key: &str,
    crypto: &dyn CryptoProvider,
) -> Result<()> {
    let key = Key::from_pem(public_key)?;
    let client_data_hash = crypto
        .digest(HashAlgorithm::Sha256, &client_data.raw_client_data_json)
        .await?;
    let mut signed = authnr_data.raw_authnr_data.to_vec();
    signed.extend_from_slice(&client_data_hash);

    let alg = assertion_algorithm(key.public_key());
    if !crypto
        .verify(key.public_key(), alg, &authnr_data.sig, &signed)
        .await?
    {
        return Err(Error::verification("assertion signature verification failed"));
    }
    audit.record(Field::Sig);
    Ok(())
}

pub(crate) fn validate_user_handle(
    audit: &mut Audit,
    user_handle: Option<&Bytes>,
    expected: Option<&str>,
) -> Result<()> {
    let received = user_handle.filter(|handle| !handle.is_empty());
    let expected = expected.filter(|handle| !handle.is_empty());
    let matches = match (received, expected) {
        (None, None) => true,
        (Some(received), Some(expected)) => {
            encoding::to_base64url(expected).as_deref() == Some(encoding::base64url(received).as_str())
        }
        _ => false,
    };
    if !matches {
        return Err(Error::verification("userHandle mismatch"));
    }
    audit.record(Field::UserHandle);
    Ok(())
}

// Audit

/// Make sure the journal covers exactly the fields of the parsed data, and that the request and
/// expectations were checked. Marks the audit complete.
pub(crate) fn validate_audit(
    audit: &mut Audit,
    client_fields: &[Field],
    authnr_fields: &[Field],
) -> Result<()> {
    if let Some(field) = client_fields
        .iter()
        .chain(authnr_fields)
        .find(|field| !audit.journal.contains(field))
    {
        return Err(Error::audit(format!("{field} was not validated")));
    }

    let expected = client_fields.len() + authnr_fields.len();
    if audit.journal.len() != expected {
        return Err(Error::audit(format!(
            "{} fields checked; expected {expected}",
            audit.journal.len()
        )));
    }

    if !audit.valid_expectations {
        return Err(Error::audit("expectations not validated"));
    }
    if !audit.valid_request {
        return Err(Error::audit("request not validated"));
    }

    audit.complete = true;
    Ok(())
}

// Ceremonies

/// Fill in the configured rpId when the caller did not name one.
fn with_default_rp_id(mut expectations: Expectations, config: &Config) -> Expectations {
    if expectations.rp_id.is_none() {
        expectations.rp_id.clone_from(&config.rp_id);
    }
    expectations
}

fn required<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| Error::type_error(format!("expectation did not contain value for '{name}'")))
}

pub(crate) async fn verify_attestation(
    verifier: &Verifier,
    response: &CreatedPublicKeyCredential,
    expectations: Expectations,
) -> Result<AttestationResult> {
    let config = &verifier.config;
    let crypto = verifier.crypto.as_ref();
    let mut audit = Audit::default();

    check("request", validate_create_request(&mut audit, response))?;

    let expectations = with_default_rp_id(expectations, config);
    check(
        "expectations",
        validate_expectations(&expectations, Ceremony::Attestation, config.challenge_size),
    )?;
    audit.valid_expectations = true;

    let client_data = ClientData::from_bytes(response.response.client_data_json.clone())?;
    let client_data = ClientDataResult::new(client_data, response.raw_id.clone());

    let object = AttestationObject::from_slice(&response.response.attestation_object)?;
    let auth_data = AuthenticatorData::from_slice(&object.auth_data)?;
    let acd = auth_data.attested_credential_data.as_ref().ok_or_else(|| {
        Error::verification("authnrData is missing attested credential data")
    })?;
    let statement = verifier
        .attestation_formats
        .parse(&object.fmt, &object.att_stmt)?;
    let credential_key = Key::from_cose(acd.credential_public_key())?;

    let authnr_data = AttestationAuthnrData {
        fmt: object.fmt.clone(),
        statement,
        raw_authnr_data: auth_data.raw().clone(),
        transports: response.response.transports.clone(),
        rp_id_hash: Bytes::from(auth_data.rp_id_hash()),
        flags: auth_data.flags,
        counter: auth_data.counter,
        aaguid: acd.aaguid,
        cred_id_len: acd.credential_id_len(),
        cred_id: acd.credential_id().clone(),
        credential_public_key_cose: acd.credential_public_key().clone(),
        credential_public_key_jwk: credential_key.to_jwk()?,
        credential_public_key_pem: credential_key.to_pem()?,
        web_authn_extensions: auth_data.extensions.clone(),
    };

    let origin = required(&expectations.origin, "origin")?;
    let challenge = required(&expectations.challenge, "challenge")?;
    let flags = required(&expectations.flags, "flags")?;
    let allow_cross_origin = expectations.allow_cross_origin.unwrap_or(false);

    check("rawClientDataJson", validate_raw_client_data_json(&mut audit, &client_data))?;
    check("origin", validate_origin(&mut audit, &client_data, origin))?;
    check("type", validate_type(&mut audit, &client_data, Ceremony::Attestation))?;
    check("challenge", validate_challenge(&mut audit, &client_data, challenge))?;
    check("tokenBinding", validate_token_binding(&mut audit, &client_data))?;
    check(
        "crossOrigin",
        validate_cross_origin(&mut audit, &client_data, allow_cross_origin),
    )?;
    validate_client_data_members(&mut audit, &client_data);
    check(
        "id",
        validate_id(
            &mut audit,
            &client_data.raw_id,
            Some(&authnr_data.cred_id),
            expectations.allow_credentials.as_deref(),
        ),
    )?;
    check("rawAuthnrData", validate_raw_authnr_data(&mut audit, &authnr_data.raw_authnr_data))?;

    let client_data_hash = crypto
        .digest(HashAlgorithm::Sha256, &client_data.raw_client_data_json)
        .await?;
    let mut ctx = AttestationContext {
        statement: &authnr_data.statement,
        auth_data: &auth_data,
        client_data_hash: &client_data_hash,
        credential_key: &credential_key,
        audit: &mut audit,
        config,
        cert_manager: &verifier.cert_manager,
        metadata: verifier.metadata.as_deref(),
        crypto,
    };
    let attestation = verifier.attestation_formats.validate(&mut ctx).await;
    check("attestation", attestation)?;

    check(
        "rpIdHash",
        validate_rp_id_hash(&mut audit, &authnr_data.rp_id_hash, &expectations, crypto).await,
    )?;
    check("aaguid", validate_aaguid(&mut audit, &authnr_data))?;
    check("credId", validate_cred_id(&mut audit, &authnr_data))?;
    check(
        "publicKey",
        validate_public_key(&mut audit, &authnr_data, &credential_key, config),
    )?;
    check("flags", validate_flags(&mut audit, authnr_data.flags, flags))?;
    validate_initial_counter(&mut audit);
    validate_transports(&mut audit, authnr_data.transports.as_deref());
    check(
        "extensions",
        validate_extensions(
            &mut audit,
            authnr_data.web_authn_extensions.as_deref(),
            &verifier.extensions,
            &ExtensionContext {
                ceremony: Ceremony::Attestation,
                flags: authnr_data.flags,
            },
        ),
    )?;

    check(
        "audit",
        validate_audit(&mut audit, &client_data.fields(), &authnr_data.fields()),
    )?;

    Ok(AttestationResult {
        audit,
        client_data,
        authnr_data,
        expectations,
    })
}

pub(crate) async fn verify_assertion(
    verifier: &Verifier,
    response: &AuthenticatedPublicKeyCredential,
    expectations: Expectations,
) -> Result<AssertionResult> {
    let config = &verifier.config;
    let crypto = verifier.crypto.as_ref();
    let mut audit = Audit::default();

    check("request", validate_assertion_response(&mut audit, response))?;

    let expectations = with_default_rp_id(expectations, config);
    check(
        "expectations",
        validate_expectations(&expectations, Ceremony::Assertion, config.challenge_size),
    )?;
    audit.valid_expectations = true;

    let client_data = ClientData::from_bytes(response.response.client_data_json.clone())?;
    let client_data = ClientDataResult::new(client_data, response.raw_id.clone());

    let auth_data = AuthenticatorData::from_slice(&response.response.authenticator_data)?;
    let authnr_data = AssertionAuthnrData {
        rp_id_hash: Bytes::from(auth_data.rp_id_hash()),
        flags: auth_data.flags,
        counter: auth_data.counter,
        sig: response.response.signature.clone(),
        user_handle: response.response.user_handle.clone(),
        raw_authnr_data: auth_data.raw().clone(),
        web_authn_extensions: auth_data.extensions.clone(),
    };

    let origin = required(&expectations.origin, "origin")?;
    let challenge = required(&expectations.challenge, "challenge")?;
    let flags = required(&expectations.flags, "flags")?;
    let allow_cross_origin = expectations.allow_cross_origin.unwrap_or(false);
    let prev_counter = *required(&expectations.prev_counter, "prevCounter")?;
    let public_key = required(&expectations.public_key, "publicKey")?;
    let user_handle = required(&expectations.user_handle, "userHandle")?;

    check("rawClientDataJson", validate_raw_client_data_json(&mut audit, &client_data))?;
    check("origin", validate_origin(&mut audit, &client_data, origin))?;
    check("type", validate_type(&mut audit, &client_data, Ceremony::Assertion))?;
    check("challenge", validate_challenge(&mut audit, &client_data, challenge))?;
    check("tokenBinding", validate_token_binding(&mut audit, &client_data))?;
    check(
        "crossOrigin",
        validate_cross_origin(&mut audit, &client_data, allow_cross_origin),
    )?;
    validate_client_data_members(&mut audit, &client_data);
    check(
        "id",
        validate_id(
            &mut audit,
            &client_data.raw_id,
            None,
            expectations.allow_credentials.as_deref(),
        ),
    )?;
    check("rawAuthnrData", validate_raw_authnr_data(&mut audit, &authnr_data.raw_authnr_data))?;
    check(
        "rpIdHash",
        validate_rp_id_hash(&mut audit, &authnr_data.rp_id_hash, &expectations, crypto).await,
    )?;
    check("flags", validate_flags(&mut audit, authnr_data.flags, flags))?;
    check("counter", validate_counter(&mut audit, authnr_data.counter, prev_counter))?;
    check(
        "signature",
        validate_assertion_signature(&mut audit, &authnr_data, &client_data, public_key, crypto)
            .await,
    )?;
    check(
        "userHandle",
        validate_user_handle(
            &mut audit,
            authnr_data.user_handle.as_ref(),
            user_handle.as_deref(),
        ),
    )?;
    check(
        "extensions",
        validate_extensions(
            &mut audit,
            authnr_data.web_authn_extensions.as_deref(),
            &verifier.extensions,
            &ExtensionContext {
                ceremony: Ceremony::Assertion,
                flags: authnr_data.flags,
            },
        ),
    )?;

    check(
        "audit",
        validate_audit(&mut audit, &client_data.fields(), &authnr_data.fields()),
    )?;

    Ok(AssertionResult {
        audit,
        client_data,
        authnr_data,
        expectations,
    })
}
