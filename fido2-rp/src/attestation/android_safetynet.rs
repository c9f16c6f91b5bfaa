use std::time::{SystemTime, UNIX_EPOCH};

use ciborium::value::Value;
use fido2_rp_types::encoding;
use serde::Deserialize;

use super::{
    wrong_statement, AttestationContext, AttestationFormat, AttestationStatement, StatementMap,
};
use crate::{
    audit::Field,
    certs::{AltName, Certificate, ExtensionValue},
    crypto::HashAlgorithm,
    keys::{CoseAlgorithm, Jwk, Key},
    AttestationTrust, Error, Result,
};

const FMT: &str = "android-safetynet";

/// Host name the SafetyNet attestation certificate is issued to.
const ATTEST_HOSTNAME: &str = "attest.android.com";

/// Statement of the `android-safetynet` format.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyNetStatement {
    /// Version of Google Play Services that produced the response.
    pub ver: String,
    /// The SafetyNet API response, a compact JWS.
    pub response: String,
}

/// The `android-safetynet` format produced by Android devices through the SafetyNet API.
///
/// <https://w3c.github.io/webauthn/#sctn-android-safetynet-attestation>
#[derive(Debug, Default, Clone, Copy)]
pub struct AndroidSafetyNet;

#[derive(Debug, Deserialize)]
struct JwsHeader {
    alg: String,
    #[serde(default)]
    x5c: Vec<String>,
    #[serde(default)]
    jwk: Option<Jwk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafetyNetPayload {
    nonce: String,
    timestamp_ms: i64,
    #[serde(default)]
    cts_profile_match: bool,
}

/// A compact JWS split into its decoded parts.
struct Jws<'a> {
    header: JwsHeader,
    payload: SafetyNetPayload,
    signing_input: &'a str,
    signature: Vec<u8>,
}

impl<'a> Jws<'a> {
    fn parse(response: &'a str) -> Result<Self> {
        let malformed = || Error::format("android-safetynet: response is not a compact JWS");

        let (signing_input, signature) = response.rsplit_once('.').ok_or_else(malformed)?;
        let (header, payload) = signing_input.split_once('.').ok_or_else(malformed)?;

        let decode = |part: &str| encoding::try_from_base64url(part).ok_or_else(malformed);
        let header: JwsHeader = serde_json::from_slice(&decode(header)?).map_err(|e| {
            Error::format(format!("android-safetynet: invalid JWS header: {e}"))
        })?;
        let payload: SafetyNetPayload = serde_json::from_slice(&decode(payload)?).map_err(|e| {
            Error::format(format!("android-safetynet: invalid JWS payload: {e}"))
        })?;

        Ok(Self {
            header,
            payload,
            signing_input,
            signature: decode(signature)?,
        })
    }
}

/// JWS carries ECDSA signatures as `r ‖ s`; the crypto capability expects DER.
fn jose_to_der(alg: CoseAlgorithm, signature: Vec<u8>) -> Result<Vec<u8>> {
    if alg != CoseAlgorithm::Es256 {
        return Ok(signature);
    }
    let signature = p256::ecdsa::Signature::from_slice(&signature)
        .map_err(|_| Error::format("android-safetynet: malformed ES256 signature"))?;
    Ok(signature.to_der().as_bytes().to_vec())
}

fn is_attest_host(cert: &Certificate) -> bool {
    let cn_matches = cert
        .subject()
        .get("common-name")
        .is_some_and(|cn| cn == ATTEST_HOSTNAME);
    let san_matches = matches!(
        cert.extension("subject-alt-name").map(|ext| &ext.value),
        Some(ExtensionValue::SubjectAltName(names))
            if names.iter().any(|name| matches!(name, AltName::Dns(dns) if dns == ATTEST_HOSTNAME))
    );
    cn_matches || san_matches
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl AttestationFormat for AndroidSafetyNet {
    fn fmt(&self) -> &str {
        FMT
    }

    fn parse(&self, att_stmt: &[(Value, Value)]) -> Result<AttestationStatement> {
        let map = StatementMap::new(FMT, att_stmt, &["ver", "response"])?;
        let response = String::from_utf8(map.bytes("response")?.into())
            .map_err(|_| Error::format("android-safetynet: response is not UTF-8"))?;
        Ok(AttestationStatement::AndroidSafetyNet(SafetyNetStatement {
            ver: map.text("ver")?,
            response,
        }))
    }

    async fn validate(&self, ctx: &mut AttestationContext<'_>) -> Result<()> {
        let statement = ctx.statement;
        let AttestationStatement::AndroidSafetyNet(stmt) = statement else {
            return Err(wrong_statement(FMT));
        };
        ctx.audit.record(Field::Ver);

        let jws = Jws::parse(&stmt.response)?;
        let alg = match CoseAlgorithm::from_name(&jws.header.alg) {
            Some(alg @ (CoseAlgorithm::Rs256 | CoseAlgorithm::Es256)) => alg,
            _ => {
                return Err(Error::verification(format!(
                    "android-safetynet: unsupported JWS algorithm: {}",
                    jws.header.alg
                )))
            }
        };

        let chain = jws
            .header
            .x5c
            .iter()
            .map(|cert| Certificate::try_from(cert.as_str()))
            .collect::<Result<Vec<_>>>()?;
        let signing_key = match (chain.first(), &jws.header.jwk) {
            (Some(leaf), _) => {
                if !is_attest_host(leaf) {
                    return Err(Error::verification(
                        "android-safetynet: attestation certificate is not issued to attest.android.com",
                    ));
                }
                leaf.public_key()?
            }
            (None, Some(jwk)) => Key::from_jwk(jwk.clone())?,
            (None, None) => {
                return Err(Error::format(
                    "android-safetynet: JWS header has neither 'x5c' nor 'jwk'",
                ))
            }
        };

        let signature = jose_to_der(alg, jws.signature)?;
        ctx.verify_signature(
            FMT,
            signing_key.public_key(),
            alg,
            &signature,
            jws.signing_input.as_bytes(),
        )
        .await?;

        let expected_nonce = encoding::base64_padded(
            &ctx.crypto
                .digest(HashAlgorithm::Sha256, &ctx.signed_data())
                .await?,
        );
        if jws.payload.nonce != expected_nonce {
            return Err(Error::verification("android-safetynet: nonce mismatch"));
        }

        if !jws.payload.cts_profile_match {
            return Err(Error::verification(
                "android-safetynet: ctsProfileMatch is not true",
            ));
        }

        let now = now_ms();
        let max_age = i64::try_from(ctx.config.timeout).unwrap_or(i64::MAX);
        if jws.payload.timestamp_ms > now {
            return Err(Error::verification(
                "android-safetynet: attestation timestamp is in the future",
            ));
        }
        if now.saturating_sub(jws.payload.timestamp_ms) > max_age {
            return Err(Error::verification("android-safetynet: attestation is too old"));
        }

        if chain.is_empty() {
            if ctx.config.attestation_trust == AttestationTrust::Required {
                return Err(Error::verification(
                    "no trusted root certificate found for chain",
                ));
            }
            ctx.audit
                .set_warning("attestation-trust", "JWS signed by an embedded key without a chain");
        } else {
            ctx.verify_trust(&chain).await?;
        }
        ctx.audit.record(Field::Response);

        ctx.audit.set_info("attestation-type", "basic");
        Ok(())
    }
}
