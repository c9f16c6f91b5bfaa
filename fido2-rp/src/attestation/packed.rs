use ciborium::value::Value;
use fido2_rp_types::Bytes;

use super::{
    wrong_statement, AttestationContext, AttestationFormat, AttestationStatement, StatementMap,
};
use crate::{audit::Field, certs::Certificate, keys::CoseAlgorithm, Error, Result};

const FMT: &str = "packed";

/// Statement of the `packed` format.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedStatement {
    /// Algorithm of the signature.
    pub alg: CoseAlgorithm,
    /// Signature over `authenticatorData ‖ clientDataHash`.
    pub sig: Bytes,
    /// Attestation certificate and its chain. Absent for self attestation.
    pub x5c: Option<Vec<Certificate>>,
}

/// The `packed` format, the WebAuthn optimized attestation most FIDO2 authenticators use.
///
/// <https://w3c.github.io/webauthn/#sctn-packed-attestation>
#[derive(Debug, Default, Clone, Copy)]
pub struct Packed;

/// Requirements on the attestation certificate.
///
/// <https://w3c.github.io/webauthn/#sctn-packed-attestation-cert-requirements>
fn check_certificate(cert: &Certificate) -> Result<()> {
    let fail = |msg: &str| Err(Error::verification(format!("packed: {msg}")));

    if cert.version() != 3 {
        return fail("attestation certificate must be version 3");
    }

    let subject = cert.subject();
    let attribute = |name: &str| subject.get(name).map(String::as_str).unwrap_or_default();
    if attribute("country-name").len() != 2 {
        return fail("attestation certificate subject must contain a two letter country (C)");
    }
    if attribute("organization-name").is_empty() {
        return fail("attestation certificate subject must contain an organization (O)");
    }
    if attribute("organizational-unit-name") != "Authenticator Attestation" {
        return fail("attestation certificate OU must be 'Authenticator Attestation'");
    }
    if attribute("common-name").is_empty() {
        return fail("attestation certificate subject must contain a common name (CN)");
    }

    if cert.is_ca() {
        return fail("attestation certificate must not be a CA");
    }
    Ok(())
}

#[async_trait::async_trait]
impl AttestationFormat for Packed {
    fn fmt(&self) -> &str {
        FMT
    }

    fn parse(&self, att_stmt: &[(Value, Value)]) -> Result<AttestationStatement> {
        let map = StatementMap::new(FMT, att_stmt, &["alg", "sig", "x5c", "ecdaaKeyId"])?;
        if map.contains("ecdaaKeyId") {
            return Err(Error::format("packed: ECDAA attestation is not supported"));
        }
        Ok(AttestationStatement::Packed(PackedStatement {
            alg: map.alg()?,
            sig: map.bytes("sig")?,
            x5c: map.x5c()?,
        }))
    }

    async fn validate(&self, ctx: &mut AttestationContext<'_>) -> Result<()> {
        let statement = ctx.statement;
        let AttestationStatement::Packed(stmt) = statement else {
            return Err(wrong_statement(FMT));
        };
        let signed_data = ctx.signed_data();

        match &stmt.x5c {
            Some(x5c) => {
                let cert = x5c
                    .first()
                    .ok_or_else(|| Error::format("packed: missing attestation certificate"))?;
                check_certificate(cert)?;
                ctx.check_aaguid_extension(FMT, cert)?;

                let cert_key = cert.public_key()?;
                ctx.verify_signature(FMT, cert_key.public_key(), stmt.alg, &stmt.sig, &signed_data)
                    .await?;
                ctx.audit.record(Field::Alg);
                ctx.audit.record(Field::Sig);

                ctx.verify_trust(x5c).await?;
                ctx.audit.record(Field::X5c);
                ctx.audit.set_info("attestation-type", "basic");
            }
            None => {
                if ctx.credential_key.alg() != Some(stmt.alg) {
                    return Err(Error::verification(
                        "packed: self attestation alg does not match credential alg",
                    ));
                }
                ctx.audit.record(Field::Alg);

                ctx.verify_signature(
                    FMT,
                    ctx.credential_key.public_key(),
                    stmt.alg,
                    &stmt.sig,
                    &signed_data,
                )
                .await?;
                ctx.audit.record(Field::Sig);
                ctx.audit.set_info("attestation-type", "self");
            }
        }
        Ok(())
    }
}
