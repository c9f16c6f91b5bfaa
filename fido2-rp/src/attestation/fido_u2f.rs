use ciborium::value::Value;
use fido2_rp_types::Bytes;

use super::{
    wrong_statement, AttestationContext, AttestationFormat, AttestationStatement, StatementMap,
};
use crate::{
    audit::Field,
    certs::Certificate,
    keys::{CoseAlgorithm, PublicKey},
    Error, Result,
};

const FMT: &str = "fido-u2f";

/// Statement of the `fido-u2f` format.
#[derive(Debug, Clone, PartialEq)]
pub struct FidoU2fStatement {
    /// Raw ECDSA signature.
    pub sig: Bytes,
    /// The attestation certificate, always exactly one.
    pub x5c: Vec<Certificate>,
}

/// The `fido-u2f` format used by authenticators that only speak U2F.
///
/// <https://w3c.github.io/webauthn/#sctn-fido-u2f-attestation>
#[derive(Debug, Default, Clone, Copy)]
pub struct FidoU2f;

#[async_trait::async_trait]
impl AttestationFormat for FidoU2f {
    fn fmt(&self) -> &str {
        FMT
    }

    fn parse(&self, att_stmt: &[(Value, Value)]) -> Result<AttestationStatement> {
        let map = StatementMap::new(FMT, att_stmt, &["sig", "x5c"])?;
        let sig = map.bytes("sig")?;
        let x5c = map.x5c()?.unwrap_or_default();
        if x5c.len() != 1 {
            return Err(Error::format(
                "fido-u2f: expected 'x5c' to contain exactly one certificate",
            ));
        }
        Ok(AttestationStatement::FidoU2f(FidoU2fStatement { sig, x5c }))
    }

    async fn validate(&self, ctx: &mut AttestationContext<'_>) -> Result<()> {
        let statement = ctx.statement;
        let AttestationStatement::FidoU2f(stmt) = statement else {
            return Err(wrong_statement(FMT));
        };

        // U2F only knows P-256 keys, sent as raw uncompressed points
        let credential_point = match ctx.credential_key.public_key() {
            key @ PublicKey::P256(_) => key.sec1_uncompressed(),
            _ => None,
        }
        .ok_or_else(|| {
            Error::verification("fido-u2f: credential public key must be an EC P-256 key")
        })?;

        let acd = ctx.attested_credential()?;
        let mut verification_data = vec![0x00];
        verification_data.extend_from_slice(ctx.auth_data.rp_id_hash());
        verification_data.extend_from_slice(ctx.client_data_hash);
        verification_data.extend_from_slice(acd.credential_id());
        verification_data.extend_from_slice(&credential_point);

        let cert = stmt
            .x5c
            .first()
            .ok_or_else(|| Error::format("fido-u2f: missing attestation certificate"))?;
        let cert_key = cert.public_key()?;
        if !matches!(cert_key.public_key(), PublicKey::P256(_)) {
            return Err(Error::verification(
                "fido-u2f: attestation certificate key must be an EC P-256 key",
            ));
        }

        ctx.verify_signature(
            FMT,
            cert_key.public_key(),
            CoseAlgorithm::Es256,
            &stmt.sig,
            &verification_data,
        )
        .await?;
        ctx.audit.record(Field::Sig);

        ctx.verify_trust(&stmt.x5c).await?;
        ctx.audit.record(Field::X5c);

        ctx.audit.set_info("attestation-type", "basic");
        Ok(())
    }
}
