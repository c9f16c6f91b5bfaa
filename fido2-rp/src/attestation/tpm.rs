use ciborium::value::Value;
use fido2_rp_types::Bytes;
use rsa::{traits::PublicKeyParts, BigUint};

use super::{
    wrong_statement, AttestationContext, AttestationFormat, AttestationStatement, StatementMap,
};
use crate::{
    audit::Field,
    certs::{AltName, Certificate, ExtensionValue},
    crypto::HashAlgorithm,
    keys::{CoseAlgorithm, PublicKey},
    Error, Result,
};

const FMT: &str = "tpm";

/// `TPM_GENERATED_VALUE`, 0xFF followed by "TCG".
const TPM_GENERATED_VALUE: u32 = 0xff54_4347;
const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;

const TPM_ALG_RSA: u16 = 0x0001;
const TPM_ALG_ECC: u16 = 0x0023;

const TPM_ECC_NIST_P256: u16 = 0x0003;
const TPM_ECC_NIST_P384: u16 = 0x0004;

/// RSA public exponent used when `exponent` is zero in the public area.
const DEFAULT_RSA_EXPONENT: u32 = 65537;

/// Size of `TPMS_CLOCK_INFO`: clock (8), resetCount (4), restartCount (4), safe (1).
const CLOCK_INFO_LEN: usize = 17;

/// Statement of the `tpm` format.
#[derive(Debug, Clone, PartialEq)]
pub struct TpmStatement {
    /// Version of the TPM specification, always `2.0`.
    pub ver: String,
    /// Algorithm of the signature over `certInfo`.
    pub alg: CoseAlgorithm,
    /// Signature over `certInfo` by the attestation identity key.
    pub sig: Bytes,
    /// AIK certificate followed by its chain.
    pub x5c: Vec<Certificate>,
    /// `TPMS_ATTEST` structure that was signed.
    pub cert_info: Bytes,
    /// `TPMT_PUBLIC` structure describing the credential public key.
    pub pub_area: Bytes,
}

/// The `tpm` format produced by platform authenticators backed by a TPM 2.0.
///
/// <https://w3c.github.io/webauthn/#sctn-tpm-attestation>
#[derive(Debug, Default, Clone, Copy)]
pub struct Tpm;

/// Hash algorithm for a `TPM_ALG_ID`.
fn name_alg(id: u16) -> Option<HashAlgorithm> {
    match id {
        0x0004 => Some(HashAlgorithm::Sha1),
        0x000B => Some(HashAlgorithm::Sha256),
        0x000C => Some(HashAlgorithm::Sha384),
        0x000D => Some(HashAlgorithm::Sha512),
        _ => None,
    }
}

fn malformed(structure: &str) -> Error {
    Error::format(format!("tpm: {structure} is malformed"))
}

/// Big endian cursor over a TPM structure.
struct Reader<'a> {
    structure: &'static str,
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(structure: &'static str, data: &'a [u8]) -> Self {
        Self { structure, data }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.data.len() < len {
            return Err(malformed(self.structure));
        }
        let (head, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(head)
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// A `TPM2B` buffer: two byte length followed by that many bytes.
    fn sized(&mut self) -> Result<&'a [u8]> {
        let len = self.u16()?;
        self.take(usize::from(len))
    }

    fn finish(self) -> Result<()> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(Error::format(format!(
                "tpm: {} has {} trailing bytes",
                self.structure,
                self.data.len()
            )))
        }
    }
}

/// The `unique` member of a public area: the public key itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TpmPublicKey {
    Rsa { exponent: u32, modulus: Vec<u8> },
    Ecc { curve_id: u16, x: Vec<u8>, y: Vec<u8> },
}

/// A decoded `TPMT_PUBLIC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PubArea {
    pub(crate) name_alg: u16,
    pub(crate) key: TpmPublicKey,
}

impl PubArea {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new("pubArea", bytes);
        let ty = reader.u16()?;
        let name_alg = reader.u16()?;
        let _object_attributes = reader.u32()?;
        let _auth_policy = reader.sized()?;

        let key = match ty {
            TPM_ALG_RSA => {
                let _symmetric = reader.u16()?;
                let _scheme = reader.u16()?;
                let _key_bits = reader.u16()?;
                let exponent = reader.u32()?;
                let modulus = reader.sized()?.to_vec();
                TpmPublicKey::Rsa { exponent, modulus }
            }
            TPM_ALG_ECC => {
                let _symmetric = reader.u16()?;
                let _scheme = reader.u16()?;
                let curve_id = reader.u16()?;
                let _kdf = reader.u16()?;
                let x = reader.sized()?.to_vec();
                let y = reader.sized()?.to_vec();
                TpmPublicKey::Ecc { curve_id, x, y }
            }
            other => {
                return Err(Error::format(format!(
                    "tpm: unsupported pubArea type: {other:#06x}"
                )))
            }
        };
        reader.finish()?;

        Ok(Self { name_alg, key })
    }

    /// Whether the key in this area is `key`.
    fn matches(&self, key: &PublicKey) -> bool {
        match (&self.key, key) {
            (TpmPublicKey::Rsa { exponent, modulus }, PublicKey::Rsa(key)) => {
                let exponent = if *exponent == 0 {
                    DEFAULT_RSA_EXPONENT
                } else {
                    *exponent
                };
                key.n().to_bytes_be() == *modulus && *key.e() == BigUint::from(exponent)
            }
            (TpmPublicKey::Ecc { curve_id, x, y }, PublicKey::P256(_) | PublicKey::P384(_)) => {
                let expected_curve = match key {
                    PublicKey::P256(_) => TPM_ECC_NIST_P256,
                    _ => TPM_ECC_NIST_P384,
                };
                let point: Vec<u8> = std::iter::once(0x04)
                    .chain(x.iter().copied())
                    .chain(y.iter().copied())
                    .collect();
                *curve_id == expected_curve && key.sec1_uncompressed() == Some(point)
            }
            _ => false,
        }
    }
}

/// A decoded `TPMS_ATTEST` of type `TPM_ST_ATTEST_CERTIFY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CertInfo {
    pub(crate) extra_data: Vec<u8>,
    pub(crate) attested_name: Vec<u8>,
}

impl CertInfo {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new("certInfo", bytes);
        if reader.u32()? != TPM_GENERATED_VALUE {
            return Err(Error::verification("tpm: certInfo magic is not TPM_GENERATED_VALUE"));
        }
        if reader.u16()? != TPM_ST_ATTEST_CERTIFY {
            return Err(Error::verification("tpm: certInfo type is not TPM_ST_ATTEST_CERTIFY"));
        }
        let _qualified_signer = reader.sized()?;
        let extra_data = reader.sized()?.to_vec();
        let _clock_info = reader.take(CLOCK_INFO_LEN)?;
        let _firmware_version = reader.take(8)?;
        let attested_name = reader.sized()?.to_vec();
        let _attested_qualified_name = reader.sized()?;
        reader.finish()?;

        Ok(Self {
            extra_data,
            attested_name,
        })
    }
}

/// Requirements on the AIK certificate.
///
/// <https://w3c.github.io/webauthn/#sctn-tpm-cert-requirements>
fn check_aik_certificate(cert: &Certificate) -> Result<()> {
    let fail = |msg: &str| Err(Error::verification(format!("tpm: {msg}")));

    if cert.version() != 3 {
        return fail("AIK certificate must be version 3");
    }
    if !cert.subject().is_empty() {
        return fail("AIK certificate subject must be empty");
    }

    let has_tpm_name = match cert.extension("subject-alt-name").map(|ext| &ext.value) {
        Some(ExtensionValue::SubjectAltName(names)) => names.iter().any(|name| {
            matches!(name, AltName::Directory(dn)
                if ["tcg-at-tpm-manufacturer", "tcg-at-tpm-model", "tcg-at-tpm-version"]
                    .iter()
                    .all(|attr| dn.contains_key(*attr)))
        }),
        _ => false,
    };
    if !has_tpm_name {
        return fail(
            "AIK certificate subject alternative name must contain TPM manufacturer, model and version",
        );
    }

    let is_aik = matches!(
        cert.extension("ext-key-usage").map(|ext| &ext.value),
        Some(ExtensionValue::ExtKeyUsage(usages))
            if usages.iter().any(|usage| usage == "tcg-kp-aik-certificate")
    );
    if !is_aik {
        return fail("AIK certificate extended key usage must contain tcg-kp-aik-certificate");
    }

    if cert.is_ca() {
        return fail("AIK certificate must not be a CA");
    }
    Ok(())
}

#[async_trait::async_trait]
impl AttestationFormat for Tpm {
    fn fmt(&self) -> &str {
        FMT
    }

    fn parse(&self, att_stmt: &[(Value, Value)]) -> Result<AttestationStatement> {
        let map = StatementMap::new(
            FMT,
            att_stmt,
            &["ver", "alg", "x5c", "sig", "certInfo", "pubArea", "ecdaaKeyId"],
        )?;
        if map.contains("ecdaaKeyId") {
            return Err(Error::format("tpm: ECDAA attestation is not supported"));
        }
        let x5c = map
            .x5c()?
            .ok_or_else(|| Error::format("tpm: expected attStmt 'x5c' to be present"))?;
        Ok(AttestationStatement::Tpm(TpmStatement {
            ver: map.text("ver")?,
            alg: map.alg()?,
            sig: map.bytes("sig")?,
            x5c,
            cert_info: map.bytes("certInfo")?,
            pub_area: map.bytes("pubArea")?,
        }))
    }

    async fn validate(&self, ctx: &mut AttestationContext<'_>) -> Result<()> {
        let statement = ctx.statement;
        let AttestationStatement::Tpm(stmt) = statement else {
            return Err(wrong_statement(FMT));
        };

        if stmt.ver != "2.0" {
            return Err(Error::verification(format!(
                "tpm: expected version 2.0, got: {}",
                stmt.ver
            )));
        }
        ctx.audit.record(Field::Ver);

        let pub_area = PubArea::parse(&stmt.pub_area)?;
        if !pub_area.matches(ctx.credential_key.public_key()) {
            return Err(Error::verification(
                "tpm: pubArea key does not match credential public key",
            ));
        }

        let cert_info = CertInfo::parse(&stmt.cert_info)?;

        let hash = stmt
            .alg
            .hash()
            .ok_or_else(|| Error::verification(format!("tpm: unsupported algorithm: {}", stmt.alg)))?;
        let att_to_be_signed = ctx.crypto.digest(hash, &ctx.signed_data()).await?;
        if cert_info.extra_data != att_to_be_signed {
            return Err(Error::verification(
                "tpm: certInfo extraData does not match the hash of authData and clientDataHash",
            ));
        }

        let (name_alg_id, name_digest) = match cert_info.attested_name.as_slice() {
            [hi, lo, digest @ ..] => (u16::from_be_bytes([*hi, *lo]), digest),
            _ => return Err(malformed("certInfo attested name")),
        };
        if name_alg_id != pub_area.name_alg {
            return Err(Error::verification(
                "tpm: attested name algorithm does not match pubArea nameAlg",
            ));
        }
        let name_hash = name_alg(name_alg_id).ok_or_else(|| {
            Error::verification(format!("tpm: unsupported name algorithm: {name_alg_id:#06x}"))
        })?;
        if ctx.crypto.digest(name_hash, &stmt.pub_area).await? != name_digest {
            return Err(Error::verification(
                "tpm: attested name does not match the hash of pubArea",
            ));
        }
        ctx.audit.record(Field::PubArea);

        let aik = stmt
            .x5c
            .first()
            .ok_or_else(|| Error::format("tpm: missing AIK certificate"))?;
        check_aik_certificate(aik)?;
        ctx.check_aaguid_extension(FMT, aik)?;

        let aik_key = aik.public_key()?;
        ctx.verify_signature(FMT, aik_key.public_key(), stmt.alg, &stmt.sig, &stmt.cert_info)
            .await?;
        ctx.audit.record(Field::Alg);
        ctx.audit.record(Field::Sig);
        ctx.audit.record(Field::CertInfo);

        ctx.verify_trust(&stmt.x5c).await?;
        ctx.audit.record(Field::X5c);

        ctx.audit.set_info("attestation-type", "AttCA");
        Ok(())
    }
}
