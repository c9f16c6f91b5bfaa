use std::time::{SystemTime, UNIX_EPOCH};

use coset::{iana, CborSerializable, CoseKeyBuilder};
use fido2_rp_types::{crypto::sha256, encoding};
use p256::{
    ecdsa::{signature::Signer, Signature, SigningKey},
    elliptic_curve::sec1::ToEncodedPoint,
    pkcs8::DecodePrivateKey,
};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

use super::*;
use crate::{certs::fixtures::*, crypto::RustCrypto, mds::MockMetadataLookup};

const CRED_ID: [u8; 16] = [0x11; 16];

fn text(key: &str) -> Value {
    Value::Text(key.into())
}

fn cert(pem: &str) -> Certificate {
    Certificate::from_pem(pem).expect("valid fixture certificate")
}

fn x5c(pems: &[&str]) -> Value {
    Value::Array(
        pems.iter()
            .map(|pem| Value::Bytes(cert(pem).der().to_vec()))
            .collect(),
    )
}

fn es256(key: &SigningKey, data: &[u8]) -> Vec<u8> {
    let signature: Signature = key.sign(data);
    signature.to_der().as_bytes().to_vec()
}

fn rs256(data: &[u8]) -> Vec<u8> {
    let key = RsaPrivateKey::from_pkcs8_pem(RSA_LEAF_KEY).expect("fixture RSA key");
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(data))
        .expect("RSA signature")
}

fn leaf_key() -> SigningKey {
    SigningKey::from_pkcs8_pem(ATTESTATION_LEAF_KEY).expect("fixture P-256 key")
}

/// A freshly generated P-256 credential inside authenticator data for `localhost`.
struct Setup {
    signer: SigningKey,
    point: Vec<u8>,
    credential_key: Key,
    auth_data: AuthenticatorData,
    client_data_hash: Vec<u8>,
    config: Config,
    cert_manager: CertManager,
}

impl Setup {
    fn new() -> Self {
        let signer = SigningKey::random(&mut rand::thread_rng());
        let point = p256::PublicKey::from(signer.verifying_key()).to_encoded_point(false);
        let cose = CoseKeyBuilder::new_ec2_pub_key(
            iana::EllipticCurve::P_256,
            point.x().unwrap().to_vec(),
            point.y().unwrap().to_vec(),
        )
        .algorithm(iana::Algorithm::ES256)
        .build()
        .to_vec()
        .unwrap();

        let mut raw = sha256(b"localhost").to_vec();
        raw.push(0x45);
        raw.extend_from_slice(&[0, 0, 0, 0]);
        raw.extend_from_slice(&AAGUID);
        raw.extend_from_slice(&[0x00, 0x10]);
        raw.extend_from_slice(&CRED_ID);
        raw.extend_from_slice(&cose);

        Self {
            point: point.as_bytes().to_vec(),
            credential_key: Key::from_cose(&cose).unwrap(),
            auth_data: AuthenticatorData::from_slice(&raw).unwrap(),
            client_data_hash: sha256(b"{\"type\":\"webauthn.create\"}").to_vec(),
            config: Config::default(),
            cert_manager: CertManager::new(),
            signer,
        }
    }

    fn signed_data(&self) -> Vec<u8> {
        let mut data = self.auth_data.raw().to_vec();
        data.extend_from_slice(&self.client_data_hash);
        data
    }

    async fn run_with(
        &self,
        registry: &AttestationRegistry,
        fmt: &str,
        att_stmt: &[(Value, Value)],
        metadata: Option<&dyn MetadataLookup>,
    ) -> Result<Audit> {
        let statement = registry.parse(fmt, att_stmt)?;
        let mut audit = Audit::default();
        let mut ctx = AttestationContext {
            statement: &statement,
            auth_data: &self.auth_data,
            client_data_hash: &self.client_data_hash,
            credential_key: &self.credential_key,
            audit: &mut audit,
            config: &self.config,
            cert_manager: &self.cert_manager,
            metadata,
            crypto: &RustCrypto,
        };
        registry.validate(&mut ctx).await?;

        assert!(audit.journal().contains(&Field::Fmt));
        for field in statement.fields() {
            assert!(audit.journal().contains(&field), "{field} was not journaled");
        }
        Ok(audit)
    }

    async fn run(&self, fmt: &str, att_stmt: &[(Value, Value)]) -> Result<Audit> {
        self.run_with(&AttestationRegistry::with_defaults(), fmt, att_stmt, None)
            .await
    }

    fn packed_full(&self) -> Vec<(Value, Value)> {
        vec![
            (text("alg"), Value::Integer((-7).into())),
            (text("sig"), Value::Bytes(es256(&leaf_key(), &self.signed_data()))),
            (text("x5c"), x5c(&[ATTESTATION_LEAF, INTERMEDIATE_CA])),
        ]
    }
}

#[tokio::test]
async fn none_format() {
    let setup = Setup::new();
    let audit = setup.run("none", &[]).await.unwrap();
    assert_eq!(audit.info()["attestation-type"], "none");
    assert_eq!(audit.journal().len(), 1);

    let err = setup
        .run("none", &[(text("sig"), Value::Bytes(vec![1]))])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "'none' attestation format: attStmt had fields");
}

#[tokio::test]
async fn packed_full_attestation_anchored_in_store() {
    let setup = Setup::new();
    setup.cert_manager.add_cert(cert(ROOT_CA));

    let audit = setup.run("packed", &setup.packed_full()).await.unwrap();
    assert_eq!(audit.info()["attestation-type"], "basic");
    assert_eq!(audit.info()["attestation-trust"], "verified");
    assert!(audit.warning().is_empty());
}

#[tokio::test]
async fn packed_full_attestation_anchored_by_metadata() {
    let setup = Setup::new();
    let mut metadata = MockMetadataLookup::new();
    metadata
        .expect_attestation_roots()
        .times(1)
        .returning(|_| vec![cert(ROOT_CA)]);

    let audit = setup
        .run_with(
            &AttestationRegistry::with_defaults(),
            "packed",
            &setup.packed_full(),
            Some(&metadata),
        )
        .await
        .unwrap();
    assert_eq!(audit.info()["attestation-trust"], "verified");
}

#[tokio::test]
async fn packed_trust_policy() {
    let mut setup = Setup::new();
    let audit = setup.run("packed", &setup.packed_full()).await.unwrap();
    assert!(audit.warning().contains_key("attestation-trust"));

    setup.config.attestation_trust = AttestationTrust::Required;
    let err = setup.run("packed", &setup.packed_full()).await.unwrap_err();
    assert_eq!(err.to_string(), "no trusted root certificate found for chain");
}

#[tokio::test]
async fn packed_rejects_bad_signature_and_ecdaa() {
    let setup = Setup::new();
    let mut att_stmt = setup.packed_full();
    att_stmt[1].1 = Value::Bytes(es256(&leaf_key(), b"something else"));
    let err = setup.run("packed", &att_stmt).await.unwrap_err();
    assert_eq!(err.to_string(), "packed: signature verification failed");

    att_stmt.push((text("ecdaaKeyId"), Value::Bytes(vec![0; 32])));
    setup
        .run("packed", &att_stmt)
        .await
        .expect_err("ECDAA is not supported");
}

#[tokio::test]
async fn packed_self_attestation() {
    let setup = Setup::new();
    let sig = es256(&setup.signer, &setup.signed_data());
    let audit = setup
        .run(
            "packed",
            &[
                (text("alg"), Value::Integer((-7).into())),
                (text("sig"), Value::Bytes(sig.clone())),
            ],
        )
        .await
        .unwrap();
    assert_eq!(audit.info()["attestation-type"], "self");

    let err = setup
        .run(
            "packed",
            &[
                (text("alg"), Value::Integer((-257).into())),
                (text("sig"), Value::Bytes(sig)),
            ],
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "packed: self attestation alg does not match credential alg"
    );
}

#[tokio::test]
async fn fido_u2f() {
    let setup = Setup::new();
    let mut data = vec![0x00];
    data.extend_from_slice(&sha256(b"localhost"));
    data.extend_from_slice(&setup.client_data_hash);
    data.extend_from_slice(&CRED_ID);
    data.extend_from_slice(&setup.point);

    let audit = setup
        .run(
            "fido-u2f",
            &[
                (text("sig"), Value::Bytes(es256(&leaf_key(), &data))),
                (text("x5c"), x5c(&[ATTESTATION_LEAF])),
            ],
        )
        .await
        .unwrap();
    assert_eq!(audit.info()["attestation-type"], "basic");

    let err = setup
        .run(
            "fido-u2f",
            &[
                (text("sig"), Value::Bytes(es256(&leaf_key(), &data))),
                (text("x5c"), x5c(&[ATTESTATION_LEAF, INTERMEDIATE_CA])),
            ],
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "fido-u2f: expected 'x5c' to contain exactly one certificate"
    );
}

fn tpm_pub_area(point: &[u8]) -> Vec<u8> {
    let (x, y) = point[1..].split_at(32);
    let mut area = Vec::new();
    area.extend_from_slice(&0x0023u16.to_be_bytes()); // TPM_ALG_ECC
    area.extend_from_slice(&0x000bu16.to_be_bytes()); // nameAlg SHA-256
    area.extend_from_slice(&0x0006_0472u32.to_be_bytes());
    area.extend_from_slice(&[0x00, 0x00]); // authPolicy
    area.extend_from_slice(&0x0010u16.to_be_bytes()); // symmetric: TPM_ALG_NULL
    area.extend_from_slice(&0x0010u16.to_be_bytes()); // scheme: TPM_ALG_NULL
    area.extend_from_slice(&0x0003u16.to_be_bytes()); // TPM_ECC_NIST_P256
    area.extend_from_slice(&0x0010u16.to_be_bytes()); // kdf: TPM_ALG_NULL
    area.extend_from_slice(&[0x00, 0x20]);
    area.extend_from_slice(x);
    area.extend_from_slice(&[0x00, 0x20]);
    area.extend_from_slice(y);
    area
}

fn tpm_cert_info(extra_data: &[u8], pub_area: &[u8]) -> Vec<u8> {
    let mut info = Vec::new();
    info.extend_from_slice(&0xff54_4347u32.to_be_bytes());
    info.extend_from_slice(&0x8017u16.to_be_bytes());
    info.extend_from_slice(&[0x00, 0x00]); // qualifiedSigner
    info.extend_from_slice(&[0x00, 0x20]);
    info.extend_from_slice(extra_data);
    info.extend_from_slice(&[0; 17]); // clockInfo
    info.extend_from_slice(&[0; 8]); // firmwareVersion
    info.extend_from_slice(&[0x00, 0x22, 0x00, 0x0b]);
    info.extend_from_slice(&sha256(pub_area));
    info.extend_from_slice(&[0x00, 0x00]); // attestedQualifiedName
    info
}

fn tpm_statement(cert_info: Vec<u8>, pub_area: Vec<u8>) -> Vec<(Value, Value)> {
    vec![
        (text("ver"), text("2.0")),
        (text("alg"), Value::Integer((-257).into())),
        (text("x5c"), x5c(&[TPM_AIK])),
        (text("sig"), Value::Bytes(rs256(&cert_info))),
        (text("certInfo"), Value::Bytes(cert_info)),
        (text("pubArea"), Value::Bytes(pub_area)),
    ]
}

#[tokio::test]
async fn tpm() {
    let setup = Setup::new();
    let pub_area = tpm_pub_area(&setup.point);
    let cert_info = tpm_cert_info(&sha256(&setup.signed_data()), &pub_area);

    let audit = setup
        .run("tpm", &tpm_statement(cert_info, pub_area.clone()))
        .await
        .unwrap();
    assert_eq!(audit.info()["attestation-type"], "AttCA");

    let wrong_extra_data = tpm_cert_info(&[0; 32], &pub_area);
    let err = setup
        .run("tpm", &tpm_statement(wrong_extra_data, pub_area))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "tpm: certInfo extraData does not match the hash of authData and clientDataHash"
    );
}

#[tokio::test]
async fn tpm_pub_area_must_match_credential() {
    let setup = Setup::new();
    let other = Setup::new();
    let pub_area = tpm_pub_area(&other.point);
    let cert_info = tpm_cert_info(&sha256(&setup.signed_data()), &pub_area);

    let err = setup
        .run("tpm", &tpm_statement(cert_info, pub_area))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "tpm: pubArea key does not match credential public key"
    );
}

#[test]
fn tpm_structures_reject_trailing_bytes() {
    let setup = Setup::new();
    let mut pub_area = tpm_pub_area(&setup.point);
    assert!(tpm::PubArea::parse(&pub_area).is_ok());
    pub_area.push(0);
    tpm::PubArea::parse(&pub_area).expect_err("trailing byte");

    let mut cert_info = tpm_cert_info(&[0; 32], &pub_area);
    cert_info[0] = 0;
    tpm::CertInfo::parse(&cert_info).expect_err("bad magic");
}

fn safetynet_response(nonce: &str, timestamp_ms: u128) -> Vec<u8> {
    let header = serde_json::json!({
        "alg": "RS256",
        "x5c": [encoding::base64_padded(cert(SAFETYNET_LEAF).der())],
    });
    let payload = serde_json::json!({
        "nonce": nonce,
        "timestampMs": u64::try_from(timestamp_ms).unwrap(),
        "apkPackageName": "com.google.android.gms",
        "ctsProfileMatch": true,
        "basicIntegrity": true,
    });
    let signing_input = format!(
        "{}.{}",
        encoding::base64url(header.to_string().as_bytes()),
        encoding::base64url(payload.to_string().as_bytes())
    );
    let signature = rs256(signing_input.as_bytes());
    format!("{signing_input}.{}", encoding::base64url(&signature)).into_bytes()
}

#[tokio::test]
async fn android_safetynet() {
    let setup = Setup::new();
    let nonce = encoding::base64_padded(&sha256(&setup.signed_data()));
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();

    let statement = |response| {
        vec![
            (text("ver"), text("14366018")),
            (text("response"), Value::Bytes(response)),
        ]
    };

    let audit = setup
        .run(
            "android-safetynet",
            &statement(safetynet_response(&nonce, now - 1_000)),
        )
        .await
        .unwrap();
    assert_eq!(audit.info()["attestation-type"], "basic");

    let err = setup
        .run(
            "android-safetynet",
            &statement(safetynet_response("bm90IHRoZSBub25jZQ==", now - 1_000)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "android-safetynet: nonce mismatch");

    let err = setup
        .run(
            "android-safetynet",
            &statement(safetynet_response(&nonce, now - 3_600_000)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "android-safetynet: attestation is too old");
}

/// A caller defined format that accepts any statement and journals its entries.
struct Example;

#[async_trait::async_trait]
impl AttestationFormat for Example {
    fn fmt(&self) -> &str {
        "example"
    }

    fn parse(&self, att_stmt: &[(Value, Value)]) -> Result<AttestationStatement> {
        let fields = att_stmt
            .iter()
            .filter_map(|(key, value)| Some((key.as_text()?.to_owned(), value.clone())))
            .collect();
        Ok(AttestationStatement::Custom {
            fmt: "example".into(),
            fields,
        })
    }

    async fn validate(&self, ctx: &mut AttestationContext<'_>) -> Result<()> {
        for field in ctx.statement.fields() {
            ctx.audit.record(field);
        }
        ctx.audit.set_info("attestation-type", "example");
        Ok(())
    }
}

#[tokio::test]
async fn registry() {
    let setup = Setup::new();
    let mut registry = AttestationRegistry::with_defaults();
    assert_eq!(
        registry.formats().collect::<Vec<_>>(),
        ["none", "fido-u2f", "packed", "tpm", "android-safetynet"]
    );

    let err = registry.add(Box::new(NoneFormat)).unwrap_err();
    assert_eq!(err.to_string(), "can't add format: 'none' already exists");

    registry.add(Box::new(Example)).unwrap();
    let audit = setup
        .run_with(&registry, "example", &[(text("proof"), Value::Bool(true))], None)
        .await
        .unwrap();
    assert!(audit.journal().contains(&Field::Other("proof".into())));

    registry.delete_all();
    let err = setup.run_with(&registry, "none", &[], None).await.unwrap_err();
    assert_eq!(err.to_string(), "no support for attestation format: none");
}
