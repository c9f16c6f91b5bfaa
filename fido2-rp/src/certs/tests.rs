use fido2_rp_types::{authenticator::Aaguid, encoding};

use super::{fixtures::*, *};
use crate::crypto::RustCrypto;

fn cert(pem: &str) -> Certificate {
    Certificate::from_pem(pem).expect("valid fixture certificate")
}

#[test]
fn reads_names_and_serials() {
    let root = cert(ROOT_CA);
    assert_eq!(root.version(), 3);
    assert_eq!(root.serial_number(), "01");
    assert_eq!(root.identifier(), "FIDO2 RP Test Root CA");
    assert_eq!(root.issuer_identifier(), "FIDO2 RP Test Root CA");
    assert!(root.is_self_issued());
    assert!(root.is_ca());
    assert_eq!(
        root.subject().get("organization-name").map(String::as_str),
        Some("FIDO2 RP Test")
    );
    assert_eq!(
        root.subject().get("country-name").map(String::as_str),
        Some("US")
    );

    let leaf = cert(ATTESTATION_LEAF);
    assert_eq!(leaf.serial_number(), "1001");
    assert_eq!(leaf.issuer_identifier(), "FIDO2 RP Test Intermediate CA");
    assert_eq!(
        leaf.subject()
            .get("organizational-unit-name")
            .map(String::as_str),
        Some("Authenticator Attestation")
    );
    assert!(!leaf.is_ca());
    assert!(leaf.is_valid_at(unix_now()));
    assert!(!leaf.is_valid_at(0));
}

#[test]
fn accepts_pem_and_base64_der() {
    let root = cert(ROOT_CA);
    let b64 = encoding::base64(root.der());
    let b64url = encoding::base64url(root.der());

    assert_eq!(Certificate::try_from(ROOT_CA).unwrap(), root);
    assert_eq!(Certificate::try_from(b64.as_str()).unwrap(), root);
    assert_eq!(Certificate::try_from(b64url.as_str()).unwrap(), root);
    Certificate::from_pem(INTERMEDIATE_CRL).expect_err("CRL is not a certificate");
    Certificate::from_der(&[0x30, 0x03, 0x02, 0x01, 0x01]).expect_err("not a certificate");
}

#[test]
fn decodes_fido_extensions() {
    let leaf = cert(ATTESTATION_LEAF);

    let aaguid = leaf.extension("fido-aaguid").expect("aaguid extension");
    assert!(!aaguid.critical);
    assert_eq!(aaguid.oid, "1.3.6.1.4.1.45724.1.1.4");
    assert_eq!(aaguid.value, ExtensionValue::FidoAaguid(Aaguid::from(AAGUID)));

    let transports = leaf
        .extension("fido-u2f-transports")
        .expect("transports extension");
    assert_eq!(
        transports.value,
        ExtensionValue::FidoU2fTransports(vec!["usb", "nfc"])
    );

    assert_eq!(
        leaf.extension("basic-constraints").map(|ext| &ext.value),
        Some(&ExtensionValue::BasicConstraints {
            ca: false,
            path_len: None
        })
    );
}

#[test]
fn decodes_tpm_extensions() {
    let aik = cert(TPM_AIK);
    assert!(aik.subject().is_empty());

    let Some(ExtensionValue::ExtKeyUsage(usages)) =
        aik.extension("ext-key-usage").map(|ext| &ext.value)
    else {
        panic!("missing ext-key-usage");
    };
    assert_eq!(usages, &["tcg-kp-aik-certificate"]);

    let san = aik.extension("subject-alt-name").expect("SAN");
    assert!(san.critical);
    let ExtensionValue::SubjectAltName(names) = &san.value else {
        panic!("SAN not decoded");
    };
    let Some(AltName::Directory(dn)) = names.first() else {
        panic!("expected a directory name");
    };
    assert_eq!(
        dn.get("tcg-at-tpm-manufacturer").map(String::as_str),
        Some("id:FFFFF1D0")
    );
    assert_eq!(dn.get("tcg-at-tpm-version").map(String::as_str), Some("id:13"));
}

#[test]
fn exposes_public_keys() {
    let leaf = cert(ATTESTATION_LEAF);
    let jwk = leaf.public_key_jwk().unwrap();
    assert_eq!(jwk.kty, "EC");
    assert_eq!(jwk.crv.as_deref(), Some("P-256"));

    let aik = cert(TPM_AIK);
    assert_eq!(aik.public_key_jwk().unwrap().kty, "RSA");
    assert!(aik.public_key().unwrap().to_pem().unwrap().starts_with("-----BEGIN PUBLIC KEY-----"));
}

#[tokio::test]
async fn verify_against_issuer() {
    let root = cert(ROOT_CA);
    let intermediate = cert(INTERMEDIATE_CA);
    let leaf = cert(ATTESTATION_LEAF);

    intermediate
        .verify(Some(&root), None, &RustCrypto)
        .await
        .expect("intermediate is signed by root");
    leaf.verify(Some(&intermediate), None, &RustCrypto)
        .await
        .expect("leaf is signed by intermediate");
    root.verify(Some(&root), None, &RustCrypto)
        .await
        .expect("root is self signed");

    leaf.verify(Some(&root), None, &RustCrypto)
        .await
        .expect_err("root did not issue the leaf");
}

#[tokio::test]
async fn verify_looks_up_issuer_in_manager() {
    let manager = CertManager::new();
    let intermediate = cert(INTERMEDIATE_CA);

    let err = intermediate
        .verify(None, Some(&manager), &RustCrypto)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Please provide issuer certificate as a parameter"
    );

    manager.add_cert(cert(ROOT_CA));
    intermediate
        .verify(None, Some(&manager), &RustCrypto)
        .await
        .expect("root found in manager");
}

#[test]
fn manager_storage() {
    let manager = CertManager::new();
    assert!(!manager.add_cert(cert(ROOT_CA)));
    assert!(manager.add_cert(cert(ROOT_CA)));
    manager.add_cert(cert(INTERMEDIATE_CA));

    assert_eq!(manager.get_certs().len(), 2);
    assert_eq!(
        manager.get_cert_by_serial("02").map(|c| c.identifier()),
        Some("FIDO2 RP Test Intermediate CA".to_owned())
    );
    assert!(manager.get_cert_by_serial("ff").is_none());

    manager.remove_all();
    assert!(manager.get_certs().is_empty());
}

#[test]
fn crl_lists_revoked_serials() {
    let crl = Crl::from_pem(INTERMEDIATE_CRL).expect("valid CRL");
    assert_eq!(crl.issuer_identifier(), "FIDO2 RP Test Intermediate CA");
    assert_eq!(crl.revoked_serials().collect::<Vec<_>>(), ["1002"]);
    assert!(crl.is_revoked(&cert(REVOKED_LEAF)));
    assert!(!crl.is_revoked(&cert(ATTESTATION_LEAF)));
    Crl::from_pem(ROOT_CA).expect_err("certificate is not a CRL");
}

#[tokio::test]
async fn chain_verification() {
    let manager = CertManager::new();
    let root = cert(ROOT_CA);
    let chain = [cert(ATTESTATION_LEAF), cert(INTERMEDIATE_CA)];

    manager
        .verify_cert_chain(&chain, &[root.clone()], &[], &RustCrypto)
        .await
        .expect("chain anchored in the given roots");

    let err = manager
        .verify_cert_chain(&chain, &[], &[], &RustCrypto)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no trusted root certificate found for chain");

    manager.add_cert(root.clone());
    manager
        .verify_cert_chain(&chain, &[], &[], &RustCrypto)
        .await
        .expect("chain anchored in the manager");

    let full = [cert(ATTESTATION_LEAF), cert(INTERMEDIATE_CA), root.clone()];
    manager
        .verify_cert_chain(&full, &[root], &[], &RustCrypto)
        .await
        .expect("chain ending in a root");

    manager
        .verify_cert_chain(&[], &[], &[], &RustCrypto)
        .await
        .expect_err("empty chain");
}

#[tokio::test]
async fn chain_rejects_revoked_and_non_ca_links() {
    let manager = CertManager::new();
    let root = cert(ROOT_CA);
    let crl = Crl::from_pem(INTERMEDIATE_CRL).unwrap();
    let revoked = [cert(REVOKED_LEAF), cert(INTERMEDIATE_CA)];

    manager
        .verify_cert_chain(&revoked, &[root.clone()], &[], &RustCrypto)
        .await
        .expect("no CRL known yet");

    let err = manager
        .verify_cert_chain(&revoked, &[root.clone()], &[crl.clone()], &RustCrypto)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "certificate revoked");

    manager.add_crl(crl);
    manager
        .verify_cert_chain(&revoked, &[root.clone()], &[], &RustCrypto)
        .await
        .expect_err("stored CRL applies too");

    let bad = [cert(ATTESTATION_LEAF), cert(REVOKED_LEAF)];
    manager
        .verify_cert_chain(&bad, &[root], &[], &RustCrypto)
        .await
        .expect_err("leaf certificates cannot issue");
}
