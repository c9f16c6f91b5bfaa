use fido2_rp_types::{authenticator::Aaguid, Bytes};
use indexmap::IndexMap;
use x509_parser::{
    der_parser::{
        ber::BerObjectContent,
        der::{parse_der_bitstring, parse_der_octetstring, parse_der_oid},
    },
    extensions::{GeneralName, ParsedExtension, X509Extension},
};

use super::{flatten_name, Name};

const FIDO_U2F_TRANSPORTS: &str = "1.3.6.1.4.1.45724.2.1.1";
const FIDO_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";
const YUBICO_DEVICE_ID: &str = "1.3.6.1.4.1.41482.2";
const TCG_KP_AIK_CERTIFICATE: &str = "2.23.133.8.3";

/// Bit positions of the FIDO U2F transports extension.
const TRANSPORT_BITS: [&str; 5] = [
    "bluetooth-classic",
    "bluetooth-low-energy",
    "usb",
    "nfc",
    "usb-internal",
];

/// A decoded certificate extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertExtension {
    /// The extension OID in dotted form.
    pub oid: String,
    /// Whether the extension was marked critical.
    pub critical: bool,
    /// The decoded value.
    pub value: ExtensionValue,
}

/// Entry of a subject alternative name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AltName {
    /// dNSName
    Dns(String),
    /// rfc822Name
    Email(String),
    /// uniformResourceIdentifier
    Uri(String),
    /// iPAddress, as the raw address bytes
    Ip(Bytes),
    /// A directory name, as used by TPM attestation identity keys.
    Directory(Name),
    /// Any other kind of name, as its OID or a short description.
    Other(String),
}

/// Values of the extensions this crate knows how to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionValue {
    /// subject-key-identifier
    SubjectKeyIdentifier(Bytes),
    /// authority-key-identifier
    AuthorityKeyIdentifier(Option<Bytes>),
    /// basic-constraints
    BasicConstraints {
        /// Whether the subject is a CA.
        ca: bool,
        /// Maximum number of intermediates below this one.
        path_len: Option<u32>,
    },
    /// key-usage, as the names of the bits that are set
    KeyUsage(Vec<&'static str>),
    /// ext-key-usage, known purposes by name and the rest as OIDs
    ExtKeyUsage(Vec<String>),
    /// certificate-policies, as policy OIDs
    CertificatePolicies(Vec<String>),
    /// subject-alt-name
    SubjectAltName(Vec<AltName>),
    /// authority-info-access, as (method OID, location) pairs
    AuthorityInfoAccess(Vec<(String, String)>),
    /// fido-u2f-transports
    FidoU2fTransports(Vec<&'static str>),
    /// fido-aaguid
    FidoAaguid(Aaguid),
    /// yubico-device-id
    YubicoDeviceId(String),
    /// Anything else, kept as the raw extension value.
    Unknown(Bytes),
}

fn key_usage(ku: &x509_parser::extensions::KeyUsage) -> Vec<&'static str> {
    [
        (ku.digital_signature(), "digital-signature"),
        (ku.non_repudiation(), "non-repudiation"),
        (ku.key_encipherment(), "key-encipherment"),
        (ku.data_encipherment(), "data-encipherment"),
        (ku.key_agreement(), "key-agreement"),
        (ku.key_cert_sign(), "key-cert-sign"),
        (ku.crl_sign(), "crl-sign"),
        (ku.encipher_only(), "encipher-only"),
        (ku.decipher_only(), "decipher-only"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect()
}

fn ext_key_usage(eku: &x509_parser::extensions::ExtendedKeyUsage) -> Vec<String> {
    let mut usages: Vec<String> = [
        (eku.any, "any"),
        (eku.server_auth, "server-auth"),
        (eku.client_auth, "client-auth"),
        (eku.code_signing, "code-signing"),
        (eku.email_protection, "email-protection"),
        (eku.time_stamping, "time-stamping"),
        (eku.ocsp_signing, "ocsp-signing"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then(|| name.to_owned()))
    .collect();

    usages.extend(eku.other.iter().map(|oid| match oid.to_id_string().as_str() {
        TCG_KP_AIK_CERTIFICATE => "tcg-kp-aik-certificate".to_owned(),
        other => other.to_owned(),
    }));
    usages
}

fn general_name(name: &GeneralName<'_>) -> AltName {
    match name {
        GeneralName::DNSName(dns) => AltName::Dns((*dns).to_owned()),
        GeneralName::RFC822Name(email) => AltName::Email((*email).to_owned()),
        GeneralName::URI(uri) => AltName::Uri((*uri).to_owned()),
        GeneralName::IPAddress(ip) => AltName::Ip(Bytes::from(*ip)),
        GeneralName::DirectoryName(dn) => AltName::Directory(flatten_name(dn)),
        GeneralName::RegisteredID(oid) => AltName::Other(oid.to_id_string()),
        GeneralName::OtherName(oid, _) => AltName::Other(oid.to_id_string()),
        other => AltName::Other(format!("{other:?}")),
    }
}

fn location(name: &GeneralName<'_>) -> String {
    match general_name(name) {
        AltName::Dns(s) | AltName::Email(s) | AltName::Uri(s) | AltName::Other(s) => s,
        AltName::Ip(ip) => String::from(ip),
        AltName::Directory(dn) => dn.values().cloned().collect::<Vec<_>>().join(", "),
    }
}

fn fido_transports(value: &[u8]) -> Option<Vec<&'static str>> {
    let (_, obj) = parse_der_bitstring(value).ok()?;
    let BerObjectContent::BitString(_, ref bits) = obj.content else {
        return None;
    };
    Some(
        TRANSPORT_BITS
            .into_iter()
            .enumerate()
            .filter_map(|(bit, name)| bits.is_set(bit).then_some(name))
            .collect(),
    )
}

fn fido_aaguid(value: &[u8]) -> Option<Aaguid> {
    let (_, obj) = parse_der_octetstring(value).ok()?;
    Aaguid::from_slice(obj.as_slice().ok()?)
}

fn yubico_device_id(value: &[u8]) -> String {
    parse_der_oid(value)
        .ok()
        .and_then(|(_, obj)| obj.as_oid().ok().map(|oid| oid.to_id_string()))
        .unwrap_or_else(|| data_encoding::HEXLOWER.encode(value))
}

fn decode_one(ext: &X509Extension<'_>) -> (String, ExtensionValue) {
    let oid = ext.oid.to_id_string();
    let unknown = || ExtensionValue::Unknown(Bytes::from(ext.value));

    let named = |name: &str, value: ExtensionValue| (name.to_owned(), value);
    match ext.parsed_extension() {
        ParsedExtension::SubjectKeyIdentifier(ki) => named(
            "subject-key-identifier",
            ExtensionValue::SubjectKeyIdentifier(Bytes::from(ki.0)),
        ),
        ParsedExtension::AuthorityKeyIdentifier(aki) => named(
            "authority-key-identifier",
            ExtensionValue::AuthorityKeyIdentifier(
                aki.key_identifier.as_ref().map(|ki| Bytes::from(ki.0)),
            ),
        ),
        ParsedExtension::BasicConstraints(bc) => named(
            "basic-constraints",
            ExtensionValue::BasicConstraints {
                ca: bc.ca,
                path_len: bc.path_len_constraint,
            },
        ),
        ParsedExtension::KeyUsage(ku) => named("key-usage", ExtensionValue::KeyUsage(key_usage(ku))),
        ParsedExtension::ExtendedKeyUsage(eku) => named(
            "ext-key-usage",
            ExtensionValue::ExtKeyUsage(ext_key_usage(eku)),
        ),
        ParsedExtension::CertificatePolicies(policies) => named(
            "certificate-policies",
            ExtensionValue::CertificatePolicies(
                policies
                    .iter()
                    .map(|policy| policy.policy_id.to_id_string())
                    .collect(),
            ),
        ),
        ParsedExtension::SubjectAlternativeName(san) => named(
            "subject-alt-name",
            ExtensionValue::SubjectAltName(san.general_names.iter().map(general_name).collect()),
        ),
        ParsedExtension::AuthorityInfoAccess(aia) => named(
            "authority-info-access",
            ExtensionValue::AuthorityInfoAccess(
                aia.accessdescs
                    .iter()
                    .map(|desc| (desc.access_method.to_id_string(), location(&desc.access_location)))
                    .collect(),
            ),
        ),
        _ => match oid.as_str() {
            FIDO_U2F_TRANSPORTS => named(
                "fido-u2f-transports",
                fido_transports(ext.value)
                    .map(ExtensionValue::FidoU2fTransports)
                    .unwrap_or_else(unknown),
            ),
            FIDO_AAGUID => named(
                "fido-aaguid",
                fido_aaguid(ext.value)
                    .map(ExtensionValue::FidoAaguid)
                    .unwrap_or_else(unknown),
            ),
            YUBICO_DEVICE_ID => named(
                "yubico-device-id",
                ExtensionValue::YubicoDeviceId(yubico_device_id(ext.value)),
            ),
            _ => {
                log::warn!("unknown certificate extension: {oid}");
                (oid.clone(), unknown())
            }
        },
    }
}

/// Decode every extension of a certificate, keyed by extension name.
pub(super) fn decode(extensions: &[X509Extension<'_>]) -> IndexMap<String, CertExtension> {
    extensions
        .iter()
        .map(|ext| {
            let (name, value) = decode_one(ext);
            let ext = CertExtension {
                oid: ext.oid.to_id_string(),
                critical: ext.critical,
                value,
            };
            (name, ext)
        })
        .collect()
}
