//! What the relying party expects a response to contain.

use std::collections::BTreeSet;

use fido2_rp_types::{encoding, webauthn::PublicKeyCredentialDescriptor};

use crate::{
    keys::is_pem,
    origin::{check_origin, check_rp_id},
    Error, Result,
};

/// A flag the authenticator data must carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
pub enum ExpectedFlag {
    /// User present
    #[strum(serialize = "UP")]
    UserPresent,
    /// User verified, which also requires UP
    #[strum(serialize = "UV")]
    UserVerified,
    /// Either UP alone or UP together with UV
    #[strum(serialize = "UP-or-UV")]
    UserPresentOrVerified,
    /// Attested credential data included
    #[strum(serialize = "AT")]
    AttestedCredentialData,
    /// Extension data included
    #[strum(serialize = "ED")]
    ExtensionData,
}

/// How much the authenticator has to vouch for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Factor {
    /// The credential is the only factor: the user must be verified.
    First,
    /// The credential accompanies another factor: presence is enough.
    Second,
    /// Either of the above.
    Either,
}

impl Factor {
    /// The flags this factor requires.
    pub fn flags(self) -> BTreeSet<ExpectedFlag> {
        match self {
            Factor::First => [ExpectedFlag::UserPresent, ExpectedFlag::UserVerified].into(),
            Factor::Second => [ExpectedFlag::UserPresent].into(),
            Factor::Either => [ExpectedFlag::UserPresentOrVerified].into(),
        }
    }
}

/// The two ceremonies a relying party verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Ceremony {
    /// Registration of a new credential.
    #[strum(serialize = "attestation")]
    Attestation,
    /// Authentication with an existing credential.
    #[strum(serialize = "assertion")]
    Assertion,
}

impl Ceremony {
    fn required(self) -> &'static [&'static str] {
        match self {
            Ceremony::Attestation => &["origin", "challenge", "flags"],
            Ceremony::Assertion => &[
                "origin",
                "challenge",
                "flags",
                "prevCounter",
                "publicKey",
                "userHandle",
            ],
        }
    }

    fn optional(self) -> &'static [&'static str] {
        &["rpId", "allowCredentials", "allowCrossOrigin"]
    }
}

/// Expected values for a single verification.
///
/// Every member is optional so that a missing or superfluous expectation is reported instead of
/// silently ignored; which ones must be present depends on the [`Ceremony`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectations {
    /// Origin the client data must report.
    pub origin: Option<String>,
    /// Challenge the client data must echo, base64url.
    pub challenge: Option<String>,
    /// Flags the authenticator data must carry.
    pub flags: Option<BTreeSet<ExpectedFlag>>,
    /// Relying party id the rpIdHash is computed from. Defaults to the origin host.
    pub rp_id: Option<String>,
    /// Credentials the response may come from.
    pub allow_credentials: Option<Vec<PublicKeyCredentialDescriptor>>,
    /// Signature counter stored after the previous ceremony.
    pub prev_counter: Option<u32>,
    /// PEM public key of the credential.
    pub public_key: Option<String>,
    /// User handle stored with the credential; `Some(None)` means none is expected.
    pub user_handle: Option<Option<String>>,
    /// Whether client data reporting `crossOrigin: true` is accepted. Rejected when absent.
    pub allow_cross_origin: Option<bool>,
}

impl Expectations {
    /// Expectations for registering a credential.
    pub fn attestation(
        origin: impl Into<String>,
        challenge: impl Into<String>,
        factor: Factor,
    ) -> Self {
        let mut flags = factor.flags();
        flags.insert(ExpectedFlag::AttestedCredentialData);
        Self {
            origin: Some(origin.into()),
            challenge: Some(challenge.into()),
            flags: Some(flags),
            ..Default::default()
        }
    }

    /// Expectations for authenticating with a stored credential.
    pub fn assertion(
        origin: impl Into<String>,
        challenge: impl Into<String>,
        factor: Factor,
        prev_counter: u32,
        public_key: impl Into<String>,
        user_handle: Option<String>,
    ) -> Self {
        Self {
            origin: Some(origin.into()),
            challenge: Some(challenge.into()),
            flags: Some(factor.flags()),
            prev_counter: Some(prev_counter),
            public_key: Some(public_key.into()),
            user_handle: Some(user_handle),
            ..Default::default()
        }
    }

    /// Expect a specific relying party id.
    pub fn with_rp_id(mut self, rp_id: impl Into<String>) -> Self {
        self.rp_id = Some(rp_id.into());
        self
    }

    /// Restrict the credentials a response may come from.
    pub fn with_allow_credentials(mut self, allow: Vec<PublicKeyCredentialDescriptor>) -> Self {
        self.allow_credentials = Some(allow);
        self
    }

    /// Accept responses from a page embedded in a cross-origin frame.
    pub fn with_cross_origin_allowed(mut self) -> Self {
        self.allow_cross_origin = Some(true);
        self
    }

    fn present(&self) -> BTreeSet<&'static str> {
        [
            ("origin", self.origin.is_some()),
            ("challenge", self.challenge.is_some()),
            ("flags", self.flags.is_some()),
            ("rpId", self.rp_id.is_some()),
            ("allowCredentials", self.allow_credentials.is_some()),
            ("prevCounter", self.prev_counter.is_some()),
            ("publicKey", self.public_key.is_some()),
            ("userHandle", self.user_handle.is_some()),
            ("allowCrossOrigin", self.allow_cross_origin.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

/// Check that `expectations` holds exactly the members `ceremony` needs and that each is well
/// formed.
pub(crate) fn validate_expectations(
    expectations: &Expectations,
    ceremony: Ceremony,
    min_challenge_len: usize,
) -> Result<()> {
    let present = expectations.present();
    let required = ceremony.required();

    if let Some(missing) = required.iter().find(|name| !present.contains(*name)) {
        return Err(Error::type_error(format!(
            "expectation did not contain value for '{missing}'"
        )));
    }

    let optional = ceremony
        .optional()
        .iter()
        .filter(|name| present.contains(*name))
        .count();
    if present.len() != required.len() + optional {
        return Err(Error::type_error(format!(
            "wrong number of expectations for {ceremony}: should have {} but got {}",
            required.len() + optional,
            present.len()
        )));
    }

    if let Some(origin) = &expectations.origin {
        if check_origin(origin).map_err(Error::into_type_error)? != *origin {
            return Err(Error::type_error("expected origin was malformatted"));
        }
    }

    if let Some(rp_id) = &expectations.rp_id {
        check_rp_id(rp_id).map_err(Error::into_type_error)?;
    }

    if let Some(challenge) = &expectations.challenge {
        let decoded = encoding::is_base64url(challenge)
            .then(|| encoding::try_from_base64url(challenge))
            .flatten()
            .ok_or_else(|| {
                Error::type_error("expected challenge should be properly encoded base64url String")
            })?;
        if decoded.len() < min_challenge_len {
            return Err(Error::type_error(format!(
                "expected challenge should be at least {min_challenge_len} bytes"
            )));
        }
    }

    if let Some(flags) = &expectations.flags {
        if flags.is_empty() {
            return Err(Error::type_error("expected flags should not be empty"));
        }
    }

    if let Some(public_key) = &expectations.public_key {
        if !is_pem(public_key) {
            return Err(Error::type_error("expected publicKey should be a PEM string"));
        }
    }

    if let Some(allow) = &expectations.allow_credentials {
        for (i, descriptor) in allow.iter().enumerate() {
            if descriptor.ty != "public-key" {
                return Err(Error::type_error(format!(
                    "expected allowCredentials[{i}].type to be 'public-key', got {}",
                    descriptor.ty
                )));
            }
            let mut transports = descriptor.transports.iter().flatten();
            if let Some(transport) = transports.find(|t| !t.is_allow_list_transport()) {
                return Err(Error::type_error(format!(
                    "expected allowCredentials[{i}].transports to be 'usb', 'nfc', 'ble' or 'internal', got {transport}"
                )));
            }
        }
    }

    Ok(())
}
