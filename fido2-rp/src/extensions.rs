//! Validation of authenticator extension outputs found in authenticator data.
//!
//! Outputs are looked up by identifier in the [`ExtensionRegistry`]. A registered [`Extension`]
//! decides whether its output is acceptable; outputs nobody registered for are reported as
//! warnings on the audit rather than rejected.
//!
//! The registry starts out empty. [`CredProtect`] and [`HmacSecret`] are provided for the
//! common CTAP2 extensions.

use ciborium::value::Value;
use fido2_rp_types::authenticator::Flags;
use indexmap::IndexMap;

use crate::{audit::Audit, expectations::Ceremony, Error, Result};

/// What an extension validator can see of the ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionContext {
    /// Registration or authentication.
    pub ceremony: Ceremony,
    /// Flags of the authenticator data the output came from.
    pub flags: Flags,
}

/// Validator for one authenticator extension output.
pub trait Extension: Send + Sync {
    /// The extension identifier, as used for the key in the extension output map.
    fn name(&self) -> &str;

    /// Check the output value.
    fn validate(&self, value: &Value, ctx: &ExtensionContext) -> Result<()>;
}

/// The extension validators a verifier uses, keyed by identifier.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: IndexMap<String, Box<dyn Extension>>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.extensions.keys()).finish()
    }
}

impl ExtensionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator. Validators are never replaced.
    pub fn add(&mut self, extension: Box<dyn Extension>) -> Result<()> {
        let name = extension.name().to_owned();
        if self.extensions.contains_key(&name) {
            return Err(Error::type_error(format!(
                "the extension '{name}' has already been added"
            )));
        }
        self.extensions.insert(name, extension);
        Ok(())
    }

    /// Remove every validator.
    pub fn delete_all(&mut self) {
        self.extensions.clear();
    }

    /// The validator registered for `name`.
    pub fn get(&self, name: &str) -> Option<&dyn Extension> {
        self.extensions.get(name).map(AsRef::as_ref)
    }

    /// Validate every entry of an authenticator extension output map.
    pub fn validate_all(
        &self,
        outputs: &[(Value, Value)],
        ctx: &ExtensionContext,
        audit: &mut Audit,
    ) -> Result<()> {
        for (key, value) in outputs {
            let name = key.as_text().ok_or_else(|| {
                Error::format("authenticator extension identifiers must be strings")
            })?;
            match self.get(name) {
                Some(extension) => extension.validate(value, ctx)?,
                None => audit.set_warning(
                    format!("extension-{name}"),
                    "unknown authenticator extension output was not validated",
                ),
            }
        }
        Ok(())
    }
}

/// `credProtect`: the protection level the authenticator applied, 1 to 3.
///
/// <https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-errata-20220621.html#sctn-credProtect-extension>
#[derive(Debug, Default, Clone, Copy)]
pub struct CredProtect;

impl Extension for CredProtect {
    fn name(&self) -> &str {
        "credProtect"
    }

    fn validate(&self, value: &Value, ctx: &ExtensionContext) -> Result<()> {
        if ctx.ceremony != Ceremony::Attestation {
            return Err(Error::verification(
                "credProtect output is only returned on registration",
            ));
        }
        let level = value.as_integer().and_then(|level| u8::try_from(level).ok());
        match level {
            Some(1..=3) => Ok(()),
            _ => Err(Error::verification(
                "credProtect: expected a protection level between 1 and 3",
            )),
        }
    }
}

/// `hmac-secret`: a boolean on registration, encrypted secrets on authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct HmacSecret;

impl Extension for HmacSecret {
    fn name(&self) -> &str {
        "hmac-secret"
    }

    fn validate(&self, value: &Value, ctx: &ExtensionContext) -> Result<()> {
        let valid = match ctx.ceremony {
            Ceremony::Attestation => value.is_bool(),
            Ceremony::Assertion => value
                .as_bytes()
                .is_some_and(|secret| matches!(secret.len(), 48 | 80)),
        };
        if valid {
            Ok(())
        } else {
            Err(Error::verification(format!(
                "hmac-secret: unexpected output for {}",
                ctx.ceremony
            )))
        }
    }
}
