use fido2_rp_types::{
    authenticator::{AttestationObjectError, AuthenticatorDataError},
    webauthn::ClientDataError,
    NotBase64Encoded,
};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A caller supplied value had the wrong shape or type.
    Type,
    /// Binary or textual input was malformed.
    Format,
    /// A check on otherwise well formed input failed.
    Verification,
    /// The validator battery and the parsed fields disagree. This is a defect in the battery,
    /// not a property of the input.
    InternalAudit,
}

/// Errors produced while verifying an attestation or assertion.
///
/// The message of every variant describes exactly which check failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// See [`ErrorKind::Type`].
    #[error("{0}")]
    Type(String),

    /// See [`ErrorKind::Format`].
    #[error("{0}")]
    Format(String),

    /// See [`ErrorKind::Verification`].
    #[error("{0}")]
    Verification(String),

    /// See [`ErrorKind::InternalAudit`].
    #[error("internal audit failed: {0}")]
    Audit(String),

    /// Malformed authenticator data.
    #[error(transparent)]
    AuthenticatorData(#[from] AuthenticatorDataError),

    /// Malformed attestation object envelope.
    #[error(transparent)]
    AttestationObject(#[from] AttestationObjectError),

    /// Malformed `clientDataJSON`.
    #[error(transparent)]
    ClientData(#[from] ClientDataError),
}

impl Error {
    /// A [`ErrorKind::Type`] error.
    pub fn type_error(msg: impl Into<String>) -> Self {
        Error::Type(msg.into())
    }

    /// A [`ErrorKind::Format`] error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// A [`ErrorKind::Verification`] error.
    pub fn verification(msg: impl Into<String>) -> Self {
        Error::Verification(msg.into())
    }

    /// A [`ErrorKind::InternalAudit`] error.
    pub fn audit(msg: impl Into<String>) -> Self {
        Error::Audit(msg.into())
    }

    /// The same message reported as [`ErrorKind::Type`], for checks run on caller supplied values.
    pub(crate) fn into_type_error(self) -> Self {
        Error::Type(self.to_string())
    }

    /// The class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Type(_) => ErrorKind::Type,
            Error::Format(_)
            | Error::AuthenticatorData(_)
            | Error::AttestationObject(_)
            | Error::ClientData(_) => ErrorKind::Format,
            Error::Verification(_) => ErrorKind::Verification,
            Error::Audit(_) => ErrorKind::InternalAudit,
        }
    }
}

impl From<NotBase64Encoded> for Error {
    fn from(e: NotBase64Encoded) -> Self {
        Error::format(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_messages() {
        let err = Error::verification("counter rollback detected");
        assert_eq!(err.kind(), ErrorKind::Verification);
        assert_eq!(err.to_string(), "counter rollback detected");

        let err = Error::audit("origin was not validated");
        assert_eq!(err.kind(), ErrorKind::InternalAudit);
        assert_eq!(
            err.to_string(),
            "internal audit failed: origin was not validated"
        );

        let err = Error::from(AuthenticatorDataError::TooShort(3));
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
