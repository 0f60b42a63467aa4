//! Error taxonomy for the key distribution center.
//!
//! Every failure is a structured value: a stable [`ErrorKind`] plus a human
//! message. Errors reset a flow to its first step and are never fatal to the
//! process.

use std::fmt;

use kdc_crypto::CryptoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by KDC operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KdcError {
    /// A registration reused a taken name
    #[error("identity already exists: {0}")]
    IdentityAlreadyExists(String),

    /// A name does not refer to any registered identity
    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    /// Both ends of a session are the same identity
    #[error("cannot create a session with yourself: {0}")]
    SelfSession(String),

    /// The pair already has a session under this label
    ///
    /// Checked without regard to direction: `(bob, alice, L)` collides with an
    /// existing `(alice, bob, L)`.
    #[error("session label {label:?} already exists between {from} and {to}")]
    DuplicateLabel {
        /// Initiator of the rejected session
        from: String,
        /// Other party of the rejected session
        to: String,
        /// Label that is already taken
        label: String,
    },

    /// No session record for the pair and label
    #[error("no session {label:?} between {identity} and {partner}")]
    SessionNotFound {
        /// Identity looking up the session
        identity: String,
        /// Other party
        partner: String,
        /// Requested label
        label: String,
    },

    /// Modular inverse does not exist (internal; unreachable for generated keys)
    #[error("modular inverse does not exist: gcd({value}, {modulus}) != 1")]
    NoInverse {
        /// Number that was inverted
        value: u64,
        /// Modulus of the inversion
        modulus: u64,
    },

    /// The supplied private exponent did not unwrap a valid session key
    #[error("session key recovery failed: {reason}")]
    SessionKeyRecovery {
        /// What went wrong
        reason: String,
    },

    /// A request field failed validation
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Backend failure (I/O, serialization, poisoned lock)
    #[error("storage error: {message}")]
    Storage {
        /// Backend description of the failure
        message: String,
        /// Whether the backend considers a retry worthwhile
        transient: bool,
    },
}

impl KdcError {
    /// Shorthand for [`KdcError::InvalidInput`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput { field, reason: reason.into() }
    }

    /// Stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IdentityAlreadyExists(_) => ErrorKind::IdentityAlreadyExists,
            Self::IdentityNotFound(_) => ErrorKind::IdentityNotFound,
            Self::SelfSession(_) => ErrorKind::SelfSession,
            Self::DuplicateLabel { .. } => ErrorKind::DuplicateLabel,
            Self::SessionNotFound { .. } => ErrorKind::SessionNotFound,
            Self::NoInverse { .. } => ErrorKind::NoInverse,
            Self::SessionKeyRecovery { .. } => ErrorKind::SessionKeyRecovery,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Returns true if this error may succeed on retry.
    ///
    /// Only backend failures the backend itself marked transient qualify.
    /// Every other error is a deterministic consequence of the request and
    /// persisted state.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage { transient: true, .. })
    }
}

/// Crypto failures surface as protocol errors.
impl From<CryptoError> for KdcError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::NoInverse { value, modulus } => Self::NoInverse { value, modulus },
            CryptoError::CaesarKeyOutOfRange(value) => Self::SessionKeyRecovery {
                reason: format!("recovered value {value} is not a caesar key"),
            },
            CryptoError::InvalidPrivateExponent(_) => {
                Self::SessionKeyRecovery { reason: err.to_string() }
            },
            CryptoError::InvalidPrimeRange { .. } => Self::invalid("prime_range", err.to_string()),
        }
    }
}

/// Stable, serializable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`KdcError::IdentityAlreadyExists`]
    IdentityAlreadyExists,
    /// See [`KdcError::IdentityNotFound`]
    IdentityNotFound,
    /// See [`KdcError::SelfSession`]
    SelfSession,
    /// See [`KdcError::DuplicateLabel`]
    DuplicateLabel,
    /// See [`KdcError::SessionNotFound`]
    SessionNotFound,
    /// See [`KdcError::NoInverse`]
    NoInverse,
    /// See [`KdcError::SessionKeyRecovery`]
    SessionKeyRecovery,
    /// See [`KdcError::InvalidInput`]
    InvalidInput,
    /// See [`KdcError::Storage`]
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IdentityAlreadyExists => "identity_already_exists",
            Self::IdentityNotFound => "identity_not_found",
            Self::SelfSession => "self_session",
            Self::DuplicateLabel => "duplicate_label",
            Self::SessionNotFound => "session_not_found",
            Self::NoInverse => "no_inverse",
            Self::SessionKeyRecovery => "session_key_recovery",
            Self::InvalidInput => "invalid_input",
            Self::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// Structured failure handed to outer layers: kind plus message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
}

impl From<&KdcError> for ErrorReport {
    fn from(err: &KdcError) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

impl From<KdcError> for ErrorReport {
    fn from(err: KdcError) -> Self {
        Self::from(&err)
    }
}
