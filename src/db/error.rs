use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend-neutral category of a failed administrative operation.
///
/// Callers branch on this tag; the backend's own text stays available
/// through [`DriverError::message`] for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The database being administered (or connected to) does not exist.
    TargetAbsent,
    /// The server rejected the credentials or the role is unknown.
    CredentialRejected,
    /// The server could not be reached or refused the session.
    ConnectionUnavailable,
    /// Anything not recognised by the backend's classification table.
    Unclassified,
}

/// Errors returned by every driver operation.
///
/// The first four variants carry the verbatim backend message and display
/// exactly that message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("{0}")]
    TargetAbsent(String),
    #[error("{0}")]
    CredentialRejected(String),
    #[error("{0}")]
    ConnectionUnavailable(String),
    #[error("{0}")]
    Unclassified(String),
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("Unsupported database scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Driver not available: {0} (not compiled)")]
    DriverNotAvailable(&'static str),
}

impl DriverError {
    /// Build the variant matching `kind`.
    pub fn classified(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::TargetAbsent => DriverError::TargetAbsent(message),
            ErrorKind::CredentialRejected => DriverError::CredentialRejected(message),
            ErrorKind::ConnectionUnavailable => DriverError::ConnectionUnavailable(message),
            ErrorKind::Unclassified => DriverError::Unclassified(message),
        }
    }

    /// Category tag. Setup errors raised before any backend was contacted
    /// report [`ErrorKind::Unclassified`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::TargetAbsent(_) => ErrorKind::TargetAbsent,
            DriverError::CredentialRejected(_) => ErrorKind::CredentialRejected,
            DriverError::ConnectionUnavailable(_) => ErrorKind::ConnectionUnavailable,
            DriverError::Unclassified(_)
            | DriverError::InvalidConnectionString(_)
            | DriverError::UnsupportedScheme(_)
            | DriverError::DriverNotAvailable(_) => ErrorKind::Unclassified,
        }
    }

    /// The diagnostic text without any wrapper.
    pub fn message(&self) -> &str {
        match self {
            DriverError::TargetAbsent(m)
            | DriverError::CredentialRejected(m)
            | DriverError::ConnectionUnavailable(m)
            | DriverError::Unclassified(m)
            | DriverError::InvalidConnectionString(m)
            | DriverError::UnsupportedScheme(m) => m,
            DriverError::DriverNotAvailable(feature) => feature,
        }
    }

    pub fn is_target_absent(&self) -> bool {
        self.kind() == ErrorKind::TargetAbsent
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
