//! Failure taxonomy for the session core.

use std::time::Duration;
use thiserror::Error;

/// Fault raised by a storage collaborator.
///
/// The only failure class that propagates as a system fault. Hosting layers
/// must render it as a 5xx-equivalent, never as bad credentials.
#[derive(Debug, Error)]
#[error("storage unavailable: {0}")]
pub struct StoreError(#[from] anyhow::Error);

impl StoreError {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(err.into())
    }
}

/// Authentication outcomes returned to the hosting layer.
///
/// Every variant except `StorageUnavailable` is an expected, locally handled
/// condition. Messages stay opaque: no hash algorithm, no key id.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("locked out: {}s remaining", retry_after.as_secs())]
    LockedOut { retry_after: Duration },
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
    #[error("wrong token kind")]
    WrongTokenKind,
    #[error("token revoked")]
    Revoked,
    #[error("storage unavailable")]
    StorageUnavailable(#[from] StoreError),
}

impl AuthError {
    /// Whether this outcome is a system fault rather than an
    /// authentication decision.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
