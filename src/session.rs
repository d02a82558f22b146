//! Session issuance and validation.
//!
//! `SessionAuthenticator` is the surface the hosting layer calls: `login`,
//! `validate_access`, `refresh`, `logout`. It orchestrates the credential
//! verifier, the rate limiter, the token codec, and the revocation ledger,
//! and folds their richer internal errors into the public [`AuthError`]
//! taxonomy. No HTTP types anywhere near this contract.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, error};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::credential::CredentialVerifier;
use crate::error::{AuthError, StoreError};
use crate::ledger::RevocationLedger;
use crate::rate_limit::RateLimiter;
use crate::store::{AttemptKey, AttemptOutcome, AttemptStore, PrincipalStore, RevocationStore};
use crate::token::{self, Claims, SigningKeyset, TokenKind};

/// Access/refresh pair returned by [`SessionAuthenticator::login`] and
/// [`SessionAuthenticator::refresh`].
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct SessionAuthenticator {
    principals: Arc<dyn PrincipalStore>,
    verifier: CredentialVerifier,
    limiter: RateLimiter,
    ledger: RevocationLedger,
    keyset: SigningKeyset,
    config: AuthConfig,
    clock: Arc<dyn Clock>,
}

impl SessionAuthenticator {
    #[must_use]
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        attempts: Arc<dyn AttemptStore>,
        revocations: Arc<dyn RevocationStore>,
        keyset: SigningKeyset,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = RateLimiter::new(attempts, config.clone());
        let ledger = RevocationLedger::new(revocations, config.refresh_ttl());
        Self {
            principals,
            verifier: CredentialVerifier,
            limiter,
            ledger,
            keyset,
            config,
            clock,
        }
    }

    /// Authenticate a principal and issue an access/refresh pair.
    ///
    /// Unknown, disabled, and wrong-secret principals all fail as
    /// `InvalidCredentials` at the same cost, so callers cannot probe for
    /// which principals exist. Every attempt is recorded, whichever branch
    /// is taken.
    ///
    /// # Errors
    ///
    /// `LockedOut`, `InvalidCredentials`, or `StorageUnavailable`.
    pub async fn login(
        &self,
        principal_id: &str,
        secret: &SecretString,
        origin: &str,
    ) -> Result<TokenPair, AuthError> {
        let now = self.clock.now_unix();
        let key = AttemptKey::new(principal_id, origin);

        if let Some(retry_after) = self.limiter.is_locked(&key, now).await? {
            return Err(AuthError::LockedOut { retry_after });
        }

        let verified = match self.principals.find(principal_id).await? {
            Some(principal) if !principal.disabled => {
                self.verifier.verify(&principal.credential_hash, secret)
            }
            _ => {
                self.verifier.dummy_verify(secret);
                false
            }
        };

        let outcome = if verified {
            AttemptOutcome::Success
        } else {
            AttemptOutcome::Failure
        };
        self.limiter.record_attempt(&key, outcome, now).await?;

        if !verified {
            return Err(AuthError::InvalidCredentials);
        }
        self.mint_pair(principal_id, now)
    }

    /// Validate an access token and return its claims.
    ///
    /// Self-contained: the ledger is never consulted for access tokens.
    ///
    /// # Errors
    ///
    /// `Malformed`, `SignatureInvalid`, `Expired`, or `WrongTokenKind`.
    pub fn validate_access(&self, token: &str) -> Result<Claims, AuthError> {
        let claims =
            token::verify(token, &self.keyset, self.clock.now_unix()).map_err(fold_token_error)?;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::WrongTokenKind);
        }
        Ok(claims)
    }

    /// Rotate a refresh token into a fresh access/refresh pair.
    ///
    /// The presented token's identifier is revoked atomically before the
    /// new pair is minted; of two concurrent calls with the same token,
    /// exactly one succeeds and the other sees `Revoked`.
    ///
    /// # Errors
    ///
    /// `Malformed`, `SignatureInvalid`, `Expired`, `WrongTokenKind`,
    /// `Revoked`, or `StorageUnavailable`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let now = self.clock.now_unix();
        let claims = token::verify(refresh_token, &self.keyset, now).map_err(fold_token_error)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::WrongTokenKind);
        }
        let Some(token_id) = claims.jti.as_deref() else {
            return Err(AuthError::Malformed);
        };

        if !self.ledger.revoke(token_id, now).await? {
            return Err(AuthError::Revoked);
        }
        debug!(sub = %claims.sub, "rotated refresh token");
        self.mint_pair(&claims.sub, now)
    }

    /// Revoke a refresh token's identifier.
    ///
    /// Expired tokens still log out: only the signature has to hold.
    /// Revoking an already-revoked identifier is a no-op, not a failure.
    ///
    /// # Errors
    ///
    /// `Malformed`, `SignatureInvalid`, `WrongTokenKind`, or
    /// `StorageUnavailable`.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = token::verify_signed(refresh_token, &self.keyset).map_err(fold_token_error)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::WrongTokenKind);
        }
        let Some(token_id) = claims.jti.as_deref() else {
            return Err(AuthError::Malformed);
        };

        self.ledger.revoke(token_id, self.clock.now_unix()).await?;
        Ok(())
    }

    /// Drop revocation entries whose tokens are past their natural expiry.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable`.
    pub async fn prune_revocations(&self) -> Result<u64, AuthError> {
        Ok(self.ledger.prune(self.clock.now_unix()).await?)
    }

    fn mint_pair(&self, principal_id: &str, now: i64) -> Result<TokenPair, AuthError> {
        let access = Claims {
            v: token::TOKEN_VERSION,
            sub: principal_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs(self.config.access_ttl())),
            kind: TokenKind::Access,
            jti: None,
        };
        let refresh = Claims {
            v: token::TOKEN_VERSION,
            sub: principal_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs(self.config.refresh_ttl())),
            kind: TokenKind::Refresh,
            jti: Some(Uuid::new_v4().to_string()),
        };
        Ok(TokenPair {
            access_token: token::mint(&self.keyset, &access).map_err(mint_fault)?,
            refresh_token: token::mint(&self.keyset, &refresh).map_err(mint_fault)?,
        })
    }
}

/// Fold codec errors into the public taxonomy. Key-rotation internals
/// (unknown kid, unsupported alg) surface as a plain bad signature.
fn fold_token_error(err: token::Error) -> AuthError {
    match err {
        token::Error::Expired => AuthError::Expired,
        token::Error::InvalidSignature
        | token::Error::UnknownKid(_)
        | token::Error::UnsupportedAlg(_) => AuthError::SignatureInvalid,
        _ => AuthError::Malformed,
    }
}

/// Minting can only fail on unusable key material; that is a system fault,
/// not an authentication outcome.
fn mint_fault(err: token::Error) -> AuthError {
    error!("failed to mint token: {err}");
    AuthError::StorageUnavailable(StoreError::new(anyhow::Error::new(err)))
}

/// Convert a TTL duration into whole seconds, saturating on overflow.
fn ttl_secs(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}
