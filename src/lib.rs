//! # Sesio (Credential Issuance & Session Validation Core)
//!
//! `sesio` authenticates a principal's credentials, issues signed,
//! time-bounded access tokens, validates tokens presented on subsequent
//! requests, and enforces abuse-resistance around authentication attempts.
//!
//! The crate is the core only. HTTP routing, persistence, and UI belong to
//! the hosting layer, which implements the storage contracts in [`store`]
//! and calls the four operations on [`session::SessionAuthenticator`]:
//! `login`, `validate_access`, `refresh`, `logout`.
//!
//! ## Tokens
//!
//! Tokens are compact three-segment signed strings (HMAC-SHA256) carrying
//! their own claims and expiry; access tokens validate offline, refresh
//! tokens additionally pass through the revocation ledger so rotation and
//! logout take effect before natural expiry. The signing keyset is ordered
//! newest-first: the head key mints, every key verifies, which is how
//! rotated-out keys get their grace period.
//!
//! ## Lockout
//!
//! Failed logins are tracked per (principal, origin) pair inside a sliding
//! window. Hitting the failure threshold locks the pair with an
//! exponentially escalating backoff; a success resets the consecutive
//! count but never the escalation history. Unknown principals fail exactly
//! like wrong secrets, at the same cost, to prevent enumeration.

pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod rate_limit;
pub mod session;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use credential::{CredentialVerifier, hash_secret};
pub use error::{AuthError, StoreError};
pub use ledger::RevocationLedger;
pub use rate_limit::RateLimiter;
pub use session::{SessionAuthenticator, TokenPair};
pub use store::{
    AttemptKey, AttemptOutcome, AttemptStore, LockoutState, LoginAttempt, Principal,
    PrincipalStore, RevocationStore,
};
pub use token::{Claims, SigningKey, SigningKeyset, TokenKind};
