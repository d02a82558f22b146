//! Collaborator contracts for principal, attempt, and revocation storage.
//!
//! The core never owns persistence. Hosting layers implement these traits
//! over their database of choice; [`crate::memory`] ships in-memory
//! reference implementations. Every call may suspend, and cancellation
//! propagates by dropping the future.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::StoreError;

/// Identity under authentication. Owned by the hosting layer's user
/// storage; the core reads it and never writes it back.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: String,
    /// Salted, self-describing PHC string (`$argon2id$...`).
    pub credential_hash: String,
    pub disabled: bool,
}

/// Attempt-tracking key: one lockout state per (principal, origin) pair.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct AttemptKey {
    pub principal_id: String,
    pub origin: String,
}

impl AttemptKey {
    #[must_use]
    pub fn new(principal_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            origin: origin.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// One login attempt. Pruned once it ages past the sliding window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub at: i64,
    pub outcome: AttemptOutcome,
}

/// Lockout bookkeeping for one (principal, origin) pair.
///
/// `locked_until` is always in the future while a lockout is active.
/// `strikes` keeps lockout-trigger instants inside the escalation window so
/// backoff keeps doubling across lock/unlock cycles; a success clears the
/// consecutive-failure run but never the strike history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub attempts: VecDeque<LoginAttempt>,
    pub locked_until: Option<i64>,
    pub strikes: VecDeque<i64>,
}

/// Read-only lookup of principals.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find(&self, principal_id: &str) -> Result<Option<Principal>, StoreError>;
}

/// Persistence for [`LockoutState`], keyed by (principal, origin).
///
/// The rate limiter serializes load/save per key; implementations only need
/// plain point reads and writes.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn load(&self, key: &AttemptKey) -> Result<Option<LockoutState>, StoreError>;
    async fn save(&self, key: &AttemptKey, state: &LockoutState) -> Result<(), StoreError>;
}

/// Persistence for revocation entries, keyed by refresh-token identifier.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Insert an entry if absent. Returns `true` iff this call inserted it.
    /// Must be atomic per identifier: of two concurrent inserts for the
    /// same id, exactly one observes `true`.
    async fn insert(&self, token_id: &str, revoked_at: i64) -> Result<bool, StoreError>;

    async fn contains(&self, token_id: &str) -> Result<bool, StoreError>;

    /// Drop entries revoked before the cutoff. Returns how many went.
    async fn prune(&self, before: i64) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::{AttemptKey, AttemptOutcome, LockoutState, LoginAttempt};

    #[test]
    fn attempt_key_equality_covers_both_parts() {
        let key = AttemptKey::new("u1", "203.0.113.7");
        assert_eq!(key, AttemptKey::new("u1", "203.0.113.7"));
        assert_ne!(key, AttemptKey::new("u1", "203.0.113.8"));
        assert_ne!(key, AttemptKey::new("u2", "203.0.113.7"));
    }

    #[test]
    fn lockout_state_serde_round_trip() {
        let mut state = LockoutState::default();
        state.attempts.push_back(LoginAttempt {
            at: 1_700_000_000,
            outcome: AttemptOutcome::Failure,
        });
        state.locked_until = Some(1_700_000_030);
        state.strikes.push_back(1_700_000_000);

        let json = serde_json::to_string(&state).expect("serialize");
        let decoded: LockoutState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, state);
    }
}
