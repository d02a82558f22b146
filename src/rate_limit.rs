//! Failed-attempt tracking and lockout for login flows.
//!
//! Flow overview:
//! 1) Track attempts per (principal, origin) inside a sliding window.
//! 2) Lock the pair once the consecutive-failure run hits the threshold.
//! 3) Escalate the lockout duration exponentially across repeat lockouts
//!    within a longer escalation window, so a success cannot reset the
//!    backoff an attacker already earned.
//!
//! Updates for one key are serialized through a sharded lock held across
//! the load-modify-save; unrelated keys never contend on a global lock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::warn;

use crate::config::AuthConfig;
use crate::error::StoreError;
use crate::store::{AttemptKey, AttemptOutcome, AttemptStore, LockoutState, LoginAttempt};

const LOCK_SHARDS: usize = 64;
const MAX_BACKOFF_DOUBLINGS: u32 = 20;

/// Per-(principal, origin) failure tracking and lockout.
pub struct RateLimiter {
    store: Arc<dyn AttemptStore>,
    config: AuthConfig,
    locks: Vec<Mutex<()>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn AttemptStore>, config: AuthConfig) -> Self {
        Self {
            store,
            config,
            locks: (0..LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Append an attempt and recompute the lockout state, serialized per
    /// key so concurrent failures converge on one consistent decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt store is unavailable.
    pub async fn record_attempt(
        &self,
        key: &AttemptKey,
        outcome: AttemptOutcome,
        now: i64,
    ) -> Result<(), StoreError> {
        let _guard = self.shard(key).lock().await;
        let mut state = self.store.load(key).await?.unwrap_or_default();
        self.apply(&mut state, key, outcome, now);
        self.store.save(key, &state).await
    }

    /// Whether the key is locked, and for how much longer.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt store is unavailable.
    pub async fn is_locked(
        &self,
        key: &AttemptKey,
        now: i64,
    ) -> Result<Option<Duration>, StoreError> {
        let Some(state) = self.store.load(key).await? else {
            return Ok(None);
        };
        Ok(remaining(&state, now))
    }

    fn apply(&self, state: &mut LockoutState, key: &AttemptKey, outcome: AttemptOutcome, now: i64) {
        let window = secs(self.config.attempt_window());
        let escalation = secs(self.config.escalation_window());
        state
            .attempts
            .retain(|attempt| attempt.at > now.saturating_sub(window));
        state
            .strikes
            .retain(|&at| at > now.saturating_sub(escalation));
        if state.locked_until.is_some_and(|until| until <= now) {
            state.locked_until = None;
        }

        state.attempts.push_back(LoginAttempt { at: now, outcome });
        if outcome == AttemptOutcome::Success {
            return;
        }

        let consecutive = state
            .attempts
            .iter()
            .rev()
            .take_while(|attempt| attempt.outcome == AttemptOutcome::Failure)
            .count();
        if consecutive >= self.config.failure_threshold() as usize && state.locked_until.is_none() {
            let backoff = self.backoff(state.strikes.len());
            state.locked_until = Some(now.saturating_add(secs(backoff)));
            state.strikes.push_back(now);
            // Restart the consecutive count at zero once the lock expires.
            state.attempts.clear();
            warn!(
                principal = %key.principal_id,
                origin = %key.origin,
                backoff_seconds = backoff.as_secs(),
                "lockout triggered"
            );
        }
    }

    fn backoff(&self, prior_strikes: usize) -> Duration {
        let doublings = u32::try_from(prior_strikes)
            .unwrap_or(MAX_BACKOFF_DOUBLINGS)
            .min(MAX_BACKOFF_DOUBLINGS);
        self.config
            .lockout_base()
            .saturating_mul(1 << doublings)
            .min(self.config.lockout_max())
    }

    fn shard(&self, key: &AttemptKey) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = usize::try_from(hasher.finish() % self.locks.len() as u64).unwrap_or(0);
        &self.locks[index]
    }
}

fn remaining(state: &LockoutState, now: i64) -> Option<Duration> {
    state.locked_until.and_then(|until| {
        (until > now).then(|| Duration::from_secs(u64::try_from(until - now).unwrap_or(0)))
    })
}

fn secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}
