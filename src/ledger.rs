//! Refresh-token revocation ledger.
//!
//! Tracks revocation entries keyed by refresh-token identifier. An
//! identifier absent from the ledger is active: signature and expiry checks
//! bound the active set before the ledger is ever consulted, so only
//! revocations need storing. `revoke` reports whether this call created the
//! entry, which is what makes refresh rotation exactly-once under
//! concurrent replay.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::StoreError;
use crate::store::RevocationStore;

pub struct RevocationLedger {
    store: Arc<dyn RevocationStore>,
    refresh_ttl: Duration,
}

impl RevocationLedger {
    #[must_use]
    pub fn new(store: Arc<dyn RevocationStore>, refresh_ttl: Duration) -> Self {
        Self { store, refresh_ttl }
    }

    /// Revoke an identifier. Returns `true` iff this call revoked it first.
    ///
    /// # Errors
    ///
    /// Returns an error if the revocation store is unavailable.
    pub async fn revoke(&self, token_id: &str, at: i64) -> Result<bool, StoreError> {
        self.store.insert(token_id, at).await
    }

    /// # Errors
    ///
    /// Returns an error if the revocation store is unavailable.
    pub async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        self.store.contains(token_id).await
    }

    /// Drop entries whose tokens can no longer verify anyway: anything
    /// revoked more than one refresh TTL ago is past its natural expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the revocation store is unavailable.
    pub async fn prune(&self, now: i64) -> Result<u64, StoreError> {
        let horizon = i64::try_from(self.refresh_ttl.as_secs()).unwrap_or(i64::MAX);
        let dropped = self.store.prune(now.saturating_sub(horizon)).await?;
        if dropped > 0 {
            debug!(dropped, "pruned revocation entries");
        }
        Ok(dropped)
    }
}
