//! In-memory collaborator implementations.
//!
//! Reference implementations of the storage contracts for tests and
//! embedded deployments. Attempt and revocation state live in sharded
//! async-mutex hash maps so writes for unrelated keys do not contend.

use std::collections::HashMap;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::{
    AttemptKey, AttemptStore, LockoutState, Principal, PrincipalStore, RevocationStore,
};

const SHARDS: usize = 16;

fn shard_index(key: &impl Hash, len: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    usize::try_from(hasher.finish() % len as u64).unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct MemoryPrincipalStore {
    principals: Mutex<HashMap<String, Principal>>,
}

impl MemoryPrincipalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a principal. Provisioning-side helper; the core
    /// itself only reads.
    pub async fn upsert(&self, principal: Principal) {
        self.principals
            .lock()
            .await
            .insert(principal.id.clone(), principal);
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find(&self, principal_id: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self.principals.lock().await.get(principal_id).cloned())
    }
}

#[derive(Debug)]
pub struct MemoryAttemptStore {
    shards: Vec<Mutex<HashMap<AttemptKey, LockoutState>>>,
}

impl Default for MemoryAttemptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAttemptStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, key: &AttemptKey) -> &Mutex<HashMap<AttemptKey, LockoutState>> {
        &self.shards[shard_index(key, self.shards.len())]
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn load(&self, key: &AttemptKey) -> Result<Option<LockoutState>, StoreError> {
        Ok(self.shard(key).lock().await.get(key).cloned())
    }

    async fn save(&self, key: &AttemptKey, state: &LockoutState) -> Result<(), StoreError> {
        self.shard(key)
            .lock()
            .await
            .insert(key.clone(), state.clone());
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryRevocationStore {
    shards: Vec<Mutex<HashMap<String, i64>>>,
}

impl Default for MemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRevocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, token_id: &str) -> &Mutex<HashMap<String, i64>> {
        &self.shards[shard_index(&token_id, self.shards.len())]
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn insert(&self, token_id: &str, revoked_at: i64) -> Result<bool, StoreError> {
        let mut shard = self.shard(token_id).lock().await;
        match shard.entry(token_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(revoked_at);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn contains(&self, token_id: &str) -> Result<bool, StoreError> {
        Ok(self.shard(token_id).lock().await.contains_key(token_id))
    }

    async fn prune(&self, before: i64) -> Result<u64, StoreError> {
        let mut dropped = 0u64;
        for shard in &self.shards {
            let mut entries = shard.lock().await;
            let len_before = entries.len();
            entries.retain(|_, &mut revoked_at| revoked_at >= before);
            dropped += (len_before - entries.len()) as u64;
        }
        Ok(dropped)
    }
}
