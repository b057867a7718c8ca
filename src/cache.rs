//! Cache collaborator interface
//!
//! The client consults a cache for fallback values while the circuit is
//! open and writes successful live fetches through to keep it warm. The
//! cache is strictly passive: it never calls back into the client, and
//! the persistent storage engine behind it lives outside this crate.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Key/value store with TTL, safe for concurrent use under its own
/// contract
#[async_trait]
pub trait MetadataCache: Send + Sync {
    /// Fetch a cached payload; `None` on miss or expiry.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store a payload for `ttl`. Failures are the implementation's
    /// problem to log; the client treats writes as best-effort.
    async fn set(&self, key: &str, value: Value, ttl: Duration);
}

/// In-memory TTL cache
///
/// Backs tests and single-process deployments; production Curator hands
/// the client its persistent store behind the same trait.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MetadataCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            _ => None,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires_at));
    }
}
