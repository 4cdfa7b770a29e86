//! In-memory store of uploaded exam text, keyed by session id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug)]
struct Entry {
    text: String,
    stored_at: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// Bounded, expiring map from session id to extracted document text.
///
/// Expired entries are invisible to [`SessionCache::get`] and are purged on
/// the next insert. When full, inserting a new id evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct SessionCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
    max_entries: usize,
}

impl SessionCache {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Stores `text` under `id`, replacing any previous value.
    pub async fn put(&self, id: impl Into<String>, text: impl Into<String>) {
        let id = id.into();
        let mut entries = self.entries.write().await;

        let ttl = self.ttl;
        entries.retain(|_, entry| !entry.is_expired(ttl));

        if !entries.contains_key(&id) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                tracing::debug!(session_id = %oldest, "evicted oldest session");
            }
        }

        entries.insert(
            id,
            Entry {
                text: text.into(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Text stored under `id`, unless it is unknown or expired.
    pub async fn get(&self, id: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .filter(|entry| !entry.is_expired(self.ttl))
            .map(|entry| entry.text.clone())
    }

    /// Stores `text` under a fresh v4 UUID and returns the id.
    pub async fn create(&self, text: impl Into<String>) -> String {
        let id = Uuid::new_v4().to_string();
        self.put(id.clone(), text).await;
        id
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
