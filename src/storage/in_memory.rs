use crate::errors::{Result, SessionError};
use crate::storage::area::HashStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Entry {
    fields: HashMap<String, String>,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if deadline <= now)
    }
}

/// Effectively unbounded TTLs are capped here instead of overflowing `Instant`.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn deadline_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl).unwrap_or(now + MAX_TTL)
}

/// In-memory hash store (no persistence, not shared across processes).
///
/// Expired keys are dropped lazily when they are next touched.
#[derive(Debug, Default)]
pub struct InMemoryHashStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| SessionError::internal("in-memory hash store lock poisoned"))
    }

    /// Locks the map and evicts `key` if its deadline has passed.
    fn lock_live(&self, key: &str) -> Result<MutexGuard<'_, HashMap<String, Entry>>> {
        let mut guard = self.lock()?;
        let now = Instant::now();
        if guard.get(key).is_some_and(|e| e.is_expired(now)) {
            guard.remove(key);
        }
        Ok(guard)
    }
}

#[async_trait]
impl HashStore for InMemoryHashStore {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.lock_live(key)?
            .entry(key.to_string())
            .or_default()
            .fields
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hvals(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .lock_live(key)?
            .get(key)
            .map(|e| e.fields.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut guard = self.lock_live(key)?;
        match guard.get_mut(key) {
            Some(entry) => {
                entry.deadline = Some(deadline_after(Instant::now(), ttl));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        Ok(self
            .lock_live(key)?
            .get(key)
            .and_then(|e| e.deadline)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
