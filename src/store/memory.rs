//! In-memory entry store.
//!
//! A single mutex-guarded map plus one broadcast [`Notify`]. The mutex is
//! held only across map operations, never across an await, so a slow
//! downstream operation for one key cannot stall access for unrelated keys.

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use tracing::debug;

use super::EntryStore;
use crate::model::Entry;

pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    /// Broadcast signal: fired on every mutation that can resolve a wait.
    /// Waiters re-check their key's state on each wake.
    resolved: Notify,
    ttl: chrono::Duration,
}

impl MemoryStore {
    /// Create a store whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            resolved: Notify::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().expect("entry map poisoned")
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Entry> {
        self.lock().get(key).cloned()
    }

    fn insert_if_absent(&self, key: &str, entry: Entry) -> Option<Entry> {
        let mut map = self.lock();
        match map.entry(key.to_string()) {
            MapEntry::Occupied(existing) => Some(existing.get().clone()),
            MapEntry::Vacant(slot) => {
                slot.insert(entry);
                None
            }
        }
    }

    fn set(&self, key: &str, entry: Entry) {
        {
            let mut map = self.lock();
            map.insert(key.to_string(), entry);
        }
        // Wake everyone parked on this store. Waiters on other keys re-check
        // and go back to sleep.
        self.resolved.notify_waiters();
    }

    async fn wait_until_resolved(&self, key: &str) -> Option<Entry> {
        loop {
            let notified = self.resolved.notified();
            tokio::pin!(notified);
            {
                let map = self.lock();
                match map.get(key) {
                    None => return None,
                    Some(entry) if entry.state.is_terminal() => return Some(entry.clone()),
                    Some(_) => {}
                }
                // Register for the next notify_waiters() before releasing
                // the lock, so a set() landing in between cannot be missed.
                notified.as_mut().enable();
            }
            notified.await;
        }
    }

    fn sweep(&self) -> usize {
        let now = Utc::now();
        let evicted = {
            let mut map = self.lock();
            let before = map.len();
            map.retain(|_, entry| entry.age(now) <= self.ttl);
            before - map.len()
        };
        if evicted > 0 {
            debug!(evicted, "swept expired entries");
            // Anyone parked on a swept key must observe its absence.
            self.resolved.notify_waiters();
        }
        evicted
    }
}
