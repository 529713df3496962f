//! In-memory versioned bucket
//!
//! Behaves like a JetStream key-value bucket for a single process: one
//! sequence shared by all keys, `create` fails on existing keys, `update`
//! fails on a stale revision. Clones share one bucket, so a test can keep a
//! handle to inspect the contents after the sink owning the other one has
//! been closed. Used by the unit tests.

use crate::storage::traits::{KvBucket, KvError, KvResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, (Bytes, u64)>,
    sequence: u64,
    updates: usize,
    closes: usize,
    race_keys: HashSet<String>,
    write_failure: Option<String>,
}

impl State {
    fn next_revision(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn check_writable(&self) -> KvResult<()> {
        match &self.write_failure {
            Some(message) => Err(KvError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

/// A [`KvBucket`] held in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBucket {
    state: Arc<Mutex<State>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current value and revision of `key`
    pub fn get(&self, key: &str) -> Option<(Bytes, u64)> {
        self.lock().entries.get(key).cloned()
    }

    /// All keys currently stored, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of `update` calls seen, successful or not
    pub fn update_count(&self) -> usize {
        self.lock().updates
    }

    /// Number of times the bucket connection was closed
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Writes `key` directly, as another client would have
    pub fn seed(&self, key: &str, value: &[u8]) {
        let mut state = self.lock();
        let revision = state.next_revision();
        state
            .entries
            .insert(key.to_string(), (Bytes::copy_from_slice(value), revision));
    }

    /// Simulates a concurrent writer touching `key` right after its revision
    /// is next read, so the caller's follow-up update is stale
    pub fn race_on_next_read(&self, key: &str) {
        self.lock().race_keys.insert(key.to_string());
    }

    /// Makes every subsequent write fail with `KvError::Api`
    pub fn fail_writes(&self, message: &str) {
        self.lock().write_failure = Some(message.to_string());
    }
}

#[async_trait]
impl KvBucket for MemoryBucket {
    async fn create(&self, key: &str, value: Bytes) -> KvResult<u64> {
        let mut state = self.lock();
        state.check_writable()?;

        if state.entries.contains_key(key) {
            return Err(KvError::Conflict {
                key: key.to_string(),
            });
        }

        let revision = state.next_revision();
        state.entries.insert(key.to_string(), (value, revision));
        Ok(revision)
    }

    async fn revision(&self, key: &str) -> KvResult<Option<u64>> {
        let mut state = self.lock();
        let current = state.entries.get(key).map(|(_, rev)| *rev);

        if current.is_some() && state.race_keys.remove(key) {
            let revision = state.next_revision();
            if let Some(entry) = state.entries.get_mut(key) {
                entry.0 = Bytes::from_static(b"written by another client");
                entry.1 = revision;
            }
        }

        Ok(current)
    }

    async fn update(&self, key: &str, value: Bytes, expected: u64) -> KvResult<u64> {
        let mut state = self.lock();
        state.updates += 1;
        state.check_writable()?;

        let current = state.entries.get(key).map(|(_, rev)| *rev);
        if current != Some(expected) {
            return Err(KvError::Conflict {
                key: key.to_string(),
            });
        }

        let revision = state.next_revision();
        state.entries.insert(key.to_string(), (value, revision));
        Ok(revision)
    }

    async fn close(&self) -> KvResult<()> {
        self.lock().closes += 1;
        Ok(())
    }
}
