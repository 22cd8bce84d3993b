//! Idle-timeout tracking for region entries.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Tracked {
    last_access: Instant,
    idle_timeout: Option<Duration>,
}

impl Tracked {
    fn is_expired_at(&self, now: Instant) -> bool {
        match self.idle_timeout {
            None => false,
            Some(timeout) => now.duration_since(self.last_access) > timeout,
        }
    }
}

/// Tracks last access times and per-entry idle timeouts.
#[derive(Debug, Default)]
pub struct TtlTracker {
    entries: HashMap<String, Tracked>,
}

impl TtlTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a key (or replace its timeout) and reset its timer.
    pub fn track(&mut self, key: &str, idle_timeout: Option<Duration>) {
        self.entries.insert(
            key.to_string(),
            Tracked {
                last_access: Instant::now(),
                idle_timeout,
            },
        );
    }

    /// Record an access (resets the idle timer, keeps the timeout).
    pub fn touch(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_access = Instant::now();
        }
    }

    /// Whether a tracked key has been idle past its timeout.
    /// Untracked keys never expire.
    pub fn is_expired(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(Instant::now()))
    }

    /// Idle timeout configured for a key.
    pub fn idle_timeout(&self, key: &str) -> Option<Duration> {
        self.entries.get(key).and_then(|entry| entry.idle_timeout)
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Get all expired keys.
    pub fn get_expired(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove all expired entries and return their keys.
    pub fn drain_expired(&mut self) -> Vec<String> {
        let expired = self.get_expired();
        for key in &expired {
            self.entries.remove(key);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
