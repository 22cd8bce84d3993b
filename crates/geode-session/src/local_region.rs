//! In-process region with idle-timeout expiration and LRU eviction.
//!
//! [`LocalRegion`] implements the [`Region`] contract inside the current
//! process. It stands in for a data grid region in tests and local runs:
//! - entries expire after their per-entry idle timeout, found either lazily
//!   on access or by the task started with [`LocalRegion::start_expiration_task`]
//! - the least recently used entry is evicted when the region is full
//! - deltas are merged onto the stored frame, as a grid server would
//! - listeners are called after the region lock is released

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::LocalRegionConfig;
use crate::error::{Error, Result};
use crate::region::{Region, RegionEvent, RegionEventKind, RegionListener};
use crate::registry::SerializerRegistry;
use crate::ttl::TtlTracker;

/// Inner state protected by RwLock.
struct RegionInner {
    /// Entries in LRU order.
    lru: LruCache<String, Bytes>,

    /// Idle timeout tracking.
    ttl: TtlTracker,
}

impl RegionInner {
    /// Drop `key` if it is past its idle timeout, recording the expiration.
    fn expire_if_idle(&mut self, key: &str, events: &mut Vec<RegionEvent>) {
        if self.ttl.is_expired(key) {
            self.ttl.remove(key);
            let value = self.lru.pop(key);
            debug!(key = %key, "Region entry expired on access");
            events.push(RegionEvent::new(RegionEventKind::Expire, key, value));
        }
    }
}

/// In-process implementation of [`Region`].
pub struct LocalRegion {
    inner: Arc<RwLock<RegionInner>>,
    listeners: Arc<parking_lot::RwLock<Vec<Arc<dyn RegionListener>>>>,
    registry: Arc<SerializerRegistry>,
    available: Arc<AtomicBool>,
    config: LocalRegionConfig,
}

impl LocalRegion {
    /// Create a region that merges deltas with `registry`.
    pub fn new(config: LocalRegionConfig, registry: Arc<SerializerRegistry>) -> Self {
        let cap = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);

        let inner = RegionInner {
            lru: LruCache::new(cap),
            ttl: TtlTracker::new(),
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
            listeners: Arc::new(parking_lot::RwLock::new(Vec::new())),
            registry,
            available: Arc::new(AtomicBool::new(true)),
            config,
        }
    }

    pub fn config(&self) -> &LocalRegionConfig {
        &self.config
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.lru.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.lru.is_empty()
    }

    /// Whether a live (non-expired) entry exists, without touching it.
    pub async fn contains(&self, key: &str) -> bool {
        let inner = self.inner.read().await;
        inner.lru.contains(key) && !inner.ttl.is_expired(key)
    }

    /// Simulate losing (or regaining) the connection to the region.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::CacheUnavailable(format!(
                "region '{}' is unreachable",
                self.config.name
            )))
        }
    }

    fn dispatch(&self, events: Vec<RegionEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.read().clone();
        for event in &events {
            trace!(kind = %event.kind, key = %event.key, listeners = listeners.len(), "Dispatching region event");
            for listener in &listeners {
                listener.on_event(event);
            }
        }
    }

    /// Remove every entry past its idle timeout and notify listeners.
    ///
    /// Runs periodically when the expiration task is started, but can also be
    /// called manually.
    pub async fn expire_idle(&self) -> usize {
        let events: Vec<RegionEvent> = {
            let mut inner = self.inner.write().await;
            let expired = inner.ttl.drain_expired();
            expired
                .into_iter()
                .map(|key| {
                    let value = inner.lru.pop(&key);
                    RegionEvent::new(RegionEventKind::Expire, key, value)
                })
                .collect()
        };

        let count = events.len();
        if count > 0 {
            debug!(region = %self.config.name, count = count, "Expired idle region entries");
        }
        self.dispatch(events);
        count
    }

    /// Spawn the expiration task on the current tokio runtime.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn start_expiration_task(&self) -> JoinHandle<()> {
        let region = self.clone();
        let period = self.config.expiration_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                region.expire_idle().await;
            }
        })
    }
}

impl Clone for LocalRegion {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            listeners: Arc::clone(&self.listeners),
            registry: Arc::clone(&self.registry),
            available: Arc::clone(&self.available),
            config: self.config.clone(),
        }
    }
}

#[async_trait]
impl Region for LocalRegion {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.check_available()?;
        let mut events = Vec::new();
        let value = {
            let mut inner = self.inner.write().await;
            inner.expire_if_idle(key, &mut events);
            let value = inner.lru.get(key).cloned();
            if value.is_some() {
                inner.ttl.touch(key);
            }
            value
        };
        self.dispatch(events);
        Ok(value)
    }

    async fn put(&self, key: &str, value: Bytes, idle_timeout: Option<Duration>) -> Result<()> {
        self.check_available()?;
        let mut events = Vec::new();
        {
            let mut inner = self.inner.write().await;
            inner.expire_if_idle(key, &mut events);

            if !inner.lru.contains(key)
                && inner.lru.len() >= self.config.max_entries
                && let Some((evicted_key, evicted_value)) = inner.lru.pop_lru()
            {
                debug!(key = %evicted_key, "Evicting LRU region entry to make room");
                inner.ttl.remove(&evicted_key);
                events.push(RegionEvent::new(
                    RegionEventKind::Destroy,
                    evicted_key,
                    Some(evicted_value),
                ));
            }

            let existed = inner.lru.put(key.to_string(), value.clone()).is_some();
            inner.ttl.track(key, idle_timeout);

            let kind = if existed {
                RegionEventKind::Update
            } else {
                RegionEventKind::Create
            };
            trace!(key = %key, kind = %kind, bytes = value.len(), "Region entry written");
            events.push(RegionEvent::new(kind, key, Some(value)));
        }
        self.dispatch(events);
        Ok(())
    }

    async fn put_delta(
        &self,
        key: &str,
        delta: Bytes,
        idle_timeout: Option<Duration>,
    ) -> Result<()> {
        self.check_available()?;
        let mut events = Vec::new();
        let result = {
            let mut inner = self.inner.write().await;
            inner.expire_if_idle(key, &mut events);

            let stored = inner.lru.get(key).cloned();
            match stored {
                None => Err(Error::InvalidDelta(format!(
                    "no entry for key '{key}' in region '{}'",
                    self.config.name
                ))),
                Some(stored) => self
                    .registry
                    .merge_session_delta(&stored, &delta)
                    .map(|merged| {
                        inner.lru.put(key.to_string(), merged.clone());
                        inner.ttl.track(key, idle_timeout);
                        trace!(key = %key, delta_bytes = delta.len(), "Region delta applied");
                        events.push(RegionEvent::new(RegionEventKind::Update, key, Some(merged)));
                    }),
            }
        };
        if let Err(ref e) = result {
            warn!(key = %key, error = %e, "Rejected region delta");
        }
        self.dispatch(events);
        result
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.check_available()?;
        let mut events = Vec::new();
        let existed = {
            let mut inner = self.inner.write().await;
            inner.ttl.remove(key);
            match inner.lru.pop(key) {
                Some(value) => {
                    events.push(RegionEvent::new(RegionEventKind::Destroy, key, Some(value)));
                    true
                }
                None => false,
            }
        };
        self.dispatch(events);
        Ok(existed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        Ok(inner
            .lru
            .iter()
            .filter(|(key, _)| !inner.ttl.is_expired(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn subscribe(&self, listener: Arc<dyn RegionListener>) {
        self.listeners.write().push(listener);
    }
}
