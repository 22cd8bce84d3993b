//! Contract for the cache region sessions are stored in.
//!
//! A region maps session ids to encoded session frames. Implementations wrap a
//! real data grid client (with its own connection pool and retry policy) or,
//! for tests and local runs, [`LocalRegion`](crate::LocalRegion).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// What happened to a region entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionEventKind {
    /// A new entry was written.
    Create,
    /// An existing entry was replaced or had a delta applied.
    Update,
    /// The entry was removed explicitly or evicted.
    Destroy,
    /// The entry value was invalidated.
    Invalidate,
    /// The entry reached its idle timeout.
    Expire,
}

impl std::fmt::Display for RegionEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionEventKind::Create => write!(f, "create"),
            RegionEventKind::Update => write!(f, "update"),
            RegionEventKind::Destroy => write!(f, "destroy"),
            RegionEventKind::Invalidate => write!(f, "invalidate"),
            RegionEventKind::Expire => write!(f, "expire"),
        }
    }
}

/// Notification delivered to region subscribers.
#[derive(Debug, Clone)]
pub struct RegionEvent {
    pub kind: RegionEventKind,
    pub key: String,
    /// Full frame of the entry: the new value for create/update, the last
    /// value for destroy/expire when the region still had it.
    pub value: Option<Bytes>,
}

impl RegionEvent {
    pub fn new(kind: RegionEventKind, key: impl Into<String>, value: Option<Bytes>) -> Self {
        Self {
            kind,
            key: key.into(),
            value,
        }
    }
}

/// Receives region notifications.
///
/// Called on the task that performed the operation for local writes, or on
/// the region's own task for expiration.
pub trait RegionListener: Send + Sync {
    fn on_event(&self, event: &RegionEvent);
}

/// A named key-value collection in the data grid.
#[async_trait]
pub trait Region: Send + Sync {
    fn name(&self) -> &str;

    /// Read an entry's full frame.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Write a full frame, setting the entry idle timeout.
    async fn put(&self, key: &str, value: Bytes, idle_timeout: Option<Duration>) -> Result<()>;

    /// Apply a delta frame to an existing entry.
    ///
    /// Fails with [`Error::InvalidDelta`](crate::Error::InvalidDelta) when the
    /// entry has no baseline to apply it to.
    async fn put_delta(&self, key: &str, delta: Bytes, idle_timeout: Option<Duration>)
    -> Result<()>;

    /// Remove an entry. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Keys of all live entries.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Register a listener for entry notifications.
    fn subscribe(&self, listener: Arc<dyn RegionListener>);
}
