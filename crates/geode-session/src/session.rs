//! Session records.

use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

use crate::attributes::{AttributeDelta, AttributeStore};
use crate::value::AttributeValue;

/// Attribute holding the authenticated principal, used by principal lookups.
pub const PRINCIPAL_NAME_ATTRIBUTE: &str = "session.principal_name";

/// Current time at the millisecond precision the wire format carries.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}

/// Plain session data as carried by a full frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub id: String,
    pub creation_time: DateTime<Utc>,
    pub last_accessed_time: DateTime<Utc>,
    pub max_inactive_interval_secs: i64,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl SessionState {
    /// Apply a delta received for this session.
    pub fn apply_delta(&mut self, delta: &SessionDelta) {
        self.last_accessed_time = delta.last_accessed_time;
        self.max_inactive_interval_secs = delta.max_inactive_interval_secs;
        let store = AttributeStore::from_entries(std::mem::take(&mut self.attributes));
        store.apply_delta(&delta.attributes);
        self.attributes = store.snapshot();
    }
}

/// Changes to a session since its last save, as carried by a delta frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDelta {
    pub id: String,
    pub last_accessed_time: DateTime<Utc>,
    pub max_inactive_interval_secs: i64,
    pub attributes: AttributeDelta,
}

/// A web session replicated through a cache region.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    creation_time: DateTime<Utc>,
    last_accessed_time: DateTime<Utc>,
    max_inactive_interval_secs: i64,
    attributes: AttributeStore,
    is_new: bool,
    metadata_dirty: bool,
}

impl Session {
    /// Create a new unsaved session with a random id.
    pub fn new(max_inactive_interval_secs: i64) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), max_inactive_interval_secs)
    }

    /// Create a new unsaved session with a specific id.
    pub fn with_id(id: impl Into<String>, max_inactive_interval_secs: i64) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            creation_time: now,
            last_accessed_time: now,
            max_inactive_interval_secs,
            attributes: AttributeStore::new(),
            is_new: true,
            metadata_dirty: false,
        }
    }

    /// Rebuild a session decoded from a region entry.
    pub fn from_state(state: SessionState) -> Self {
        Self {
            id: state.id,
            creation_time: state.creation_time,
            last_accessed_time: state.last_accessed_time,
            max_inactive_interval_secs: state.max_inactive_interval_secs,
            attributes: AttributeStore::from_entries(state.attributes),
            is_new: false,
            metadata_dirty: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    pub fn last_accessed_time(&self) -> DateTime<Utc> {
        self.last_accessed_time
    }

    pub fn max_inactive_interval_secs(&self) -> i64 {
        self.max_inactive_interval_secs
    }

    /// Idle timeout for the region entry; `None` when the session never expires.
    pub fn max_inactive_interval(&self) -> Option<Duration> {
        u64::try_from(self.max_inactive_interval_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn set_last_accessed_time(&mut self, time: DateTime<Utc>) {
        self.last_accessed_time = time;
        self.metadata_dirty = true;
    }

    pub fn set_max_inactive_interval_secs(&mut self, secs: i64) {
        self.max_inactive_interval_secs = secs;
        self.metadata_dirty = true;
    }

    /// Record an access now. Changes no attribute.
    pub fn touch(&mut self) {
        self.set_last_accessed_time(now_millis());
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether more than the max inactive interval has passed since the last access.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.max_inactive_interval_secs <= 0 {
            return false;
        }
        match TimeDelta::try_seconds(self.max_inactive_interval_secs) {
            Some(interval) => now - self.last_accessed_time > interval,
            None => false,
        }
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.set_attribute(name, value);
    }

    pub fn get_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.attributes.get_attribute(name)
    }

    pub fn remove_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove_attribute(name)
    }

    pub fn attribute_names(&self) -> std::vec::IntoIter<String> {
        self.attributes.attribute_names()
    }

    pub fn principal_name(&self) -> Option<String> {
        self.get_attribute(PRINCIPAL_NAME_ATTRIBUTE)
            .and_then(|v| v.as_str().map(str::to_owned))
    }

    /// True until the session has been written to a region.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether a save has anything to write.
    pub fn has_delta(&self) -> bool {
        self.is_new || self.metadata_dirty || self.attributes.has_delta()
    }

    /// Full state plus the attribute changes it covers, read under one lock.
    pub(crate) fn snapshot(&self) -> (SessionState, AttributeDelta) {
        let (attributes, pending) = {
            let state = self.attributes.lock();
            (state.entries(), state.delta())
        };
        let state = SessionState {
            id: self.id.clone(),
            creation_time: self.creation_time,
            last_accessed_time: self.last_accessed_time,
            max_inactive_interval_secs: self.max_inactive_interval_secs,
            attributes,
        };
        (state, pending)
    }

    pub fn to_state(&self) -> SessionState {
        self.snapshot().0
    }

    /// Changes since the last save.
    pub fn delta(&self) -> SessionDelta {
        SessionDelta {
            id: self.id.clone(),
            last_accessed_time: self.last_accessed_time,
            max_inactive_interval_secs: self.max_inactive_interval_secs,
            attributes: self.attributes.delta(),
        }
    }

    /// Mark a successful write covering `written`.
    pub(crate) fn commit(&mut self, written: &AttributeDelta) {
        self.attributes.commit(written);
        self.is_new = false;
        self.metadata_dirty = false;
    }
}
