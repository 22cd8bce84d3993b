//! Serializers for attribute stores and sessions.
//!
//! Each serializer owns a fixed 32-bit type identifier that prefixes every
//! frame it produces. The identifiers are part of the wire contract: changing
//! one breaks compatibility with nodes running an older build.

use crate::attributes::AttributeDelta;
use crate::error::{Error, Result};
use crate::registry::SerializerRegistry;
use crate::session::{SessionDelta, SessionState};
use crate::value::AttributeValue;
use crate::wire::{DataInput, DataOutput};

/// Type id of [`DataAttributesSerializer`].
pub const DATA_ATTRIBUTES_SERIALIZER_ID: u32 = 0x8192_ACE5;

/// Type id of [`DataSessionSerializer`].
pub const DATA_SESSION_SERIALIZER_ID: u32 = 0x9192_ACE5;

/// Which encoding a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Every attribute; used for the first write of a session.
    Full,
    /// Only changes since the last checkpoint; requires a baseline on the receiver.
    Delta,
}

/// Encodes attribute maps.
pub trait AttributesSerializer: Send + Sync {
    /// Stable type identifier written in the frame header.
    fn id(&self) -> u32;

    /// Registry name, used for configuration lookup and conflict reports.
    fn name(&self) -> &'static str;

    fn write_full(&self, entries: &[(String, AttributeValue)], out: &mut DataOutput) -> Result<()>;

    fn write_delta(&self, delta: &AttributeDelta, out: &mut DataOutput) -> Result<()>;

    fn read_full(&self, input: &mut DataInput<'_>) -> Result<Vec<(String, AttributeValue)>>;

    fn read_delta(&self, input: &mut DataInput<'_>) -> Result<AttributeDelta>;
}

/// Encodes whole sessions: metadata plus a nested attributes frame.
pub trait SessionSerializer: Send + Sync {
    fn id(&self) -> u32;

    fn name(&self) -> &'static str;

    fn write_full(
        &self,
        state: &SessionState,
        out: &mut DataOutput,
        registry: &SerializerRegistry,
    ) -> Result<()>;

    fn write_delta(
        &self,
        delta: &SessionDelta,
        out: &mut DataOutput,
        registry: &SerializerRegistry,
    ) -> Result<()>;

    fn read_full(
        &self,
        input: &mut DataInput<'_>,
        registry: &SerializerRegistry,
    ) -> Result<SessionState>;

    fn read_delta(
        &self,
        input: &mut DataInput<'_>,
        registry: &SerializerRegistry,
    ) -> Result<SessionDelta>;
}

/// Default attribute encoding.
///
/// ```text
/// full:  i32 count, count x (name, value)
/// delta: i32 dirty, dirty x (name, value), i32 removed, removed x name
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DataAttributesSerializer;

impl DataAttributesSerializer {
    fn read_entries(input: &mut DataInput<'_>) -> Result<Vec<(String, AttributeValue)>> {
        let count = input.read_count()?;
        // Smallest entry is 3 bytes; never trust the count for allocation.
        let mut entries = Vec::with_capacity(count.min(input.remaining() / 3));
        for _ in 0..count {
            let name = input.read_name()?;
            let value = input.read_value()?;
            entries.push((name, value));
        }
        Ok(entries)
    }

    fn write_entries(entries: &[(String, AttributeValue)], out: &mut DataOutput) -> Result<()> {
        out.write_count(entries.len())?;
        for (name, value) in entries {
            out.write_name(name)?;
            out.write_value(value)?;
        }
        Ok(())
    }
}

impl AttributesSerializer for DataAttributesSerializer {
    fn id(&self) -> u32 {
        DATA_ATTRIBUTES_SERIALIZER_ID
    }

    fn name(&self) -> &'static str {
        "data-attributes"
    }

    fn write_full(&self, entries: &[(String, AttributeValue)], out: &mut DataOutput) -> Result<()> {
        Self::write_entries(entries, out)
    }

    fn write_delta(&self, delta: &AttributeDelta, out: &mut DataOutput) -> Result<()> {
        Self::write_entries(&delta.updated, out)?;
        out.write_count(delta.removed.len())?;
        for name in &delta.removed {
            out.write_name(name)?;
        }
        Ok(())
    }

    fn read_full(&self, input: &mut DataInput<'_>) -> Result<Vec<(String, AttributeValue)>> {
        Self::read_entries(input)
    }

    fn read_delta(&self, input: &mut DataInput<'_>) -> Result<AttributeDelta> {
        let updated = Self::read_entries(input)?;
        let count = input.read_count()?;
        let mut removed = Vec::with_capacity(count.min(input.remaining() / 2));
        for _ in 0..count {
            removed.push(input.read_name()?);
        }
        Ok(AttributeDelta { updated, removed })
    }
}

/// Default session encoding.
///
/// ```text
/// full:  id, i64 creation ms, i64 last-accessed ms, i64 max-inactive s,
///        u32 attributes id, full attributes payload
/// delta: id, i64 last-accessed ms, i64 max-inactive s,
///        u32 attributes id, delta attributes payload
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DataSessionSerializer {
    attributes_id: u32,
}

impl DataSessionSerializer {
    /// Nest attributes with a specific registered attributes serializer.
    pub fn with_attributes_serializer(attributes_id: u32) -> Self {
        Self { attributes_id }
    }
}

impl Default for DataSessionSerializer {
    fn default() -> Self {
        Self::with_attributes_serializer(DATA_ATTRIBUTES_SERIALIZER_ID)
    }
}

fn read_timestamp(input: &mut DataInput<'_>) -> Result<chrono::DateTime<chrono::Utc>> {
    let millis = input.read_i64()?;
    chrono::DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::malformed(format!("timestamp {millis} out of range")))
}

impl SessionSerializer for DataSessionSerializer {
    fn id(&self) -> u32 {
        DATA_SESSION_SERIALIZER_ID
    }

    fn name(&self) -> &'static str {
        "data-session"
    }

    fn write_full(
        &self,
        state: &SessionState,
        out: &mut DataOutput,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let attributes = registry.attributes(self.attributes_id)?;
        out.write_name(&state.id)?;
        out.write_i64(state.creation_time.timestamp_millis());
        out.write_i64(state.last_accessed_time.timestamp_millis());
        out.write_i64(state.max_inactive_interval_secs);
        out.write_u32(attributes.id());
        attributes.write_full(&state.attributes, out)
    }

    fn write_delta(
        &self,
        delta: &SessionDelta,
        out: &mut DataOutput,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let attributes = registry.attributes(self.attributes_id)?;
        out.write_name(&delta.id)?;
        out.write_i64(delta.last_accessed_time.timestamp_millis());
        out.write_i64(delta.max_inactive_interval_secs);
        out.write_u32(attributes.id());
        attributes.write_delta(&delta.attributes, out)
    }

    fn read_full(
        &self,
        input: &mut DataInput<'_>,
        registry: &SerializerRegistry,
    ) -> Result<SessionState> {
        let id = input.read_name()?;
        let creation_time = read_timestamp(input)?;
        let last_accessed_time = read_timestamp(input)?;
        let max_inactive_interval_secs = input.read_i64()?;
        let attributes = registry.attributes(input.read_u32()?)?.read_full(input)?;
        Ok(SessionState {
            id,
            creation_time,
            last_accessed_time,
            max_inactive_interval_secs,
            attributes,
        })
    }

    fn read_delta(
        &self,
        input: &mut DataInput<'_>,
        registry: &SerializerRegistry,
    ) -> Result<SessionDelta> {
        let id = input.read_name()?;
        let last_accessed_time = read_timestamp(input)?;
        let max_inactive_interval_secs = input.read_i64()?;
        let attributes = registry.attributes(input.read_u32()?)?.read_delta(input)?;
        Ok(SessionDelta {
            id,
            last_accessed_time,
            max_inactive_interval_secs,
            attributes,
        })
    }
}
