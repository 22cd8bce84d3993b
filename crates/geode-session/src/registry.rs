//! Serializer registry and frame entry points.
//!
//! A registry is built once at startup and shared by `Arc` with every
//! component that encodes or decodes frames. A frame is a 4-byte big-endian
//! type identifier followed by the payload of the serializer it names.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::attributes::AttributeStore;
use crate::error::{Error, Result};
use crate::serializer::{
    AttributesSerializer, DataAttributesSerializer, DataSessionSerializer, EncodeMode,
    SessionSerializer,
};
use crate::session::{SessionDelta, SessionState};
use crate::wire::{DataInput, DataOutput};

#[derive(Clone)]
enum Registered {
    Attributes(Arc<dyn AttributesSerializer>),
    Session(Arc<dyn SessionSerializer>),
}

impl Registered {
    fn name(&self) -> &'static str {
        match self {
            Registered::Attributes(s) => s.name(),
            Registered::Session(s) => s.name(),
        }
    }
}

/// Mapping from type identifier to serializer.
#[derive(Clone, Default)]
pub struct SerializerRegistry {
    serializers: HashMap<u32, Registered>,
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self
            .serializers
            .iter()
            .map(|(id, s)| (*id, s.name()))
            .collect();
        names.sort();
        f.debug_struct("SerializerRegistry")
            .field("serializers", &names)
            .finish()
    }
}

impl SerializerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the data-serializable attribute and session serializers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let attributes = registry.register_attributes(Arc::new(DataAttributesSerializer));
        let session = registry.register_session(Arc::new(DataSessionSerializer::default()));
        debug_assert!(
            attributes.is_ok() && session.is_ok(),
            "default serializer ids collide: {attributes:?} {session:?}"
        );
        registry
    }

    /// Register an attributes serializer.
    ///
    /// Re-registering the same serializer is a no-op; a different serializer
    /// under a taken id is a [`Error::RegistryConflict`].
    pub fn register_attributes(&mut self, serializer: Arc<dyn AttributesSerializer>) -> Result<()> {
        let id = serializer.id();
        self.register(id, Registered::Attributes(serializer))
    }

    /// Register a session serializer.
    pub fn register_session(&mut self, serializer: Arc<dyn SessionSerializer>) -> Result<()> {
        let id = serializer.id();
        self.register(id, Registered::Session(serializer))
    }

    fn register(&mut self, id: u32, entry: Registered) -> Result<()> {
        if let Some(existing) = self.serializers.get(&id) {
            if existing.name() == entry.name() {
                trace!(id = %format!("{id:#010X}"), name = entry.name(), "Serializer already registered");
                return Ok(());
            }
            return Err(Error::RegistryConflict {
                id,
                existing: existing.name(),
                attempted: entry.name(),
            });
        }
        debug!(id = %format!("{id:#010X}"), name = entry.name(), "Registered serializer");
        self.serializers.insert(id, entry);
        Ok(())
    }

    /// Registered type ids, ascending.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.serializers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Look up an attributes serializer by type id.
    pub fn attributes(&self, id: u32) -> Result<Arc<dyn AttributesSerializer>> {
        match self.serializers.get(&id) {
            Some(Registered::Attributes(s)) => Ok(Arc::clone(s)),
            _ => Err(Error::UnknownType(id)),
        }
    }

    /// Look up a session serializer by type id.
    pub fn session(&self, id: u32) -> Result<Arc<dyn SessionSerializer>> {
        match self.serializers.get(&id) {
            Some(Registered::Session(s)) => Ok(Arc::clone(s)),
            _ => Err(Error::UnknownType(id)),
        }
    }

    /// Look up a session serializer by its registry name.
    pub fn session_by_name(&self, name: &str) -> Result<Arc<dyn SessionSerializer>> {
        self.serializers
            .values()
            .find_map(|entry| match entry {
                Registered::Session(s) if s.name() == name => Some(Arc::clone(s)),
                _ => None,
            })
            .ok_or_else(|| Error::UnknownSerializer(name.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Attribute frames
    // ─────────────────────────────────────────────────────────────────────

    /// Encode a store and clear its delta.
    ///
    /// The store lock is held for the whole encode; on error the delta is kept.
    pub fn encode_attributes(
        &self,
        serializer_id: u32,
        store: &AttributeStore,
        mode: EncodeMode,
    ) -> Result<Bytes> {
        let serializer = self.attributes(serializer_id)?;
        let mut out = DataOutput::new();
        out.write_u32(serializer_id);

        let mut state = store.lock();
        match mode {
            EncodeMode::Full => serializer.write_full(&state.entries(), &mut out)?,
            EncodeMode::Delta => serializer.write_delta(&state.delta(), &mut out)?,
        }
        state.clear_delta();
        drop(state);

        trace!(bytes = out.len(), ?mode, "Encoded attributes frame");
        Ok(out.freeze())
    }

    /// Decode a full attributes frame into a fresh store with no delta.
    pub fn decode_attributes(&self, frame: &[u8]) -> Result<AttributeStore> {
        let mut input = DataInput::new(frame);
        let serializer = self.attributes(input.read_u32()?)?;
        let entries = serializer.read_full(&mut input)?;
        input.finish()?;
        Ok(AttributeStore::from_entries(entries))
    }

    /// Decode a delta attributes frame and apply it onto `target`.
    ///
    /// The frame is fully parsed before `target` is touched.
    pub fn apply_attributes_delta(&self, frame: &[u8], target: &AttributeStore) -> Result<()> {
        let mut input = DataInput::new(frame);
        let serializer = self.attributes(input.read_u32()?)?;
        let delta = serializer.read_delta(&mut input)?;
        input.finish()?;
        target.apply_delta(&delta);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session frames
    // ─────────────────────────────────────────────────────────────────────

    pub fn encode_session(&self, serializer_id: u32, state: &SessionState) -> Result<Bytes> {
        let serializer = self.session(serializer_id)?;
        let mut out = DataOutput::new();
        out.write_u32(serializer_id);
        serializer.write_full(state, &mut out, self)?;
        Ok(out.freeze())
    }

    pub fn encode_session_delta(&self, serializer_id: u32, delta: &SessionDelta) -> Result<Bytes> {
        let serializer = self.session(serializer_id)?;
        let mut out = DataOutput::new();
        out.write_u32(serializer_id);
        serializer.write_delta(delta, &mut out, self)?;
        Ok(out.freeze())
    }

    /// Decode a full session frame.
    pub fn decode_session(&self, frame: &[u8]) -> Result<SessionState> {
        let mut input = DataInput::new(frame);
        let serializer = self.session(input.read_u32()?)?;
        let state = serializer.read_full(&mut input, self)?;
        input.finish()?;
        Ok(state)
    }

    /// Decode a session delta frame.
    pub fn decode_session_delta(&self, frame: &[u8]) -> Result<SessionDelta> {
        let mut input = DataInput::new(frame);
        let serializer = self.session(input.read_u32()?)?;
        let delta = serializer.read_delta(&mut input, self)?;
        input.finish()?;
        Ok(delta)
    }

    /// Apply a delta frame to a stored full frame, producing the new full frame.
    ///
    /// This is the receiving side of delta propagation: the result is encoded
    /// with the serializer that produced `stored`.
    pub fn merge_session_delta(&self, stored: &[u8], delta: &[u8]) -> Result<Bytes> {
        let stored_id = DataInput::new(stored).read_u32()?;
        let mut state = self.decode_session(stored)?;
        let delta = self.decode_session_delta(delta)?;
        if delta.id != state.id {
            return Err(Error::InvalidDelta(format!(
                "delta for session {} applied to session {}",
                delta.id, state.id
            )));
        }
        state.apply_delta(&delta);
        self.encode_session(stored_id, &state)
    }
}
