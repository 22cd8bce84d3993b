//! Session replication with delta serialization.
//!
//! This crate stores web sessions in a cache region and keeps replication
//! traffic small:
//! - attribute changes are tracked per session and only the delta since the
//!   last save is shipped
//! - frames carry a fixed 4-byte type identifier resolved through an explicit
//!   [`SerializerRegistry`]
//! - idle sessions expire and lifecycle events are published to listeners
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use geode_session::{LocalRegion, LocalRegionConfig, RepositoryConfig, SerializerRegistry, SessionRepository};
//!
//! let registry = Arc::new(SerializerRegistry::with_defaults());
//! let region = Arc::new(LocalRegion::new(LocalRegionConfig::default(), registry.clone()));
//! let repo = SessionRepository::new(region, registry, RepositoryConfig::default())?;
//!
//! let mut session = repo.create_session();
//! session.set_attribute("user", "alice");
//! repo.save(&mut session).await?;
//! ```

mod attributes;
mod config;
mod error;
mod events;
mod local_region;
mod region;
mod registry;
mod repository;
mod serializer;
mod session;
mod ttl;
mod value;
mod wire;

pub use attributes::{AttributeDelta, AttributeStore};
pub use config::{
    DEFAULT_MAX_ENTRIES, DEFAULT_MAX_INACTIVE_INTERVAL_SECS, DEFAULT_REGION_NAME,
    DEFAULT_SERIALIZER, LocalRegionConfig, RepositoryConfig,
};
pub use error::{Error, Result};
pub use events::{
    EventNotifier, RegionEventBridge, SessionEvent, SessionEventKind, SessionEventListener,
};
pub use local_region::LocalRegion;
pub use region::{Region, RegionEvent, RegionEventKind, RegionListener};
pub use registry::SerializerRegistry;
pub use repository::SessionRepository;
pub use serializer::{
    AttributesSerializer, DATA_ATTRIBUTES_SERIALIZER_ID, DATA_SESSION_SERIALIZER_ID,
    DataAttributesSerializer, DataSessionSerializer, EncodeMode, SessionSerializer,
};
pub use session::{PRINCIPAL_NAME_ATTRIBUTE, Session, SessionDelta, SessionState};
pub use ttl::TtlTracker;
pub use value::AttributeValue;
pub use wire::{DataInput, DataOutput};
