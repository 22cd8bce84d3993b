//! Session repository backed by a cache region.
//!
//! The repository creates, saves, finds and deletes sessions. The first save
//! of a session writes a full frame; later saves ship only the attribute
//! changes since the previous successful save. Lifecycle events reach the
//! [`EventNotifier`] through region notifications.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use crate::events::{EventNotifier, RegionEventBridge};
use crate::region::Region;
use crate::registry::SerializerRegistry;
use crate::session::{Session, SessionDelta, SessionState};

/// Creates, persists and looks up sessions in a [`Region`].
pub struct SessionRepository<R: Region + ?Sized> {
    region: Arc<R>,
    registry: Arc<SerializerRegistry>,
    notifier: Arc<EventNotifier>,
    serializer_id: u32,
    config: RepositoryConfig,
}

impl<R: Region + ?Sized> SessionRepository<R> {
    /// Create a repository and subscribe it to the region's notifications.
    ///
    /// Fails with [`Error::UnknownSerializer`] when the configured serializer
    /// is not registered.
    pub fn new(
        region: Arc<R>,
        registry: Arc<SerializerRegistry>,
        config: RepositoryConfig,
    ) -> Result<Self> {
        let serializer_id = registry.session_by_name(&config.serializer)?.id();
        let notifier = Arc::new(EventNotifier::new());

        region.subscribe(Arc::new(RegionEventBridge::new(
            Arc::clone(&notifier),
            Arc::clone(&registry),
        )));

        debug!(
            region = %region.name(),
            serializer = %config.serializer,
            serializer_id = %format!("{serializer_id:#010X}"),
            "Session repository ready"
        );

        Ok(Self {
            region,
            registry,
            notifier,
            serializer_id,
            config,
        })
    }

    pub fn region(&self) -> &Arc<R> {
        &self.region
    }

    pub fn registry(&self) -> &Arc<SerializerRegistry> {
        &self.registry
    }

    /// Notifier for registering lifecycle listeners.
    pub fn notifier(&self) -> &Arc<EventNotifier> {
        &self.notifier
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Create a new session. Nothing is written until it is saved.
    pub fn create_session(&self) -> Session {
        let session = Session::new(self.config.max_inactive_interval_secs);
        trace!(session_id = %session.id(), "Session created");
        session
    }

    /// Persist a session.
    ///
    /// New sessions are written in full, existing ones as a delta. A session
    /// with nothing to write is left alone. The delta is cleared only after
    /// the region accepted the write, so a failed save can be retried.
    pub async fn save(&self, session: &mut Session) -> Result<()> {
        if !session.has_delta() {
            trace!(session_id = %session.id(), "Session unchanged, skipping save");
            return Ok(());
        }

        let (state, written) = session.snapshot();
        let idle_timeout = session.max_inactive_interval();

        if session.is_new() {
            self.write_full(&state, idle_timeout).await?;
        } else {
            let delta = SessionDelta {
                id: state.id.clone(),
                last_accessed_time: state.last_accessed_time,
                max_inactive_interval_secs: state.max_inactive_interval_secs,
                attributes: written.clone(),
            };
            let frame = self.registry.encode_session_delta(self.serializer_id, &delta)?;
            trace!(
                session_id = %state.id,
                updated = delta.attributes.updated.len(),
                removed = delta.attributes.removed.len(),
                bytes = frame.len(),
                "Writing session delta"
            );

            match self.region.put_delta(&state.id, frame, idle_timeout).await {
                Ok(()) => {}
                Err(Error::InvalidDelta(reason)) => {
                    debug!(session_id = %state.id, reason = %reason, "Delta rejected, writing full session");
                    self.write_full(&state, idle_timeout).await?;
                }
                Err(e) => return Err(e),
            }
        }

        session.commit(&written);
        Ok(())
    }

    async fn write_full(&self, state: &SessionState, idle_timeout: Option<Duration>) -> Result<()> {
        let frame = self.registry.encode_session(self.serializer_id, state)?;
        trace!(
            session_id = %state.id,
            attributes = state.attributes.len(),
            bytes = frame.len(),
            "Writing full session"
        );
        self.region.put(&state.id, frame, idle_timeout).await
    }

    /// Load a session without touching it, dropping it if it has expired.
    async fn load(&self, id: &str) -> Result<Option<Session>> {
        let Some(frame) = self.region.get(id).await? else {
            trace!(session_id = %id, "Session not found");
            return Ok(None);
        };

        let session = Session::from_state(self.registry.decode_session(&frame)?);
        if session.is_expired() {
            debug!(session_id = %id, "Session expired, removing from region");
            self.region.remove(id).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Find a live session by id and record the access.
    ///
    /// The access is not written until the session is saved.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        let mut session = self.load(id).await?;
        if let Some(session) = session.as_mut() {
            session.touch();
        }
        Ok(session)
    }

    /// Delete a session. Deleting a missing session succeeds.
    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        let existed = self.region.remove(id).await?;
        debug!(session_id = %id, existed = existed, "Session deleted");
        Ok(())
    }

    /// Record an access on a session without changing any attribute.
    pub fn touch(&self, session: &mut Session) {
        session.touch();
    }

    /// Find live sessions whose principal name attribute equals `principal`,
    /// keyed by session id.
    pub async fn find_by_principal_name(&self, principal: &str) -> Result<HashMap<String, Session>> {
        let mut found = HashMap::new();
        for id in self.region.keys().await? {
            let session = match self.load(&id).await {
                Ok(Some(session)) => session,
                Ok(None) => continue,
                Err(e @ (Error::Serialization(_) | Error::UnknownType(_))) => {
                    warn!(session_id = %id, error = %e, "Skipping undecodable session in principal scan");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if session.principal_name().as_deref() == Some(principal) {
                found.insert(id, session);
            }
        }
        debug!(principal = %principal, count = found.len(), "Principal lookup finished");
        Ok(found)
    }
}
