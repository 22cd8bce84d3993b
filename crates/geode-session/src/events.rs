//! Session lifecycle events.
//!
//! The [`EventNotifier`] fans session events out to local listeners. Events
//! originate from region notifications (see [`RegionEventBridge`]), so a local
//! write publishes on the writing task and an expiration publishes on the
//! region's expiration task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::region::{RegionEvent, RegionEventKind, RegionListener};
use crate::registry::SerializerRegistry;
use crate::session::Session;

/// Lifecycle transition of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    Created,
    Updated,
    Deleted,
    Expired,
}

impl std::fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEventKind::Created => write!(f, "created"),
            SessionEventKind::Updated => write!(f, "updated"),
            SessionEventKind::Deleted => write!(f, "deleted"),
            SessionEventKind::Expired => write!(f, "expired"),
        }
    }
}

impl From<RegionEventKind> for SessionEventKind {
    fn from(kind: RegionEventKind) -> Self {
        match kind {
            RegionEventKind::Create => SessionEventKind::Created,
            RegionEventKind::Update => SessionEventKind::Updated,
            RegionEventKind::Destroy | RegionEventKind::Invalidate => SessionEventKind::Deleted,
            RegionEventKind::Expire => SessionEventKind::Expired,
        }
    }
}

/// Event published for a session lifecycle transition.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session_id: String,
    /// The session as carried by the notification, when it had a value.
    pub session: Option<Session>,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, session_id: impl Into<String>, session: Option<Session>) -> Self {
        Self {
            kind,
            session_id: session_id.into(),
            session,
            timestamp: Utc::now(),
        }
    }
}

/// Receives session events.
pub trait SessionEventListener: Send + Sync {
    fn on_session_event(&self, event: &SessionEvent);
}

impl<F> SessionEventListener for F
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn on_session_event(&self, event: &SessionEvent) {
        self(event)
    }
}

/// Forwards events into a channel; a closed receiver drops them.
impl SessionEventListener for mpsc::UnboundedSender<SessionEvent> {
    fn on_session_event(&self, event: &SessionEvent) {
        if self.send(event.clone()).is_err() {
            trace!(session_id = %event.session_id, "Event channel closed, dropping event");
        }
    }
}

/// Publishes session events to registered listeners.
#[derive(Default)]
pub struct EventNotifier {
    listeners: RwLock<Vec<Arc<dyn SessionEventListener>>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionEventListener>) {
        self.listeners.write().push(listener);
    }

    /// Forward events to a new unbounded channel and return its receiver.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_listener(Arc::new(tx));
        rx
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver an event to every listener on the calling thread.
    pub fn publish(&self, event: &SessionEvent) {
        let listeners = self.listeners.read().clone();
        trace!(
            kind = %event.kind,
            session_id = %event.session_id,
            listeners = listeners.len(),
            "Publishing session event"
        );
        for listener in &listeners {
            listener.on_session_event(event);
        }
    }
}

/// Turns region notifications into session events.
pub struct RegionEventBridge {
    notifier: Arc<EventNotifier>,
    registry: Arc<SerializerRegistry>,
}

impl RegionEventBridge {
    pub fn new(notifier: Arc<EventNotifier>, registry: Arc<SerializerRegistry>) -> Self {
        Self { notifier, registry }
    }
}

impl RegionListener for RegionEventBridge {
    fn on_event(&self, event: &RegionEvent) {
        let session = event.value.as_ref().and_then(|frame| {
            match self.registry.decode_session(frame) {
                Ok(state) => Some(Session::from_state(state)),
                Err(e) => {
                    warn!(key = %event.key, error = %e, "Undecodable session in region notification");
                    None
                }
            }
        });
        self.notifier
            .publish(&SessionEvent::new(event.kind.into(), &event.key, session));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::DATA_SESSION_SERIALIZER_ID;
    use bytes::Bytes;
    use parking_lot::Mutex;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            SessionEventKind::from(RegionEventKind::Create),
            SessionEventKind::Created
        );
        assert_eq!(
            SessionEventKind::from(RegionEventKind::Invalidate),
            SessionEventKind::Deleted
        );
        assert_eq!(SessionEventKind::Expired.to_string(), "expired");
    }

    #[test]
    fn test_closure_listener_receives_in_order() {
        let notifier = EventNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        notifier.add_listener(Arc::new(move |event: &SessionEvent| {
            sink.lock().push(event.kind);
        }));

        notifier.publish(&SessionEvent::new(SessionEventKind::Created, "s", None));
        notifier.publish(&SessionEvent::new(SessionEventKind::Updated, "s", None));
        notifier.publish(&SessionEvent::new(SessionEventKind::Expired, "s", None));

        assert_eq!(
            *seen.lock(),
            vec![
                SessionEventKind::Created,
                SessionEventKind::Updated,
                SessionEventKind::Expired
            ]
        );
    }

    #[test]
    fn test_channel_listener() {
        let notifier = EventNotifier::new();
        let mut rx = notifier.subscribe_channel();
        notifier.publish(&SessionEvent::new(SessionEventKind::Deleted, "s-9", None));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, SessionEventKind::Deleted);
        assert_eq!(event.session_id, "s-9");
    }

    #[test]
    fn test_bridge_decodes_session() {
        let registry = Arc::new(SerializerRegistry::with_defaults());
        let notifier = Arc::new(EventNotifier::new());
        let mut rx = notifier.subscribe_channel();
        let bridge = RegionEventBridge::new(Arc::clone(&notifier), Arc::clone(&registry));

        let session = Session::with_id("s-1", 60);
        session.set_attribute("a", 1);
        let frame = registry
            .encode_session(DATA_SESSION_SERIALIZER_ID, &session.to_state())
            .unwrap();
        bridge.on_event(&RegionEvent::new(RegionEventKind::Create, "s-1", Some(frame)));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, SessionEventKind::Created);
        let decoded = event.session.unwrap();
        assert_eq!(decoded.id(), "s-1");
        assert_eq!(decoded.get_attribute("a"), Some(1.into()));
    }

    #[test]
    fn test_bridge_tolerates_garbage_value() {
        let registry = Arc::new(SerializerRegistry::with_defaults());
        let notifier = Arc::new(EventNotifier::new());
        let mut rx = notifier.subscribe_channel();
        let bridge = RegionEventBridge::new(notifier, registry);

        bridge.on_event(&RegionEvent::new(
            RegionEventKind::Expire,
            "s-2",
            Some(Bytes::from_static(&[1, 2, 3])),
        ));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, SessionEventKind::Expired);
        assert!(event.session.is_none());
    }
}
