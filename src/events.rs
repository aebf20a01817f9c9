//! Real-time event types and broadcast fan-out.
//!
//! The distributor publishes two event types to connected sessions:
//! `new-context` (a freshly submitted event, delivered to sessions other
//! than the originator) and `suggestions-update` (the ranked list for the
//! originating subject once ranking completes).
//!
//! Publishing is best-effort over a `tokio::sync::broadcast` channel: it
//! never blocks the distributor, send errors when nobody is listening are
//! ignored, and lagged subscribers simply drop events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{ContextEvent, Suggestion};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    NewContext {
        subject_id: String,
        event: ContextEvent,
    },
    SuggestionsUpdate {
        subject_id: String,
        suggestions: Vec<Suggestion>,
    },
}

impl RealtimeEvent {
    pub fn subject_id(&self) -> &str {
        match self {
            RealtimeEvent::NewContext { subject_id, .. } => subject_id,
            RealtimeEvent::SuggestionsUpdate { subject_id, .. } => subject_id,
        }
    }
}

/// One published event plus the session that caused it, so delivery can
/// exclude the originator.
#[derive(Debug, Clone)]
pub struct Published {
    pub origin_session: Option<String>,
    pub event: RealtimeEvent,
}

/// Decides whether a published event reaches one subscriber session.
///
/// `new-context` never goes back to its originating session. With
/// `scope_to_subject` (the default contract) it additionally requires the
/// subscriber to have declared the event's subject; without it the
/// original broadcast-to-everyone-else behavior applies.
/// `suggestions-update` always goes to the event subject's sessions;
/// subscribers with no declared subject act as wildcard observers.
pub fn should_deliver(
    published: &Published,
    session_id: &str,
    subject_id: Option<&str>,
    scope_to_subject: bool,
) -> bool {
    match &published.event {
        RealtimeEvent::NewContext {
            subject_id: event_subject,
            ..
        } => {
            if published.origin_session.as_deref() == Some(session_id) {
                return false;
            }
            if scope_to_subject {
                subject_id == Some(event_subject.as_str())
            } else {
                true
            }
        }
        RealtimeEvent::SuggestionsUpdate {
            subject_id: event_subject,
            ..
        } => match subject_id {
            Some(subject) => subject == event_subject,
            None => true,
        },
    }
}

/// Fan-out handle shared by the distributor and the SSE endpoint.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Published>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to all current subscribers. Returns the receiver count at
    /// send time; zero when nobody is listening (not an error).
    pub fn publish(&self, origin_session: Option<String>, event: RealtimeEvent) -> usize {
        self.tx
            .send(Published {
                origin_session,
                event,
            })
            .unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Published> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
