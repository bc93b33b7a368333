use chrono::{DateTime, Utc};
use serde::Serialize;

/// Server-sent event payloads for a hosted game session.
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent<S> {
    StateChanged {
        session_id: String,
        snapshot: S,
        timestamp: DateTime<Utc>,
    },
    SessionClosed {
        session_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl<S: Serialize> SessionEvent<S> {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "state-changed",
            SessionEvent::SessionClosed { .. } => "session-closed",
        }
    }
}
