// Session model and the SessionService trait
//
// A session is the runtime's persistence unit, keyed by app name + user id
// + session id. It holds an append-only event log and a mutable state blob;
// appending an event with a state delta merges the delta into the blob.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::events::TurnContent;

/// One record in a session's append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: String,
    /// "user", "system", or the agent's name.
    pub author: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TurnContent>,
    #[serde(default)]
    pub partial: bool,
    /// Keys merged into the session state when the event is appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_delta: Option<serde_json::Map<String, serde_json::Value>>,
}

impl SessionEvent {
    /// A final (non-partial) content record.
    pub fn content(author: impl Into<String>, content: TurnContent) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            author: author.into(),
            timestamp: Utc::now(),
            content: Some(content),
            partial: false,
            state_delta: None,
        }
    }

    /// A state-changing marker record with no displayable content.
    pub fn state_update(
        author: impl Into<String>,
        state_delta: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            author: author.into(),
            timestamp: Utc::now(),
            content: None,
            partial: false,
            state_delta: Some(state_delta),
        }
    }
}

/// The runtime's persistence unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    /// Mutable state blob, updated by appending events with state deltas.
    pub state: serde_json::Map<String, serde_json::Value>,
    /// Append-only event log.
    pub events: Vec<SessionEvent>,
    pub created_at: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

/// Storage seam for sessions. Implementations own durability; the bridge
/// never writes around this interface.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Look up one session. `Ok(None)` when the triple does not exist.
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>>;

    /// Create a session with the given id and optional initial state.
    /// Fails with [`crate::RuntimeError::SessionExists`] on duplicates.
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        state: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Session>;

    /// Append one event to the session's log, merging any state delta into
    /// the state blob and bumping `last_update_time`.
    async fn append_event(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        event: SessionEvent,
    ) -> Result<()>;

    /// All sessions for the user/app pair.
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>>;
}
