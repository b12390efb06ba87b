// In-memory SessionService for examples and testing

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{Result, RuntimeError};
use crate::session::{Session, SessionEvent, SessionService};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionKey {
    fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

/// In-memory session service. Not durable across restarts; the service
/// lock serializes concurrent appends.
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&SessionKey::new(app_name, user_id, session_id))
            .cloned())
    }

    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        state: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Session> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(RuntimeError::SessionExists(session_id.to_string()));
        }

        let now = Utc::now();
        let session = Session {
            id: session_id.to_string(),
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            state: state.unwrap_or_default(),
            events: Vec::new(),
            created_at: now,
            last_update_time: now,
        };
        sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn append_event(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        event: SessionEvent,
    ) -> Result<()> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&key).ok_or_else(|| {
            RuntimeError::session_not_found(app_name, user_id, session_id)
        })?;

        if let Some(delta) = &event.state_delta {
            for (k, v) in delta {
                session.state.insert(k.clone(), v.clone());
            }
        }
        session.last_update_time = event.timestamp;
        session.events.push(event);
        Ok(())
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.app_name == app_name && s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TurnContent;

    #[tokio::test]
    async fn create_then_get() {
        let svc = InMemorySessionService::new();
        svc.create_session("app", "u1", "s1", None).await.unwrap();

        let session = svc.get_session("app", "u1", "s1").await.unwrap().unwrap();
        assert_eq!(session.id, "s1");
        assert!(session.events.is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let svc = InMemorySessionService::new();
        svc.create_session("app", "u1", "s1", None).await.unwrap();

        let err = svc.create_session("app", "u1", "s1", None).await.unwrap_err();
        assert!(matches!(err, RuntimeError::SessionExists(_)));
    }

    #[tokio::test]
    async fn get_is_scoped_by_user() {
        let svc = InMemorySessionService::new();
        svc.create_session("app", "u1", "s1", None).await.unwrap();

        assert!(svc.get_session("app", "u2", "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn append_merges_state_delta() {
        let svc = InMemorySessionService::new();
        svc.create_session("app", "u1", "s1", None).await.unwrap();

        let mut delta = serde_json::Map::new();
        delta.insert("title".into(), serde_json::json!("First chat"));
        svc.append_event("app", "u1", "s1", SessionEvent::state_update("system", delta))
            .await
            .unwrap();

        let session = svc.get_session("app", "u1", "s1").await.unwrap().unwrap();
        assert_eq!(session.state["title"], "First chat");
        assert_eq!(session.events.len(), 1);
        assert!(session.last_update_time >= session.created_at);
    }

    #[tokio::test]
    async fn append_to_missing_session_fails() {
        let svc = InMemorySessionService::new();
        let err = svc
            .append_event(
                "app",
                "u1",
                "nope",
                SessionEvent::content("user", TurnContent::user_text("hi")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn list_filters_by_app_and_user() {
        let svc = InMemorySessionService::new();
        svc.create_session("app", "u1", "s1", None).await.unwrap();
        svc.create_session("app", "u1", "s2", None).await.unwrap();
        svc.create_session("app", "u2", "s3", None).await.unwrap();
        svc.create_session("other", "u1", "s4", None).await.unwrap();

        let sessions = svc.list_sessions("app", "u1").await.unwrap();
        let mut ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["s1", "s2"]);
    }
}
