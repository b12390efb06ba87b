// Echo runner: a minimal agent backend for local runs and tests
//
// Echoes the user's message back one word at a time, recording both the
// user turn and the final model turn in the session log the way a real
// runtime would.

use async_trait::async_trait;
use futures::stream;
use std::sync::Arc;

use chatbridge_runtime::{
    AgentRunner, Result, SessionEvent, SessionService, TurnContent, TurnEvent, TurnStream,
};

pub struct EchoRunner {
    sessions: Arc<dyn SessionService>,
    app_name: String,
}

impl EchoRunner {
    pub fn new(sessions: Arc<dyn SessionService>, app_name: impl Into<String>) -> Self {
        Self {
            sessions,
            app_name: app_name.into(),
        }
    }
}

#[async_trait]
impl AgentRunner for EchoRunner {
    async fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: TurnContent,
    ) -> Result<TurnStream> {
        let text = message.text();
        self.sessions
            .append_event(
                &self.app_name,
                user_id,
                session_id,
                SessionEvent::content("user", message),
            )
            .await?;

        let reply = if text.is_empty() {
            "I heard nothing.".to_string()
        } else {
            format!("You said: {text}")
        };

        let mut events = vec![Ok(TurnEvent::started())];
        let mut spoken = String::new();
        for word in reply.split_whitespace() {
            if !spoken.is_empty() {
                spoken.push(' ');
            }
            spoken.push_str(word);
            events.push(Ok(TurnEvent::delta(word)));
        }
        events.push(Ok(TurnEvent::full(spoken)));

        self.sessions
            .append_event(
                &self.app_name,
                user_id,
                session_id,
                SessionEvent::content("model", TurnContent::agent_text(reply)),
            )
            .await?;

        Ok(Box::pin(stream::iter(events)))
    }

    async fn close(&self) -> Result<()> {
        tracing::info!(app = %self.app_name, "echo runner closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbridge_runtime::InMemorySessionService;
    use futures::StreamExt;

    #[tokio::test]
    async fn echo_turn_streams_deltas_then_full_text() {
        let sessions = Arc::new(InMemorySessionService::new());
        sessions
            .create_session("chat", "user-1", "thr_1", None)
            .await
            .unwrap();
        let runner = EchoRunner::new(sessions.clone(), "chat");

        let stream = runner
            .run("user-1", "thr_1", TurnContent::user_text("hi there"))
            .await
            .unwrap();
        let events: Vec<TurnEvent> = stream.map(|r| r.unwrap()).collect().await;

        assert!(events[0].content.is_none());
        let last = events.last().unwrap();
        assert!(!last.partial);
        assert_eq!(
            last.content.as_ref().unwrap().text(),
            "You said: hi there"
        );

        // Both turns landed in the log.
        let session = sessions
            .get_session("chat", "user-1", "thr_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.events.len(), 2);
        assert_eq!(session.events[0].author, "user");
        assert_eq!(session.events[1].author, "model");
    }
}
