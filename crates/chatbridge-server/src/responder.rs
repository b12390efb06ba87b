// Runner-backed responder
//
// Bridges the processor's Respond seam to a registered agent runner: look
// the runner up by app, hand it the user's text, translate its turn-event
// stream, and merge in anything tool code pushes through the turn context.

use async_trait::async_trait;
use std::sync::Arc;

use chatbridge_core::{
    interleave, stream_agent_response_with_policy, BridgeContext, EventStream, FinalPolicy,
    Respond, Result, TurnContext,
};
use chatbridge_protocol::items::UserMessageItem;
use chatbridge_protocol::thread::ThreadMetadata;
use chatbridge_runtime::{RunnerRegistry, TurnContent};

pub struct RunnerResponder {
    registry: Arc<RunnerRegistry>,
    policy: FinalPolicy,
}

impl RunnerResponder {
    pub fn new(registry: Arc<RunnerRegistry>, policy: FinalPolicy) -> Self {
        Self { registry, policy }
    }
}

#[async_trait]
impl Respond for RunnerResponder {
    async fn respond(
        &self,
        thread: &ThreadMetadata,
        item: Option<&UserMessageItem>,
        ctx: &BridgeContext,
    ) -> Result<EventStream> {
        let runner = self.registry.get(&ctx.app_name).await?;
        let text = item.map(|i| i.text()).unwrap_or_default();

        let turn = runner
            .run(&ctx.user_id, &thread.id, TurnContent::user_text(text))
            .await?;

        // The turn context handle would be passed into any tool layer the
        // runner exposes; dropping the response stream drops it, ending
        // the turn.
        let (turn_ctx, bridge) = TurnContext::channel(&thread.id);
        let events = stream_agent_response_with_policy(thread, turn, self.policy);
        Ok(interleave(events, turn_ctx, bridge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::EchoRunner;
    use chatbridge_core::BridgeError;
    use chatbridge_protocol::events::ThreadStreamEvent;
    use chatbridge_runtime::{InMemorySessionService, SessionService};
    use chrono::Utc;
    use futures::StreamExt;

    fn meta() -> ThreadMetadata {
        ThreadMetadata {
            id: "thr_1".into(),
            title: None,
            created_at: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn respond_translates_a_full_turn() {
        let sessions = Arc::new(InMemorySessionService::new());
        sessions
            .create_session("chat", "user-1", "thr_1", None)
            .await
            .unwrap();
        let registry = Arc::new(RunnerRegistry::new());
        registry
            .register("chat", Arc::new(EchoRunner::new(sessions, "chat")))
            .await
            .unwrap();

        let responder = RunnerResponder::new(registry, FinalPolicy::Silent);
        let ctx = BridgeContext::new("chat", "user-1");
        let stream = responder.respond(&meta(), None, &ctx).await.unwrap();
        let events: Vec<ThreadStreamEvent> =
            stream.map(|r| r.unwrap()).collect().await;

        assert!(matches!(events[0], ThreadStreamEvent::ItemAdded(_)));
        assert!(matches!(
            events.last().unwrap(),
            ThreadStreamEvent::ItemDone(_)
        ));
    }

    #[tokio::test]
    async fn respond_fails_for_unregistered_app() {
        let responder =
            RunnerResponder::new(Arc::new(RunnerRegistry::new()), FinalPolicy::Silent);
        let ctx = BridgeContext::new("nope", "user-1");
        let err = responder.respond(&meta(), None, &ctx).await.err().unwrap();
        assert!(matches!(err, BridgeError::Runtime(_)));
    }
}
