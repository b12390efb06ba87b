// Request processor: the per-request dispatch seam
//
// Stateless. Parses the request union, splits it exhaustively into
// streaming and non-streaming, and produces either one JSON document or an
// SSE-framed byte stream. Thread setup for streaming requests happens
// eagerly so not-found and malformed failures surface as plain errors
// before any bytes go out; only the response events themselves are lazy.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::future;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use chatbridge_protocol::events::ThreadStreamEvent;
use chatbridge_protocol::items::UserMessageItem;
use chatbridge_protocol::requests::{
    ChatKitRequest, NonStreamingRequest, RequestClass, StreamingRequest, UserMessageInput,
};
use chatbridge_protocol::sse;
use chatbridge_protocol::thread::{Page, Thread, ThreadMetadata};

use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};
use crate::ids::{generate_id, MESSAGE_PREFIX};
use crate::store::ThreadStore;
use crate::translate::EventStream;

/// SSE-framed bytes ready for the transport. Failures never surface at
/// this level; they are framed as a terminal error event instead.
pub type SseStream = Pin<Box<dyn futures::Stream<Item = std::result::Result<Vec<u8>, Infallible>> + Send>>;

/// The agent-behavior boundary. A backend has a responder; the processor
/// never knows which agent is on the other side.
#[async_trait]
pub trait Respond: Send + Sync {
    /// Produce the assistant's event stream for one user turn.
    async fn respond(
        &self,
        thread: &ThreadMetadata,
        item: Option<&UserMessageItem>,
        ctx: &BridgeContext,
    ) -> Result<EventStream>;
}

/// One response from the processor: either a byte stream or one document.
pub enum ProcessorOutput {
    Streaming(SseStream),
    Json(Vec<u8>),
}

/// Per-request dispatcher over the store and the responder.
#[derive(Clone)]
pub struct RequestProcessor {
    store: ThreadStore,
    responder: Arc<dyn Respond>,
}

impl RequestProcessor {
    pub fn new(store: ThreadStore, responder: Arc<dyn Respond>) -> Self {
        Self { store, responder }
    }

    pub fn store(&self) -> &ThreadStore {
        &self.store
    }

    /// Handle one raw request body.
    pub async fn process(&self, body: &[u8], ctx: BridgeContext) -> Result<ProcessorOutput> {
        let request: ChatKitRequest =
            serde_json::from_slice(body).map_err(|err| BridgeError::malformed(err.to_string()))?;
        match request.classify() {
            RequestClass::Streaming(req) => {
                let events = self.streaming_events(req, ctx).await?;
                Ok(ProcessorOutput::Streaming(sse_frames(events)))
            }
            RequestClass::NonStreaming(req) => {
                Ok(ProcessorOutput::Json(self.non_streaming(req, ctx).await?))
            }
        }
    }

    /// The unframed event stream for a streaming request. Setup (thread
    /// creation or lookup) runs here; the returned stream is lazy.
    pub async fn streaming_events(
        &self,
        request: StreamingRequest,
        ctx: BridgeContext,
    ) -> Result<EventStream> {
        let (meta, user_item, mut head) = match request {
            StreamingRequest::Create(params) => {
                let meta = self.store.create_thread(&ctx).await?;
                let user_item = build_user_item(&meta.id, params.input);
                let head = vec![ThreadStreamEvent::thread_created(thread_view(&meta))];
                (meta, user_item, head)
            }
            StreamingRequest::AddUserMessage(params) => {
                let meta = self.store.load_thread(&ctx, &params.thread_id).await?;
                let user_item = build_user_item(&meta.id, params.input);
                (meta, user_item, Vec::new())
            }
        };

        // The user's own message is acknowledged before any assistant
        // activity is visible.
        head.push(ThreadStreamEvent::item_done(user_item.clone()));
        tracing::info!(
            thread_id = %meta.id,
            user_id = %ctx.user_id,
            "dispatching user turn"
        );

        let tail = self.responder.respond(&meta, Some(&user_item), &ctx).await?;
        Ok(Box::pin(stream::iter(head.into_iter().map(Ok)).chain(tail)))
    }

    async fn non_streaming(&self, request: NonStreamingRequest, ctx: BridgeContext) -> Result<Vec<u8>> {
        match request {
            NonStreamingRequest::List(params) => {
                let page: Page<ThreadMetadata> = self.store.list_threads(&ctx, &params).await?;
                Ok(serde_json::to_vec(&page)?)
            }
            NonStreamingRequest::GetById(params) => {
                let thread = self.store.load_full_thread(&ctx, &params.thread_id).await?;
                Ok(serde_json::to_vec(&thread)?)
            }
        }
    }
}

/// Frame an event stream for the wire: one `data: <json>\n\n` block per
/// event. A failure becomes one terminal `error` event and ends the
/// stream; nothing is emitted after it.
pub fn sse_frames(events: EventStream) -> SseStream {
    Box::pin(events.scan(false, |failed, item| {
        if *failed {
            return future::ready(None);
        }
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                *failed = true;
                tracing::warn!(error = %err, code = err.code(), "turn stream failed");
                ThreadStreamEvent::error(Some(err.code()), err.to_string())
            }
        };
        let bytes = sse::frame(&event).unwrap_or_default();
        future::ready(Some(Ok(bytes)))
    }))
}

fn build_user_item(thread_id: &str, input: UserMessageInput) -> UserMessageItem {
    UserMessageItem {
        id: generate_id(MESSAGE_PREFIX),
        thread_id: thread_id.to_string(),
        created_at: Utc::now(),
        content: input.content,
        attachments: Vec::new(),
        quoted_text: input.quoted_text,
        inference_options: input.inference_options,
    }
}

fn thread_view(meta: &ThreadMetadata) -> Thread {
    Thread {
        id: meta.id.clone(),
        title: meta.title.clone(),
        created_at: meta.created_at,
        items: Page::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbridge_protocol::items::ThreadItem;
    use chatbridge_runtime::{InMemorySessionService, TurnEvent};

    use crate::translate::stream_agent_response;

    /// Replays a scripted agent turn through the translator.
    struct ScriptedResponder {
        turn: Vec<TurnEvent>,
    }

    #[async_trait]
    impl Respond for ScriptedResponder {
        async fn respond(
            &self,
            thread: &ThreadMetadata,
            _item: Option<&UserMessageItem>,
            _ctx: &BridgeContext,
        ) -> Result<EventStream> {
            let turn: Vec<chatbridge_runtime::Result<TurnEvent>> =
                self.turn.iter().cloned().map(Ok).collect();
            Ok(stream_agent_response(thread, Box::pin(stream::iter(turn))))
        }
    }

    struct FailingResponder;

    #[async_trait]
    impl Respond for FailingResponder {
        async fn respond(
            &self,
            _thread: &ThreadMetadata,
            _item: Option<&UserMessageItem>,
            _ctx: &BridgeContext,
        ) -> Result<EventStream> {
            Ok(Box::pin(stream::iter(vec![
                Ok(ThreadStreamEvent::part_text_delta("msg_x", 0, "partial")),
                Err(BridgeError::Runtime("model unavailable".into())),
            ])))
        }
    }

    fn processor(turn: Vec<TurnEvent>) -> RequestProcessor {
        let store = ThreadStore::new(Arc::new(InMemorySessionService::new()));
        RequestProcessor::new(store, Arc::new(ScriptedResponder { turn }))
    }

    fn ctx() -> BridgeContext {
        BridgeContext::new("chat", "user-1")
    }

    fn create_body(text: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "op": "threads.create",
            "params": {"input": {"content": [{"type": "input_text", "text": text}]}}
        }))
        .unwrap()
    }

    async fn collect_sse(stream: SseStream) -> Vec<serde_json::Value> {
        let chunks: Vec<_> = stream.collect().await;
        let mut events = Vec::new();
        for chunk in chunks {
            let chunk = chunk.unwrap();
            let text = String::from_utf8(chunk).unwrap();
            for line in text.lines() {
                if let Some(json) = line.strip_prefix("data: ") {
                    events.push(serde_json::from_str(json).unwrap());
                }
            }
        }
        events
    }

    #[tokio::test]
    async fn create_flow_orders_thread_then_user_then_assistant() {
        let processor = processor(vec![
            TurnEvent::started(),
            TurnEvent::delta("Hel"),
            TurnEvent::full("Hello"),
        ]);

        let out = processor.process(&create_body("hi"), ctx()).await.unwrap();
        let ProcessorOutput::Streaming(stream) = out else {
            panic!("expected a stream");
        };
        let events = collect_sse(stream).await;

        assert_eq!(events[0]["type"], "thread.created");
        assert_eq!(events[1]["type"], "thread.item.done");
        assert_eq!(events[1]["item"]["type"], "user_message");
        assert_eq!(events[1]["item"]["content"][0]["text"], "hi");
        // Assistant activity strictly after the user's acknowledgement.
        assert_eq!(events[2]["type"], "thread.item.added");
        assert_eq!(events.last().unwrap()["type"], "thread.item.done");
        assert_eq!(
            events.last().unwrap()["item"]["content"][0]["text"],
            "Hello"
        );
    }

    #[tokio::test]
    async fn add_user_message_to_unknown_thread_is_not_found() {
        let processor = processor(vec![]);
        let body = serde_json::to_vec(&serde_json::json!({
            "op": "threads.add_user_message",
            "params": {
                "threadId": "thr_missing1",
                "input": {"content": [{"type": "input_text", "text": "hi"}]}
            }
        }))
        .unwrap();

        let err = processor.process(&body, ctx()).await.err().unwrap();
        assert!(matches!(err, BridgeError::ThreadNotFound { .. }));
    }

    #[tokio::test]
    async fn add_user_message_to_existing_thread_streams() {
        let processor = processor(vec![TurnEvent::full("sure")]);
        let meta = processor.store().create_thread(&ctx()).await.unwrap();

        let body = serde_json::to_vec(&serde_json::json!({
            "op": "threads.add_user_message",
            "params": {
                "threadId": meta.id,
                "input": {"content": [{"type": "input_text", "text": "again"}]}
            }
        }))
        .unwrap();

        let out = processor.process(&body, ctx()).await.unwrap();
        let ProcessorOutput::Streaming(stream) = out else {
            panic!("expected a stream");
        };
        let events = collect_sse(stream).await;

        // No thread.created on an existing thread.
        assert_eq!(events[0]["type"], "thread.item.done");
        assert_eq!(events[0]["item"]["type"], "user_message");
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let processor = processor(vec![]);
        let err = processor.process(b"not json", ctx()).await.err().unwrap();
        assert!(matches!(err, BridgeError::MalformedRequest(_)));

        let err = processor
            .process(br#"{"op": "threads.purge", "params": {}}"#, ctx())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::MalformedRequest(_)));
    }

    #[tokio::test]
    async fn list_returns_json_page() {
        let processor = processor(vec![]);
        processor.store().create_thread(&ctx()).await.unwrap();

        let body = serde_json::to_vec(&serde_json::json!({"op": "threads.list"})).unwrap();
        let out = processor.process(&body, ctx()).await.unwrap();
        let ProcessorOutput::Json(bytes) = out else {
            panic!("expected json");
        };
        let page: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(page["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_by_id_returns_the_thread() {
        let processor = processor(vec![]);
        let meta = processor.store().create_thread(&ctx()).await.unwrap();

        let body = serde_json::to_vec(&serde_json::json!({
            "op": "threads.get_by_id",
            "params": {"threadId": meta.id}
        }))
        .unwrap();
        let out = processor.process(&body, ctx()).await.unwrap();
        let ProcessorOutput::Json(bytes) = out else {
            panic!("expected json");
        };
        let thread: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(thread["id"], serde_json::json!(meta.id));
        assert_eq!(thread["items"]["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn mid_stream_failure_frames_one_terminal_error_event() {
        let store = ThreadStore::new(Arc::new(InMemorySessionService::new()));
        let processor = RequestProcessor::new(store, Arc::new(FailingResponder));

        let out = processor.process(&create_body("hi"), ctx()).await.unwrap();
        let ProcessorOutput::Streaming(stream) = out else {
            panic!("expected a stream");
        };
        let events = collect_sse(stream).await;

        let last = events.last().unwrap();
        assert_eq!(last["type"], "error");
        assert_eq!(last["code"], "runtime_error");
        // Exactly one error event, and nothing after it.
        let errors = events.iter().filter(|e| e["type"] == "error").count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn user_item_carries_the_input_through() {
        let input = UserMessageInput {
            content: vec![chatbridge_protocol::items::UserContentPart::text("hi")],
            quoted_text: Some("earlier".into()),
            inference_options: None,
        };
        let item = build_user_item("thr_1", input);
        assert!(item.id.starts_with("msg_"));
        assert_eq!(item.thread_id, "thr_1");
        assert_eq!(item.quoted_text.as_deref(), Some("earlier"));
        let _ = ThreadItem::from(item);
    }
}
