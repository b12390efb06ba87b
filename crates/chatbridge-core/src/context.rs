// Per-turn context and the queue bridge
//
// Tool-style code running inside one response turn cannot emit protocol
// events through its normal return path, so every turn gets a TurnContext
// handle: an unbounded FIFO of outbound events plus a terminal sentinel.
// The bridge side is interleaved with the translated agent events into a
// single outbound stream, in arrival order.

use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use chatbridge_protocol::events::ThreadStreamEvent;
use chatbridge_protocol::items::{ClientToolCallItem, ClientToolCallStatus, WidgetItem};

use crate::error::{BridgeError, Result};
use crate::ids::{generate_id, TOOL_CALL_PREFIX};
use crate::translate::EventStream;

/// Opaque per-request identity: which app and which user this request
/// belongs to.
#[derive(Debug, Clone)]
pub struct BridgeContext {
    pub app_name: String,
    pub user_id: String,
}

impl BridgeContext {
    pub fn new(app_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
        }
    }
}

enum TurnMessage {
    Event(ThreadStreamEvent),
    Complete,
}

/// Handle for pushing out-of-band events into the current turn's outbound
/// stream. One instance per in-flight turn; clone the [`Arc`] into any
/// callback that needs to emit.
pub struct TurnContext {
    thread_id: String,
    tx: mpsc::UnboundedSender<TurnMessage>,
    // Set by the tool layer before dispatching a call that may stream a
    // widget; widgets are addressed by the originating call.
    function_call_id: Mutex<Option<String>>,
}

impl TurnContext {
    /// Build one context plus the receiving half of its queue.
    pub fn channel(thread_id: impl Into<String>) -> (Arc<TurnContext>, TurnEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(TurnContext {
            thread_id: thread_id.into(),
            tx,
            function_call_id: Mutex::new(None),
        });
        (ctx, TurnEvents { rx, done: false })
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn set_function_call_id(&self, call_id: impl Into<String>) {
        if let Ok(mut slot) = self.function_call_id.lock() {
            *slot = Some(call_id.into());
        }
    }

    pub fn function_call_id(&self) -> Option<String> {
        self.function_call_id.lock().ok().and_then(|slot| slot.clone())
    }

    /// Enqueue one event. FIFO, never blocks the producer. Dropped
    /// receivers (client gone) are ignored.
    pub fn stream(&self, event: ThreadStreamEvent) {
        if self.tx.send(TurnMessage::Event(event)).is_err() {
            tracing::debug!(thread_id = %self.thread_id, "turn queue closed, event dropped");
        }
    }

    /// Surface a widget as a done item. Fails unless a function-call id
    /// was set for the in-flight tool call: widgets are addressed by the
    /// call that produced them, and guessing an identity is worse than
    /// failing fast.
    pub fn stream_widget(&self, widget: serde_json::Value) -> Result<()> {
        let call_id = self.function_call_id().ok_or_else(|| {
            BridgeError::precondition("stream_widget requires an in-flight function call id")
        })?;
        let item = WidgetItem {
            id: format!("wgt_{call_id}"),
            thread_id: self.thread_id.clone(),
            created_at: Utc::now(),
            widget,
        };
        self.stream(ThreadStreamEvent::item_done(item));
        Ok(())
    }

    /// Record a tool call that must execute on the client and surface it
    /// as a done item. The returned record is `Pending`; completion is
    /// reported by the client out of band.
    pub fn issue_client_tool_call(
        &self,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> ClientToolCallItem {
        let item = ClientToolCallItem {
            id: generate_id(TOOL_CALL_PREFIX),
            thread_id: self.thread_id.clone(),
            created_at: Utc::now(),
            name: name.into(),
            arguments,
            status: ClientToolCallStatus::Pending,
            call_id: self.function_call_id(),
        };
        self.stream(ThreadStreamEvent::item_done(item.clone()));
        item
    }

    /// Push a named client-side effect with a JSON payload.
    pub fn client_effect(&self, name: impl Into<String>, data: serde_json::Value) {
        self.stream(ThreadStreamEvent::client_effect(name, data));
    }

    /// Enqueue the terminal sentinel. Readers stop at the first sentinel,
    /// so calling this more than once is harmless.
    pub fn complete(&self) {
        let _ = self.tx.send(TurnMessage::Complete);
    }
}

/// The receiving half of a turn's queue: yields events until the terminal
/// sentinel (or until every sender is gone).
pub struct TurnEvents {
    rx: mpsc::UnboundedReceiver<TurnMessage>,
    done: bool,
}

impl Stream for TurnEvents {
    type Item = ThreadStreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(TurnMessage::Event(event))) => Poll::Ready(Some(event)),
            Poll::Ready(Some(TurnMessage::Complete)) | Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Merge the translated agent events with the turn's bridge queue into one
/// outbound stream, completing the queue once the agent side is exhausted.
/// Arrival order is preserved within each side; the merged order follows
/// poll order, which is the authoring order for a single-producer turn.
pub fn interleave(events: EventStream, ctx: Arc<TurnContext>, bridge: TurnEvents) -> EventStream {
    let mut completed = false;
    let tail = stream::poll_fn(move |_| {
        // Runs once the agent side is exhausted; unblocks the bridge side.
        if !completed {
            completed = true;
            ctx.complete();
        }
        Poll::Ready(None)
    });
    Box::pin(stream::select(events.chain(tail), bridge.map(Ok)))
}
