// Event translator: agent turn events -> thread stream events
//
// One call translates one agent response. The translator assigns a single
// synthetic assistant-item id for the whole turn, primes the item at most
// once (only when the upstream signals "no content yet"), maps partial
// chunks to raw deltas and non-partial chunks to full-text part-done
// events, and closes with one item-done carrying the last full text.
//
// The core is a synchronous step function; the async wrapper pulls the
// upstream one event at a time and flattens each step's output, so the
// algorithm stays unit-testable without an executor.

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;

use chatbridge_protocol::events::ThreadStreamEvent;
use chatbridge_protocol::items::{AssistantContent, AssistantMessageItem};
use chatbridge_protocol::thread::ThreadMetadata;
use chatbridge_runtime::{TurnEvent, TurnStream};

use crate::error::{BridgeError, Result};
use crate::ids::{generate_id, MESSAGE_PREFIX};

/// A finite, non-restartable stream of outbound thread events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ThreadStreamEvent>> + Send>>;

/// What to do when a turn that produced output never emits a final
/// (non-partial) chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FinalPolicy {
    /// Drop the item silently: deltas were streamed but no item-done is
    /// emitted.
    #[default]
    Silent,
    /// Fail the stream with [`BridgeError::IncompleteTurn`].
    Error,
}

/// Per-response translation state. One instance per agent turn.
pub struct ResponseTranslator {
    thread_id: String,
    item_id: String,
    created_at: DateTime<Utc>,
    primed: bool,
    final_text: Option<String>,
}

impl ResponseTranslator {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            // One identity for the whole turn, not per chunk.
            item_id: generate_id(MESSAGE_PREFIX),
            created_at: Utc::now(),
            primed: false,
            final_text: None,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Translate one upstream event into zero or more outbound events.
    pub fn on_event(&mut self, event: &TurnEvent) -> Vec<ThreadStreamEvent> {
        let mut out = Vec::new();
        match &event.content {
            None => {
                // Priming pair, at most once per response.
                if !self.primed {
                    self.primed = true;
                    out.push(ThreadStreamEvent::item_added(self.empty_item()));
                    out.push(ThreadStreamEvent::part_added(&self.item_id, 0, ""));
                }
            }
            Some(content) => {
                for part in &content.parts {
                    let Some(text) = part.text.as_deref() else {
                        continue;
                    };
                    if event.partial {
                        out.push(ThreadStreamEvent::part_text_delta(&self.item_id, 0, text));
                    } else {
                        out.push(ThreadStreamEvent::part_done(&self.item_id, 0, text));
                        self.final_text = Some(text.to_string());
                    }
                }
            }
        }
        out
    }

    /// Close the turn. `Some(item-done)` if a final chunk was observed,
    /// carrying that last full text.
    pub fn finish(&mut self) -> Option<ThreadStreamEvent> {
        let text = self.final_text.take()?;
        Some(ThreadStreamEvent::item_done(AssistantMessageItem {
            id: self.item_id.clone(),
            thread_id: self.thread_id.clone(),
            created_at: self.created_at,
            content: vec![AssistantContent::text(text)],
        }))
    }

    fn empty_item(&self) -> AssistantMessageItem {
        AssistantMessageItem {
            id: self.item_id.clone(),
            thread_id: self.thread_id.clone(),
            created_at: self.created_at,
            content: Vec::new(),
        }
    }
}

/// Translate a full agent response with the default (silent) final policy.
pub fn stream_agent_response(thread: &ThreadMetadata, events: TurnStream) -> EventStream {
    stream_agent_response_with_policy(thread, events, FinalPolicy::default())
}

/// Translate a full agent response into an outbound event stream.
///
/// Upstream errors propagate as-is and terminate the stream; the
/// translator adds no retry of its own. An empty upstream yields an empty
/// output stream regardless of policy.
pub fn stream_agent_response_with_policy(
    thread: &ThreadMetadata,
    events: TurnStream,
    policy: FinalPolicy,
) -> EventStream {
    let translator = ResponseTranslator::new(thread.id.clone());

    // (upstream, translator, saw any event, done). Each unfold step yields
    // a batch of outbound events; `flatten` stitches the batches together.
    let state = (events, translator, false, false);
    Box::pin(
        stream::unfold(state, move |(mut events, mut translator, saw_any, done)| async move {
            if done {
                return None;
            }
            let batch: Vec<Result<ThreadStreamEvent>> = match events.next().await {
                Some(Ok(event)) => {
                    let out = translator.on_event(&event);
                    return Some((
                        stream::iter(out.into_iter().map(Ok).collect::<Vec<_>>()),
                        (events, translator, true, false),
                    ));
                }
                Some(Err(err)) => vec![Err(BridgeError::from(err))],
                None => match translator.finish() {
                    Some(item_done) => vec![Ok(item_done)],
                    None if saw_any && policy == FinalPolicy::Error => {
                        vec![Err(BridgeError::IncompleteTurn)]
                    }
                    None => Vec::new(),
                },
            };
            Some((stream::iter(batch), (events, translator, saw_any, true)))
        })
        .flatten(),
    )
}
