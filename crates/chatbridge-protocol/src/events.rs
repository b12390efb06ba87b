// Thread stream event types for SSE streaming
//
// These are the wire-level units emitted to the client during a turn.
// Ordering within one stream is authoring order; no reordering permitted.

use serde::{Deserialize, Serialize};

use crate::items::{AssistantContent, ThreadItem};
use crate::thread::Thread;

/// Tagged union over every event a streamed response can carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThreadStreamEvent {
    #[serde(rename = "thread.created")]
    ThreadCreated(ThreadCreatedEvent),
    #[serde(rename = "thread.item.added")]
    ItemAdded(ThreadItemAddedEvent),
    #[serde(rename = "thread.item.updated")]
    ItemUpdated(ThreadItemUpdatedEvent),
    #[serde(rename = "thread.item.done")]
    ItemDone(ThreadItemDoneEvent),
    #[serde(rename = "thread.item.replaced")]
    ItemReplaced(ThreadItemReplacedEvent),
    #[serde(rename = "progress.update")]
    ProgressUpdate(ProgressUpdateEvent),
    #[serde(rename = "client.effect")]
    ClientEffect(ClientEffectEvent),
    #[serde(rename = "error")]
    Error(StreamErrorEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCreatedEvent {
    pub thread: Thread,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadItemAddedEvent {
    pub item: ThreadItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadItemUpdatedEvent {
    pub item_id: String,
    pub update: ThreadItemUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadItemDoneEvent {
    pub item: ThreadItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadItemReplacedEvent {
    pub item: ThreadItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEffectEvent {
    pub name: String,
    pub data: serde_json::Value,
}

/// Terminal event emitted when a streamed turn fails mid-flight. The SSE
/// stream closes right after this event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamErrorEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

/// Sub-update for one content part of an in-flight assistant item.
/// Lifecycle: added, zero or more deltas, done. `done` carries the full
/// accumulated text, not the last delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThreadItemUpdate {
    #[serde(rename = "content_part.added")]
    PartAdded(ContentPartAdded),
    #[serde(rename = "content_part.text_delta")]
    PartTextDelta(ContentPartTextDelta),
    #[serde(rename = "content_part.done")]
    PartDone(ContentPartDone),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPartAdded {
    pub content_index: usize,
    pub content: AssistantContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPartTextDelta {
    pub content_index: usize,
    pub delta: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPartDone {
    pub content_index: usize,
    pub content: AssistantContent,
}

// Constructor helpers

impl ThreadStreamEvent {
    pub fn thread_created(thread: Thread) -> Self {
        ThreadStreamEvent::ThreadCreated(ThreadCreatedEvent { thread })
    }

    pub fn item_added(item: impl Into<ThreadItem>) -> Self {
        ThreadStreamEvent::ItemAdded(ThreadItemAddedEvent { item: item.into() })
    }

    pub fn item_done(item: impl Into<ThreadItem>) -> Self {
        ThreadStreamEvent::ItemDone(ThreadItemDoneEvent { item: item.into() })
    }

    pub fn part_added(item_id: impl Into<String>, content_index: usize, text: impl Into<String>) -> Self {
        ThreadStreamEvent::ItemUpdated(ThreadItemUpdatedEvent {
            item_id: item_id.into(),
            update: ThreadItemUpdate::PartAdded(ContentPartAdded {
                content_index,
                content: AssistantContent::text(text),
            }),
        })
    }

    pub fn part_text_delta(item_id: impl Into<String>, content_index: usize, delta: impl Into<String>) -> Self {
        ThreadStreamEvent::ItemUpdated(ThreadItemUpdatedEvent {
            item_id: item_id.into(),
            update: ThreadItemUpdate::PartTextDelta(ContentPartTextDelta {
                content_index,
                delta: delta.into(),
            }),
        })
    }

    pub fn part_done(item_id: impl Into<String>, content_index: usize, text: impl Into<String>) -> Self {
        ThreadStreamEvent::ItemUpdated(ThreadItemUpdatedEvent {
            item_id: item_id.into(),
            update: ThreadItemUpdate::PartDone(ContentPartDone {
                content_index,
                content: AssistantContent::text(text),
            }),
        })
    }

    pub fn client_effect(name: impl Into<String>, data: serde_json::Value) -> Self {
        ThreadStreamEvent::ClientEffect(ClientEffectEvent {
            name: name.into(),
            data,
        })
    }

    pub fn error(code: Option<&str>, message: impl Into<String>) -> Self {
        ThreadStreamEvent::Error(StreamErrorEvent {
            code: code.map(str::to_string),
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{AssistantMessageItem, UserContentPart, UserMessageItem};
    use crate::thread::Page;
    use chrono::Utc;

    #[test]
    fn event_tag_names() {
        let event = ThreadStreamEvent::part_text_delta("msg_1", 0, "Hel");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "thread.item.updated");
        assert_eq!(json["itemId"], "msg_1");
        assert_eq!(json["update"]["type"], "content_part.text_delta");
        assert_eq!(json["update"]["contentIndex"], 0);
        assert_eq!(json["update"]["delta"], "Hel");
    }

    #[test]
    fn thread_created_round_trip() {
        let event = ThreadStreamEvent::thread_created(Thread {
            id: "thr_1".into(),
            title: None,
            created_at: Utc::now(),
            items: Page::empty(),
        });

        let json = serde_json::to_string(&event).unwrap();
        let back: ThreadStreamEvent = serde_json::from_str(&json).unwrap();
        match back {
            ThreadStreamEvent::ThreadCreated(ev) => {
                assert_eq!(ev.thread.id, "thr_1");
                assert!(ev.thread.title.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn item_done_round_trip_field_for_field() {
        let event = ThreadStreamEvent::item_done(ThreadItem::AssistantMessage(AssistantMessageItem {
            id: "msg_2".into(),
            thread_id: "thr_1".into(),
            created_at: Utc::now(),
            content: vec![AssistantContent::text("Hello")],
        }));

        let json = serde_json::to_string(&event).unwrap();
        let back: ThreadStreamEvent = serde_json::from_str(&json).unwrap();
        let ThreadStreamEvent::ItemDone(ev) = back else {
            panic!("expected item done");
        };
        let ThreadItem::AssistantMessage(item) = ev.item else {
            panic!("expected assistant item");
        };
        assert_eq!(item.id, "msg_2");
        assert_eq!(item.content[0].text, "Hello");
    }

    #[test]
    fn error_event_omits_null_code() {
        let event = ThreadStreamEvent::error(None, "boom");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "boom");
        assert!(json.get("code").is_none());
    }

    #[test]
    fn user_item_done_keeps_wire_aliases() {
        let event = ThreadStreamEvent::item_done(ThreadItem::UserMessage(UserMessageItem {
            id: "msg_3".into(),
            thread_id: "thr_1".into(),
            created_at: Utc::now(),
            content: vec![UserContentPart::text("hi")],
            attachments: vec![],
            quoted_text: None,
            inference_options: None,
        }));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "thread.item.done");
        assert_eq!(json["item"]["type"], "user_message");
        assert_eq!(json["item"]["threadId"], "thr_1");
        assert!(json["item"].get("inferenceOptions").is_none());
    }
}
