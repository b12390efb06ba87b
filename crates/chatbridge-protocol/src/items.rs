// Thread item types
//
// A thread item is one displayable (or hidden) unit within a thread: a user
// or assistant message, a widget, a client tool call record, or a hidden
// context note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tagged union over everything that can appear in a thread.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum ThreadItem {
    #[serde(rename = "user_message")]
    UserMessage(UserMessageItem),
    #[serde(rename = "assistant_message")]
    AssistantMessage(AssistantMessageItem),
    #[serde(rename = "widget")]
    Widget(WidgetItem),
    #[serde(rename = "client_tool_call")]
    ClientToolCall(ClientToolCallItem),
    #[serde(rename = "hidden_context")]
    HiddenContext(HiddenContextItem),
}

impl ThreadItem {
    pub fn id(&self) -> &str {
        match self {
            ThreadItem::UserMessage(item) => &item.id,
            ThreadItem::AssistantMessage(item) => &item.id,
            ThreadItem::Widget(item) => &item.id,
            ThreadItem::ClientToolCall(item) => &item.id,
            ThreadItem::HiddenContext(item) => &item.id,
        }
    }

    pub fn thread_id(&self) -> &str {
        match self {
            ThreadItem::UserMessage(item) => &item.thread_id,
            ThreadItem::AssistantMessage(item) => &item.thread_id,
            ThreadItem::Widget(item) => &item.thread_id,
            ThreadItem::ClientToolCall(item) => &item.thread_id,
            ThreadItem::HiddenContext(item) => &item.thread_id,
        }
    }
}

impl From<UserMessageItem> for ThreadItem {
    fn from(item: UserMessageItem) -> Self {
        ThreadItem::UserMessage(item)
    }
}

impl From<AssistantMessageItem> for ThreadItem {
    fn from(item: AssistantMessageItem) -> Self {
        ThreadItem::AssistantMessage(item)
    }
}

impl From<WidgetItem> for ThreadItem {
    fn from(item: WidgetItem) -> Self {
        ThreadItem::Widget(item)
    }
}

impl From<ClientToolCallItem> for ThreadItem {
    fn from(item: ClientToolCallItem) -> Self {
        ThreadItem::ClientToolCall(item)
    }
}

/// One content part of a user message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum UserContentPart {
    #[serde(rename = "input_text")]
    InputText { text: String },
}

impl UserContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        UserContentPart::InputText { text: text.into() }
    }
}

/// A user message within a thread.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMessageItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub content: Vec<UserContentPart>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub attachments: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub inference_options: Option<serde_json::Value>,
}

impl UserMessageItem {
    /// All text parts joined with a space, trimmed.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        for part in &self.content {
            let UserContentPart::InputText { text } = part;
            if !text.is_empty() {
                parts.push(text.as_str());
            }
        }
        parts.join(" ").trim().to_string()
    }
}

/// One unit of assistant output. Currently text only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContent {
    pub text: String,
}

impl AssistantContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An assistant message within a thread. The id stays stable for the
/// lifetime of one agent turn.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessageItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub content: Vec<AssistantContent>,
}

/// A widget surfaced from tool execution, addressed by the originating
/// function-call id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WidgetItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub widget: serde_json::Value,
}

/// Lifecycle of a client-side tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientToolCallStatus {
    Pending,
    Completed,
}

/// A record of a tool call that must execute on the client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientToolCallItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub name: String,
    #[schema(value_type = Object)]
    pub arguments: serde_json::Value,
    pub status: ClientToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

/// Context that is fed to the agent but never displayed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HiddenContextItem {
    pub id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
}
