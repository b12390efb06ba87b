// Thread store: maps runtime sessions to chat threads
//
// A thread is backed by one session, keyed by app + user + thread id.
// Thread metadata lives under one key of the session's state blob; saving
// appends a state-delta record to the append-only log, never a blind
// overwrite. Item durability belongs to the runtime log: add_item is a
// no-op and items are materialized from the log on demand.

use chrono::Utc;
use std::sync::Arc;

use chatbridge_protocol::items::{
    AssistantContent, AssistantMessageItem, HiddenContextItem, ThreadItem, UserContentPart,
    UserMessageItem,
};
use chatbridge_protocol::requests::ThreadListParams;
use chatbridge_protocol::thread::{Page, Thread, ThreadMetadata};
use chatbridge_runtime::{Session, SessionEvent, SessionService};

use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};
use crate::ids::{generate_id, MESSAGE_PREFIX, THREAD_PREFIX};

/// Session state key holding the serialized thread metadata.
pub const THREAD_STATE_KEY: &str = "bridge:thread";

/// Page size for thread listings when the request does not provide one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Store adapter over the runtime's session service.
#[derive(Clone)]
pub struct ThreadStore {
    sessions: Arc<dyn SessionService>,
}

impl ThreadStore {
    pub fn new(sessions: Arc<dyn SessionService>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> Arc<dyn SessionService> {
        self.sessions.clone()
    }

    /// Create a fresh thread backed by a new session.
    pub async fn create_thread(&self, ctx: &BridgeContext) -> Result<ThreadMetadata> {
        let meta = ThreadMetadata {
            id: generate_id(THREAD_PREFIX),
            title: None,
            created_at: Utc::now(),
            metadata: serde_json::Map::new(),
        };
        let mut state = serde_json::Map::new();
        state.insert(THREAD_STATE_KEY.into(), serde_json::to_value(&meta)?);
        self.sessions
            .create_session(&ctx.app_name, &ctx.user_id, &meta.id, Some(state))
            .await?;
        tracing::info!(thread_id = %meta.id, user_id = %ctx.user_id, "thread created");
        Ok(meta)
    }

    /// Load one thread's metadata. Fails with
    /// [`BridgeError::ThreadNotFound`] if no session backs the id.
    pub async fn load_thread(&self, ctx: &BridgeContext, thread_id: &str) -> Result<ThreadMetadata> {
        let session = self.require_session(ctx, thread_id).await?;
        Ok(Self::metadata_of(&session))
    }

    /// Persist thread metadata. Creates the backing session if absent;
    /// otherwise appends a metadata-delta record to the log.
    pub async fn save_thread(&self, ctx: &BridgeContext, meta: &ThreadMetadata) -> Result<()> {
        let mut delta = serde_json::Map::new();
        delta.insert(THREAD_STATE_KEY.into(), serde_json::to_value(meta)?);

        let existing = self
            .sessions
            .get_session(&ctx.app_name, &ctx.user_id, &meta.id)
            .await?;
        match existing {
            None => {
                self.sessions
                    .create_session(&ctx.app_name, &ctx.user_id, &meta.id, Some(delta))
                    .await?;
            }
            Some(_) => {
                self.sessions
                    .append_event(
                        &ctx.app_name,
                        &ctx.user_id,
                        &meta.id,
                        SessionEvent::state_update("system", delta),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// List the user's threads, newest first, honoring limit and cursor.
    pub async fn list_threads(
        &self,
        ctx: &BridgeContext,
        params: &ThreadListParams,
    ) -> Result<Page<ThreadMetadata>> {
        let mut sessions = self.sessions.list_sessions(&ctx.app_name, &ctx.user_id).await?;
        // Newest first; id as tiebreak so the cursor stays deterministic.
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        let metas: Vec<ThreadMetadata> = sessions.iter().map(Self::metadata_of).collect();

        let start = match &params.after {
            Some(cursor) => metas
                .iter()
                .position(|m| &m.id == cursor)
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };
        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let total = metas.len();
        let data: Vec<ThreadMetadata> = metas.into_iter().skip(start).take(limit).collect();
        let has_more = start + data.len() < total;
        let after = if has_more {
            data.last().map(|m| m.id.clone())
        } else {
            None
        };
        Ok(Page { data, has_more, after })
    }

    /// Load a thread together with all its items, materialized from the
    /// session's event log.
    pub async fn load_full_thread(&self, ctx: &BridgeContext, thread_id: &str) -> Result<Thread> {
        let session = self.require_session(ctx, thread_id).await?;
        let meta = Self::metadata_of(&session);
        let items = Self::materialize_items(&session);
        Ok(Thread {
            id: meta.id,
            title: meta.title,
            created_at: meta.created_at,
            items: Page::new(items),
        })
    }

    /// The items page alone, materialized from the session's event log.
    pub async fn load_items(&self, ctx: &BridgeContext, thread_id: &str) -> Result<Page<ThreadItem>> {
        let session = self.require_session(ctx, thread_id).await?;
        Ok(Page::new(Self::materialize_items(&session)))
    }

    /// Item durability belongs to the runtime's event log; the store never
    /// writes items of its own.
    pub async fn add_item(&self, _ctx: &BridgeContext, _item: &ThreadItem) -> Result<()> {
        Ok(())
    }

    /// Attach context for the agent that is never shown in the UI.
    pub async fn add_hidden_context(
        &self,
        ctx: &BridgeContext,
        thread_id: &str,
        content: impl Into<String>,
    ) -> Result<HiddenContextItem> {
        let item = HiddenContextItem {
            id: generate_id(MESSAGE_PREFIX),
            thread_id: thread_id.to_string(),
            created_at: Utc::now(),
            content: content.into(),
        };
        self.add_item(ctx, &ThreadItem::HiddenContext(item.clone())).await?;
        Ok(item)
    }

    /// Attachments need a blob-store collaborator this adapter does not
    /// have.
    pub async fn save_attachment(
        &self,
        _ctx: &BridgeContext,
        _thread_id: &str,
        _attachment: &serde_json::Value,
    ) -> Result<()> {
        Err(BridgeError::unsupported("attachments"))
    }

    pub async fn delete_thread(&self, _ctx: &BridgeContext, _thread_id: &str) -> Result<()> {
        Err(BridgeError::unsupported("thread deletion"))
    }

    async fn require_session(&self, ctx: &BridgeContext, thread_id: &str) -> Result<Session> {
        self.sessions
            .get_session(&ctx.app_name, &ctx.user_id, thread_id)
            .await?
            .ok_or_else(|| {
                BridgeError::thread_not_found(&ctx.app_name, &ctx.user_id, thread_id)
            })
    }

    fn metadata_of(session: &Session) -> ThreadMetadata {
        session
            .state
            .get(THREAD_STATE_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_else(|| ThreadMetadata {
                id: session.id.clone(),
                title: None,
                created_at: session.created_at,
                metadata: serde_json::Map::new(),
            })
    }

    // Final text records become message items; partial records and state
    // markers are invisible here.
    fn materialize_items(session: &Session) -> Vec<ThreadItem> {
        let mut items = Vec::new();
        for event in &session.events {
            if event.partial {
                continue;
            }
            let Some(content) = &event.content else {
                continue;
            };
            let text = content.text();
            if text.is_empty() {
                continue;
            }
            let id = format!("msg_{}", &event.id[..event.id.len().min(8)]);
            let item = if event.author == "user" {
                ThreadItem::UserMessage(UserMessageItem {
                    id,
                    thread_id: session.id.clone(),
                    created_at: event.timestamp,
                    content: vec![UserContentPart::text(text)],
                    attachments: Vec::new(),
                    quoted_text: None,
                    inference_options: None,
                })
            } else {
                ThreadItem::AssistantMessage(AssistantMessageItem {
                    id,
                    thread_id: session.id.clone(),
                    created_at: event.timestamp,
                    content: vec![AssistantContent::text(text)],
                })
            };
            items.push(item);
        }
        items
    }
}
