// Thread and page DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::items::ThreadItem;

/// Thread metadata as it travels on the wire. The full item history is
/// loaded separately (see [`Thread`]).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMetadata {
    /// Stable thread id, assigned at creation (`thr_` prefix).
    pub id: String,
    /// Human-readable title. Absent until something sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// When the thread was created.
    pub created_at: DateTime<Utc>,
    /// Free-form metadata attached to the thread.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A thread together with a page of its items.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Page<ThreadItem>,
}

impl Thread {
    /// The metadata view of this thread.
    pub fn metadata(&self) -> ThreadMetadata {
        ThreadMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            metadata: serde_json::Map::new(),
        }
    }
}

/// Cursor page wrapper. List responses are wrapped in a `data` field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_more: bool,
    /// Cursor for the next page: the id of the last item in `data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            has_more: false,
            after: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> From<Vec<T>> for Page<T> {
    fn from(data: Vec<T>) -> Self {
        Self::new(data)
    }
}
