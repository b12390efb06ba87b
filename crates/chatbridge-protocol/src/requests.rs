// Inbound request union
//
// Requests arrive as a discriminated union on the `op` field. The known
// operations split into streaming (create, add_user_message) and
// non-streaming (list, get_by_id); the split is exhaustive by construction.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::items::UserContentPart;

/// The wire-level request union.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "op")]
pub enum ChatKitRequest {
    #[serde(rename = "threads.create")]
    ThreadsCreate { params: ThreadsCreateParams },
    #[serde(rename = "threads.add_user_message")]
    ThreadsAddUserMessage { params: AddUserMessageParams },
    #[serde(rename = "threads.list")]
    ThreadsList {
        #[serde(default)]
        params: ThreadListParams,
    },
    #[serde(rename = "threads.get_by_id")]
    ThreadsGetById { params: ThreadsGetByIdParams },
}

/// Message content supplied by the user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMessageInput {
    pub content: Vec<UserContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub inference_options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadsCreateParams {
    pub input: UserMessageInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddUserMessageParams {
    pub thread_id: String,
    pub input: UserMessageInput,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadListParams {
    /// Maximum number of threads per page. Defaults to 20.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Cursor: return threads after the one with this id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadsGetByIdParams {
    pub thread_id: String,
}

/// A request that produces an SSE event stream.
#[derive(Debug, Clone)]
pub enum StreamingRequest {
    Create(ThreadsCreateParams),
    AddUserMessage(AddUserMessageParams),
}

/// A request that produces a single JSON document.
#[derive(Debug, Clone)]
pub enum NonStreamingRequest {
    List(ThreadListParams),
    GetById(ThreadsGetByIdParams),
}

/// Exhaustive classification of a parsed request.
#[derive(Debug, Clone)]
pub enum RequestClass {
    Streaming(StreamingRequest),
    NonStreaming(NonStreamingRequest),
}

impl ChatKitRequest {
    pub fn classify(self) -> RequestClass {
        match self {
            ChatKitRequest::ThreadsCreate { params } => {
                RequestClass::Streaming(StreamingRequest::Create(params))
            }
            ChatKitRequest::ThreadsAddUserMessage { params } => {
                RequestClass::Streaming(StreamingRequest::AddUserMessage(params))
            }
            ChatKitRequest::ThreadsList { params } => {
                RequestClass::NonStreaming(NonStreamingRequest::List(params))
            }
            ChatKitRequest::ThreadsGetById { params } => {
                RequestClass::NonStreaming(NonStreamingRequest::GetById(params))
            }
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            ChatKitRequest::ThreadsCreate { .. } | ChatKitRequest::ThreadsAddUserMessage { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create_request() {
        let body = serde_json::json!({
            "op": "threads.create",
            "params": {
                "input": {
                    "content": [{"type": "input_text", "text": "hi"}]
                }
            }
        });

        let req: ChatKitRequest = serde_json::from_value(body).unwrap();
        assert!(req.is_streaming());
        match req.classify() {
            RequestClass::Streaming(StreamingRequest::Create(params)) => {
                assert_eq!(params.input.content.len(), 1);
                assert!(params.input.quoted_text.is_none());
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn parse_add_user_message_request() {
        let body = serde_json::json!({
            "op": "threads.add_user_message",
            "params": {
                "threadId": "thr_12345678",
                "input": {"content": [{"type": "input_text", "text": "again"}]}
            }
        });

        let req: ChatKitRequest = serde_json::from_value(body).unwrap();
        match req.classify() {
            RequestClass::Streaming(StreamingRequest::AddUserMessage(params)) => {
                assert_eq!(params.thread_id, "thr_12345678");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn parse_list_request_defaults() {
        let body = serde_json::json!({"op": "threads.list"});
        let req: ChatKitRequest = serde_json::from_value(body).unwrap();
        assert!(!req.is_streaming());
        match req.classify() {
            RequestClass::NonStreaming(NonStreamingRequest::List(params)) => {
                assert!(params.limit.is_none());
                assert!(params.after.is_none());
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn unknown_op_fails_to_parse() {
        let body = serde_json::json!({"op": "threads.purge", "params": {}});
        assert!(serde_json::from_value::<ChatKitRequest>(body).is_err());
    }
}
