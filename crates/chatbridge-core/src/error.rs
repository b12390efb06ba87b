// Error taxonomy for the bridge core
//
// Every failure the adapter can surface has a stable wire code so the
// server layer can map it to a status or a terminal stream event without
// string matching.

use chatbridge_runtime::RuntimeError;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by the translator, processor, store, and turn context
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request body failed schema validation
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// No thread exists for the app/user/thread triple
    #[error("thread {thread_id} not found for user {user_id} in app {app_name}")]
    ThreadNotFound {
        app_name: String,
        user_id: String,
        thread_id: String,
    },

    /// A store capability this deployment does not implement
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Required per-turn context is missing
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A turn ended without ever emitting a final chunk
    #[error("turn ended without a final content chunk")]
    IncompleteTurn,

    /// Failure inside the agent runtime seam
    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        BridgeError::MalformedRequest(msg.into())
    }

    pub fn thread_not_found(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        thread_id: impl Into<String>,
    ) -> Self {
        BridgeError::ThreadNotFound {
            app_name: app_name.into(),
            user_id: user_id.into(),
            thread_id: thread_id.into(),
        }
    }

    pub fn unsupported(op: impl Into<String>) -> Self {
        BridgeError::UnsupportedOperation(op.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        BridgeError::Precondition(msg.into())
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MalformedRequest(_) => "malformed_request",
            BridgeError::ThreadNotFound { .. } => "thread_not_found",
            BridgeError::UnsupportedOperation(_) => "unsupported_operation",
            BridgeError::Precondition(_) => "precondition_violation",
            BridgeError::IncompleteTurn => "incomplete_turn",
            BridgeError::Runtime(_) => "runtime_error",
            BridgeError::Serialization(_) => "serialization_error",
        }
    }
}

impl From<RuntimeError> for BridgeError {
    fn from(err: RuntimeError) -> Self {
        match err {
            // The session triple is the thread triple on this side of the seam.
            RuntimeError::SessionNotFound {
                app_name,
                user_id,
                session_id,
            } => BridgeError::ThreadNotFound {
                app_name,
                user_id,
                thread_id: session_id,
            },
            other => BridgeError::Runtime(other.to_string()),
        }
    }
}
