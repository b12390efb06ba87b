// Error types for the runtime seam

use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors surfaced by session services and agent runners
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No session exists for the app/user/session triple
    #[error("session {session_id} not found for user {user_id} in app {app_name}")]
    SessionNotFound {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    /// A session with this id already exists for the app/user pair
    #[error("session {0} already exists")]
    SessionExists(String),

    /// A runner was registered twice for the same app
    #[error("runner for app '{0}' already registered")]
    RunnerExists(String),

    /// No runner registered for the app
    #[error("runner for app '{0}' not registered")]
    RunnerNotFound(String),

    /// Agent execution failure
    #[error("agent error: {0}")]
    Agent(String),
}

impl RuntimeError {
    pub fn session_not_found(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        RuntimeError::SessionNotFound {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    pub fn agent(msg: impl Into<String>) -> Self {
        RuntimeError::Agent(msg.into())
    }
}
