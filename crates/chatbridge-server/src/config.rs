// Server configuration from environment variables

use axum::http::HeaderValue;
use std::time::Duration;

use chatbridge_core::FinalPolicy;

/// Runtime configuration loaded at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind. `BIND_ADDR`, default `0.0.0.0:9000`.
    pub bind_addr: String,
    /// App name the runner is registered under. `CHAT_APP_NAME`,
    /// default `chat`.
    pub app_name: String,
    /// What to do when a turn never emits a final chunk.
    /// `TURN_FINAL_POLICY`: `silent` (default) or `error`.
    pub final_policy: FinalPolicy,
    /// Allowed CORS origins, comma separated. `CORS_ALLOWED_ORIGINS`,
    /// empty means same-origin only.
    pub cors_origins: Vec<HeaderValue>,
    /// Bounded wait for runner close at shutdown.
    /// `RUNNER_DRAIN_TIMEOUT_SECS`, default 30.
    pub drain_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".to_string());
        let app_name = std::env::var("CHAT_APP_NAME").unwrap_or_else(|_| "chat".to_string());

        let final_policy = match std::env::var("TURN_FINAL_POLICY").as_deref() {
            Ok("error") => FinalPolicy::Error,
            _ => FinalPolicy::Silent,
        };

        let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.split(',').filter_map(|s| s.trim().parse().ok()).collect())
            .unwrap_or_default();

        let drain_timeout = std::env::var("RUNNER_DRAIN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self {
            bind_addr,
            app_name,
            final_policy,
            cors_origins,
            drain_timeout,
        }
    }
}
