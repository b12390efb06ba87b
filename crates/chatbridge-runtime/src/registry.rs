// Per-app runner registry
//
// One runner per app, registered at startup and drained at shutdown:
// close every runner concurrently with a bounded wait, then cancel any
// stragglers. The registry is owned by the process controller and passed
// where needed; there is no global.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Result, RuntimeError};
use crate::events::{TurnContent, TurnStream};

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// An agent backend that can execute one turn for a session.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run one turn: feed `message` into the agent for the given session
    /// and return the finite stream of turn events it produces.
    async fn run(&self, user_id: &str, session_id: &str, message: TurnContent)
        -> Result<TurnStream>;

    /// Release resources held by this runner. Called once at shutdown.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Keyed lookup of runners by app name, with drain-then-cancel shutdown.
pub struct RunnerRegistry {
    runners: RwLock<HashMap<String, Arc<dyn AgentRunner>>>,
    drain_timeout: Duration,
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::with_drain_timeout(DEFAULT_DRAIN_TIMEOUT)
    }

    pub fn with_drain_timeout(drain_timeout: Duration) -> Self {
        Self {
            runners: RwLock::new(HashMap::new()),
            drain_timeout,
        }
    }

    /// Register a runner for an app. Each app gets exactly one runner.
    pub async fn register(&self, app_name: &str, runner: Arc<dyn AgentRunner>) -> Result<()> {
        let mut runners = self.runners.write().await;
        if runners.contains_key(app_name) {
            return Err(RuntimeError::RunnerExists(app_name.to_string()));
        }
        runners.insert(app_name.to_string(), runner);
        Ok(())
    }

    pub async fn get(&self, app_name: &str) -> Result<Arc<dyn AgentRunner>> {
        let runners = self.runners.read().await;
        runners
            .get(app_name)
            .cloned()
            .ok_or_else(|| RuntimeError::RunnerNotFound(app_name.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.runners.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runners.read().await.is_empty()
    }

    /// Close all registered runners. Waits up to the drain timeout for the
    /// closes to finish, then cancels any still outstanding.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Arc<dyn AgentRunner>)> =
            self.runners.write().await.drain().collect();
        if drained.is_empty() {
            return;
        }
        info!(count = drained.len(), "Draining runner registry");

        let mut tasks = Vec::with_capacity(drained.len());
        for (app_name, runner) in drained {
            let task_app = app_name.clone();
            let handle = tokio::spawn(async move {
                if let Err(e) = runner.close().await {
                    warn!(app = %task_app, error = %e, "Runner close failed");
                }
            });
            tasks.push((app_name, handle));
        }

        let drain = futures::future::join_all(tasks.iter_mut().map(|(_, handle)| handle));
        if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
            for (app_name, handle) in &tasks {
                if !handle.is_finished() {
                    warn!(app = %app_name, "Runner close timed out, cancelling");
                    handle.abort();
                }
            }
        }
    }
}
