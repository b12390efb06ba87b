// Chatbridge reference server
//
// Wires the bridge together: an in-memory session service, a runner
// registry with the echo runner registered under the configured app name,
// and the single chat protocol endpoint. The registry is owned here and
// drained on shutdown.

mod chatkit;
mod config;
mod echo;
mod responder;

use anyhow::{Context, Result};
use axum::http::{header, Method};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use chatbridge_core::{RequestProcessor, ThreadStore};
use chatbridge_protocol::items::{
    AssistantContent, AssistantMessageItem, ClientToolCallItem, ClientToolCallStatus,
    HiddenContextItem, ThreadItem, UserContentPart, UserMessageItem, WidgetItem,
};
use chatbridge_protocol::requests::{
    AddUserMessageParams, ChatKitRequest, ThreadListParams, ThreadsCreateParams,
    ThreadsGetByIdParams, UserMessageInput,
};
use chatbridge_protocol::thread::{Page, Thread, ThreadMetadata};
use chatbridge_runtime::{InMemorySessionService, RunnerRegistry};

use config::ServerConfig;
use echo::EchoRunner;
use responder::RunnerResponder;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    app_name: String,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        app_name: state.app_name.clone(),
    })
}

#[derive(Clone)]
struct HealthState {
    app_name: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(chatkit::handle_chatkit_request),
    components(
        schemas(
            ChatKitRequest, UserMessageInput,
            ThreadsCreateParams, AddUserMessageParams,
            ThreadListParams, ThreadsGetByIdParams,
            Thread, ThreadMetadata,
            ThreadItem, UserMessageItem, UserContentPart,
            AssistantMessageItem, AssistantContent,
            WidgetItem, ClientToolCallItem, ClientToolCallStatus,
            HiddenContextItem,
            Page<ThreadItem>,
            Page<ThreadMetadata>,
        )
    ),
    tags(
        (name = "chatkit", description = "Chat protocol endpoint (JSON or SSE)")
    ),
    info(
        title = "Chatbridge API",
        version = "0.1.0",
        description = "Bridge between an agent runtime and a chat UI protocol",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

/// Assemble the router (extracted for testing).
fn build_app(chatkit_state: chatkit::AppState, config: &ServerConfig) -> Router {
    let health_state = HealthState {
        app_name: config.app_name.clone(),
    };

    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(chatkit::routes(chatkit_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let app = if config.cors_origins.is_empty() {
        app
    } else {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.cors_origins.clone()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::CACHE_CONTROL,
                ]),
        )
    };

    app.layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatbridge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        app_name = %config.app_name,
        final_policy = ?config.final_policy,
        "chatbridge-server starting"
    );

    let sessions: Arc<InMemorySessionService> = Arc::new(InMemorySessionService::new());
    let registry = Arc::new(RunnerRegistry::with_drain_timeout(config.drain_timeout));
    registry
        .register(
            &config.app_name,
            Arc::new(EchoRunner::new(sessions.clone(), config.app_name.clone())),
        )
        .await
        .context("Failed to register runner")?;

    let store = ThreadStore::new(sessions);
    let responder = Arc::new(RunnerResponder::new(registry.clone(), config.final_policy));
    let chatkit_state = chatkit::AppState {
        processor: RequestProcessor::new(store, responder),
        app_name: config.app_name.clone(),
    };

    let app = build_app(chatkit_state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("draining runners");
    registry.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
