// The chat protocol HTTP endpoint
//
// One POST route carries the whole request union. Streaming operations
// answer with `text/event-stream`; the rest answer with one JSON document.
// The caller's identity rides in the `x-user-id` header.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::post,
    Router,
};

use chatbridge_core::{BridgeContext, BridgeError, ProcessorOutput, RequestProcessor};

const USER_ID_HEADER: &str = "x-user-id";

/// App state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub processor: RequestProcessor,
    pub app_name: String,
}

/// Create chat protocol routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/chatkit", post(handle_chatkit_request))
        .with_state(state)
}

/// POST /v1/chatkit - Handle one chat protocol request
#[utoipa::path(
    post,
    path = "/v1/chatkit",
    request_body = chatbridge_protocol::requests::ChatKitRequest,
    responses(
        (status = 200, description = "JSON document or SSE event stream"),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "Thread not found"),
        (status = 501, description = "Operation not supported by this deployment")
    ),
    tag = "chatkit"
)]
pub async fn handle_chatkit_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, StatusCode> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous");
    let ctx = BridgeContext::new(state.app_name.clone(), user_id);

    match state.processor.process(&body, ctx).await {
        Ok(ProcessorOutput::Streaming(stream)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::CONNECTION, "keep-alive")
            .body(Body::from_stream(stream))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR),
        Ok(ProcessorOutput::Json(bytes)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR),
        Err(err) => error_response(err),
    }
}

fn error_response(err: BridgeError) -> Result<Response, StatusCode> {
    let status = match &err {
        BridgeError::MalformedRequest(_) | BridgeError::Precondition(_) => {
            StatusCode::BAD_REQUEST
        }
        BridgeError::ThreadNotFound { .. } => StatusCode::NOT_FOUND,
        BridgeError::UnsupportedOperation(_) => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(code = err.code(), error = %err, "request failed");

    let body = serde_json::json!({
        "error": {"code": err.code(), "message": err.to_string()}
    });
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
