use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::llm::models::PromptRequest;
use crate::web::state::AppState;

// CORS preflight; the headers themselves are added by the router layers
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> (StatusCode, &'static str) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        "Only POST requests are supported",
    )
}

/// Decodes the first JSON value of the body. `null` counts as an empty
/// request and anything after the first value is ignored.
fn decode_prompt(body: &[u8]) -> Option<PromptRequest> {
    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<Option<PromptRequest>>();
    match values.next() {
        Some(Ok(request)) => Some(request.unwrap_or_default()),
        Some(Err(e)) => {
            debug!("Rejecting request body: {}", e);
            None
        }
        None => {
            debug!("Rejecting empty request body");
            None
        }
    }
}

/// Translates `{"prompt": "..."}` into `{"sql": "..."}`.
///
/// The body is decoded regardless of its Content-Type or size. An empty
/// prompt is forwarded to the model like any other.
pub async fn get_sql(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, (StatusCode, String)> {
    let request = decode_prompt(&body)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "Invalid JSON format".to_string()))?;

    debug!("Prompt received ({} chars)", request.prompt.chars().count());

    let result = app_state
        .llm_manager
        .generate_sql(&app_state.schema, &request.prompt)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("AI error: {}", e)))?;

    info!("Generated SQL: {}", result.sql);

    let body = serde_json::to_string_pretty(&result).map_err(|e| {
        error!("Failed to encode response: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode response: {}", e),
        )
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
