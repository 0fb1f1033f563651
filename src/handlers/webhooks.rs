use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::error::WebhookError;
use crate::handlers::AppState;
use crate::services::webhook_processor::SettlementOutcome;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// `POST /webhooks/pix`: 200 on processed-or-duplicate, 401 on invalid
/// signature, 404 on unknown txid.
pub async fn receive_pix(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.webhooks.process(&body, signature).await {
        Ok(SettlementOutcome::AlreadyProcessed) => (
            StatusCode::OK,
            Json(json!({ "status": "already_processed" })),
        ),
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "processed" }))),
        Err(WebhookError::InvalidSignature) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid signature" })),
        ),
        Err(WebhookError::UnknownCharge { txid }) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown charge", "txid": txid })),
        ),
        Err(WebhookError::MalformedPayload(reason)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": reason })),
        ),
        Err(e) => {
            error!("webhook processing failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
        }
    }
}
