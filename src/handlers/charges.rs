use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::error::CreateChargeError;
use crate::handlers::AppState;
use crate::models::charge::NewChargeRequest;

/// Thin glue: the orchestrator's result goes back verbatim. Only malformed
/// input turns into a failure response.
pub async fn create_charge(
    State(state): State<AppState>,
    Json(request): Json<NewChargeRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.orchestrator.create_charge(&request).await {
        Ok(result) => Ok(Json(json!(result))),
        Err(CreateChargeError::Validation(e)) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "field": e.field,
                "error": e.reason,
            })),
        )),
        Err(CreateChargeError::Internal(e)) => {
            error!("charge creation failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "internal error" })),
            ))
        }
    }
}
