//! Telegram Webhook Handler
//!
//! 校验 secret token 后把 Update 放入处理队列，立即应答

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;

use crate::infrastructure::adapters::telegram::Update;
use crate::infrastructure::http::dto::{ApiResponse, Empty};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// POST /telegram/webhook
pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized("invalid secret token".into()));
        }
    }

    let update: Update = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid update: {}", e)))?;
    let update_id = update.update_id;

    let Some(message) = update.into_inbound() else {
        tracing::debug!(update_id, "Ignoring update without message");
        return Ok(Json(ApiResponse::ok()));
    };

    state
        .queue_sender
        .send(message)
        .await
        .map_err(|_| ApiError::ServiceUnavailable("update queue closed".into()))?;

    tracing::debug!(update_id, "Update queued");
    Ok(Json(ApiResponse::ok()))
}
