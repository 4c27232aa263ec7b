//! HTTP Routes
//!
//! - /api/ping           GET   健康检查
//! - /telegram/webhook   POST  接收 Bot API Update

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ping", get(handlers::ping))
        .route("/telegram/webhook", post(handlers::telegram_webhook))
}
