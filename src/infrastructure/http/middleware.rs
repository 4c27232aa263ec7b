//! HTTP Middleware
//!
//! 对 4xx / 5xx 响应记录日志。只记录 path，不记录 query

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// HTTP 状态码错误日志中间件
///
/// 业务错误（errno != 0）返回 200，在 `ApiError::into_response` 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::error!(%method, %path, status, elapsed_ms, "HTTP server error");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %path, status, elapsed_ms, "HTTP client error");
    }

    response
}
