use axum::{
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

/// 记录5xx响应的请求行和响应体，便于排查线上错误
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    if response.status().is_server_error() {
        let (mut parts, body) = response.into_parts();
        match to_bytes(body, 1024).await {
            Ok(bytes) => {
                error!(
                    "Server error on {} {} - Status: {}, Body: {}",
                    method,
                    path,
                    parts.status,
                    String::from_utf8_lossy(&bytes)
                );
                // 重置body以便重新构建响应
                parts.headers.remove(axum::http::header::CONTENT_LENGTH);
                Response::from_parts(parts, Body::from(bytes))
            }
            Err(e) => {
                error!(
                    "Server error on {} {} - Status: {}, body unreadable: {}",
                    method, path, parts.status, e
                );
                Response::from_parts(parts, Body::empty())
            }
        }
    } else {
        response
    }
}
