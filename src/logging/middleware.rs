use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

/// Log one line per request, at a level picked from the response status.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let req_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    match classify(status, &route) {
        StatusClass::ServerError => tracing::error!(
            request_id = %req_id, method = %method, uri = %uri, route = %route,
            status = status.as_u16(), duration_ms, "request failed"
        ),
        StatusClass::ClientError => tracing::warn!(
            request_id = %req_id, method = %method, uri = %uri, route = %route,
            status = status.as_u16(), duration_ms, "request rejected"
        ),
        StatusClass::Health => tracing::debug!(
            request_id = %req_id, method = %method, route = %route,
            status = status.as_u16(), duration_ms, "health probe"
        ),
        StatusClass::Success => tracing::info!(
            request_id = %req_id, method = %method, uri = %uri, route = %route,
            status = status.as_u16(), duration_ms, "request completed"
        ),
    }

    response
}

#[derive(Debug, PartialEq, Eq)]
enum StatusClass {
    Success,
    Health,
    ClientError,
    ServerError,
}

fn classify(status: StatusCode, route: &str) -> StatusClass {
    if status.is_server_error() {
        StatusClass::ServerError
    } else if status.is_client_error() {
        StatusClass::ClientError
    } else if route.starts_with("/health") {
        StatusClass::Health
    } else {
        StatusClass::Success
    }
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(StatusCode::OK, "/posts"), StatusClass::Success);
        assert_eq!(classify(StatusCode::OK, "/health/ready"), StatusClass::Health);
        assert_eq!(classify(StatusCode::NOT_FOUND, "/posts/{postId}"), StatusClass::ClientError);
        assert_eq!(
            classify(StatusCode::SERVICE_UNAVAILABLE, "/health/ready"),
            StatusClass::ServerError
        );
    }
}
