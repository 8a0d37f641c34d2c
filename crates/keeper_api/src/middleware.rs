//! Request tracing middleware
//!
//! Gives every request an id, logs it together with the GitHub delivery id,
//! and echoes the id back in the `x-request-id` response header.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

use crate::handlers::{GITHUB_DELIVERY_HEADER, GITHUB_EVENT_HEADER};

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request tracing middleware.
///
/// Adds request ID and logging context for observability.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let delivery = header_value(&request, GITHUB_DELIVERY_HEADER);
    let event = header_value(&request, GITHUB_EVENT_HEADER);

    tracing::info!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        delivery = %delivery,
        event = %event,
        "Request started"
    );

    let mut response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        status = %response.status(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

fn header_value(request: &Request, name: &str) -> String {
    request
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string()
}
