//! HTTP request handlers
//!
//! The webhook handler only classifies the delivery and answers. Merges for
//! accepted deliveries keep running after the response is sent.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{responses::WebhookResponse, AppState};

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

/// Header carrying the webhook event name.
pub const GITHUB_EVENT_HEADER: &str = "x-github-event";

/// Header carrying the unique id of a webhook delivery.
pub const GITHUB_DELIVERY_HEADER: &str = "x-github-delivery";

/// POST /payload
///
/// Receives a GitHub webhook delivery. A missing event header is treated as an
/// event the keeper does not handle.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    let event_name = headers
        .get(GITHUB_EVENT_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let dispatch = state.dispatcher.handle_delivery(event_name, &body).await;
    tracing::debug!(
        event = event_name,
        decision = %dispatch.decision,
        tasks = dispatch.tasks.len(),
        "Webhook delivery dispatched"
    );

    WebhookResponse::from(&dispatch.decision)
}

/// GET /health
///
/// Health check endpoint.
///
/// Returns service health status with version and timestamp.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Service status
    pub status: String,

    /// Service version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Current timestamp (ISO 8601)
    pub timestamp: String,
}
