//! Response codification
//!
//! Maps each dispatch [`Decision`] to the HTTP status and literal body GitHub
//! receives. The bodies are part of the external contract; webhook delivery
//! logs on GitHub show them verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keeper_core::Decision;

#[cfg(test)]
#[path = "responses_tests.rs"]
mod tests;

pub const CONFIGURED_BODY: &str = "successfully configured the webhook for greenkeeper-keeper";
pub const CONTENT_TYPE_MISMATCH_BODY: &str =
    "please update your webhook configuration to send application/json";
pub const ACCEPTED_BODY: &str = "ok";
pub const SKIPPED_BODY: &str = "skipping";
pub const NO_PULL_REQUESTS_BODY: &str = "no PRs for this commit";
pub const LOOKUP_FAILED_BODY: &str = "failed to fetch PRs";

/// Coarse classification of a webhook response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// The webhook is set up correctly.
    Configured,

    /// Processing was started.
    Accepted,

    /// The delivery was understood but will not be acted on.
    Rejected,

    /// The keeper could not decide because GitHub failed.
    Failed,
}

impl ResponseClass {
    pub fn status(&self) -> StatusCode {
        match self {
            ResponseClass::Configured => StatusCode::NO_CONTENT,
            ResponseClass::Accepted => StatusCode::ACCEPTED,
            ResponseClass::Rejected => StatusCode::BAD_REQUEST,
            ResponseClass::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The HTTP answer to a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub class: ResponseClass,
    pub body: String,
}

impl WebhookResponse {
    fn new(class: ResponseClass, body: impl Into<String>) -> Self {
        Self {
            class,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.class.status()
    }
}

impl From<&Decision> for WebhookResponse {
    fn from(decision: &Decision) -> Self {
        match decision {
            Decision::Configured => Self::new(ResponseClass::Configured, CONFIGURED_BODY),
            Decision::ContentTypeMismatch { .. } => {
                Self::new(ResponseClass::Rejected, CONTENT_TYPE_MISMATCH_BODY)
            }
            Decision::Accepted { .. } => Self::new(ResponseClass::Accepted, ACCEPTED_BODY),
            Decision::Skipped(_) => Self::new(ResponseClass::Rejected, SKIPPED_BODY),
            Decision::UntrustedSender { sender } => Self::new(
                ResponseClass::Rejected,
                format!("PR is not from greenkeeper, but from {}", sender),
            ),
            Decision::NoPullRequests => Self::new(ResponseClass::Rejected, NO_PULL_REQUESTS_BODY),
            Decision::LookupFailed { .. } => Self::new(ResponseClass::Failed, LOOKUP_FAILED_BODY),
        }
    }
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        let status = self.status();

        // A 204 carries no body.
        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }

        (status, self.body).into_response()
    }
}
