//! Commit status domain types.
//!
//! GitHub computes a combined status for a commit from every status reported
//! against it. The keeper only ever trusts the aggregate `state`; the individual
//! contexts are kept for logging.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;

/// The combined status of a commit as returned by
/// `GET /repos/{owner}/{repo}/commits/{ref}/status`.
///
/// `state` is left as a string on purpose: GitHub documents `success`,
/// `failure`, `pending` and `error`, but callers must treat any value they do
/// not recognise as invalid rather than fail to deserialize the response.
///
/// # Examples
///
/// ```rust
/// use github_client::CombinedStatus;
///
/// let status: CombinedStatus = serde_json::from_str(r#"{"state": "success"}"#).unwrap();
/// assert_eq!(status.state, "success");
/// assert!(status.statuses.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CombinedStatus {
    /// The aggregate state over all statuses
    pub state: String,

    /// The SHA the status was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,

    /// Number of statuses contributing to the aggregate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,

    /// The individual statuses
    #[serde(default)]
    pub statuses: Vec<StatusContext>,
}

/// A single status reported against a commit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusContext {
    /// Name of the reporting context, e.g. `ci/circleci`
    pub context: String,

    /// State of this context
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
