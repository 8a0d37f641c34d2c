//! Commit status evaluation.
//!
//! Reads the combined commit status of a pull request's head commit and turns
//! it into a [`StatusVerdict`]. A `pending` status may be re-polled a bounded
//! number of times before it is reported.

use std::time::Duration;

use github_client::{CombinedStatus, GitHubActions, Repository};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{Error, Rejection};

#[cfg(test)]
#[path = "acceptability_tests.rs"]
mod tests;

/// How often a `pending` combined status is polled again before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRetry {
    /// Number of polls after the first one.
    pub retries: u32,

    /// Seconds to wait between two polls.
    #[serde(default)]
    pub interval_seconds: u64,
}

impl PendingRetry {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Outcome of reading the combined status of a commit.
///
/// The payload of the non-success variants is a short human-readable detail,
/// used for logging and for the rejection message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusVerdict {
    Success,
    Failure(String),
    Pending(String),
    Invalid(String),
}

impl StatusVerdict {
    /// Classifies a combined status by its overall state.
    pub fn from_combined_status(status: &CombinedStatus) -> Self {
        match status.state.as_str() {
            "success" => StatusVerdict::Success,
            "failure" => StatusVerdict::Failure(contexts_in_state(status, &["failure", "error"])),
            "pending" => StatusVerdict::Pending(contexts_in_state(status, &["pending"])),
            other => StatusVerdict::Invalid(other.to_string()),
        }
    }

    /// Converts the verdict into the acceptability decision.
    ///
    /// Only [`StatusVerdict::Success`] is acceptable.
    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            StatusVerdict::Success => Ok(()),
            StatusVerdict::Failure(_) => Err(Rejection::FailedStatusFound),
            StatusVerdict::Pending(detail) => Err(Rejection::PendingStatus { detail }),
            StatusVerdict::Invalid(state) => Err(Rejection::InvalidStatusFound { state }),
        }
    }
}

fn contexts_in_state(status: &CombinedStatus, states: &[&str]) -> String {
    let contexts: Vec<&str> = status
        .statuses
        .iter()
        .filter(|s| states.contains(&s.state.as_str()))
        .map(|s| s.context.as_str())
        .collect();

    if contexts.is_empty() {
        status.state.clone()
    } else {
        contexts.join(", ")
    }
}

/// Reads the combined status of `sha` and classifies it.
///
/// With a [`PendingRetry`] budget a `pending` status is polled again, waiting
/// the configured interval between polls, until it settles or the budget is
/// spent. Without a budget the status is read exactly once.
///
/// # Errors
///
/// Returns [`Error::Transport`] if the status cannot be read. A transport error
/// on any poll ends the evaluation.
#[instrument(skip(client, pending_retry), fields(repo = %repo))]
pub async fn evaluate(
    client: &dyn GitHubActions,
    repo: &Repository,
    sha: &str,
    pending_retry: Option<&PendingRetry>,
) -> Result<StatusVerdict, Error> {
    let retries = pending_retry.map_or(0, |r| r.retries);
    let mut poll = 0;

    loop {
        let status = client.get_combined_status(repo, sha).await?;
        let verdict = StatusVerdict::from_combined_status(&status);

        match (&verdict, pending_retry) {
            (StatusVerdict::Pending(detail), Some(retry)) if poll < retries => {
                poll += 1;
                debug!(
                    poll = poll,
                    retries = retries,
                    pending = %detail,
                    "Combined status is pending, polling again"
                );
                tokio::time::sleep(retry.interval()).await;
            }
            _ => return Ok(verdict),
        }
    }
}

/// Evaluates the head commit and decides whether the pull request can be merged.
///
/// Returns `Ok(Ok(()))` when all commit statuses passed and `Ok(Err(_))` with
/// the [`Rejection`] otherwise.
///
/// # Errors
///
/// Returns [`Error::Transport`] if the status cannot be read.
pub async fn ensure_acceptability(
    client: &dyn GitHubActions,
    repo: &Repository,
    sha: &str,
    pending_retry: Option<&PendingRetry>,
) -> Result<Result<(), Rejection>, Error> {
    let verdict = evaluate(client, repo, sha, pending_retry).await?;
    let decision = verdict.into_result();

    match &decision {
        Ok(()) => info!(repo = %repo, sha = sha, "All commit statuses passed"),
        Err(rejection) => info!(
            repo = %repo,
            sha = sha,
            reason = %rejection,
            "Commit statuses do not allow a merge"
        ),
    }

    Ok(decision)
}
