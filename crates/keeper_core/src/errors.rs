//! Error and rejection types for the keeper core.
//!
//! Two families are kept apart:
//!
//! - [`Rejection`] is a normal negative outcome: the pull request is not (yet)
//!   ready to be merged. Rejections are returned as values, never posted as
//!   comments.
//! - [`Error`] is a hard failure: GitHub could not be reached, the merge was
//!   refused, the branch could not be deleted, or the webhook payload did not
//!   have the expected shape.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Hard failures of the keeper core.
#[derive(Error, Debug)]
pub enum Error {
    /// The merge request was refused or failed in transit.
    ///
    /// The message is posted verbatim as a comment on the pull request.
    #[error("An attempt to merge this PR failed. Error: {cause}")]
    MergeFailure { cause: String },

    /// The pull request was merged but its source branch could not be deleted.
    #[error("An attempt to delete this branch failed. Error: {cause}")]
    BranchDeletionFailure { cause: String },

    /// A GitHub API call failed (network, authentication, unexpected response).
    #[error("GitHub request failed: {0}")]
    Transport(#[from] github_client::Error),

    /// The webhook body does not match the schema of its event type.
    #[error("Malformed '{event}' webhook payload: {reason}")]
    MalformedPayload { event: String, reason: String },
}

/// Reasons a pull request is not merged that are part of normal operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The combined status of the head commit is `failure`.
    #[error("A failed status was found for this PR.")]
    FailedStatusFound,

    /// The combined status of the head commit is not a state the keeper knows.
    #[error("An invalid status was found for this PR.")]
    InvalidStatusFound { state: String },

    /// The combined status is still `pending` once the re-poll budget is spent.
    #[error("The combined status for this PR is still pending ({detail}).")]
    PendingStatus { detail: String },

    /// The pull request was not opened by a trusted sender.
    #[error("PR is not from greenkeeper, but from {sender}")]
    UntrustedSender { sender: String },

    /// The pull request is no longer open.
    #[error("The PR is {state}, not open.")]
    PullRequestNotOpen { state: String },
}

impl Rejection {
    /// Returns true if waiting and asking again may produce a different answer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Rejection::PendingStatus { .. })
    }
}
