//! Merge orchestration.
//!
//! Drives a single pull request through acceptability evaluation, merge,
//! optional branch deletion and failure reporting. All GitHub calls for one
//! pull request happen in that order and never overlap.

use std::fmt;
use std::sync::Arc;

use github_client::{GitHubActions, PullRequestDetails, Repository};
use tracing::{error, info, instrument, warn};

use crate::acceptability::ensure_acceptability;
use crate::settings::Settings;
use crate::{Error, Rejection};

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

/// The pull request the keeper acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub repository: Repository,
    pub number: u64,
    pub head_sha: String,
    pub head_ref: String,

    /// Profile URL of the pull request author or of the webhook sender.
    pub sender: String,

    pub comments_url: Option<String>,
}

impl PullRequestRef {
    /// Builds a reference from the pull request details GitHub reports.
    pub fn from_details(repository: Repository, details: &PullRequestDetails) -> Self {
        Self {
            repository,
            number: details.number,
            head_sha: details.head.sha.clone(),
            head_ref: details.head.git_ref.clone(),
            sender: details
                .user
                .as_ref()
                .map(|u| u.html_url.clone())
                .unwrap_or_default(),
            comments_url: details.comments_url.clone(),
        }
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

/// What happened to the source branch after a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDeletionOutcome {
    NotRequested,
    Deleted,
}

/// A completed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// SHA of the merge commit.
    pub sha: String,
    pub branch_deletion: BranchDeletionOutcome,
}

/// The terminal state of processing one pull request, other than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Merged(MergeOutcome),
    Rejected(Rejection),
}

/// Formats the comment posted on a pull request when its processing fails.
pub fn failure_comment(error: &Error) -> String {
    format!(
        ":x: greenkeeper-keeper failed to merge the pull-request \n> {}",
        error
    )
}

/// Merges accepted pull requests with the configured strategy.
///
/// Cheap to clone; clones share the GitHub client and settings.
#[derive(Clone)]
pub struct MergeOrchestrator {
    client: Arc<dyn GitHubActions>,
    settings: Arc<Settings>,
}

impl MergeOrchestrator {
    pub fn new(client: Arc<dyn GitHubActions>, settings: Arc<Settings>) -> Self {
        Self { client, settings }
    }

    /// Evaluates, merges and cleans up a single pull request.
    ///
    /// A pull request whose head commit statuses are not all green is returned
    /// as [`ProcessOutcome::Rejected`] without any further GitHub call.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the commit status cannot be read. Nothing is
    ///   merged and no comment is posted.
    /// - [`Error::MergeFailure`] if the merge is refused. One failure comment is
    ///   posted.
    /// - [`Error::BranchDeletionFailure`] if the merge succeeded but the branch
    ///   could not be deleted. One failure comment is posted.
    #[instrument(skip(self, pr), fields(pull_request = %pr))]
    pub async fn accept_and_merge(&self, pr: &PullRequestRef) -> Result<ProcessOutcome, Error> {
        let acceptability = ensure_acceptability(
            self.client.as_ref(),
            &pr.repository,
            &pr.head_sha,
            self.settings.pending_retry.as_ref(),
        )
        .await?;

        if let Err(rejection) = acceptability {
            return Ok(ProcessOutcome::Rejected(rejection));
        }

        let sha = match self.merge(pr).await {
            Ok(sha) => sha,
            Err(e) => {
                self.report_failure(pr, &e).await;
                return Err(e);
            }
        };

        let branch_deletion = match self.delete_branch(pr).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report_failure(pr, &e).await;
                return Err(e);
            }
        };

        Ok(ProcessOutcome::Merged(MergeOutcome {
            sha,
            branch_deletion,
        }))
    }

    /// Loads a pull request by number and processes it.
    ///
    /// Used for events that only identify the pull request indirectly (commit
    /// statuses and check runs). The pull request author must be a trusted
    /// sender and the pull request must still be open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the pull request cannot be read, and
    /// otherwise the errors of [`MergeOrchestrator::accept_and_merge`].
    #[instrument(skip(self), fields(repo = %repository))]
    pub async fn process_pull_request(
        &self,
        repository: &Repository,
        number: u64,
    ) -> Result<ProcessOutcome, Error> {
        let details = self.client.get_pull_request(repository, number).await?;
        let pr = PullRequestRef::from_details(repository.clone(), &details);

        if details.state != "open" {
            let rejection = Rejection::PullRequestNotOpen {
                state: details.state.clone(),
            };
            info!(category = "PR", reason = %rejection, "skipping");
            return Ok(ProcessOutcome::Rejected(rejection));
        }

        if !self.settings.trusted_senders.is_trusted(&pr.sender) {
            let rejection = Rejection::UntrustedSender {
                sender: pr.sender.clone(),
            };
            info!(category = "PR", reason = %rejection, "skipping");
            return Ok(ProcessOutcome::Rejected(rejection));
        }

        self.accept_and_merge(&pr).await
    }

    async fn merge(&self, pr: &PullRequestRef) -> Result<String, Error> {
        let method = self.settings.merge_method;
        match self
            .client
            .merge_pull_request(&pr.repository, pr.number, &pr.head_sha, method)
            .await
        {
            Ok(result) => {
                info!(
                    merge_method = %method,
                    merge_sha = %result.sha,
                    "Pull request merged"
                );
                Ok(result.sha)
            }
            Err(e) => {
                error!(merge_method = %method, error = %e, "Failed to merge pull request");
                Err(Error::MergeFailure {
                    cause: e.to_string(),
                })
            }
        }
    }

    async fn delete_branch(&self, pr: &PullRequestRef) -> Result<BranchDeletionOutcome, Error> {
        if !self.settings.delete_branches {
            return Ok(BranchDeletionOutcome::NotRequested);
        }

        match self.client.delete_ref(&pr.repository, &pr.head_ref).await {
            Ok(()) => {
                info!(branch = %pr.head_ref, "Source branch deleted");
                Ok(BranchDeletionOutcome::Deleted)
            }
            Err(e) => {
                error!(branch = %pr.head_ref, error = %e, "Failed to delete source branch");
                Err(Error::BranchDeletionFailure {
                    cause: e.to_string(),
                })
            }
        }
    }

    /// Posts the failure as a comment. A failure to comment is only logged.
    async fn report_failure(&self, pr: &PullRequestRef, failure: &Error) {
        let body = failure_comment(failure);
        if let Err(e) = self
            .client
            .create_issue_comment(&pr.repository, pr.number, &body)
            .await
        {
            warn!(
                error = %e,
                comments_url = pr.comments_url.as_deref().unwrap_or_default(),
                "Failed to report the failure on the pull request"
            );
        }
    }
}
