//! Crate for interacting with the GitHub REST API.
//!
//! This crate provides the small set of GitHub operations the keeper needs to
//! merge a pull request: reading the combined commit status, reading and
//! merging pull requests, searching pull requests by branch, deleting a branch
//! and commenting on an issue thread.
//!
//! Every operation authenticates with the configured personal access token
//! before its first remote call. The credential context is built per call and
//! never cached between operations.

use async_trait::async_trait;
use octocrab::{params::repos::Reference, Octocrab, Result as OctocrabResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{Repository, User};

pub mod pull_request;
pub use pull_request::{
    merge_commit_title, IssueSearchItem, MergeMethod, MergeResult, PullRequestDetails,
    PullRequestHead,
};

pub mod status;
pub use status::{CombinedStatus, StatusContext};

use pull_request::{IssueSearchResults, MergeRequest};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// The public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// The GitHub operations the keeper performs.
///
/// Implemented by [`GitHubClient`] against the real API and by hand-written
/// mocks in tests.
#[async_trait]
pub trait GitHubActions: Send + Sync {
    /// Reads the combined status for a commit.
    ///
    /// # Errors
    ///
    /// Returns an `Error` if authentication or the API call fails.
    async fn get_combined_status(
        &self,
        repo: &Repository,
        sha: &str,
    ) -> Result<CombinedStatus, Error>;

    /// Reads the details of a pull request.
    async fn get_pull_request(
        &self,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequestDetails, Error>;

    /// Searches the pull requests of a repository that mention the given branch.
    ///
    /// May return an empty list.
    async fn search_pull_requests_for_ref(
        &self,
        repo: &Repository,
        git_ref: &str,
    ) -> Result<Vec<IssueSearchItem>, Error>;

    /// Merges a pull request, guarded by the expected head SHA.
    ///
    /// # Errors
    ///
    /// Returns an `Error` carrying GitHub's message if the merge is refused or
    /// the request fails. A response with `merged: false` is an error.
    async fn merge_pull_request(
        &self,
        repo: &Repository,
        number: u64,
        sha: &str,
        method: MergeMethod,
    ) -> Result<MergeResult, Error>;

    /// Deletes a branch.
    async fn delete_ref(&self, repo: &Repository, git_ref: &str) -> Result<(), Error>;

    /// Posts a comment on the issue thread of an issue or pull request.
    async fn create_issue_comment(
        &self,
        repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<(), Error>;
}

/// A client for the GitHub API authenticated with a personal access token.
#[derive(Debug)]
pub struct GitHubClient {
    token: SecretString,
    base_uri: String,
}

impl GitHubClient {
    /// Creates a new `GitHubClient` for the public GitHub API.
    ///
    /// # Arguments
    ///
    /// * `token` - The personal access token used for every request.
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            base_uri: DEFAULT_API_URL.to_string(),
        }
    }

    /// Points the client at a different API root, e.g. a GitHub Enterprise
    /// server or a mock server in tests.
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    /// Returns the API root this client talks to.
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Establishes the credential context for one operation.
    fn authenticate(&self) -> Result<Octocrab, Error> {
        create_token_client(self.token.expose_secret(), &self.base_uri)
    }
}

#[derive(Debug, Serialize)]
struct SearchQuery {
    q: String,
}

#[derive(Debug, Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedComment {
    id: u64,
}

#[async_trait]
impl GitHubActions for GitHubClient {
    #[instrument(skip(self), fields(repo = %repo))]
    async fn get_combined_status(
        &self,
        repo: &Repository,
        sha: &str,
    ) -> Result<CombinedStatus, Error> {
        repo.validate()?;
        let client = self.authenticate()?;

        let path = format!(
            "/repos/{}/{}/commits/{}/status",
            repo.owner(),
            repo.name(),
            sha
        );
        debug!("Making API call to: {}", path);

        let result: OctocrabResult<CombinedStatus> = client.get(path, None::<&()>).await;
        match result {
            Ok(status) => {
                info!(
                    sha = sha,
                    state = %status.state,
                    contexts = status.statuses.len(),
                    "Retrieved combined status"
                );
                Ok(status)
            }
            Err(e) => Err(map_octocrab_error("Failed to get combined status", e)),
        }
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn get_pull_request(
        &self,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequestDetails, Error> {
        repo.validate()?;
        let client = self.authenticate()?;

        let path = format!("/repos/{}/{}/pulls/{}", repo.owner(), repo.name(), number);
        let result: OctocrabResult<PullRequestDetails> = client.get(path, None::<&()>).await;
        result.map_err(|e| map_octocrab_error("Failed to get pull request", e))
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn search_pull_requests_for_ref(
        &self,
        repo: &Repository,
        git_ref: &str,
    ) -> Result<Vec<IssueSearchItem>, Error> {
        repo.validate()?;
        let client = self.authenticate()?;

        let query = SearchQuery {
            q: format!("{} type:pr repo:{}", git_ref, repo.full_name()),
        };
        debug!(query = %query.q, "Searching pull requests for ref");

        let result: OctocrabResult<IssueSearchResults> =
            client.get("/search/issues", Some(&query)).await;
        match result {
            Ok(results) => {
                info!(
                    git_ref = git_ref,
                    total_count = results.total_count,
                    "Found pull requests for ref"
                );
                Ok(results.items)
            }
            Err(e) => Err(map_octocrab_error("Failed to search pull requests", e)),
        }
    }

    #[instrument(skip(self), fields(repo = %repo, method = %method))]
    async fn merge_pull_request(
        &self,
        repo: &Repository,
        number: u64,
        sha: &str,
        method: MergeMethod,
    ) -> Result<MergeResult, Error> {
        repo.validate()?;
        let client = self.authenticate()?;

        let path = format!(
            "/repos/{}/{}/pulls/{}/merge",
            repo.owner(),
            repo.name(),
            number
        );
        let request = MergeRequest {
            commit_title: merge_commit_title(number),
            commit_message: merge_commit_title(number),
            sha,
            merge_method: method,
        };

        let result: OctocrabResult<MergeResult> = client.put(path, Some(&request)).await;
        match result {
            Ok(response) if response.merged => {
                info!(
                    pr_number = number,
                    merge_sha = %response.sha,
                    "Merged pull request"
                );
                Ok(response)
            }
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "GitHub reported the pull request as not merged".to_string());
                error!(pr_number = number, error_message = %message, "Merge was refused");
                Err(Error::ApiError(message))
            }
            Err(e) => Err(map_octocrab_error("Failed to merge pull request", e)),
        }
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn delete_ref(&self, repo: &Repository, git_ref: &str) -> Result<(), Error> {
        repo.validate()?;
        let client = self.authenticate()?;

        client
            .repos(repo.owner(), repo.name())
            .delete_ref(&Reference::Branch(git_ref.to_string()))
            .await
            .map_err(|e| map_octocrab_error("Failed to delete branch", e))?;

        info!(git_ref = git_ref, "Deleted branch");
        Ok(())
    }

    #[instrument(skip(self, body), fields(repo = %repo))]
    async fn create_issue_comment(
        &self,
        repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<(), Error> {
        repo.validate()?;
        let client = self.authenticate()?;

        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            repo.owner(),
            repo.name(),
            number
        );
        let result: OctocrabResult<CreatedComment> =
            client.post(path, Some(&CommentBody { body })).await;
        match result {
            Ok(comment) => {
                info!(pr_number = number, comment_id = comment.id, "Posted comment");
                Ok(())
            }
            Err(e) => Err(map_octocrab_error("Failed to create issue comment", e)),
        }
    }
}

/// Creates an `Octocrab` client authenticated with a personal access token.
///
/// # Arguments
///
/// * `token` - The personal access token.
/// * `base_uri` - The root of the GitHub REST API.
///
/// # Errors
///
/// Returns an `Error::AuthError` if the URI cannot be parsed or the client
/// cannot be built.
#[instrument(skip(token))]
pub fn create_token_client(token: &str, base_uri: &str) -> Result<Octocrab, Error> {
    Octocrab::builder()
        .base_uri(base_uri)
        .map_err(|e| {
            error!(base_uri = base_uri, error = %e, "Invalid GitHub API URL");
            Error::AuthError(format!("Invalid GitHub API URL '{}': {}", base_uri, e))
        })?
        .personal_token(token.to_string())
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to build Octocrab client with token credentials");
            Error::AuthError("Failed to build the token-authenticated client.".to_string())
        })
}

/// Logs an octocrab failure and converts it into the crate error, keeping
/// GitHub's own message.
fn map_octocrab_error(message: &str, e: octocrab::Error) -> Error {
    log_octocrab_error(message, &e);

    match e {
        octocrab::Error::GitHub { source, .. } => match source.status_code.as_u16() {
            404 => Error::NotFound(source.message),
            429 => Error::RateLimitExceeded,
            403 if source.message.to_lowercase().contains("rate limit") => {
                Error::RateLimitExceeded
            }
            _ => Error::ApiError(source.message),
        },
        other => Error::ApiError(other.to_string()),
    }
}

fn log_octocrab_error(message: &str, e: &octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, .. } => error!(
            error_message = %source.message,
            status = source.status_code.as_u16(),
            "{}. Received an error from GitHub",
            message
        ),
        octocrab::Error::UriParse { source, .. } => error!(
            error_message = %source,
            "{}. Failed to parse URI.",
            message
        ),
        octocrab::Error::Uri { source, .. } => error!(
            error_message = %source,
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, .. } => error!(
            error_message = %source,
            "{}. One of the header values was invalid.",
            message
        ),
        _ => error!(error_message = %e, "{}", message),
    };
}
