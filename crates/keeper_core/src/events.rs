//! Typed GitHub webhook events.
//!
//! Only the fields the keeper reads are modelled. A body that lacks one of
//! them, or carries it with the wrong type, is a malformed payload.

use github_client::{PullRequestHead, Repository};
use serde::{de::DeserializeOwned, Deserialize};

use crate::Error;

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

/// A GitHub webhook delivery, classified by its `X-GitHub-Event` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Ping(PingEvent),
    PullRequest(PullRequestEvent),
    Status(StatusEvent),
    CheckRun(CheckRunEvent),

    /// Any event the keeper does not act on. The body is not inspected.
    Other { name: String },
}

impl WebhookEvent {
    /// Parses a webhook body according to its event name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if the body of a known event is not
    /// valid JSON or does not have the expected shape.
    pub fn parse(event_name: &str, payload: &[u8]) -> Result<Self, Error> {
        match event_name {
            "ping" => parse_payload(event_name, payload).map(WebhookEvent::Ping),
            "pull_request" => parse_payload(event_name, payload).map(WebhookEvent::PullRequest),
            "status" => parse_payload(event_name, payload).map(WebhookEvent::Status),
            "check_run" => parse_payload(event_name, payload).map(WebhookEvent::CheckRun),
            other => Ok(WebhookEvent::Other {
                name: other.to_string(),
            }),
        }
    }

    /// The event name this variant was parsed from.
    pub fn name(&self) -> &str {
        match self {
            WebhookEvent::Ping(_) => "ping",
            WebhookEvent::PullRequest(_) => "pull_request",
            WebhookEvent::Status(_) => "status",
            WebhookEvent::CheckRun(_) => "check_run",
            WebhookEvent::Other { name } => name,
        }
    }
}

fn parse_payload<T: DeserializeOwned>(event_name: &str, payload: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(payload).map_err(|e| Error::MalformedPayload {
        event: event_name.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadOwner {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayloadRepository {
    pub name: String,
    pub owner: PayloadOwner,

    #[serde(default)]
    pub default_branch: Option<String>,
}

impl PayloadRepository {
    pub fn to_repository(&self) -> Repository {
        Repository::new(self.owner.login.clone(), self.name.clone())
    }

    /// Returns true for `master` and for the repository's own default branch.
    ///
    /// Commits on these branches never belong to a dependency update.
    pub fn is_default_branch(&self, branch: &str) -> bool {
        branch == "master" || self.default_branch.as_deref() == Some(branch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sender {
    #[serde(default)]
    pub login: Option<String>,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookConfig {
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Hook {
    pub config: HookConfig,
}

/// Sent once when a webhook is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PingEvent {
    #[serde(default)]
    pub zen: Option<String>,

    #[serde(default)]
    pub hook_id: Option<u64>,

    #[serde(default)]
    pub hook: Option<Hook>,
}

impl PingEvent {
    /// The content type the webhook was configured with, if reported.
    pub fn content_type(&self) -> Option<&str> {
        self.hook.as_ref()?.config.content_type.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    pub head: PullRequestHead,

    #[serde(default)]
    pub comments_url: Option<String>,

    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequestPayload,
    pub repository: PayloadRepository,
    pub sender: Sender,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchPayload {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusEvent {
    pub sha: String,
    pub state: String,

    /// Branches containing the commit. Absent is the same as empty.
    #[serde(default)]
    pub branches: Vec<BranchPayload>,

    pub repository: PayloadRepository,

    #[serde(default)]
    pub context: Option<String>,

    #[serde(default)]
    pub sender: Option<Sender>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckSuitePayload {
    #[serde(default)]
    pub head_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckRunPullRequest {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckRunPayload {
    pub status: String,

    #[serde(default)]
    pub conclusion: Option<String>,

    pub head_sha: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub check_suite: Option<CheckSuitePayload>,

    #[serde(default)]
    pub pull_requests: Vec<CheckRunPullRequest>,
}

impl CheckRunPayload {
    pub fn head_branch(&self) -> Option<&str> {
        self.check_suite.as_ref()?.head_branch.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckRunEvent {
    #[serde(default)]
    pub action: Option<String>,
    pub check_run: CheckRunPayload,
    pub repository: PayloadRepository,

    #[serde(default)]
    pub sender: Option<Sender>,
}
