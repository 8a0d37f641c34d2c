//! Webhook event dispatch.
//!
//! The dispatcher classifies each delivery, decides synchronously what the
//! HTTP response should be, and starts the merge pipeline for accepted pull
//! requests as detached tasks. The decision never waits on a merge.

use std::fmt;
use std::sync::Arc;

use github_client::{GitHubActions, Repository};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, instrument, warn, Instrument};

use crate::events::{CheckRunEvent, PingEvent, PullRequestEvent, StatusEvent, WebhookEvent};
use crate::orchestrator::{MergeOrchestrator, ProcessOutcome, PullRequestRef};
use crate::settings::Settings;
use crate::Error;

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

/// Why a delivery was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MalformedPayload(String),
    IrrelevantAction(String),
    StatusNotSuccessful(String),

    /// The commit, or check run, maps to zero or several candidates.
    AmbiguousTarget(Vec<String>),

    DefaultBranch(String),
    CheckRunIncomplete(String),
    CheckRunNotSuccessful(Option<String>),
    UnhandledEvent(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MalformedPayload(reason) => write!(f, "malformed payload: {}", reason),
            SkipReason::IrrelevantAction(action) => {
                write!(f, "pull request action '{}' is not handled", action)
            }
            SkipReason::StatusNotSuccessful(state) => write!(f, "commit status is '{}'", state),
            SkipReason::AmbiguousTarget(candidates) => write!(
                f,
                "expected exactly one target but found {} [{}]",
                candidates.len(),
                candidates.join(", ")
            ),
            SkipReason::DefaultBranch(branch) => {
                write!(f, "commit is on the default branch '{}'", branch)
            }
            SkipReason::CheckRunIncomplete(status) => write!(f, "check run is '{}'", status),
            SkipReason::CheckRunNotSuccessful(conclusion) => write!(
                f,
                "check run concluded '{}'",
                conclusion.as_deref().unwrap_or("none")
            ),
            SkipReason::UnhandledEvent(name) => write!(f, "event '{}' is not handled", name),
        }
    }
}

/// The synchronous outcome of a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A ping for a webhook sending JSON.
    Configured,

    /// A ping for a webhook sending another content type.
    ContentTypeMismatch { content_type: Option<String> },

    /// Merge processing was started for these pull requests.
    Accepted { pull_requests: Vec<u64> },

    Skipped(SkipReason),

    UntrustedSender { sender: String },

    /// No open pull request matches the commit.
    NoPullRequests,

    /// The pull request search failed.
    LookupFailed { cause: String },
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Configured => f.write_str("webhook configured"),
            Decision::ContentTypeMismatch { content_type } => write!(
                f,
                "webhook sends '{}' instead of 'json'",
                content_type.as_deref().unwrap_or("unknown")
            ),
            Decision::Accepted { pull_requests } => {
                write!(f, "processing {} pull request(s)", pull_requests.len())
            }
            Decision::Skipped(reason) => write!(f, "skipping: {}", reason),
            Decision::UntrustedSender { sender } => {
                write!(f, "PR is not from greenkeeper, but from {}", sender)
            }
            Decision::NoPullRequests => f.write_str("no PRs for this commit"),
            Decision::LookupFailed { cause } => write!(f, "failed to fetch PRs: {}", cause),
        }
    }
}

/// A decision together with the merge tasks it started.
#[derive(Debug)]
pub struct Dispatch {
    pub decision: Decision,
    pub tasks: Vec<JoinHandle<()>>,
}

impl Dispatch {
    fn immediate(decision: Decision) -> Self {
        Self {
            decision,
            tasks: Vec::new(),
        }
    }

    /// Waits for every started task to finish and returns the decision.
    pub async fn wait(self) -> Decision {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Merge task did not complete");
            }
        }
        self.decision
    }
}

/// Routes webhook deliveries to the merge pipeline.
pub struct Dispatcher {
    client: Arc<dyn GitHubActions>,
    settings: Arc<Settings>,
    orchestrator: MergeOrchestrator,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn GitHubActions>, settings: Arc<Settings>) -> Self {
        let orchestrator = MergeOrchestrator::new(client.clone(), settings.clone());
        Self {
            client,
            settings,
            orchestrator,
        }
    }

    /// Parses a raw delivery and dispatches it.
    ///
    /// A body that does not match its event type is skipped.
    pub async fn handle_delivery(&self, event_name: &str, payload: &[u8]) -> Dispatch {
        match WebhookEvent::parse(event_name, payload) {
            Ok(event) => self.dispatch(event).await,
            Err(e) => {
                let reason = match e {
                    Error::MalformedPayload { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.reject("webhook", Decision::Skipped(SkipReason::MalformedPayload(reason)))
            }
        }
    }

    /// Decides what to do with a parsed event.
    ///
    /// Returns once the decision is made. Merges run in the returned tasks.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub async fn dispatch(&self, event: WebhookEvent) -> Dispatch {
        match event {
            WebhookEvent::Ping(ping) => self.on_ping(&ping),
            WebhookEvent::PullRequest(pr) => self.on_pull_request(pr),
            WebhookEvent::Status(status) => self.on_status(status).await,
            WebhookEvent::CheckRun(check) => self.on_check_run(check),
            WebhookEvent::Other { name } => {
                self.reject("PR", Decision::Skipped(SkipReason::UnhandledEvent(name)))
            }
        }
    }

    fn on_ping(&self, ping: &PingEvent) -> Dispatch {
        match ping.content_type() {
            Some("json") => {
                info!(
                    category = "webhook",
                    hook_id = ping.hook_id,
                    "successfully configured the webhook for greenkeeper-keeper"
                );
                Dispatch::immediate(Decision::Configured)
            }
            other => self.reject(
                "webhook",
                Decision::ContentTypeMismatch {
                    content_type: other.map(str::to_string),
                },
            ),
        }
    }

    fn on_pull_request(&self, event: PullRequestEvent) -> Dispatch {
        if event.action != "opened" {
            return self.reject(
                "PR",
                Decision::Skipped(SkipReason::IrrelevantAction(event.action)),
            );
        }

        if !self.settings.trusted_senders.is_trusted(&event.sender.html_url) {
            return self.reject(
                "PR",
                Decision::UntrustedSender {
                    sender: event.sender.html_url,
                },
            );
        }

        let pr = PullRequestRef {
            repository: event.repository.to_repository(),
            number: event.pull_request.number,
            head_sha: event.pull_request.head.sha,
            head_ref: event.pull_request.head.git_ref,
            sender: event.sender.html_url,
            comments_url: event.pull_request.comments_url,
        };
        info!(category = "PR", pull_request = %pr, "Accepted pull request for merging");

        let number = pr.number;
        let task = self.spawn_merge(pr);
        Dispatch {
            decision: Decision::Accepted {
                pull_requests: vec![number],
            },
            tasks: vec![task],
        }
    }

    async fn on_status(&self, event: StatusEvent) -> Dispatch {
        if event.state != "success" {
            return self.reject(
                "PR",
                Decision::Skipped(SkipReason::StatusNotSuccessful(event.state)),
            );
        }

        let branch = match event.branches.as_slice() {
            [branch] => branch.name.clone(),
            branches => {
                let names = branches.iter().map(|b| b.name.clone()).collect();
                return self.reject("PR", Decision::Skipped(SkipReason::AmbiguousTarget(names)));
            }
        };

        if event.repository.is_default_branch(&branch) {
            return self.reject("PR", Decision::Skipped(SkipReason::DefaultBranch(branch)));
        }

        let repository = event.repository.to_repository();
        let items = match self
            .client
            .search_pull_requests_for_ref(&repository, &branch)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                error!(
                    category = "PR",
                    branch = %branch,
                    error = %e,
                    "failed to fetch PRs"
                );
                return Dispatch::immediate(Decision::LookupFailed {
                    cause: e.to_string(),
                });
            }
        };

        if items.is_empty() {
            return self.reject("PR", Decision::NoPullRequests);
        }

        let pull_requests: Vec<u64> = items.iter().map(|item| item.number).collect();
        info!(
            category = "PR",
            branch = %branch,
            sha = %event.sha,
            pull_requests = ?pull_requests,
            "Commit status passed, processing matching pull requests"
        );

        let tasks = pull_requests
            .iter()
            .map(|number| self.spawn_process(repository.clone(), *number))
            .collect();
        Dispatch {
            decision: Decision::Accepted { pull_requests },
            tasks,
        }
    }

    fn on_check_run(&self, event: CheckRunEvent) -> Dispatch {
        let run = &event.check_run;
        if run.status != "completed" {
            return self.reject(
                "PR",
                Decision::Skipped(SkipReason::CheckRunIncomplete(run.status.clone())),
            );
        }

        if run.conclusion.as_deref() != Some("success") {
            return self.reject(
                "PR",
                Decision::Skipped(SkipReason::CheckRunNotSuccessful(run.conclusion.clone())),
            );
        }

        if let Some(branch) = run.head_branch() {
            if event.repository.is_default_branch(branch) {
                return self.reject(
                    "PR",
                    Decision::Skipped(SkipReason::DefaultBranch(branch.to_string())),
                );
            }
        }

        let number = match run.pull_requests.as_slice() {
            [] => return self.reject("PR", Decision::NoPullRequests),
            [pr] => pr.number,
            many => {
                let numbers = many.iter().map(|pr| format!("#{}", pr.number)).collect();
                return self.reject("PR", Decision::Skipped(SkipReason::AmbiguousTarget(numbers)));
            }
        };

        info!(
            category = "PR",
            check_run = run.name.as_deref().unwrap_or_default(),
            pull_request = number,
            "Check run passed, processing pull request"
        );
        let task = self.spawn_process(event.repository.to_repository(), number);
        Dispatch {
            decision: Decision::Accepted {
                pull_requests: vec![number],
            },
            tasks: vec![task],
        }
    }

    fn reject(&self, category: &'static str, decision: Decision) -> Dispatch {
        info!(category = category, reason = %decision, "skipping");
        Dispatch::immediate(decision)
    }

    fn spawn_merge(&self, pr: PullRequestRef) -> JoinHandle<()> {
        let orchestrator = self.orchestrator.clone();
        let span = info_span!("merge", pull_request = %pr);
        tokio::spawn(
            async move {
                log_outcome(orchestrator.accept_and_merge(&pr).await);
            }
            .instrument(span),
        )
    }

    fn spawn_process(&self, repository: Repository, number: u64) -> JoinHandle<()> {
        let orchestrator = self.orchestrator.clone();
        let span = info_span!("merge", repo = %repository, pull_request = number);
        tokio::spawn(
            async move {
                log_outcome(orchestrator.process_pull_request(&repository, number).await);
            }
            .instrument(span),
        )
    }
}

fn log_outcome(result: Result<ProcessOutcome, Error>) {
    match result {
        Ok(ProcessOutcome::Merged(outcome)) => info!(
            merge_sha = %outcome.sha,
            branch_deletion = ?outcome.branch_deletion,
            "Pull request processed"
        ),
        Ok(ProcessOutcome::Rejected(rejection)) => info!(
            reason = %rejection,
            retryable = rejection.is_retryable(),
            "Pull request left open"
        ),
        Err(e) => error!(error = %e, "Failed to process pull request"),
    }
}
