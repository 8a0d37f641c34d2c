//! Shared test doubles for the keeper core.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use github_client::{
    CombinedStatus, Error as ClientError, GitHubActions, IssueSearchItem, MergeMethod,
    MergeResult, PullRequestDetails, PullRequestHead, Repository, StatusContext, User,
};

use crate::sender::GREENKEEPER_INTEGRATION_GITHUB_URL;

pub const OWNER: &str = "test-owner";
pub const REPO: &str = "test-repo";
pub const HEAD_SHA: &str = "6dcb09b5b57875f334f61aebed695e2e4193db5e";
pub const HEAD_REF: &str = "greenkeeper/lodash-4.17.21";
pub const MERGE_SHA: &str = "9e0f1bcb8d3e8f6f1c1a4f0c7cdb70e8f3a0e2c4";

/// A GitHub call observed by [`MockGitHub`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CombinedStatus { sha: String },
    GetPullRequest { number: u64 },
    Search { git_ref: String },
    Merge { number: u64, sha: String, method: MergeMethod },
    DeleteRef { git_ref: String },
    Comment { number: u64, body: String },
}

/// Mock implementation of `GitHubActions` that records every call.
///
/// Combined status states are served in order; the last one repeats.
#[derive(Debug)]
pub struct MockGitHub {
    states: Mutex<VecDeque<String>>,
    status_failure: Option<String>,
    pull_request: Option<PullRequestDetails>,
    search_results: Vec<IssueSearchItem>,
    search_failure: Option<String>,
    merge_failure: Option<String>,
    delete_failure: Option<String>,
    comment_failure: Option<String>,
    calls: Mutex<Vec<Call>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(VecDeque::from(vec!["success".to_string()])),
            status_failure: None,
            pull_request: None,
            search_results: Vec::new(),
            search_failure: None,
            merge_failure: None,
            delete_failure: None,
            comment_failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_states(self, states: &[&str]) -> Self {
        *self.states.lock().unwrap() = states.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_status_failure(mut self, message: &str) -> Self {
        self.status_failure = Some(message.to_string());
        self
    }

    pub fn with_pull_request(mut self, details: PullRequestDetails) -> Self {
        self.pull_request = Some(details);
        self
    }

    pub fn with_search_results(mut self, numbers: &[u64]) -> Self {
        self.search_results = numbers
            .iter()
            .map(|number| IssueSearchItem {
                number: *number,
                title: Some(format!("Update dependency #{}", number)),
                user: None,
                html_url: None,
            })
            .collect();
        self
    }

    pub fn with_search_failure(mut self, message: &str) -> Self {
        self.search_failure = Some(message.to_string());
        self
    }

    pub fn with_merge_failure(mut self, message: &str) -> Self {
        self.merge_failure = Some(message.to_string());
        self
    }

    pub fn with_delete_failure(mut self, message: &str) -> Self {
        self.delete_failure = Some(message.to_string());
        self
    }

    pub fn with_comment_failure(mut self, message: &str) -> Self {
        self.comment_failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn merge_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Merge { .. }))
            .count()
    }

    pub fn comments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Comment { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_state(&self) -> String {
        let mut states = self.states.lock().unwrap();
        if states.len() > 1 {
            states.pop_front().unwrap()
        } else {
            states.front().cloned().unwrap_or_else(|| "success".to_string())
        }
    }
}

#[async_trait]
impl GitHubActions for MockGitHub {
    async fn get_combined_status(
        &self,
        _repo: &Repository,
        sha: &str,
    ) -> Result<CombinedStatus, ClientError> {
        self.record(Call::CombinedStatus {
            sha: sha.to_string(),
        });
        if let Some(message) = &self.status_failure {
            return Err(ClientError::ApiError(message.clone()));
        }

        let state = self.next_state();
        Ok(CombinedStatus {
            state: state.clone(),
            sha: Some(sha.to_string()),
            total_count: Some(1),
            statuses: vec![StatusContext {
                context: "ci/circleci".to_string(),
                state,
                description: None,
            }],
        })
    }

    async fn get_pull_request(
        &self,
        _repo: &Repository,
        number: u64,
    ) -> Result<PullRequestDetails, ClientError> {
        self.record(Call::GetPullRequest { number });
        self.pull_request
            .clone()
            .ok_or_else(|| ClientError::NotFound(format!("Pull request #{}", number)))
    }

    async fn search_pull_requests_for_ref(
        &self,
        _repo: &Repository,
        git_ref: &str,
    ) -> Result<Vec<IssueSearchItem>, ClientError> {
        self.record(Call::Search {
            git_ref: git_ref.to_string(),
        });
        match &self.search_failure {
            Some(message) => Err(ClientError::ApiError(message.clone())),
            None => Ok(self.search_results.clone()),
        }
    }

    async fn merge_pull_request(
        &self,
        _repo: &Repository,
        number: u64,
        sha: &str,
        method: MergeMethod,
    ) -> Result<MergeResult, ClientError> {
        self.record(Call::Merge {
            number,
            sha: sha.to_string(),
            method,
        });
        match &self.merge_failure {
            Some(message) => Err(ClientError::ApiError(message.clone())),
            None => Ok(MergeResult {
                sha: MERGE_SHA.to_string(),
                merged: true,
                message: Some("Pull Request successfully merged".to_string()),
            }),
        }
    }

    async fn delete_ref(&self, _repo: &Repository, git_ref: &str) -> Result<(), ClientError> {
        self.record(Call::DeleteRef {
            git_ref: git_ref.to_string(),
        });
        match &self.delete_failure {
            Some(message) => Err(ClientError::ApiError(message.clone())),
            None => Ok(()),
        }
    }

    async fn create_issue_comment(
        &self,
        _repo: &Repository,
        number: u64,
        body: &str,
    ) -> Result<(), ClientError> {
        self.record(Call::Comment {
            number,
            body: body.to_string(),
        });
        match &self.comment_failure {
            Some(message) => Err(ClientError::ApiError(message.clone())),
            None => Ok(()),
        }
    }
}

pub fn test_repository() -> Repository {
    Repository::new(OWNER, REPO)
}

/// Pull request details as GitHub returns them for an open greenkeeper PR.
pub fn greenkeeper_pull_request(number: u64) -> PullRequestDetails {
    pull_request_from(number, GREENKEEPER_INTEGRATION_GITHUB_URL)
}

pub fn pull_request_from(number: u64, author_url: &str) -> PullRequestDetails {
    PullRequestDetails {
        number,
        state: "open".to_string(),
        head: PullRequestHead {
            git_ref: HEAD_REF.to_string(),
            sha: HEAD_SHA.to_string(),
        },
        user: Some(User {
            login: "greenkeeper[bot]".to_string(),
            html_url: author_url.to_string(),
        }),
        comments_url: Some(format!(
            "https://api.github.com/repos/{}/{}/issues/{}/comments",
            OWNER, REPO, number
        )),
        html_url: Some(format!("https://github.com/{}/{}/pull/{}", OWNER, REPO, number)),
        merged: Some(false),
    }
}
