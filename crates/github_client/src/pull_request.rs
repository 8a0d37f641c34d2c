//! Pull request domain types.
//!
//! This module contains the pull request details the keeper reads, the issue
//! search results used to map a branch back to its pull requests, and the
//! request/response shapes of the merge endpoint.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::User;

#[cfg(test)]
#[path = "pull_request_tests.rs"]
mod tests;

/// The method GitHub uses to integrate a pull request.
///
/// Serialized in lowercase, matching the `merge_method` parameter of the merge
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Create a merge commit
    #[default]
    Merge,
    /// Squash all commits into one
    Squash,
    /// Rebase the commits onto the base branch
    Rebase,
}

impl MergeMethod {
    /// Converts the MergeMethod to the literal GitHub expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Squash => "squash",
            Self::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Self::Merge),
            "squash" => Ok(Self::Squash),
            "rebase" => Ok(Self::Rebase),
            other => Err(format!(
                "unknown merge method '{}', expected one of: merge, squash, rebase",
                other
            )),
        }
    }
}

/// The head of a pull request: the branch it was opened from and its tip.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequestHead {
    /// Branch name, without the `refs/heads/` prefix
    #[serde(rename = "ref")]
    pub git_ref: String,

    /// Commit SHA at the tip of the branch
    pub sha: String,
}

/// Details of a pull request as returned by `GET /repos/{owner}/{repo}/pulls/{number}`.
///
/// Only the fields the keeper acts on are modelled; everything else GitHub
/// returns is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequestDetails {
    pub number: u64,

    /// `open` or `closed`
    #[serde(default)]
    pub state: String,

    pub head: PullRequestHead,

    /// The account that opened the pull request
    #[serde(default)]
    pub user: Option<User>,

    #[serde(default)]
    pub comments_url: Option<String>,

    #[serde(default)]
    pub html_url: Option<String>,

    #[serde(default)]
    pub merged: Option<bool>,
}

/// A single hit of `GET /search/issues`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IssueSearchItem {
    /// Issue or pull request number
    pub number: u64,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub user: Option<User>,

    #[serde(default)]
    pub html_url: Option<String>,
}

/// The envelope of `GET /search/issues`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IssueSearchResults {
    #[serde(default)]
    pub total_count: u64,

    #[serde(default)]
    pub items: Vec<IssueSearchItem>,
}

/// Body of `PUT /repos/{owner}/{repo}/pulls/{number}/merge`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct MergeRequest<'a> {
    pub commit_title: String,
    pub commit_message: String,
    /// Head SHA guard; GitHub refuses the merge if the head moved.
    pub sha: &'a str,
    pub merge_method: MergeMethod,
}

/// Response of the merge endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeResult {
    /// SHA of the merge commit
    #[serde(default)]
    pub sha: String,

    pub merged: bool,

    #[serde(default)]
    pub message: Option<String>,
}

/// Builds the commit title and message the keeper uses for every merge.
pub fn merge_commit_title(number: u64) -> String {
    format!("greenkeeper-keeper(pr: {}): :white_check_mark:", number)
}
