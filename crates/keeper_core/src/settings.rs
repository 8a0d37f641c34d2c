//! Keeper settings.
//!
//! Settings are read from TOML in their raw form ([`RawSettings`]), where every
//! field is optional, and then validated into [`Settings`]. Validation fails
//! before the service starts, so the rest of the keeper can rely on a complete
//! configuration.
//!
//! ```toml
//! squash = true
//! deleteBranches = true
//! trustedSenders = ["https://github.com/apps/greenkeeper"]
//!
//! [github]
//! token = "ghp_..."
//!
//! [pending]
//! retries = 3
//! intervalSeconds = 20
//! ```

use github_client::{GitHubClient, MergeMethod, DEFAULT_API_URL};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::acceptability::PendingRetry;
use crate::sender::TrustedSenders;

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

/// Errors raised while reading or validating settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("\"{0}\" is required")]
    MissingField(&'static str),

    #[error("\"squash\" or \"acceptAction\" is required")]
    MissingMergeStrategy,

    #[error("\"squash\" and \"acceptAction\" are mutually exclusive")]
    ConflictingMergeStrategy,

    #[error("\"{field}\" is invalid: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Settings as written in the configuration file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    pub github: Option<RawGitHubSettings>,
    pub squash: Option<bool>,
    pub accept_action: Option<MergeMethod>,
    pub delete_branches: Option<bool>,
    pub pending: Option<PendingRetry>,
    pub trusted_senders: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGitHubSettings {
    pub token: Option<String>,
    pub api_url: Option<String>,
}

impl RawSettings {
    /// Parses raw settings from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Replaces the configured token, creating the `github` table if needed.
    pub fn override_token(&mut self, token: impl Into<String>) {
        self.github.get_or_insert_with(RawGitHubSettings::default).token = Some(token.into());
    }
}

/// Validated keeper settings.
#[derive(Debug)]
pub struct Settings {
    token: SecretString,

    /// Base URL of the GitHub REST API.
    pub api_url: String,

    /// How accepted pull requests are merged.
    pub merge_method: MergeMethod,

    /// Whether the source branch is deleted after a successful merge.
    pub delete_branches: bool,

    /// Re-poll budget for `pending` commit statuses. `None` polls once.
    pub pending_retry: Option<PendingRetry>,

    pub trusted_senders: TrustedSenders,
}

impl Settings {
    /// Creates settings with the defaults for everything but the token and
    /// merge method.
    pub fn new(token: impl Into<String>, merge_method: MergeMethod) -> Self {
        Self {
            token: SecretString::from(token.into()),
            api_url: DEFAULT_API_URL.to_string(),
            merge_method,
            delete_branches: false,
            pending_retry: None,
            trusted_senders: TrustedSenders::default(),
        }
    }

    pub fn with_delete_branches(mut self, delete_branches: bool) -> Self {
        self.delete_branches = delete_branches;
        self
    }

    pub fn with_pending_retry(mut self, pending_retry: PendingRetry) -> Self {
        self.pending_retry = Some(pending_retry);
        self
    }

    pub fn with_trusted_senders(mut self, trusted_senders: TrustedSenders) -> Self {
        self.trusted_senders = trusted_senders;
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// Creates a GitHub client for the configured API root and token.
    pub fn github_client(&self) -> GitHubClient {
        GitHubClient::new(SecretString::from(self.token.expose_secret().to_owned()))
            .with_base_uri(self.api_url.clone())
    }

    /// Parses and validates settings from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::try_from(RawSettings::from_toml_str(content)?)
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = ConfigError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        let github = raw.github.ok_or(ConfigError::MissingField("github"))?;
        let token = github
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingField("token"))?;

        let merge_method = match (raw.squash, raw.accept_action) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingMergeStrategy),
            (Some(true), None) => MergeMethod::Squash,
            (Some(false), None) => MergeMethod::Merge,
            (None, Some(method)) => method,
            (None, None) => return Err(ConfigError::MissingMergeStrategy),
        };

        let mut settings = Settings::new(token, merge_method)
            .with_delete_branches(raw.delete_branches.unwrap_or(false));

        if let Some(api_url) = github.api_url {
            if api_url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "apiUrl",
                    reason: "must not be empty".to_string(),
                });
            }
            settings = settings.with_api_url(api_url);
        }

        if let Some(pending) = raw.pending {
            settings = settings.with_pending_retry(pending);
        }

        if let Some(urls) = raw.trusted_senders {
            if urls.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "trustedSenders",
                    reason: "must name at least one profile URL".to_string(),
                });
            }
            settings = settings.with_trusted_senders(TrustedSenders::new(urls));
        }

        Ok(settings)
    }
}
