//! Sender identity check.
//!
//! Decides whether the actor behind a webhook is the dependency-update bot the
//! keeper is allowed to merge for. Identities are GitHub profile URLs and are
//! compared for exact equality.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;

/// Profile URL of the greenkeeper marketplace listing.
pub const GREENKEEPER_BOT_GITHUB_URL: &str = "https://github.com/marketplace/greenkeeper";

/// Profile URL of the greenkeeper GitHub App.
pub const GREENKEEPER_INTEGRATION_GITHUB_URL: &str = "https://github.com/apps/greenkeeper";

/// The set of profile URLs whose pull requests may be merged automatically.
///
/// The set is immutable once built. It defaults to the two greenkeeper
/// identities and can be replaced through configuration or in tests.
///
/// # Examples
///
/// ```rust
/// use keeper_core::sender::TrustedSenders;
///
/// let trusted = TrustedSenders::default();
///
/// assert!(trusted.is_trusted("https://github.com/apps/greenkeeper"));
/// assert!(!trusted.is_trusted("https://github.com/apps/greenkeeper/"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustedSenders {
    urls: Vec<String>,
}

impl TrustedSenders {
    /// Creates a trust set from the given profile URLs.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true iff `profile_url` equals one of the trusted URLs exactly.
    ///
    /// No normalization is applied: case, trailing slashes and prefixes all
    /// matter.
    pub fn is_trusted(&self, profile_url: &str) -> bool {
        self.urls.iter().any(|url| url == profile_url)
    }

    /// Returns the trusted URLs.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

impl Default for TrustedSenders {
    fn default() -> Self {
        Self::new([
            GREENKEEPER_INTEGRATION_GITHUB_URL,
            GREENKEEPER_BOT_GITHUB_URL,
        ])
    }
}
