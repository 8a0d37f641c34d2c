//! # Models
//!
//! This module contains the data models shared by every GitHub operation the keeper
//! performs: the repository key used to address API calls and the user account
//! that opened a pull request.

use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Identifies a GitHub repository by owner login and name.
///
/// Every remote call the keeper makes is addressed through a `Repository`. Both
/// fields must be non-empty before the value is used in a request; see
/// [`Repository::validate`].
///
/// # Examples
///
/// ```rust
/// use github_client::models::Repository;
///
/// let repo = Repository::new("octo-org", "widgets");
///
/// assert_eq!(repo.owner(), "octo-org");
/// assert_eq!(repo.name(), "widgets");
/// assert_eq!(repo.full_name(), "octo-org/widgets");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Repository {
    /// The login of the user or organization that owns the repository
    owner_login: String,
    /// The name of the repository
    name: String,
}

impl Repository {
    /// Creates a new Repository instance.
    ///
    /// # Arguments
    ///
    /// * `owner_login` - The login of the owning user or organization
    /// * `name` - The name of the repository
    pub fn new(owner_login: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner_login: owner_login.into(),
            name: name.into(),
        }
    }

    /// Returns the name of the repository (without owner).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the login of the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner_login
    }

    /// Returns the `owner/name` form used by GitHub search qualifiers.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_login, self.name)
    }

    /// Checks that the repository can address a GitHub API call.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the owner or the name is empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.owner_login.trim().is_empty() {
            return Err(Error::InvalidInput(
                "repository owner must not be empty".to_string(),
            ));
        }

        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "repository name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner_login, self.name)
    }
}

/// Represents a GitHub user account as it appears on pull requests and search results.
///
/// The `html_url` is the profile URL; it is the identity the keeper compares
/// against its trusted senders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    /// The login name of the user
    pub login: String,
    /// The profile URL of the user
    #[serde(default)]
    pub html_url: String,
}
