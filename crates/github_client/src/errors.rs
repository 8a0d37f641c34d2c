//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when the keeper talks to the
//! GitHub REST API. Every variant carries enough of the remote message that callers
//! can surface it verbatim, e.g. in a comment explaining why a merge failed.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::Error;
///
/// match client.get_combined_status(&repo, sha).await {
///     Ok(status) => println!("Combined state: {}", status.state),
///     Err(Error::AuthError(msg)) => eprintln!("Authentication failed: {}", msg),
///     Err(Error::RateLimitExceeded) => eprintln!("Rate limit exceeded, retry later"),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A GitHub API request failed.
    ///
    /// The contained string is the message GitHub (or the transport) returned.
    #[error("{0}")]
    ApiError(String),

    /// Building the token-authenticated client failed.
    ///
    /// This error occurs when:
    /// - The configured API URL cannot be parsed
    /// - The HTTP client cannot be initialised
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// The caller supplied an argument that can never form a valid request,
    /// for instance a repository without an owner.
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// The requested resource was not found.
    ///
    /// This error occurs when a GitHub API request returns a 404 status code.
    /// The contained string is the message GitHub returned.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// GitHub API rate limit has been exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}
