//! # Keeper Core
//!
//! This crate decides what to do with GitHub webhook deliveries concerning
//! dependency-update pull requests, and merges the ones whose checks pass.
//!
//! ## Overview
//!
//! A delivery flows through these stages:
//! 1. [`events`] parses the body into a typed [`WebhookEvent`]
//! 2. [`dispatcher`] classifies it and returns a [`Decision`] immediately
//! 3. For accepted pull requests, a detached task runs the
//!    [`MergeOrchestrator`]: status evaluation, merge, optional branch deletion
//!    and a failure comment if anything goes wrong
//!
//! Only pull requests opened by a trusted sender (see [`sender`]) are merged.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use github_client::MergeMethod;
//! use keeper_core::{Dispatcher, Settings};
//!
//! # async fn example() {
//! let settings = Arc::new(Settings::new("ghp_token", MergeMethod::Squash));
//! let client = Arc::new(settings.github_client());
//! let dispatcher = Dispatcher::new(client, settings);
//!
//! let payload = br#"{"hook":{"config":{"content_type":"json"}}}"#;
//! let dispatch = dispatcher.handle_delivery("ping", payload).await;
//! println!("{}", dispatch.decision);
//! # }
//! ```

pub mod acceptability;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod sender;
pub mod settings;

pub use acceptability::{ensure_acceptability, evaluate, PendingRetry, StatusVerdict};
pub use dispatcher::{Decision, Dispatch, Dispatcher, SkipReason};
pub use errors::{Error, Rejection};
pub use events::WebhookEvent;
pub use orchestrator::{
    failure_comment, BranchDeletionOutcome, MergeOrchestrator, MergeOutcome, ProcessOutcome,
    PullRequestRef,
};
pub use sender::TrustedSenders;
pub use settings::{ConfigError, RawSettings, Settings};

#[cfg(test)]
mod test_support;
