//! greenkeeper-keeper HTTP service
//!
//! This crate exposes the keeper as a GitHub webhook receiver. It exists in
//! the HTTP layer and handles:
//! - Reading the event name and raw body of each delivery
//! - Handing the delivery to the [`keeper_core::Dispatcher`]
//! - Codifying the dispatch decision as an HTTP status and body
//! - Routing, request tracing and server lifecycle
//!
//! The dependency flows HTTP API → business logic, never the reverse.

use std::sync::Arc;

use keeper_core::{Dispatcher, Settings};

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routes;
pub mod server;

pub use responses::{ResponseClass, WebhookResponse};
pub use server::{ApiConfig, ApiServer};

/// Default API port
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Creates the state for the given settings, talking to the GitHub API
    /// they point at.
    pub fn from_settings(settings: Settings) -> Self {
        let client = Arc::new(settings.github_client());
        Self::new(Dispatcher::new(client, Arc::new(settings)))
    }
}
