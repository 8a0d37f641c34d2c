//! greenkeeper-keeper webhook server
//!
//! Main binary for running the webhook receiver.
//!
//! # Environment Variables
//!
//! - `KEEPER_CONFIG`: Settings file (default: keeper.toml)
//! - `GITHUB_TOKEN`: GitHub token, overrides the settings file
//! - `API_PORT`: Port to listen on (default: 3000)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `RUST_LOG`: Log level (default: info)
//! - `LOG_FORMAT`: `json` for structured log lines (default: plain text)

use std::env;

use keeper_api::{config, ApiServer, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let api_config = config::api_config_from_env()?;
    let settings = config::settings_from_env()?;

    tracing::info!("Starting greenkeeper-keeper");
    tracing::info!(
        merge_method = %settings.merge_method,
        delete_branches = settings.delete_branches,
        api_url = %settings.api_url,
        "Loaded settings"
    );

    let server = ApiServer::new(api_config, AppState::from_settings(settings));

    // Start server with graceful shutdown
    server.serve().await
}

fn init_tracing() {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
