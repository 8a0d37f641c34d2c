//! Service configuration loading.
//!
//! Keeper settings come from a TOML file; the server address and the secret
//! token can be set through the environment.
//!
//! # Environment Variables
//!
//! - `KEEPER_CONFIG`: Path of the settings file (default: keeper.toml)
//! - `GITHUB_TOKEN`: Overrides `github.token` from the settings file
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `API_PORT`: Port to listen on (default: 3000)

use std::{env, fs, path::Path};

use anyhow::Context;
use keeper_core::{RawSettings, Settings};
use tracing::debug;

use crate::{ApiConfig, DEFAULT_HOST, DEFAULT_PORT};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

pub const CONFIG_PATH_VAR: &str = "KEEPER_CONFIG";
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const HOST_VAR: &str = "API_HOST";
pub const PORT_VAR: &str = "API_PORT";

/// Default settings file name
pub const DEFAULT_CONFIG_FILENAME: &str = "keeper.toml";

/// Reads the server address from the environment.
///
/// # Errors
///
/// Returns an error if `API_PORT` is not a valid port number.
pub fn api_config_from_env() -> anyhow::Result<ApiConfig> {
    let port = match env::var(PORT_VAR) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("Invalid {}: '{}'", PORT_VAR, value))?,
        Err(_) => DEFAULT_PORT,
    };

    Ok(ApiConfig {
        port,
        host: env::var(HOST_VAR).unwrap_or_else(|_| DEFAULT_HOST.to_string()),
    })
}

/// Loads the keeper settings named by the environment.
pub fn settings_from_env() -> anyhow::Result<Settings> {
    let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILENAME.to_string());
    let token = env::var(TOKEN_VAR).ok().filter(|t| !t.trim().is_empty());

    load_settings(Path::new(&path), token)
}

/// Loads and validates keeper settings from a TOML file.
///
/// A `token_override` replaces the token in the file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or fails
/// validation.
pub fn load_settings(path: &Path, token_override: Option<String>) -> anyhow::Result<Settings> {
    debug!("Loading settings from {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {:?}", path))?;

    let mut raw = RawSettings::from_toml_str(&content)
        .with_context(|| format!("Invalid settings file {:?}", path))?;
    if let Some(token) = token_override {
        raw.override_token(token);
    }

    let settings = Settings::try_from(raw)
        .with_context(|| format!("Invalid settings file {:?}", path))?;

    Ok(settings)
}
