//! Provider configuration loading for the CLI.

use std::path::{Path, PathBuf};
use xauth::{ProviderConfig, XAuthResult};

pub const XAUTH_CONFIG_PATH: &str = ".xauth/config.toml";

/// Resolve the config file path: an explicit path wins, otherwise the file in
/// the home directory
pub fn get_config_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(p) => p.to_path_buf(),
        None => dirs::home_dir()
            .unwrap_or_default()
            .join(XAUTH_CONFIG_PATH),
    }
}

/// Load the provider configuration.
///
/// An explicitly given file must exist. The default file is optional; when it
/// is absent the built-in provider settings are used.
pub fn load(path: Option<&Path>) -> XAuthResult<ProviderConfig> {
    let config_path = get_config_path(path);

    if path.is_none() && !config_path.exists() {
        tracing::debug!("No config file at {}, using defaults", config_path.display());
        return Ok(ProviderConfig::default());
    }

    tracing::debug!("Loading config from {}", config_path.display());
    ProviderConfig::from_file(&config_path)
}
