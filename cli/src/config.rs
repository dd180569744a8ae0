// Configuration for the CLI: optional capro.toml, overridden by flags

use capro_common::{CaproError, ProxyConfig, Result, DEFAULT_CONFIG_FILE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::commands::ServeArgs;

/// Contents of a capro.toml file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub origin: Option<String>,
    pub cache_file: Option<PathBuf>,
    pub timeout: Option<String>,
}

/// Loads the config file at `path`, or `capro.toml` in the working directory
/// when no path is given. Only an explicitly named file is required to exist.
pub async fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !path.exists() {
        if required {
            return Err(CaproError::Config(format!("Config file not found: {}", path.display())));
        }
        debug!("No config file at {}, using flags and defaults", path.display());
        return Ok(FileConfig::default());
    }

    debug!("Loading config from: {}", path.display());
    let content = tokio::fs::read_to_string(&path).await?;
    let config: FileConfig = toml::from_str(&content)?;

    debug!("Loaded config: {:?}", config);
    Ok(config)
}

/// Merges flags over the file config over defaults, then validates.
pub fn resolve(file: FileConfig, args: &ServeArgs) -> Result<ProxyConfig> {
    let defaults = ProxyConfig::default();

    let timeout = match (args.timeout, file.timeout.as_deref()) {
        (Some(timeout), _) => timeout,
        (None, Some(timeout)) => parse_timeout(timeout)?,
        (None, None) => defaults.fetch_timeout,
    };

    let config = ProxyConfig {
        port: args.port.or(file.port).unwrap_or(defaults.port),
        origin: args.origin.clone().or(file.origin).unwrap_or(defaults.origin),
        cache_file: args.cache_file.clone().or(file.cache_file).unwrap_or(defaults.cache_file),
        fetch_timeout: timeout,
    };

    config.validate()?;
    Ok(config)
}

/// Cache file location for commands that don't serve.
pub fn cache_file(file: &FileConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| file.cache_file.clone())
        .unwrap_or_else(|| ProxyConfig::default().cache_file)
}

fn parse_timeout(timeout: &str) -> Result<Duration> {
    humantime::parse_duration(timeout.trim())
        .map_err(|_| CaproError::Config(format!("Invalid timeout format: {}", timeout)))
}
