//! Server configuration for the application under test.
//!
//! The host looks for `ServerConfig.json` (or `<name>.ServerConfig.json`) in
//! the test crate's directory and hands it to the app through
//! [`StartupContext`]. Loaded files are cached per directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use figment::{
    providers::{Format, Json},
    Figment,
};
use once_cell::sync::Lazy;
use serde::Deserialize;

/// Environment name reported to the application under test.
pub const TEST_ENVIRONMENT_NAME: &str = "Test";

/// File name of the server configuration, matched case-insensitively.
pub const SERVER_CONFIG_FILE_NAME: &str = "ServerConfig.json";

/// Loaded server configurations keyed by the directory they were found in.
/// `None` records that a directory has no configuration file.
static SERVER_CONFIGS: Lazy<Mutex<HashMap<PathBuf, Option<Figment>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Directory searched when a host is not given one explicitly.
///
/// Cargo sets `CARGO_MANIFEST_DIR` when running tests, which points at the
/// crate holding the tests.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Whether a file name identifies a server configuration file.
///
/// Matches `ServerConfig.json` itself or any name ending in
/// `.ServerConfig.json`, ignoring case.
#[must_use]
pub fn is_server_config_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let wanted = SERVER_CONFIG_FILE_NAME.to_ascii_lowercase();
    lower == wanted || lower.ends_with(&format!(".{wanted}"))
}

/// Find the server configuration file in a directory.
///
/// When several files match, the first by name wins.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn find_server_config(dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_server_config_name(name))
        .collect();
    names.sort();

    Ok(names.into_iter().next().map(|name| dir.join(name)))
}

/// Load the server configuration found in `dir`, caching the result.
///
/// No other sources are merged: environment variables never leak into the
/// configuration seen by the application under test.
///
/// # Errors
/// Returns an error if the directory cannot be read or the file is not valid
/// JSON.
pub fn load_server_config(dir: &Path) -> Result<Option<Figment>, ConfigError> {
    let mut cache = SERVER_CONFIGS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(cached) = cache.get(dir) {
        return Ok(cached.clone());
    }

    let loaded = match find_server_config(dir)? {
        Some(path) => {
            let figment = Figment::from(Json::file(&path));
            // Parse now so a malformed file fails host start, not a later extract.
            figment.extract::<serde_json::Value>()?;
            tracing::debug!(path = %path.display(), "Loaded server configuration");
            Some(figment)
        }
        None => {
            tracing::debug!(dir = %dir.display(), "No server configuration found");
            None
        }
    };

    cache.insert(dir.to_path_buf(), loaded.clone());
    Ok(loaded)
}

/// What the application under test learns about its environment.
#[derive(Debug, Clone)]
pub struct StartupContext {
    pub environment_name: String,
    pub config: Option<Figment>,
}

impl StartupContext {
    #[must_use]
    pub fn new(config: Option<Figment>) -> Self {
        Self {
            environment_name: TEST_ENVIRONMENT_NAME.to_string(),
            config,
        }
    }

    #[must_use]
    pub fn is_test(&self) -> bool {
        self.environment_name == TEST_ENVIRONMENT_NAME
    }

    /// Extract a typed section of the server configuration.
    ///
    /// Returns `Ok(None)` when no configuration file was found.
    ///
    /// # Errors
    /// Returns an error if the section is missing or has the wrong shape.
    pub fn extract<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ConfigError> {
        match &self.config {
            Some(figment) => Ok(Some(figment.extract_inner(key)?)),
            None => Ok(None),
        }
    }
}
