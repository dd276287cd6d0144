//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_BOARD_CONFIG_PATH";

/// Default snapshot file location.
const DEFAULT_STATE_FILE: &str = "data/state.json";
/// Default debounce before a dirty mirror is flushed to the store.
const DEFAULT_FLUSH_DEBOUNCE_MS: u64 = 500;
/// Default broadcast channel capacity for the relay hub.
const DEFAULT_HUB_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    state_file: PathBuf,
    flush_debounce: Duration,
    hub_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in
    /// defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Path of the snapshot file.
    pub fn state_file(&self) -> &PathBuf {
        &self.state_file
    }

    /// Quiescence window before a dirty mirror is flushed to the store.
    pub fn flush_debounce(&self) -> Duration {
        self.flush_debounce
    }

    /// Broadcast channel capacity for the relay hub.
    pub fn hub_capacity(&self) -> usize {
        self.hub_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            flush_debounce: Duration::from_millis(DEFAULT_FLUSH_DEBOUNCE_MS),
            hub_capacity: DEFAULT_HUB_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file.
struct RawConfig {
    state_file: Option<PathBuf>,
    flush_debounce_ms: Option<u64>,
    hub_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            state_file: raw.state_file.unwrap_or(defaults.state_file),
            flush_debounce: raw
                .flush_debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.flush_debounce),
            hub_capacity: raw.hub_capacity.unwrap_or(defaults.hub_capacity),
        }
    }
}

/// Resolve the configuration path from the environment, if overridden.
fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
