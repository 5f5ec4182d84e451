use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::editor::EditorSettings;
use crate::paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transient (5xx / connect) retries. Authorization failures are never retried here.
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_store_path: Option<PathBuf>,

    #[serde(default)]
    pub editor: EditorSettings,
}

const CONFIG_FILE_PATH: &str = "devhub.toml";

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn parse_number_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring {name}: {value:?} is not a valid number");
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            token_store_path: None,
            editor: EditorSettings::default(),
        }
    }
}

impl Config {
    /// Load `~/.devhub/config.json`, falling back to `./devhub.toml`, then apply
    /// `DEVHUB_*` environment overrides.
    pub fn new() -> Self {
        let mut config = Self::from_files(&paths::config_json_path(), Path::new(CONFIG_FILE_PATH));
        config.apply_env_overrides();
        config
    }

    pub fn from_files(json_path: &Path, toml_path: &Path) -> Self {
        if json_path.exists() {
            match std::fs::read_to_string(json_path).map(|c| serde_json::from_str::<Config>(&c)) {
                Ok(Ok(file_config)) => return file_config,
                Ok(Err(e)) => tracing::warn!("Failed to parse {}: {e}", json_path.display()),
                Err(e) => tracing::warn!("Failed to read {}: {e}", json_path.display()),
            }
        }

        if toml_path.exists() {
            match std::fs::read_to_string(toml_path).map(|c| toml::from_str::<Config>(&c)) {
                Ok(Ok(file_config)) => return file_config,
                Ok(Err(e)) => tracing::warn!("Failed to parse {}: {e}", toml_path.display()),
                Err(e) => tracing::warn!("Failed to read {}: {e}", toml_path.display()),
            }
        }

        Config::default()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("DEVHUB_API_BASE_URL") {
            self.api_base_url = base_url;
        }
        if let Some(timeout) = parse_number_env("DEVHUB_TIMEOUT_SECS") {
            self.timeout_secs = timeout;
        }
        if let Some(retries) = parse_number_env("DEVHUB_MAX_RETRIES") {
            self.max_retries = retries;
        }
        if let Ok(store) = std::env::var("DEVHUB_TOKEN_STORE") {
            if !store.trim().is_empty() {
                self.token_store_path = Some(PathBuf::from(store));
            }
        }
    }

    /// Token store location, defaulting to `~/.devhub/tokens.json`
    pub fn token_store_path(&self) -> PathBuf {
        self.token_store_path
            .clone()
            .unwrap_or_else(paths::token_store_path)
    }

    /// Base URL without a trailing slash
    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
