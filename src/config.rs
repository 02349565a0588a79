use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::filter::ModelFilter;

pub const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";
pub const DEFAULT_HOSTED_URL: &str = "https://api.openai.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_ATTEMPTS_CAP: u32 = 10;

/// Config file looked up in the working directory when
/// `REFACTORAPTOR_CONFIG` is not set.
pub const CONFIG_FILE_NAME: &str = "refactoraptor.toml";

#[derive(Clone)]
pub struct Config {
    /// Base URL of the local inference server.
    pub local_url: String,
    /// Base URL of the hosted chat-completion API.
    pub hosted_url: String,
    /// Bearer token for the hosted API. `None` leaves that backend unconfigured.
    pub hosted_api_key: Option<String>,
    pub local_filter: ModelFilter,
    pub hosted_filter: ModelFilter,
    /// Send the response schema as the local backend's `format` hint.
    pub schema_hint: bool,
    /// Whole-request deadline when the caller does not pass one.
    pub request_timeout: Duration,
    /// Largest `max_attempts` a caller may ask for.
    pub max_attempts_cap: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_url: DEFAULT_LOCAL_URL.to_string(),
            hosted_url: DEFAULT_HOSTED_URL.to_string(),
            hosted_api_key: None,
            local_filter: ModelFilter::AllowAll,
            hosted_filter: ModelFilter::hosted_default(),
            schema_hint: true,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts_cap: DEFAULT_MAX_ATTEMPTS_CAP,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("local_url", &self.local_url)
            .field("hosted_url", &self.hosted_url)
            .field(
                "hosted_api_key",
                &self.hosted_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("local_filter", &self.local_filter)
            .field("hosted_filter", &self.hosted_filter)
            .field("schema_hint", &self.schema_hint)
            .field("request_timeout", &self.request_timeout)
            .field("max_attempts_cap", &self.max_attempts_cap)
            .finish()
    }
}

/// Optional TOML overlay. Every key is optional; unknown keys are an error so
/// typos surface instead of being ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub local_url: Option<String>,
    pub hosted_url: Option<String>,
    pub local_models: Option<Vec<String>>,
    pub hosted_models: Option<Vec<String>>,
    pub schema_hint: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Defaults, then the config file (if any), then environment variables.
    pub fn load() -> Self {
        let mut config = Self::default();
        if let Some(path) = config_file_path() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match config.apply_toml(&text) {
                    Ok(()) => tracing::info!("loaded config from {}", path.display()),
                    Err(e) => tracing::warn!("ignoring invalid config {}: {e}", path.display()),
                },
                Err(e) => tracing::warn!("cannot read config {}: {e}", path.display()),
            }
        }
        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// Defaults overlaid with environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok());
        config
    }

    pub fn apply_toml(&mut self, text: &str) -> Result<(), toml::de::Error> {
        let file: FileConfig = toml::from_str(text)?;
        if let Some(url) = file.local_url {
            self.local_url = url;
        }
        if let Some(url) = file.hosted_url {
            self.hosted_url = url;
        }
        if let Some(models) = file.local_models {
            self.local_filter = ModelFilter::allow_list(models);
        }
        if let Some(models) = file.hosted_models {
            self.hosted_filter = ModelFilter::allow_list(models);
        }
        if let Some(hint) = file.schema_hint {
            self.schema_hint = hint;
        }
        if let Some(secs) = file.timeout_secs.filter(|s| *s > 0) {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(cap) = file.max_attempts.filter(|c| *c > 0) {
            self.max_attempts_cap = cap;
        }
        Ok(())
    }

    /// Overlay variables from `lookup`. Unparseable values are logged and skipped.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("OLLAMA_URL") {
            self.local_url = url;
        }
        if let Some(url) = get("OPENAI_URL") {
            self.hosted_url = url;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.hosted_api_key = Some(key);
        }
        if let Some(csv) = get("REFACTORAPTOR_LOCAL_MODELS") {
            self.local_filter = ModelFilter::from_csv(&csv);
        }
        if let Some(csv) = get("REFACTORAPTOR_HOSTED_MODELS") {
            self.hosted_filter = ModelFilter::from_csv(&csv);
        }
        if let Some(raw) = get("REFACTORAPTOR_SCHEMA_HINT") {
            match raw.trim().parse::<bool>() {
                Ok(hint) => self.schema_hint = hint,
                Err(_) => tracing::warn!("REFACTORAPTOR_SCHEMA_HINT must be true or false, got {raw:?}"),
            }
        }
        if let Some(raw) = get("REFACTORAPTOR_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!("REFACTORAPTOR_TIMEOUT_SECS must be a positive integer, got {raw:?}"),
            }
        }
        if let Some(raw) = get("REFACTORAPTOR_MAX_ATTEMPTS") {
            match raw.trim().parse::<u32>() {
                Ok(cap) if cap > 0 => self.max_attempts_cap = cap,
                _ => tracing::warn!("REFACTORAPTOR_MAX_ATTEMPTS must be a positive integer, got {raw:?}"),
            }
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("REFACTORAPTOR_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    let default = Path::new(CONFIG_FILE_NAME);
    default.exists().then(|| default.to_path_buf())
}
