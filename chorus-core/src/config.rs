use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ChorusError, ChorusResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChorusConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_true")]
    pub live: bool,

    #[serde(default = "default_poll_failure_warn_threshold")]
    pub poll_failure_warn_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory transcripts are written to. Empty means the working directory.
    #[serde(default)]
    pub directory: String,

    #[serde(default = "default_export_suffix")]
    pub suffix: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    3_000
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_poll_interval() -> u64 {
    1_500
}

fn default_true() -> bool {
    true
}

fn default_poll_failure_warn_threshold() -> u32 {
    5
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_export_suffix() -> String {
    "_transcript.md".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            live: true,
            poll_failure_warn_threshold: default_poll_failure_warn_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            suffix: default_export_suffix(),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ExportConfig {
    pub fn directory(&self) -> PathBuf {
        if self.directory.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.directory)
        }
    }
}

impl ChorusConfig {
    pub fn load() -> ChorusResult<Self> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> ChorusResult<Self> {
        load_dotenv_files();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("CHORUS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut chorus_config: ChorusConfig = config.try_deserialize()?;

        if let Ok(url) = std::env::var("CHORUS_API_BASE") {
            chorus_config.api.base_url = url;
        } else if let Ok(url) = std::env::var("VITE_API_BASE") {
            chorus_config.api.base_url = url;
        }

        if let Ok(level) = std::env::var("CHORUS_LOG_LEVEL") {
            chorus_config.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            chorus_config.logging.level = level;
        }

        if let Ok(interval) = std::env::var("CHORUS_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                chorus_config.session.poll_interval_ms = ms;
            }
        }

        chorus_config.validate()?;

        Ok(chorus_config)
    }

    pub fn validate(&self) -> ChorusResult<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ChorusError::MissingRequired("api.base_url".to_string()));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ChorusError::InvalidConfigValue {
                key: "api.base_url".to_string(),
                message: "Must be an http:// or https:// URL".to_string(),
            });
        }

        if self.api.connect_timeout_ms == 0 || self.api.request_timeout_ms == 0 {
            return Err(ChorusError::InvalidConfigValue {
                key: "api.request_timeout_ms".to_string(),
                message: "Timeouts must be greater than 0".to_string(),
            });
        }

        if self.session.poll_interval_ms == 0 {
            return Err(ChorusError::InvalidConfigValue {
                key: "session.poll_interval_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) && !level_lower.contains('=') {
            return Err(ChorusError::InvalidConfigValue {
                key: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.api.base_url
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("default.toml"));
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("chorus.toml"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".chorus").join("config.toml"));
    }

    paths
}

fn load_dotenv_files() {
    for path in get_dotenv_paths() {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

fn get_dotenv_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".env"));
        paths.push(cwd.join(".env.local"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".chorus").join(".env"));
    }

    paths
}

fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chorus"))
}
