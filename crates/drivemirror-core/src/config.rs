//! Configuration module for drivemirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding `mirror.source`
pub const ENV_SOURCE_FOLDER: &str = "SOURCE_FOLDER";

/// Environment variable overriding `mirror.destination`
pub const ENV_DEST_FOLDER: &str = "DEST_FOLDER";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drivemirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mirror: MirrorConfig,
    pub drive: DriveConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Mirroring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Local directory tree to mirror.
    pub source: PathBuf,
    /// Display name of the destination folder under the drive root.
    pub destination: String,
    /// Seconds between the start of two passes.
    pub interval_secs: u64,
    /// Number of concurrent folder workers.
    pub workers: usize,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Retries for throttled (429) and server-error (5xx) responses.
    pub max_retries: u32,
}

/// OAuth client and token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID of the installed application.
    pub client_id: Option<String>,
    /// OAuth client secret of the installed application.
    pub client_secret: Option<String>,
    /// File holding the persisted access/refresh tokens.
    pub token_file: PathBuf,
    /// Seconds between credential renewal checks.
    pub renew_interval_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivemirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivemirror")
            .join("config.yaml")
    }

    /// Applies `SOURCE_FOLDER` / `DEST_FOLDER` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Empty or whitespace-only values are ignored; values are trimmed.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(source) = value(ENV_SOURCE_FOLDER) {
            self.mirror.source = PathBuf::from(source);
        }
        if let Some(dest) = value(ENV_DEST_FOLDER) {
            self.mirror.destination = dest;
        }
        self.mirror.destination = self.mirror.destination.trim().to_string();
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_source() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("Z:\\")
    } else {
        PathBuf::from("/mnt/sync")
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            destination: "CLOUD".to_string(),
            interval_secs: 3600,
            workers: default_workers(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 5,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_file: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("drivemirror")
                .join("token.json"),
            renew_interval_secs: 1800,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"mirror.workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Whether
    /// `mirror.source` exists is checked at startup, not here.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- mirror ---
        if self.mirror.destination.trim().is_empty() {
            errors.push(ValidationError {
                field: "mirror.destination".into(),
                message: "must not be empty".into(),
            });
        }
        if self.mirror.destination.contains('/') {
            errors.push(ValidationError {
                field: "mirror.destination".into(),
                message: "must be a single folder name".into(),
            });
        }
        if self.mirror.interval_secs == 0 {
            errors.push(ValidationError {
                field: "mirror.interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.mirror.workers == 0 {
            errors.push(ValidationError {
                field: "mirror.workers".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- drive ---
        if self.drive.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "drive.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- auth ---
        if self.auth.renew_interval_secs == 0 {
            errors.push(ValidationError {
                field: "auth.renew_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivemirror_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .mirror_source("/srv/share")
///     .mirror_workers(8)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- mirror ---

    pub fn mirror_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.mirror.source = source.into();
        self
    }

    pub fn mirror_destination(mut self, destination: impl Into<String>) -> Self {
        self.config.mirror.destination = destination.into();
        self
    }

    pub fn mirror_interval_secs(mut self, seconds: u64) -> Self {
        self.config.mirror.interval_secs = seconds;
        self
    }

    pub fn mirror_workers(mut self, workers: usize) -> Self {
        self.config.mirror.workers = workers;
        self
    }

    // --- drive ---

    pub fn drive_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.drive.request_timeout_secs = seconds;
        self
    }

    pub fn drive_max_retries(mut self, retries: u32) -> Self {
        self.config.drive.max_retries = retries;
        self
    }

    // --- auth ---

    pub fn auth_client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(id.into());
        self.config.auth.client_secret = Some(secret.into());
        self
    }

    pub fn auth_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.auth.token_file = path.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
