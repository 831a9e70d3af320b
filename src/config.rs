/// Service configuration.
///
/// Loaded from `agrimon.toml` (every field optional), then overridden by
/// environment variables, which may come from a `.env` file:
///
/// | Variable           | Overrides           |
/// |--------------------|---------------------|
/// | `AGRIMON_BASE_URL` | `service.base_url`  |
/// | `AGRIMON_USER_ID`  | `service.user_id`   |
/// | `AGRIMON_TIMEZONE` | `viewer.timezone`   |
/// | `AGRIMON_LANGUAGE` | `viewer.language`   |

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::logging::LogLevel;
use crate::model::Cadence;

pub const DEFAULT_CONFIG_PATH: &str = "agrimon.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// The signed-in user, for the user-scoped routes.
    pub user_id: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 15,
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub language: String,
    /// IANA zone name used for every calendar-day decision.
    pub timezone: String,
    pub cadence: Cadence,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            language: "en".to_string(),
            timezone: "Asia/Shanghai".to_string(),
            cadence: Cadence::Daily,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
            console_timestamps: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub viewer: ViewerConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, message: String },
    Toml(String),
    InvalidValue { field: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "Cannot read {}: {}", path, message),
            ConfigError::Toml(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value for {}: '{}'", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` (defaults only if it does not exist), then applies
    /// environment overrides from the process environment and `.env`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            Config::from_toml_str(&text)?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("AGRIMON_BASE_URL") {
            self.service.base_url = v;
        }
        if let Some(v) = get("AGRIMON_USER_ID") {
            self.service.user_id = Some(v);
        }
        if let Some(v) = get("AGRIMON_TIMEZONE") {
            self.viewer.timezone = v;
        }
        if let Some(v) = get("AGRIMON_LANGUAGE") {
            self.viewer.language = v;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        self.log_level()?;
        if self.service.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "service.timeout_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// The viewer's timezone.
    pub fn timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.viewer
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "viewer.timezone",
                value: self.viewer.timezone.clone(),
            })
    }

    pub fn log_level(&self) -> Result<LogLevel, ConfigError> {
        self.logging
            .level
            .parse::<LogLevel>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "logging.level",
                value: self.logging.level.clone(),
            })
    }
}
