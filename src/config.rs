//! Application configuration.
//!
//! Precedence: built-in defaults < TOML file < `NATOURS_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 10_000;
pub const DEFAULT_SORT: &str = "-createdAt";
pub const VERSION_FIELD: &str = "__v";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Knobs for the list pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub default_page: u64,
    pub default_limit: u64,
    /// Upper bound applied to client supplied `limit`.
    pub max_limit: u64,
    /// Sort used when the client sends none.
    pub default_sort: String,
    /// Internal field hidden when the client sends no `fields`.
    pub hidden_field: String,
    /// Report `NotFound` for pages past the last result instead of an empty page.
    pub strict_pages: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            default_page: DEFAULT_PAGE,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            default_sort: DEFAULT_SORT.to_string(),
            hidden_field: VERSION_FIELD.to_string(),
            strict_pages: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub level: String,
    pub retention: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: None, level: "info".into(), retention: 7 }
    }
}

impl FeatureConfig {
    fn check_limits(&self) -> Result<(), ConfigError> {
        for (key, value) in
            [("features.default_limit", self.default_limit), ("features.max_limit", self.max_limit)]
        {
            if value == 0 {
                return Err(ConfigError::InvalidValue { key: key.to_string(), value: "0".to_string() });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub features: FeatureConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// # Errors
    /// Returns an error if the TOML is malformed or a limit is zero.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.features.check_limits()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Defaults, then the optional file (falling back to `./natours.toml`), then the process environment.
    ///
    /// # Errors
    /// Returns an error if an explicitly given file is unreadable, or any source holds an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let local = PathBuf::from("natours.toml");
                if local.exists() { Self::from_file(&local)? } else { Self::default() }
            }
        };
        cfg.apply_overrides(std::env::vars())?;
        Ok(cfg)
    }

    /// Apply `NATOURS_*` overrides from an iterator of `(name, value)` pairs.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for values that do not parse.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let invalid =
                || ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() };
            match key {
                "NATOURS_ENV" => self.environment = value.parse().map_err(|_| invalid())?,
                "NATOURS_DEFAULT_LIMIT" => {
                    self.features.default_limit =
                        value.parse::<u64>().ok().filter(|n| *n > 0).ok_or_else(invalid)?;
                }
                "NATOURS_MAX_LIMIT" => {
                    self.features.max_limit =
                        value.parse::<u64>().ok().filter(|n| *n > 0).ok_or_else(invalid)?;
                }
                "NATOURS_STRICT_PAGES" => {
                    self.features.strict_pages = match value.to_ascii_lowercase().as_str() {
                        "1" | "true" | "yes" => true,
                        "0" | "false" | "no" => false,
                        _ => return Err(invalid()),
                    };
                }
                "NATOURS_LOG_LEVEL" => self.log.level = value.to_string(),
                "NATOURS_LOG_DIR" => self.log.dir = Some(PathBuf::from(value)),
                "NATOURS_LOG_RETENTION" => {
                    self.log.retention = value.parse().map_err(|_| invalid())?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}
