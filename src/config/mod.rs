//! Configuration module for Pueo.
//!
//! Settings can be loaded from files (TOML, YAML, JSON) and overridden with
//! environment variables. All values are validated before use.
//!
//! Environment overrides use the prefix followed by `__`-separated keys, for
//! example `PUEO__FILTER__CAPACITY=4096` or `PUEO__LOG__LEVEL=debug`.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError as ExternalConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::data_structures::cuckoo_filter::CuckooFilterConfig;
use crate::error::config::ConfigError;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Default environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "PUEO";

/// A trait for types that can be validated.
pub trait Validate {
    /// Validates that the configuration is correct.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the configuration is valid
    /// * `Err(ConfigError)` if the configuration is invalid
    fn validate(&self) -> ConfigResult<()>;
}

/// Root of a Pueo configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterSettings {
    /// Filter sizing and layout
    pub filter: CuckooFilterConfig,

    /// Log configuration
    pub log: LogConfig,
}

impl FilterSettings {
    /// Renders the settings as a TOML document.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Other(e.to_string()))
    }
}

impl Validate for FilterSettings {
    fn validate(&self) -> ConfigResult<()> {
        self.filter.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Whether to log in JSON format
    pub json: bool,

    /// Whether to include source code locations in logs
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            source_location: true,
        }
    }
}

impl Validate for LogConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}",
                self.level
            ))),
        }
    }
}

/// Loads [`FilterSettings`] from defaults, an optional file and the environment.
#[derive(Debug)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(None::<PathBuf>, ENV_PREFIX)
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Optional path to the configuration file
    /// * `env_prefix` - Prefix for environment variables that override configuration values
    pub fn new<P: AsRef<Path>>(config_path: Option<P>, env_prefix: &str) -> Self {
        Self {
            config_path: config_path.map(|p| p.as_ref().to_path_buf()),
            env_prefix: env_prefix.to_string(),
        }
    }

    /// Loads and validates the settings.
    ///
    /// Later sources override earlier ones: defaults, then the file, then
    /// environment variables.
    pub fn load(&self) -> ConfigResult<FilterSettings> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&FilterSettings::default())
                .map_err(|e| ConfigError::ParseError(e.to_string()))?,
        );

        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }

            let format = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => FileFormat::Toml,
                Some("json") => FileFormat::Json,
                Some("yaml" | "yml") => FileFormat::Yaml,
                _ => {
                    return Err(ConfigError::ParseError(format!(
                        "Unsupported file extension for: {path:?}"
                    )))
                }
            };
            builder = builder.add_source(File::from(path.as_path()).format(format));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let settings: FilterSettings = builder
            .build()
            .map_err(map_external_error)?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        settings.validate()?;
        tracing::debug!(
            path = ?self.config_path,
            capacity = settings.filter.capacity,
            layout = %settings.filter.layout,
            "configuration loaded"
        );

        Ok(settings)
    }
}

fn map_external_error(e: ExternalConfigError) -> ConfigError {
    match e {
        ExternalConfigError::NotFound(path) => ConfigError::FileNotFound(PathBuf::from(path)),
        ExternalConfigError::FileParse { uri, cause } => ConfigError::ParseError(match uri {
            Some(uri) => format!("Error parsing {uri}: {cause}"),
            None => format!("Error parsing config file: {cause}"),
        }),
        ExternalConfigError::Message(msg) => ConfigError::ParseError(msg),
        other => ConfigError::ParseError(other.to_string()),
    }
}
