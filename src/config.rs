//! Client configuration
//!
//! TOML file support with environment variable overrides, a legacy
//! `key=value` properties file for the service identifiers, and defaults.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::timestamp::TimeFormat;

/// Default application identifier sent to the logging service
pub const DEFAULT_APP_ID: &str = "LHC_MD_ABP_ANALYSIS";

/// Default client identifier sent to the logging service
pub const DEFAULT_CLIENT_ID: &str = "BEAM PHYSICS";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Service identity and data source
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Query defaults
    #[serde(default)]
    pub query: QueryConfig,
}

/// Service identity and data source
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Application identifier
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Client identifier
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Which databases to read from
    #[serde(default)]
    pub source: DataSource,

    /// Legacy properties file consulted while the identifiers are defaults
    #[serde(default = "default_properties_file")]
    pub properties_file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target in log lines
    #[serde(default = "default_true")]
    pub with_target: bool,
}

/// Query defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Report timestamps as epoch seconds rather than calendar values
    #[serde(default = "default_true")]
    pub unixtime: bool,
}

/// Data location preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Short-term measurement database
    Mdb,
    /// Long-term logging database
    Ldb,
    /// Both, measurement database first
    #[default]
    All,
}

impl DataSource {
    /// Configuration spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Mdb => "mdb",
            DataSource::Ldb => "ldb",
            DataSource::All => "all",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mdb" => Ok(DataSource::Mdb),
            "ldb" => Ok(DataSource::Ldb),
            "all" => Ok(DataSource::All),
            other => Err(Error::Configuration(format!(
                "unknown data source '{}', expected mdb, ldb or all",
                other
            ))),
        }
    }
}

// Default value functions
fn default_app_id() -> String { DEFAULT_APP_ID.to_string() }
fn default_client_id() -> String { DEFAULT_CLIENT_ID.to_string() }
fn default_properties_file() -> PathBuf { PathBuf::from("configuration.properties") }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            client_id: default_client_id(),
            source: DataSource::default(),
            properties_file: default_properties_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { unixtime: true }
    }
}

impl ClientConfig {
    /// Whether either identifier is still the default
    pub fn uses_default_ids(&self) -> bool {
        self.app_id == DEFAULT_APP_ID || self.client_id == DEFAULT_CLIENT_ID
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load a TOML file, then apply the properties file and environment overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_properties_file()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Defaults with the properties file and environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_properties_file()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Take the identifiers from the legacy properties file
    ///
    /// Only consulted while an identifier is still the default. Both
    /// `APPLICATION_NAME` and `CLIENT_NAME` must be present for either to
    /// be used. A missing file is not an error.
    pub fn apply_properties_file(&mut self) -> Result<()> {
        if !self.client.uses_default_ids() {
            return Ok(());
        }

        let path = &self.client.properties_file;
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No properties file");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let props = parse_properties(&contents);
        match (props.get("APPLICATION_NAME"), props.get("CLIENT_NAME")) {
            (Some(app), Some(client)) => {
                self.client.app_id = app.clone();
                self.client.client_id = client.clone();
            }
            _ => debug!("appname and clientname not specified in config file"),
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup that behaves like the environment
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(app_id) = lookup("TIMBER_APP_ID") {
            self.client.app_id = app_id;
        }
        if let Some(client_id) = lookup("TIMBER_CLIENT_ID") {
            self.client.client_id = client_id;
        }
        if let Some(source) = lookup("TIMBER_SOURCE") {
            self.client.source = source.parse()?;
        }

        // Logging
        if let Some(log_level) = lookup("RUST_LOG") {
            self.logging.level = log_level;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.client.app_id.trim().is_empty() {
            return Err("Application id cannot be empty".to_string());
        }
        if self.client.client_id.trim().is_empty() {
            return Err("Client id cannot be empty".to_string());
        }
        if self.logging.level.trim().is_empty() {
            return Err("Log level cannot be empty".to_string());
        }
        Ok(())
    }

    /// Default timestamp format for query results
    pub fn time_format(&self) -> TimeFormat {
        TimeFormat::from(self.query.unixtime)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Parse `key=value` lines; `#` and `!` start comments
fn parse_properties(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=').or_else(|| line.split_once(':'))?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.client.app_id, DEFAULT_APP_ID);
        assert_eq!(config.client.source, DataSource::All);
        assert_eq!(config.time_format(), TimeFormat::Unix);
        assert!(config.client.uses_default_ids());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [client]
            source = "ldb"

            [query]
            unixtime = false
            "#,
        )
        .unwrap();
        assert_eq!(config.client.source, DataSource::Ldb);
        assert_eq!(config.client.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(config.time_format(), TimeFormat::Calendar);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_source_rejected() {
        assert!(toml::from_str::<Config>("[client]\nsource = \"tape\"").is_err());
        assert!(matches!(
            "tape".parse::<DataSource>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_id_invalid() {
        let mut config = Config::default();
        config.client.app_id = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_properties_file_replaces_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# service identity").unwrap();
        writeln!(file, "APPLICATION_NAME=MY_APP").unwrap();
        writeln!(file, "CLIENT_NAME = MY CLIENT").unwrap();

        let mut config = Config::default();
        config.client.properties_file = file.path().to_path_buf();
        config.apply_properties_file().unwrap();
        assert_eq!(config.client.app_id, "MY_APP");
        assert_eq!(config.client.client_id, "MY CLIENT");
        assert!(!config.client.uses_default_ids());
    }

    #[test]
    fn test_properties_file_needs_both_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "APPLICATION_NAME=MY_APP").unwrap();

        let mut config = Config::default();
        config.client.properties_file = file.path().to_path_buf();
        config.apply_properties_file().unwrap();
        assert_eq!(config.client.app_id, DEFAULT_APP_ID);
    }

    #[test]
    fn test_properties_file_ignored_for_custom_ids() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "APPLICATION_NAME=MY_APP\nCLIENT_NAME=MY_CLIENT").unwrap();

        let mut config = Config::default();
        config.client.app_id = "CUSTOM".to_string();
        config.client.client_id = "CUSTOM".to_string();
        config.client.properties_file = file.path().to_path_buf();
        config.apply_properties_file().unwrap();
        assert_eq!(config.client.app_id, "CUSTOM");
    }

    #[test]
    fn test_missing_properties_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.client.properties_file = dir.path().join("absent.properties");
        assert!(config.apply_properties_file().is_ok());
        assert_eq!(config.client.app_id, DEFAULT_APP_ID);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timber.toml");
        let mut config = Config::default();
        config.client.source = DataSource::Mdb;
        config.logging.with_target = false;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_env_override() {
        let env: HashMap<&str, &str> = [
            ("TIMBER_CLIENT_ID", "ENV CLIENT"),
            ("TIMBER_SOURCE", "LDB"),
            ("RUST_LOG", "debug"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.client.client_id, "ENV CLIENT");
        assert_eq!(config.client.app_id, DEFAULT_APP_ID);
        assert_eq!(config.client.source, DataSource::Ldb);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_override_rejects_unknown_source() {
        let mut config = Config::default();
        let result = config.apply_overrides_from(|key| {
            (key == "TIMBER_SOURCE").then(|| "ARCHIVE".to_string())
        });
        assert!(result.is_err());
    }
}
