//! Layered settings: defaults, `equiweight.toml`, then `EQUIWEIGHT__*` environment variables.

use crate::integration::store_manager;
use config::{Config, Environment, File};
use equiweight_index::{IndexConfig, IndexError};
use equiweight_output::ExportFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no `--config` is given.
const DEFAULT_CONFIG_FILE: &str = "equiweight";

#[derive(Debug, thiserror::Error)]
pub(crate) enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) index: IndexConfig,
    pub(crate) data: DataSettings,
    pub(crate) storage: StorageSettings,
    pub(crate) output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DataSettings {
    /// Symbols fetched concurrently per batch.
    pub(crate) batch_size: usize,
    /// Pause between batches.
    pub(crate) rate_limit_delay_ms: u64,
    /// Symbols taken from the front of the universe.
    pub(crate) max_symbols: usize,
    /// Calendar days of history for `run` and `fetch`.
    pub(crate) days_back: i64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            rate_limit_delay_ms: 2000,
            max_symbols: 100,
            days_back: 30,
        }
    }
}

impl DataSettings {
    pub(crate) const fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct StorageSettings {
    /// SQLite database; the platform data directory when unset.
    pub(crate) database_path: Option<PathBuf>,
}

impl StorageSettings {
    pub(crate) fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(store_manager::default_database_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OutputSettings {
    pub(crate) directory: PathBuf,
    pub(crate) format: ExportFormat,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            format: ExportFormat::Csv,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from an optional `equiweight.toml` in the
    /// working directory, with environment overrides on top.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings: Self = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("EQUIWEIGHT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn validate(&self) -> Result<(), SettingsError> {
        self.index.validate()?;
        if self.data.batch_size == 0 {
            return Err(SettingsError::Invalid(
                "data.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.data.days_back <= 0 {
            return Err(SettingsError::Invalid(format!(
                "data.days_back must be positive, got {}",
                self.data.days_back
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn test_defaults() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.index.size, 100);
        assert_eq!(settings.index.base_value, 100.0);
        assert_eq!(settings.data.batch_delay(), Duration::from_secs(2));
        assert_eq!(settings.output.directory, PathBuf::from("output"));
        assert!(settings.storage.database_path().ends_with("equiweight.db"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = from_toml(
            r#"
            [index]
            size = 50

            [output]
            format = "pretty-json"

            [storage]
            database_path = "/tmp/index.db"
            "#,
        )
        .unwrap();

        assert_eq!(settings.index.size, 50);
        assert_eq!(settings.index.base_value, 100.0);
        assert_eq!(settings.output.format, ExportFormat::PrettyJson);
        assert_eq!(settings.data.max_symbols, 100);
        assert_eq!(settings.storage.database_path(), PathBuf::from("/tmp/index.db"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            from_toml("[index]\nsize = 0"),
            Err(SettingsError::Index(_))
        ));
        assert!(matches!(
            from_toml("[data]\nbatch_size = 0"),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let path = Path::new("/nonexistent/equiweight.toml");
        assert!(matches!(Settings::load(Some(path)), Err(SettingsError::Load(_))));
    }
}
