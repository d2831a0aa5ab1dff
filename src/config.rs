use crate::diagnostics::DEFAULT_CAPACITY;
use crate::error::Result;
use crate::logic::{DEFAULT_ID_PLACEHOLDER, ROOT_BRANCH_ID};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub display: DisplayConfig,
    pub tree: TreeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Findings kept by an in-memory diagnostics sink.
    pub diagnostics_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Replaces characters that are not allowed in widget ids.
    pub id_placeholder: String,
    pub indent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    pub root_id: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            diagnostics_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            id_placeholder: DEFAULT_ID_PLACEHOLDER.to_string(),
            indent: 2,
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root_id: ROOT_BRANCH_ID.to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `daq-config.{toml,json,yaml,..}` in the working
    /// directory if present, then `DAQ_CONFIG__SECTION__KEY` variables.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], but reads `path` (which must exist) instead
    /// of the default file.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = match path {
            Some(path) => config.add_source(config::File::from(path).required(true)),
            None => config.add_source(config::File::with_name("daq-config").required(false)),
        };

        config = config.add_source(
            config::Environment::with_prefix("DAQ_CONFIG")
                .prefix_separator("__")
                .separator("__"),
        );

        let app_config: AppConfig = config.build()?.try_deserialize()?;
        Ok(app_config)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.logging.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.display.id_placeholder, "____");
        assert_eq!(config.tree.root_id, "root");
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "[logging]\nlevel = \"debug\"\n\n[display]\nid_placeholder = \"_\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.log_level(), log::LevelFilter::Debug);
        assert_eq!(config.display.id_placeholder, "_");
        assert_eq!(config.display.indent, 2);
        assert_eq!(config.tree.root_id, "root");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load_from(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let mut config = AppConfig::default();
        config.logging.level = "chatty".to_string();
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }
}
