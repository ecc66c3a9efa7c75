// TOML config adapter - Configuration file loading and saving

use std::path::{Path, PathBuf};

use crate::config_initialization::{config_base_dir, AppConfig};
use crate::error::{AppError, AppResult};

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "av-converter.toml";

/// TOML configuration adapter bound to one file
pub struct TomlConfigAdapter {
    path: PathBuf,
}

impl TomlConfigAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// First existing file among the default locations
    pub fn discover() -> Option<Self> {
        Self::candidate_paths()
            .into_iter()
            .find(|path| path.is_file())
            .map(Self::new)
    }

    /// Default lookup order: working directory, then the user config directory
    pub fn candidate_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(LOCAL_CONFIG_FILE),
            Self::get_default_config_path(),
        ]
    }

    /// `<config dir>/av-converter/config.toml`
    pub fn get_default_config_path() -> PathBuf {
        config_base_dir().join("av-converter").join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AppResult<AppConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read config file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Self::deserialize_config(&content)
    }

    pub fn save(&self, config: &AppConfig) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = Self::serialize_config(config)?;
        std::fs::write(&self.path, content)?;
        tracing::info!("Saved configuration to {}", self.path.display());
        Ok(())
    }

    pub fn serialize_config(config: &AppConfig) -> AppResult<String> {
        Ok(toml::to_string_pretty(config)?)
    }

    pub fn deserialize_config(content: &str) -> AppResult<AppConfig> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::LogFormat;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = TomlConfigAdapter::new(dir.path().join("nested").join("config.toml"));

        let mut config = AppConfig::default();
        config.logging.format = LogFormat::Json;
        config.profile.preset = "standard-720p".to_string();
        adapter.save(&config).unwrap();

        let loaded = adapter.load().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = TomlConfigAdapter::deserialize_config(
            r#"
            [legacy]
            component_id = "encoder_pack"
            "#,
        )
        .unwrap();
        assert_eq!(config.legacy.component_id, "encoder_pack");
        assert_eq!(config.native, AppConfig::default().native);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(matches!(
            TomlConfigAdapter::deserialize_config("[logging\nlevel = 3"),
            Err(AppError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = TomlConfigAdapter::new(dir.path().join("absent.toml"));
        assert!(matches!(adapter.load(), Err(AppError::Config(_))));
    }
}
