//! Configuration initialization and hierarchy management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::native_ffmpeg::HardwareEncoder;
use crate::adapters::toml_config::TomlConfigAdapter;
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::error::{AppError, AppResult};
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub profile: ProfileConfig,
    pub paths: PathsConfig,
    pub native: NativeConfig,
    pub legacy: LegacyConfig,
}

/// Which rate-control input the legacy path uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateControlMode {
    Quality,
    Bitrate,
}

/// Preset selection plus optional per-field overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub preset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<VideoCodec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<AudioCodec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    /// `bitrate` drops the preset's quality factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_control: Option<RateControlMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder_preset: Option<EncoderPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tune: Option<VideoTune>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_prefix: Option<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            preset: ConversionProfile::COOLPIX_L25_HIGH_QUALITY.to_string(),
            video_codec: None,
            audio_codec: None,
            video_bitrate: None,
            crf: None,
            rate_control: None,
            encoder_preset: None,
            tune: None,
            output_directory: None,
            filename_prefix: None,
        }
    }
}

impl ProfileConfig {
    /// Build the batch profile: preset first, then overrides, then validation
    pub fn resolve(&self) -> Result<ConversionProfile, DomainError> {
        let mut profile = ConversionProfile::preset(&self.preset)?;

        if let Some(codec) = &self.video_codec {
            profile.video_codec = codec.clone();
        }
        if let Some(codec) = &self.audio_codec {
            profile.audio_codec = codec.clone();
        }
        if let Some(bitrate) = self.video_bitrate {
            profile.video_bitrate = bitrate;
        }
        if let Some(crf) = self.crf {
            profile.crf = Some(crf);
        }
        match self.rate_control {
            Some(RateControlMode::Bitrate) => profile.crf = None,
            Some(RateControlMode::Quality) if profile.crf.is_none() => {
                return Err(DomainError::BadArgs(
                    "rate_control = \"quality\" requires a crf value".to_string(),
                ));
            }
            _ => {}
        }
        if let Some(preset) = self.encoder_preset {
            profile.encoder_preset = preset;
        }
        if let Some(tune) = self.tune {
            profile.tune = tune;
        }
        if let Some(directory) = &self.output_directory {
            profile.output_directory = directory.clone();
        }
        if let Some(prefix) = &self.filename_prefix {
            profile.filename_prefix = prefix.clone();
        }

        profile.validate()?;
        Ok(profile)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Scratch space for temp inputs and outputs
    pub temp_dir: PathBuf,
    /// Root of the media store; outputs land in `<media_root>/Movies/<output_directory>`
    pub media_root: PathBuf,
    /// Where installed components live
    pub components_dir: PathBuf,
    /// Where components are delivered from
    pub component_source: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = data_base_dir().join("av-converter");
        Self {
            temp_dir: std::env::temp_dir().join("av-converter"),
            media_root: home_dir(),
            components_dir: data_dir.join("components"),
            component_source: data_dir.join("component-source"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// System ffmpeg used for the hardware path
    pub ffmpeg: PathBuf,
    pub hw_encoder: HardwareEncoder,
    /// Render node for the VA-API backend
    pub vaapi_device: PathBuf,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            hw_encoder: HardwareEncoder::Auto,
            vaapi_device: PathBuf::from("/dev/dri/renderD128"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Identifier of the component carrying the software encoder
    pub component_id: String,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            component_id: "ffmpeg_feature".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> AppResult<()> {
        self.profile.resolve()?;
        if self.legacy.component_id.trim().is_empty() {
            return Err(AppError::Config(
                "legacy.component_id must not be empty".to_string(),
            ));
        }
        if self.legacy.component_id.contains(|c: char| c == '/' || c == '\\') || self.legacy.component_id == ".." {
            return Err(AppError::Config(format!(
                "legacy.component_id is not a valid directory name: {}",
                self.legacy.component_id
            )));
        }
        Ok(())
    }
}

/// Values given on the command line; they win over everything else
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub log_level: Option<LogLevel>,
    pub preset: Option<String>,
    pub hw_encoder: Option<HardwareEncoder>,
}

/// Environment variables consulted after the config file
pub const ENV_VARS: &[&str] = &[
    "AVCONV_LOG_LEVEL",
    "AVCONV_LOG_FORMAT",
    "AVCONV_PRESET",
    "AVCONV_TEMP_DIR",
    "AVCONV_MEDIA_ROOT",
    "AVCONV_COMPONENTS_DIR",
    "AVCONV_COMPONENT_SOURCE",
    "AVCONV_HW_ENCODER",
];

/// Apply `AVCONV_*` overrides read through `lookup`
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> AppResult<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;
    for name in ENV_VARS {
        let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        debug!("Found environment override: {} = {}", name, value);
        match *name {
            "AVCONV_LOG_LEVEL" => config.logging.level = value.parse()?,
            "AVCONV_LOG_FORMAT" => config.logging.format = value.parse::<LogFormat>()?,
            "AVCONV_PRESET" => config.profile.preset = value,
            "AVCONV_TEMP_DIR" => config.paths.temp_dir = PathBuf::from(value),
            "AVCONV_MEDIA_ROOT" => config.paths.media_root = PathBuf::from(value),
            "AVCONV_COMPONENTS_DIR" => config.paths.components_dir = PathBuf::from(value),
            "AVCONV_COMPONENT_SOURCE" => config.paths.component_source = PathBuf::from(value),
            "AVCONV_HW_ENCODER" => {
                config.native.hw_encoder = value.parse().map_err(AppError::Config)?
            }
            _ => continue,
        }
        applied += 1;
    }
    Ok(applied)
}

/// Apply command-line overrides
pub fn apply_cli_overrides(config: &mut AppConfig, overrides: &ConfigOverrides) -> usize {
    let mut applied = 0;
    if let Some(level) = overrides.log_level {
        config.logging.level = level;
        applied += 1;
    }
    if let Some(preset) = &overrides.preset {
        config.profile.preset = preset.clone();
        applied += 1;
    }
    if let Some(encoder) = overrides.hw_encoder {
        config.native.hw_encoder = encoder;
        applied += 1;
    }
    applied
}

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(overrides: &ConfigOverrides) -> AppResult<AppConfig> {
    let adapter = match &overrides.config_path {
        Some(path) => {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {}",
                    path.display()
                )));
            }
            Some(TomlConfigAdapter::new(path.clone()))
        }
        None => TomlConfigAdapter::discover(),
    };

    let mut config = match &adapter {
        Some(adapter) => {
            info!("Loading configuration from: {}", adapter.path().display());
            adapter.load()?
        }
        None => {
            debug!("No config file found, using defaults");
            AppConfig::default()
        }
    };

    let env_count = apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    if env_count > 0 {
        debug!("Applied {} environment variable overrides", env_count);
    }

    let cli_count = apply_cli_overrides(&mut config, overrides);
    if cli_count > 0 {
        debug!("Applied {} CLI configuration overrides", cli_count);
    }

    config.validate()?;
    Ok(config)
}

/// User home directory, or the working directory when none is set
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Per-user configuration directory
pub fn config_base_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = std::env::var_os("APPDATA") {
        return PathBuf::from(dir);
    }
    home_dir().join(".config")
}

/// Per-user data directory
pub fn data_base_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_DATA_HOME") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = std::env::var_os("LOCALAPPDATA") {
        return PathBuf::from(dir);
    }
    home_dir().join(".local").join("share")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.legacy.component_id, "ffmpeg_feature");
        assert_eq!(
            config.profile.resolve().unwrap(),
            ConversionProfile::coolpix_l25_high_quality()
        );
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: AppConfig = toml::from_str(
            r#"
            [logging]
            level = "warn"

            [profile]
            preset = "standard-720p"
            "#,
        )
        .unwrap();

        let applied = apply_env_overrides(
            &mut config,
            env(&[
                ("AVCONV_LOG_LEVEL", "debug"),
                ("AVCONV_TEMP_DIR", "/scratch"),
                ("AVCONV_HW_ENCODER", "vaapi"),
            ]),
        )
        .unwrap();

        assert_eq!(applied, 3);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.profile.preset, "standard-720p");
        assert_eq!(config.paths.temp_dir, PathBuf::from("/scratch"));
        assert_eq!(config.native.hw_encoder, HardwareEncoder::Vaapi);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, env(&[("AVCONV_PRESET", "standard-720p")])).unwrap();
        let overrides = ConfigOverrides {
            preset: Some(ConversionProfile::COOLPIX_L25_HIGH_QUALITY.to_string()),
            ..Default::default()
        };
        assert_eq!(apply_cli_overrides(&mut config, &overrides), 1);
        assert_eq!(config.profile.preset, ConversionProfile::COOLPIX_L25_HIGH_QUALITY);
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let mut config = AppConfig::default();
        assert!(apply_env_overrides(&mut config, env(&[("AVCONV_LOG_FORMAT", "xml")])).is_err());
        assert!(apply_env_overrides(&mut config, env(&[("AVCONV_HW_ENCODER", "glide")])).is_err());
    }

    #[test]
    fn test_profile_overrides() {
        let profile_config: ProfileConfig = toml::from_str(
            r#"
            preset = "coolpix-l25-high-quality"
            rate_control = "bitrate"
            video_bitrate = 20000000
            tune = "none"
            output_directory = "Archive"
            "#,
        )
        .unwrap();
        let profile = profile_config.resolve().unwrap();
        assert_eq!(profile.crf, None);
        assert_eq!(profile.rate_control(), RateControl::Bitrate(20_000_000));
        assert_eq!(profile.tune, VideoTune::Untuned);
        assert_eq!(profile.output_directory, "Archive");
    }

    #[test]
    fn test_unknown_preset_and_bad_crf_fail_validation() {
        let mut config = AppConfig::default();
        config.profile.preset = "vhs".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.profile.crf = Some(60);
        assert!(config.validate().is_err());
    }
}
