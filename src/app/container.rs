use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::{
    ComponentDirInstaller, DirectoryMediaStore, FfmpegProcessAdapter, FfprobeAdapter,
    FsContentAdapter, HwTransformAdapter,
};
use crate::app::convert_interactor::{ConvertDependencies, ConvertInteractor};
use crate::app::registry::InstalledComponentRegistry;
use crate::config_initialization::AppConfig;
use crate::domain::errors::DomainError;
use crate::domain::model::ConversionProfile;
use crate::engine::{LegacyEncoder, NativeEncoder};
use crate::ports::{ContentPort, EncoderPort, InstallerPort, LegacyEncoderProvider, MediaStorePort};

pub trait AppContainer: Send + Sync {
    /// A fresh orchestrator wired to the shared adapters
    fn convert_interactor(&self) -> ConvertInteractor;
    fn installer(&self) -> Arc<dyn InstallerPort>;
    fn legacy_provider(&self) -> Arc<dyn LegacyEncoderProvider>;
    fn profile(&self) -> &ConversionProfile;
    fn config(&self) -> &AppConfig;
}

/// Binary of an installed component, `<components_dir>/<id>/bin/<name>`
pub fn component_binary(config: &AppConfig, name: &str) -> PathBuf {
    config
        .paths
        .components_dir
        .join(&config.legacy.component_id)
        .join("bin")
        .join(format!("{}{}", name, std::env::consts::EXE_SUFFIX))
}

pub struct DefaultAppContainer {
    config: AppConfig,
    profile: ConversionProfile,
    content: Arc<dyn ContentPort>,
    native: Arc<dyn EncoderPort>,
    installer: Arc<dyn InstallerPort>,
    legacy: Arc<dyn LegacyEncoderProvider>,
    media_store: Arc<dyn MediaStorePort>,
}

impl DefaultAppContainer {
    pub fn new(config: AppConfig) -> Result<Self, DomainError> {
        let profile = config.profile.resolve()?;

        let content: Arc<dyn ContentPort> = Arc::new(FsContentAdapter::new());
        let transform = Arc::new(HwTransformAdapter::new(
            config.native.ffmpeg.clone(),
            config.native.hw_encoder,
            Arc::clone(&content),
            config.native.vaapi_device.clone(),
        ));
        let native: Arc<dyn EncoderPort> = Arc::new(NativeEncoder::new(transform));

        let installer: Arc<dyn InstallerPort> = Arc::new(ComponentDirInstaller::new(
            config.paths.components_dir.clone(),
            config.paths.component_source.clone(),
        ));

        let ffmpeg = component_binary(&config, "ffmpeg");
        let ffprobe = component_binary(&config, "ffprobe");
        let factory_content = Arc::clone(&content);
        let temp_dir = config.paths.temp_dir.clone();
        let legacy: Arc<dyn LegacyEncoderProvider> = Arc::new(InstalledComponentRegistry::new(
            Arc::clone(&installer),
            config.legacy.component_id.clone(),
            Box::new(move || {
                Arc::new(LegacyEncoder::new(
                    Arc::clone(&factory_content),
                    Arc::new(FfprobeAdapter::new(ffprobe.clone())),
                    Arc::new(FfmpegProcessAdapter::new(ffmpeg.clone())),
                    temp_dir.clone(),
                )) as Arc<dyn EncoderPort>
            }),
        ));

        let media_store: Arc<dyn MediaStorePort> =
            Arc::new(DirectoryMediaStore::new(config.paths.media_root.clone()));

        Ok(Self {
            config,
            profile,
            content,
            native,
            installer,
            legacy,
            media_store,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn convert_interactor(&self) -> ConvertInteractor {
        ConvertInteractor::new(
            ConvertDependencies {
                content: Arc::clone(&self.content),
                native: Arc::clone(&self.native),
                legacy: Arc::clone(&self.legacy),
                installer: Arc::clone(&self.installer),
                media_store: Arc::clone(&self.media_store),
                component_id: self.config.legacy.component_id.clone(),
            },
            self.profile.clone(),
            self.config.paths.temp_dir.clone(),
        )
    }

    fn installer(&self) -> Arc<dyn InstallerPort> {
        Arc::clone(&self.installer)
    }

    fn legacy_provider(&self) -> Arc<dyn LegacyEncoderProvider> {
        Arc::clone(&self.legacy)
    }

    fn profile(&self) -> &ConversionProfile {
        &self.profile
    }

    fn config(&self) -> &AppConfig {
        &self.config
    }
}
