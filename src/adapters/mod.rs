// Adapters - External system implementations

pub mod component_dir;
pub mod exec_ffmpeg;
pub mod fs_content;
pub mod fs_media_store;
pub mod native_ffmpeg;
pub mod probe_ffprobe;
pub mod toml_config;

// Re-export adapters
pub use component_dir::ComponentDirInstaller;
pub use exec_ffmpeg::FfmpegProcessAdapter;
pub use fs_content::FsContentAdapter;
pub use fs_media_store::DirectoryMediaStore;
pub use native_ffmpeg::{HardwareEncoder, HwTransformAdapter};
pub use probe_ffprobe::FfprobeAdapter;
pub use toml_config::TomlConfigAdapter;
