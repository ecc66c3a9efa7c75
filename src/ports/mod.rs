// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::engine::StatusStream;

/// Port for resolving and reading user-selected sources
#[async_trait]
pub trait ContentPort: Send + Sync {
    /// Request durable read access to a source; fails with `PermissionDenied`
    async fn grant_read_access(&self, source: &SourceRef) -> Result<(), DomainError>;

    /// Declared media type of a source, if the resolver knows one
    fn content_type(&self, source: &SourceRef) -> Option<String>;

    /// Open the source for streaming reads
    async fn open_read(
        &self,
        source: &SourceRef,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, DomainError>;

    /// Local filesystem path of the source, when it has one
    fn local_path(&self, source: &SourceRef) -> Option<PathBuf>;
}

/// Encoder parameters handed to the hardware transform session
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEncoderSettings {
    pub bitrate: u32,
    pub bitrate_mode: BitrateMode,
    pub profile: EncoderProfile,
    pub level: EncoderLevel,
    /// Seconds between keyframes
    pub keyframe_interval: f32,
}

impl VideoEncoderSettings {
    pub fn from_profile(profile: &ConversionProfile) -> Self {
        Self {
            bitrate: profile.video_bitrate,
            bitrate_mode: profile.bitrate_mode,
            profile: profile.encoder_profile,
            level: profile.encoder_level,
            keyframe_interval: profile.keyframe_interval,
        }
    }
}

/// A fully configured hardware transform job
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub source: SourceRef,
    pub destination: PathBuf,
    pub video_mime_type: String,
    pub audio_mime_type: String,
    pub audio_bitrate: u32,
    pub settings: VideoEncoderSettings,
}

impl TransformRequest {
    pub fn new(source: &SourceRef, destination: &Path, profile: &ConversionProfile) -> Self {
        Self {
            source: source.clone(),
            destination: destination.to_path_buf(),
            video_mime_type: profile.video_codec.mime_type().to_string(),
            audio_mime_type: profile.audio_codec.mime_type().to_string(),
            audio_bitrate: profile.audio_bitrate,
            settings: VideoEncoderSettings::from_profile(profile),
        }
    }
}

/// A running hardware transform
pub trait TransformSession: Send + Sync {
    /// Current completion fraction, if the session can tell
    fn progress(&self) -> Option<f32>;

    /// Stop the session; safe to call more than once
    fn cancel(&self);
}

pub struct StartedTransform {
    pub session: Arc<dyn TransformSession>,
    /// Resolves once with the session outcome
    pub completion: oneshot::Receiver<Result<(), DomainError>>,
}

/// Port for the platform hardware transform pipeline
#[async_trait]
pub trait NativeTransformPort: Send + Sync {
    /// Start a transform; unsupported inputs fail here with `UnsupportedFormat`
    async fn start(&self, request: TransformRequest) -> Result<StartedTransform, DomainError>;
}

/// Invoked with the encoder's current output position
pub type TimeProgressCallback = Box<dyn Fn(Duration) + Send + Sync>;

/// Final result of an encode process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Process exit code; -1 when it was terminated without one
    pub return_code: i32,
    pub logs: String,
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        self.return_code == 0
    }
}

pub trait ProcessHandle: Send + Sync {
    /// Stop the process; safe to call more than once
    fn cancel(&self);
}

pub struct StartedProcess {
    pub handle: Arc<dyn ProcessHandle>,
    pub completion: oneshot::Receiver<ProcessOutcome>,
}

/// Port for running the command-driven software encoder
#[async_trait]
pub trait EncodeProcessPort: Send + Sync {
    async fn execute_async(
        &self,
        command: &str,
        on_progress: TimeProgressCallback,
    ) -> Result<StartedProcess, DomainError>;
}

/// Port for media metadata probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    async fn duration(&self, path: &Path) -> Result<Duration, DomainError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Pending,
    Downloading,
    Installing,
    Installed,
    Failed,
}

/// Progress update delivered to installation listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallProgress {
    pub status: InstallStatus,
    pub bytes_downloaded: u64,
    /// `None` when the download size is unknown
    pub total_bytes: Option<u64>,
}

impl InstallProgress {
    /// Completed fraction, or `None` when it cannot be determined
    pub fn fraction(&self) -> Option<f32> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.bytes_downloaded as f64 / total as f64).clamp(0.0, 1.0) as f32)
            }
            _ => None,
        }
    }
}

pub type InstallListener = Arc<dyn Fn(&InstallProgress) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Port for the on-demand component delivery mechanism
#[async_trait]
pub trait InstallerPort: Send + Sync {
    fn is_installed(&self, component_id: &str) -> bool;

    fn register_listener(&self, listener: InstallListener) -> ListenerId;

    fn unregister_listener(&self, id: ListenerId);

    /// Install a component and resolve once it is usable
    async fn install(&self, component_id: &str) -> Result<(), DomainError>;
}

/// Entry in the durable media store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub uri: String,
    pub display_name: String,
    pub mime_type: String,
}

/// Port for the durable, user-visible media store
#[async_trait]
pub trait MediaStorePort: Send + Sync {
    /// Create a hidden entry that becomes visible on `finalize`
    ///
    /// A taken name is de-duplicated; the handle carries the name actually used.
    async fn insert_pending(
        &self,
        display_name: &str,
        mime_type: &str,
        relative_path: &str,
    ) -> Result<MediaHandle, DomainError>;

    async fn open_write(
        &self,
        handle: &MediaHandle,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>, DomainError>;

    /// Publish the entry and return its final location; never replaces an existing entry
    async fn finalize(&self, handle: &MediaHandle) -> Result<String, DomainError>;

    async fn delete(&self, handle: &MediaHandle) -> Result<(), DomainError>;
}

/// Shared contract of the native and legacy encoder adapters
///
/// The returned stream yields progress and ends with exactly one terminal
/// event. Dropping it cancels all work started for the conversion.
pub trait EncoderPort: Send + Sync {
    fn convert(
        &self,
        source: &SourceRef,
        destination: &Path,
        profile: &ConversionProfile,
    ) -> StatusStream;
}

/// Resolves the legacy encoder only while its component is installed
pub trait LegacyEncoderProvider: Send + Sync {
    fn is_installed(&self) -> bool;

    fn resolve(&self) -> Option<Arc<dyn EncoderPort>>;
}
