//! Software encode path: runs the component's command-driven encoder

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use super::command::LegacyCommand;
use super::progress::{StatusEmitter, StatusStream};
use crate::domain::errors::DomainError;
use crate::domain::model::{ConversionProfile, SourceRef};
use crate::ports::{
    ContentPort, EncodeProcessPort, EncoderPort, ProbePort, ProcessHandle, TimeProgressCallback,
};
use crate::utils::time::unix_millis;
use crate::utils::TempFileGuard;

/// Reported when the input duration is unknown
pub const UNKNOWN_DURATION_PROGRESS: f32 = 0.1;

/// Prefix of the local copy handed to the encoder
pub const RAW_INPUT_PREFIX: &str = "ffmpeg_raw_";

/// Encoder adapter for the legacy (software) path
pub struct LegacyEncoder {
    content: Arc<dyn ContentPort>,
    probe: Arc<dyn ProbePort>,
    process: Arc<dyn EncodeProcessPort>,
    temp_dir: PathBuf,
}

impl LegacyEncoder {
    pub fn new(
        content: Arc<dyn ContentPort>,
        probe: Arc<dyn ProbePort>,
        process: Arc<dyn EncodeProcessPort>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            content,
            probe,
            process,
            temp_dir: temp_dir.into(),
        }
    }
}

/// Stops the encode process when the conversion is torn down
struct ProcessGuard(Arc<dyn ProcessHandle>);

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

struct LegacyJob {
    content: Arc<dyn ContentPort>,
    probe: Arc<dyn ProbePort>,
    process: Arc<dyn EncodeProcessPort>,
    temp_dir: PathBuf,
    source: SourceRef,
    destination: PathBuf,
    profile: ConversionProfile,
}

impl EncoderPort for LegacyEncoder {
    fn convert(
        &self,
        source: &SourceRef,
        destination: &Path,
        profile: &ConversionProfile,
    ) -> StatusStream {
        let (emitter, mut stream) = StatusStream::channel();
        let cancel = stream.cancellation_token();
        let job = LegacyJob {
            content: Arc::clone(&self.content),
            probe: Arc::clone(&self.probe),
            process: Arc::clone(&self.process),
            temp_dir: self.temp_dir.clone(),
            source: source.clone(),
            destination: destination.to_path_buf(),
            profile: profile.clone(),
        };

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Legacy conversion of {} cancelled", job.source);
                }
                _ = job.run(&emitter) => {}
            }
        });
        stream.attach(task);
        stream
    }
}

impl LegacyJob {
    async fn run(&self, emitter: &StatusEmitter) {
        match self.encode(emitter).await {
            Ok(()) => {
                info!("Legacy conversion finished: {}", self.destination.display());
                emitter.complete(self.destination.to_string_lossy());
            }
            Err(e) => {
                error!("Legacy conversion of {} failed: {}", self.source, e);
                emitter.fail(e);
            }
        }
    }

    async fn encode(&self, emitter: &StatusEmitter) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let raw_path = self
            .temp_dir
            .join(format!("{}{}", RAW_INPUT_PREFIX, unix_millis()));
        // Dropped on every exit path of this function, including abortion
        let raw_guard = TempFileGuard::new(&raw_path);

        self.copy_source(&raw_path).await?;

        let duration = match self.probe.duration(&raw_path).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Could not determine duration of {}: {}", self.source, e);
                Duration::ZERO
            }
        };

        let command = LegacyCommand::new(&self.profile, &raw_path, &self.destination).build();
        debug!("Legacy encoder command: {}", command);

        let started = self
            .process
            .execute_async(&command, progress_callback(emitter.clone(), duration))
            .await?;
        let _process_guard = ProcessGuard(Arc::clone(&started.handle));

        let outcome = started
            .completion
            .await
            .map_err(|_| DomainError::legacy("encoder process ended without a result"))?;

        drop(raw_guard);

        if outcome.is_success() {
            Ok(())
        } else {
            Err(DomainError::legacy(format!(
                "FFmpeg failed (RC {}): {}",
                outcome.return_code, outcome.logs
            )))
        }
    }

    async fn copy_source(&self, raw_path: &Path) -> Result<(), DomainError> {
        let mut reader = self.content.open_read(&self.source).await?;
        let mut writer = tokio::fs::File::create(raw_path).await?;
        let copied = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;
        debug!("Copied {} bytes of {} to {}", copied, self.source, raw_path.display());
        Ok(())
    }
}

/// Map encoder time positions to completion fractions
fn progress_callback(emitter: StatusEmitter, duration: Duration) -> TimeProgressCallback {
    let duration_ms = duration.as_millis() as f64;
    Box::new(move |time: Duration| {
        if duration_ms > 0.0 {
            emitter.progress((time.as_millis() as f64 / duration_ms) as f32);
        } else {
            emitter.progress(UNKNOWN_DURATION_PROGRESS);
        }
    })
}
