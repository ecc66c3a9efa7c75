//! Hardware encode path: drives a platform transform session

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::progress::{StatusEmitter, StatusStream};
use crate::domain::errors::DomainError;
use crate::domain::model::{ConversionProfile, SourceRef};
use crate::ports::{EncoderPort, NativeTransformPort, TransformRequest, TransformSession};

/// How often session progress is sampled
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Encoder adapter for the native (hardware) path
pub struct NativeEncoder {
    transform: Arc<dyn NativeTransformPort>,
    sample_interval: Duration,
}

impl NativeEncoder {
    pub fn new(transform: Arc<dyn NativeTransformPort>) -> Self {
        Self {
            transform,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval.max(Duration::from_millis(1));
        self
    }
}

/// Cancels the session unless the session finished on its own
struct SessionGuard {
    session: Arc<dyn TransformSession>,
    armed: bool,
}

impl SessionGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!("Cancelling native transform session");
            self.session.cancel();
        }
    }
}

impl EncoderPort for NativeEncoder {
    fn convert(
        &self,
        source: &SourceRef,
        destination: &Path,
        profile: &ConversionProfile,
    ) -> StatusStream {
        let (emitter, mut stream) = StatusStream::channel();
        let cancel = stream.cancellation_token();
        let request = TransformRequest::new(source, destination, profile);
        let transform = Arc::clone(&self.transform);
        let interval = self.sample_interval;

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = run_session(transform, request, interval, &emitter) => {}
            }
        });
        stream.attach(task);
        stream
    }
}

async fn run_session(
    transform: Arc<dyn NativeTransformPort>,
    request: TransformRequest,
    interval: Duration,
    emitter: &StatusEmitter,
) {
    let destination = request.destination.clone();
    info!(
        "Starting native transform of {} ({} @ {} bps)",
        request.source, request.video_mime_type, request.settings.bitrate
    );

    let started = match transform.start(request).await {
        Ok(started) => started,
        Err(e) => {
            warn!("Native transform could not start: {}", e);
            emitter.fail(e);
            return;
        }
    };

    let mut guard = SessionGuard {
        session: Arc::clone(&started.session),
        armed: true,
    };
    let mut completion = started.completion;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            outcome = &mut completion => {
                guard.disarm();
                match outcome {
                    Ok(Ok(())) => {
                        info!("Native transform finished: {}", destination.display());
                        emitter.complete(destination.to_string_lossy());
                    }
                    Ok(Err(e)) => {
                        warn!("Native transform failed: {}", e);
                        emitter.fail(e);
                    }
                    Err(_) => {
                        emitter.fail(DomainError::native("transform session ended without a result"));
                    }
                }
                return;
            }
            _ = ticker.tick() => {
                if let Some(fraction) = guard.session.progress() {
                    debug!("Native progress sample: {:.3}", fraction);
                    emitter.progress(fraction);
                }
            }
        }
    }
}
