// Convert interactor - Orchestrates batch conversion across the native and legacy paths

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::component_gate::ComponentGate;
use crate::app::publisher::{StateObserver, StatePublisher};
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::LegacyFormatHeuristic;
use crate::output::OutputSink;
use crate::ports::*;
use crate::utils::time::unix_millis;
use crate::utils::TempFileGuard;

/// Shown when a source needs the not-yet-installed legacy encoder
pub const LEGACY_DETECTED_REASON: &str = "Format not supported natively. Download legacy converter?";

/// Shown when the legacy component could not be installed
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Download failed.";

/// Collaborators of the orchestrator
pub struct ConvertDependencies {
    pub content: Arc<dyn ContentPort>,
    pub native: Arc<dyn EncoderPort>,
    pub legacy: Arc<dyn LegacyEncoderProvider>,
    pub installer: Arc<dyn InstallerPort>,
    pub media_store: Arc<dyn MediaStorePort>,
    pub component_id: String,
}

/// Cancels whatever batch operation is currently running
///
/// Cloneable so a signal handler can hold one while the orchestrator is
/// borrowed mutably by the running operation.
#[derive(Clone, Default)]
pub struct BatchCanceller {
    current: Arc<Mutex<CancellationToken>>,
}

impl BatchCanceller {
    pub fn cancel(&self) {
        self.token().cancel();
    }

    fn token(&self) -> CancellationToken {
        match self.current.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Fresh token for a new operation
    fn renew(&self) -> CancellationToken {
        let token = CancellationToken::new();
        match self.current.lock() {
            Ok(mut current) => *current = token.clone(),
            Err(poisoned) => *poisoned.into_inner() = token.clone(),
        }
        token
    }

    /// Token for continuing a suspended batch
    ///
    /// A cancel that arrived while suspended is still pending and yields `None`.
    fn resume(&self) -> Option<CancellationToken> {
        if self.token().is_cancelled() {
            return None;
        }
        Some(self.renew())
    }
}

/// Result of converting one item
enum ItemOutcome {
    Converted,
    Failed(DomainError),
    Cancelled,
}

/// Batch orchestrator: native first, legacy fallback with sticky mode
pub struct ConvertInteractor {
    content: Arc<dyn ContentPort>,
    native: Arc<dyn EncoderPort>,
    legacy: Arc<dyn LegacyEncoderProvider>,
    gate: ComponentGate,
    sink: OutputSink,
    publisher: StatePublisher,
    profile: ConversionProfile,
    temp_dir: PathBuf,
    batch: Option<BatchState>,
    suspended: bool,
    canceller: BatchCanceller,
}

impl ConvertInteractor {
    /// Create new convert interactor with injected ports
    pub fn new(
        deps: ConvertDependencies,
        profile: ConversionProfile,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        let publisher = StatePublisher::new();
        let gate = ComponentGate::new(deps.installer, deps.component_id, publisher.clone());
        Self {
            content: deps.content,
            native: deps.native,
            legacy: deps.legacy,
            gate,
            sink: OutputSink::new(deps.media_store),
            publisher,
            profile,
            temp_dir: temp_dir.into(),
            batch: None,
            suspended: false,
            canceller: BatchCanceller::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PresentationState> {
        self.publisher.subscribe()
    }

    pub fn add_observer(&self, observer: Arc<dyn StateObserver>) {
        self.publisher.add_observer(observer);
    }

    pub fn state(&self) -> PresentationState {
        self.publisher.current()
    }

    pub fn profile(&self) -> &ConversionProfile {
        &self.profile
    }

    pub fn batch(&self) -> Option<&BatchState> {
        self.batch.as_ref()
    }

    pub fn cancel_handle(&self) -> BatchCanceller {
        self.canceller.clone()
    }

    /// Start a new batch, replacing any previous one
    pub async fn submit(&mut self, sources: Vec<SourceRef>) -> PresentationState {
        self.batch = None;
        self.suspended = false;
        let token = self.canceller.renew();
        info!("Starting batch of {} item(s) with profile {}", sources.len(), self.profile.name);

        for source in &sources {
            let granted = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = self.content.grant_read_access(source) => Some(result),
            };
            match granted {
                None => return self.cancelled(),
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    return self.fail(format!("Permission denied: {}", e.detail()));
                }
            }
        }

        self.batch = Some(BatchState::new(sources));
        self.run(&token, false).await
    }

    /// Install the legacy component and resume the suspended batch
    pub async fn confirm_legacy_download(&mut self) -> PresentationState {
        if !self.suspended || self.batch.is_none() {
            warn!("No batch is waiting for the legacy converter; ignoring confirmation");
            return self.state();
        }
        self.suspended = false;
        let token = match self.canceller.resume() {
            Some(token) => token,
            None => return self.cancelled(),
        };

        let installed = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            ok = self.gate.ensure_installed() => Some(ok),
        };
        match installed {
            None => return self.cancelled(),
            Some(false) => return self.fail(DOWNLOAD_FAILED_MESSAGE.to_string()),
            Some(true) => {}
        }

        if let Some(batch) = self.batch.as_mut() {
            batch.enter_legacy_mode();
        }
        self.run(&token, true).await
    }

    /// Decline the legacy download and drop the batch
    pub fn dismiss_legacy(&mut self) -> PresentationState {
        if !self.suspended {
            warn!("No batch is waiting for the legacy converter; ignoring dismissal");
            return self.state();
        }
        info!("Legacy download declined; discarding batch");
        self.discard()
    }

    /// Acknowledge a finished batch
    pub fn reset(&mut self) -> PresentationState {
        let state = self.state();
        if !state.is_terminal() && state != PresentationState::Idle {
            warn!("Cannot reset while {}", state.label());
            return state;
        }
        self.discard()
    }

    /// Convert from the cursor to the end of the batch
    ///
    /// `retrying` marks the item at the cursor as a first legacy attempt
    /// after a native failure.
    async fn run(&mut self, token: &CancellationToken, mut retrying: bool) -> PresentationState {
        loop {
            let (index, total, source, sticky) = match self.batch.as_ref() {
                None => return self.discard(),
                Some(batch) => match batch.current() {
                    Some(source) => (
                        batch.cursor(),
                        batch.total(),
                        source.clone(),
                        batch.is_legacy_sticky(),
                    ),
                    None => {
                        let count = batch.processed();
                        info!("Batch finished: {} item(s) converted", count);
                        return self.publish(PresentationState::Success { count });
                    }
                },
            };

            self.publisher.publish(PresentationState::Loading {
                progress: 0.0,
                current_index: index + 1,
                total,
            });

            if sticky {
                let outcome = match self.legacy.resolve() {
                    Some(encoder) => self.convert_item(encoder, &source, index, total, token).await,
                    None => ItemOutcome::Failed(DomainError::legacy("legacy encoder is not installed")),
                };
                match outcome {
                    ItemOutcome::Converted => {
                        retrying = false;
                        self.advance();
                    }
                    ItemOutcome::Cancelled => return self.cancelled(),
                    ItemOutcome::Failed(e) => {
                        let message = if retrying {
                            format!("Legacy conversion failed: {}", e.detail())
                        } else {
                            format!("Legacy batch conversion failed: {}", e.detail())
                        };
                        return self.fail(message);
                    }
                }
                continue;
            }

            let native = Arc::clone(&self.native);
            match self.convert_item(native, &source, index, total, token).await {
                ItemOutcome::Converted => self.advance(),
                ItemOutcome::Cancelled => return self.cancelled(),
                ItemOutcome::Failed(e) => {
                    warn!("Native conversion of {} failed: {}", source, e);
                    let content = Arc::clone(&self.content);
                    let plausible = LegacyFormatHeuristic::is_likely_supported(&source, |s| {
                        content.content_type(s)
                    });
                    if !plausible {
                        return self.fail(format!("Format not supported: {}", e.detail()));
                    }

                    if self.legacy.is_installed() {
                        info!("Legacy converter installed; switching batch to legacy mode");
                        if let Some(batch) = self.batch.as_mut() {
                            batch.enter_legacy_mode();
                        }
                        retrying = true;
                        continue;
                    }

                    info!("Suspending batch at item {} of {} pending legacy download", index + 1, total);
                    self.suspended = true;
                    return self.publish(PresentationState::LegacyFormatDetected {
                        reason: LEGACY_DETECTED_REASON.to_string(),
                    });
                }
            }
        }
    }

    async fn convert_item(
        &self,
        encoder: Arc<dyn EncoderPort>,
        source: &SourceRef,
        index: usize,
        total: usize,
        token: &CancellationToken,
    ) -> ItemOutcome {
        if let Err(e) = tokio::fs::create_dir_all(&self.temp_dir).await {
            return ItemOutcome::Failed(e.into());
        }
        let temp_output = self.temp_dir.join(format!(
            "{}{}.{}",
            self.profile.temp_filename_prefix,
            unix_millis(),
            self.profile.file_extension
        ));
        // Removes partial output on failure and cancellation
        let _temp_guard = TempFileGuard::new(&temp_output);

        let mut stream = encoder.convert(source, &temp_output, &self.profile);
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                event = stream.next() => Some(event),
            };

            match next {
                None => {
                    info!("Conversion of {} cancelled", source);
                    drop(stream);
                    return ItemOutcome::Cancelled;
                }
                Some(None) => {
                    return ItemOutcome::Failed(DomainError::Cancelled);
                }
                Some(Some(Ok(ConversionStatus::Progress { fraction }))) => {
                    self.publisher.publish(PresentationState::Loading {
                        progress: fraction,
                        current_index: index + 1,
                        total,
                    });
                }
                Some(Some(Ok(ConversionStatus::Completed { output_location }))) => {
                    drop(stream);
                    debug!("Converted {} into {}", source, output_location);
                    let completed = PathBuf::from(output_location);
                    if self.sink.persist(&completed, &self.profile).await.is_none() {
                        warn!("Output of {} could not be saved; continuing batch", source);
                    }
                    return ItemOutcome::Converted;
                }
                Some(Some(Err(e))) => return ItemOutcome::Failed(e),
            }
        }
    }

    fn advance(&mut self) {
        if let Some(batch) = self.batch.as_mut() {
            batch.advance();
        }
    }

    fn publish(&self, state: PresentationState) -> PresentationState {
        self.publisher.publish(state.clone());
        state
    }

    fn fail(&mut self, message: String) -> PresentationState {
        error!("{}", message);
        self.suspended = false;
        self.publish(PresentationState::Error { message })
    }

    fn cancelled(&mut self) -> PresentationState {
        info!("Batch cancelled");
        self.discard()
    }

    fn discard(&mut self) -> PresentationState {
        self.batch = None;
        self.suspended = false;
        self.publish(PresentationState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceller_targets_current_operation() {
        let canceller = BatchCanceller::default();
        let first = canceller.renew();
        let handle = canceller.clone();

        handle.cancel();
        assert!(first.is_cancelled());

        let second = canceller.renew();
        assert!(!second.is_cancelled());
        handle.cancel();
        assert!(second.is_cancelled());
    }

    #[test]
    fn test_resume_keeps_pending_cancel() {
        let canceller = BatchCanceller::default();
        let suspended = canceller.renew();
        assert!(canceller.resume().is_some());

        canceller.cancel();
        assert!(canceller.resume().is_none());
        assert!(canceller.resume().is_none());
        assert!(!suspended.is_cancelled());

        assert!(!canceller.renew().is_cancelled());
    }
}
