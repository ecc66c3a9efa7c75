//! Status stream bridging callback-driven encoders into a pull-based stream

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::DomainError;
use crate::domain::model::ConversionStatus;

/// One item of a status stream; failures travel as `Err`
pub type StatusEvent = Result<ConversionStatus, DomainError>;

/// Clamp a progress value into [0, 1]; NaN counts as no progress
pub fn clamp_fraction(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Producer half of a status stream
///
/// Clones share the terminal flag, so whichever producer finishes first
/// wins and every later event is dropped.
#[derive(Clone)]
pub struct StatusEmitter {
    tx: mpsc::UnboundedSender<StatusEvent>,
    terminated: Arc<AtomicBool>,
}

impl StatusEmitter {
    pub fn progress(&self, fraction: f32) {
        if self.terminated.load(Ordering::Acquire) {
            return;
        }
        let _ = self.tx.send(Ok(ConversionStatus::Progress {
            fraction: clamp_fraction(fraction),
        }));
    }

    pub fn complete(&self, output_location: impl Into<String>) {
        self.terminate(Ok(ConversionStatus::Completed {
            output_location: output_location.into(),
        }));
    }

    pub fn fail(&self, error: DomainError) {
        self.terminate(Err(error));
    }

    fn terminate(&self, event: StatusEvent) {
        if self
            .terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = self.tx.send(event);
        }
    }
}

/// Lazy, cancellable stream of conversion statuses
///
/// Ends after the first terminal event. Dropping the stream cancels its
/// token and aborts every attached producer task.
pub struct StatusStream {
    rx: mpsc::UnboundedReceiver<StatusEvent>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    finished: bool,
}

impl StatusStream {
    pub fn channel() -> (StatusEmitter, StatusStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = StatusEmitter {
            tx,
            terminated: Arc::new(AtomicBool::new(false)),
        };
        let stream = StatusStream {
            rx,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            finished: false,
        };
        (emitter, stream)
    }

    /// A stream that fails immediately
    pub fn failed(error: DomainError) -> Self {
        let (emitter, stream) = Self::channel();
        emitter.fail(error);
        stream
    }

    /// Token cancelled when the consumer drops the stream
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tie a producer task to the stream lifetime
    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }
}

impl Stream for StatusStream {
    type Item = StatusEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                let terminal = match &event {
                    Ok(status) => status.is_completed(),
                    Err(_) => true,
                };
                if terminal {
                    this.finished = true;
                    this.cancel.cancel();
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                // Producers went away without a terminal event
                this.finished = true;
                this.cancel.cancel();
                Poll::Ready(Some(Err(DomainError::Cancelled)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StatusStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_clamp_fraction() {
        assert_eq!(clamp_fraction(-0.5), 0.0);
        assert_eq!(clamp_fraction(1.5), 1.0);
        assert_eq!(clamp_fraction(f32::NAN), 0.0);
        assert_eq!(clamp_fraction(0.25), 0.25);
    }

    #[tokio::test]
    async fn test_exactly_one_terminal_event() {
        let (emitter, stream) = StatusStream::channel();
        emitter.progress(0.3);
        emitter.complete("/tmp/out.mp4");
        emitter.fail(DomainError::native("late"));
        emitter.progress(0.9);
        drop(emitter);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().ok(),
            Some(&ConversionStatus::Progress { fraction: 0.3 })
        );
        assert!(matches!(
            events[1],
            Ok(ConversionStatus::Completed { .. })
        ));
    }

    #[tokio::test]
    async fn test_progress_is_clamped() {
        let (emitter, mut stream) = StatusStream::channel();
        emitter.progress(4.0);
        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            ConversionStatus::Progress { fraction: 1.0 }
        );
    }

    #[tokio::test]
    async fn test_terminal_event_cancels_token() {
        let (emitter, mut stream) = StatusStream::channel();
        let token = stream.cancellation_token();
        emitter.fail(DomainError::legacy("boom"));
        assert!(stream.next().await.unwrap().is_err());
        assert!(token.is_cancelled());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_without_terminal_reports_cancelled() {
        let (emitter, mut stream) = StatusStream::channel();
        drop(emitter);
        assert!(matches!(
            stream.next().await,
            Some(Err(DomainError::Cancelled))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_cancels_and_aborts_tasks() {
        let (_emitter, mut stream) = StatusStream::channel();
        let token = stream.cancellation_token();
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _alive = alive_tx;
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        stream.attach(task);
        drop(stream);
        assert!(token.is_cancelled());
        // The sender is only dropped once the task has been aborted
        assert!(alive_rx.await.is_err());
    }
}
