//! FFmpeg process adapter for the software encode path

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::ports::{
    EncodeProcessPort, ProcessHandle, ProcessOutcome, StartedProcess, TimeProgressCallback,
};
use crate::utils::cmdline::split_command;
use crate::utils::progress_line::parse_out_time;

/// Stderr lines kept for failure reports
const MAX_LOG_LINES: usize = 200;

/// Runs the component's ffmpeg binary with machine-readable progress
pub struct FfmpegProcessAdapter {
    binary: PathBuf,
}

impl FfmpegProcessAdapter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// Cancellation handle for a running ffmpeg process
pub struct FfmpegProcessHandle {
    cancel: CancellationToken,
}

impl ProcessHandle for FfmpegProcessHandle {
    fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl EncodeProcessPort for FfmpegProcessAdapter {
    async fn execute_async(
        &self,
        command: &str,
        on_progress: TimeProgressCallback,
    ) -> Result<StartedProcess, DomainError> {
        let args = split_command(command)?;
        debug!("Spawning {} with {} argument(s)", self.binary.display(), args.len());

        let mut child = Command::new(&self.binary)
            .args(["-hide_banner", "-nostdin", "-progress", "pipe:1", "-nostats"])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::legacy(format!(
                    "failed to spawn {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        let stdout_task = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(forward_progress(stdout, on_progress)));
        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(collect_logs(stderr)));

        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let waiter_cancel = cancel.clone();

        tokio::spawn(async move {
            let waited = tokio::select! {
                status = child.wait() => Some(status),
                _ = waiter_cancel.cancelled() => None,
            };
            let return_code = match waited {
                Some(Ok(status)) => status.code().unwrap_or(-1),
                Some(Err(e)) => {
                    warn!("Failed waiting for ffmpeg: {}", e);
                    -1
                }
                None => {
                    debug!("Killing ffmpeg process");
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill ffmpeg: {}", e);
                    }
                    -1
                }
            };

            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            let logs = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };
            let _ = tx.send(ProcessOutcome { return_code, logs });
        });

        Ok(StartedProcess {
            handle: Arc::new(FfmpegProcessHandle { cancel }),
            completion: rx,
        })
    }
}

async fn forward_progress<R: AsyncRead + Unpin>(stdout: R, on_progress: TimeProgressCallback) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(time) = parse_out_time(&line) {
            on_progress(time);
        }
    }
}

async fn collect_logs<R: AsyncRead + Unpin>(stderr: R) -> String {
    let mut tail = VecDeque::with_capacity(MAX_LOG_LINES);
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == MAX_LOG_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into_iter().collect::<Vec<_>>().join("\n")
}
