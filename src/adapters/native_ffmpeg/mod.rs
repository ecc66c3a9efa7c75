//! Hardware transform adapter - Drives a system ffmpeg with a GPU encoder

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{mime, BitrateMode, VideoCodec};
use crate::ports::{
    ContentPort, NativeTransformPort, StartedTransform, TransformRequest, TransformSession,
};
use crate::utils::progress_line::{is_progress_end, parse_duration_header, parse_out_time};
use crate::utils::time::format_clock;

/// Containers the hardware pipeline can demux
pub const NATIVE_CONTAINERS: &[&str] = &[
    "video/mp4",
    "video/x-m4v",
    "video/3gpp",
    "video/webm",
    "video/x-matroska",
];

/// Stderr lines kept for failure reports
const MAX_LOG_LINES: usize = 40;

/// Hardware encoder family used by the native path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HardwareEncoder {
    /// Platform default
    #[default]
    Auto,
    /// NVIDIA NVENC
    Nvenc,
    /// Intel Quick Sync Video
    Qsv,
    /// AMD AMF
    Amf,
    /// Apple VideoToolbox
    VideoToolbox,
    /// Linux VA-API
    Vaapi,
}

impl HardwareEncoder {
    /// Concrete encoder family for this platform
    pub fn resolve(self) -> Self {
        match self {
            HardwareEncoder::Auto => {
                if cfg!(target_os = "macos") {
                    HardwareEncoder::VideoToolbox
                } else if cfg!(target_os = "windows") {
                    HardwareEncoder::Nvenc
                } else {
                    HardwareEncoder::Vaapi
                }
            }
            other => other,
        }
    }

    /// ffmpeg encoder name for a codec, if this family can produce it
    pub fn encoder_name(self, codec: &VideoCodec) -> Option<&'static str> {
        let name = match (self.resolve(), codec) {
            (HardwareEncoder::Nvenc, VideoCodec::H264) => "h264_nvenc",
            (HardwareEncoder::Nvenc, VideoCodec::H265) => "hevc_nvenc",
            (HardwareEncoder::Nvenc, VideoCodec::Av1) => "av1_nvenc",
            (HardwareEncoder::Qsv, VideoCodec::H264) => "h264_qsv",
            (HardwareEncoder::Qsv, VideoCodec::H265) => "hevc_qsv",
            (HardwareEncoder::Qsv, VideoCodec::Vp9) => "vp9_qsv",
            (HardwareEncoder::Qsv, VideoCodec::Av1) => "av1_qsv",
            (HardwareEncoder::Amf, VideoCodec::H264) => "h264_amf",
            (HardwareEncoder::Amf, VideoCodec::H265) => "hevc_amf",
            (HardwareEncoder::Amf, VideoCodec::Av1) => "av1_amf",
            (HardwareEncoder::VideoToolbox, VideoCodec::H264) => "h264_videotoolbox",
            (HardwareEncoder::VideoToolbox, VideoCodec::H265) => "hevc_videotoolbox",
            (HardwareEncoder::Vaapi, VideoCodec::H264) => "h264_vaapi",
            (HardwareEncoder::Vaapi, VideoCodec::H265) => "hevc_vaapi",
            (HardwareEncoder::Vaapi, VideoCodec::Vp9) => "vp9_vaapi",
            (HardwareEncoder::Vaapi, VideoCodec::Av1) => "av1_vaapi",
            _ => return None,
        };
        Some(name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareEncoder::Auto => "auto",
            HardwareEncoder::Nvenc => "nvenc",
            HardwareEncoder::Qsv => "qsv",
            HardwareEncoder::Amf => "amf",
            HardwareEncoder::VideoToolbox => "videotoolbox",
            HardwareEncoder::Vaapi => "vaapi",
        }
    }
}

impl fmt::Display for HardwareEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardwareEncoder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(HardwareEncoder::Auto),
            "nvenc" => Ok(HardwareEncoder::Nvenc),
            "qsv" => Ok(HardwareEncoder::Qsv),
            "amf" => Ok(HardwareEncoder::Amf),
            "videotoolbox" => Ok(HardwareEncoder::VideoToolbox),
            "vaapi" => Ok(HardwareEncoder::Vaapi),
            other => Err(format!("unknown hardware encoder: {}", other)),
        }
    }
}

/// Native transform backed by ffmpeg with a hardware video encoder
pub struct HwTransformAdapter {
    ffmpeg: PathBuf,
    encoder: HardwareEncoder,
    content: Arc<dyn ContentPort>,
    vaapi_device: PathBuf,
}

impl HwTransformAdapter {
    pub fn new(
        ffmpeg: impl Into<PathBuf>,
        encoder: HardwareEncoder,
        content: Arc<dyn ContentPort>,
        vaapi_device: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            encoder: encoder.resolve(),
            content,
            vaapi_device: vaapi_device.into(),
        }
    }

    /// Reject inputs the hardware pipeline cannot handle
    fn check_supported(&self, request: &TransformRequest) -> Result<&'static str, DomainError> {
        let container = self.content.content_type(&request.source);
        match container.as_deref() {
            Some(content_type) if NATIVE_CONTAINERS.contains(&content_type) => {}
            Some(content_type) => {
                return Err(DomainError::UnsupportedFormat(format!(
                    "container {} is not supported by the hardware pipeline",
                    content_type
                )));
            }
            None => {
                return Err(DomainError::UnsupportedFormat(format!(
                    "unknown container for {}",
                    request.source
                )));
            }
        }

        if request.audio_mime_type != mime::AUDIO_AAC {
            return Err(DomainError::UnsupportedFormat(format!(
                "audio {} is not supported by the hardware pipeline",
                request.audio_mime_type
            )));
        }

        let codec = VideoCodec::from_mime_type(&request.video_mime_type);
        self.encoder.encoder_name(&codec).ok_or_else(|| {
            DomainError::UnsupportedFormat(format!(
                "{} cannot encode {}",
                self.encoder, request.video_mime_type
            ))
        })
    }

    /// ffmpeg arguments for a validated request
    pub fn build_args(&self, request: &TransformRequest, input: &Path, encoder_name: &str) -> Vec<String> {
        let settings = &request.settings;
        let mut args: Vec<String> = vec!["-y".into()];

        if self.encoder == HardwareEncoder::Vaapi {
            args.push("-vaapi_device".into());
            args.push(self.vaapi_device.to_string_lossy().into_owned());
        }
        args.push("-i".into());
        args.push(input.to_string_lossy().into_owned());
        if self.encoder == HardwareEncoder::Vaapi {
            args.push("-vf".into());
            args.push("format=nv12,hwupload".into());
        }

        args.push("-c:v".into());
        args.push(encoder_name.into());
        args.push("-b:v".into());
        args.push(settings.bitrate.to_string());
        match settings.bitrate_mode {
            BitrateMode::Cbr => {
                args.push("-minrate".into());
                args.push(settings.bitrate.to_string());
                args.push("-maxrate".into());
                args.push(settings.bitrate.to_string());
                args.push("-bufsize".into());
                args.push((u64::from(settings.bitrate) * 2).to_string());
            }
            BitrateMode::Vbr => {
                args.push("-maxrate".into());
                args.push((u64::from(settings.bitrate) * 3 / 2).to_string());
                args.push("-bufsize".into());
                args.push((u64::from(settings.bitrate) * 2).to_string());
            }
            // Quality targets differ per encoder; the bitrate acts as a ceiling
            BitrateMode::Cq => {}
        }

        if matches!(VideoCodec::from_mime_type(&request.video_mime_type), VideoCodec::H264) {
            args.push("-profile:v".into());
            args.push(settings.profile.as_str().into());
            args.push("-level".into());
            args.push(settings.level.as_str().into());
        }
        if settings.keyframe_interval > 0.0 {
            args.push("-force_key_frames".into());
            args.push(format!("expr:gte(t,n_forced*{})", settings.keyframe_interval));
        }

        args.push("-c:a".into());
        args.push("aac".into());
        args.push("-b:a".into());
        args.push(request.audio_bitrate.to_string());

        let is_mp4 = request
            .destination
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("mp4"))
            .unwrap_or(false);
        if is_mp4 {
            args.push("-movflags".into());
            args.push("+faststart".into());
        }
        args.push(request.destination.to_string_lossy().into_owned());
        args
    }
}

/// Progress and cancellation shared with the ffmpeg reader tasks
#[derive(Default)]
pub struct HwSession {
    duration_us: AtomicU64,
    position_us: AtomicU64,
    cancel: CancellationToken,
}

impl HwSession {
    fn set_duration(&self, micros: u64) {
        self.duration_us.store(micros, Ordering::Relaxed);
    }

    fn set_position(&self, micros: u64) {
        self.position_us.store(micros, Ordering::Relaxed);
    }
}

impl TransformSession for HwSession {
    fn progress(&self) -> Option<f32> {
        let duration = self.duration_us.load(Ordering::Relaxed);
        if duration == 0 {
            return None;
        }
        let position = self.position_us.load(Ordering::Relaxed);
        Some((position as f64 / duration as f64).clamp(0.0, 1.0) as f32)
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl NativeTransformPort for HwTransformAdapter {
    async fn start(&self, request: TransformRequest) -> Result<StartedTransform, DomainError> {
        let encoder_name = self.check_supported(&request)?;
        let input = self.content.local_path(&request.source).ok_or_else(|| {
            DomainError::native(format!("{} has no local path", request.source))
        })?;
        let args = self.build_args(&request, &input, encoder_name);
        info!("Hardware transform with {} for {}", encoder_name, request.source);
        debug!("ffmpeg {}", args.join(" "));

        let mut child = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostdin", "-progress", "pipe:1", "-nostats"])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::native(format!("failed to spawn {}: {}", self.ffmpeg.display(), e))
            })?;

        let session = Arc::new(HwSession::default());
        let stdout_task = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(track_position(stdout, Arc::clone(&session))));
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(track_stderr(stderr, Arc::clone(&session))));

        let (tx, rx) = oneshot::channel();
        let waiter_session = Arc::clone(&session);
        tokio::spawn(async move {
            let waited = tokio::select! {
                status = child.wait() => Some(status),
                _ = waiter_session.cancel.cancelled() => None,
            };
            let result = match waited {
                Some(Ok(status)) if status.success() => Ok(()),
                Some(Ok(status)) => Err(status.code().unwrap_or(-1)),
                Some(Err(e)) => {
                    warn!("Failed waiting for ffmpeg: {}", e);
                    Err(-1)
                }
                None => {
                    debug!("Killing hardware transform");
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill ffmpeg: {}", e);
                    }
                    let _ = tx.send(Err(DomainError::Cancelled));
                    return;
                }
            };

            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            let logs = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };
            let outcome = result.map_err(|code| {
                DomainError::native(format!("ffmpeg exited with code {}: {}", code, logs))
            });
            let _ = tx.send(outcome);
        });

        Ok(StartedTransform {
            session,
            completion: rx,
        })
    }
}

async fn track_position<R: AsyncRead + Unpin>(stdout: R, session: Arc<HwSession>) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(time) = parse_out_time(&line) {
            session.set_position(time.as_micros() as u64);
        } else if is_progress_end(&line) {
            session.set_position(session.duration_us.load(Ordering::Relaxed));
        }
    }
}

async fn track_stderr<R: AsyncRead + Unpin>(stderr: R, session: Arc<HwSession>) -> String {
    let mut tail = VecDeque::with_capacity(MAX_LOG_LINES);
    let mut lines = BufReader::new(stderr).lines();
    let mut duration_known = false;
    while let Ok(Some(line)) = lines.next_line().await {
        if !duration_known {
            if let Some(duration) = parse_duration_header(&line) {
                debug!("Source duration {}", format_clock(duration));
                session.set_duration(duration.as_micros() as u64);
                duration_known = true;
            }
        }
        if tail.len() == MAX_LOG_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into_iter().collect::<Vec<_>>().join("\n")
}
