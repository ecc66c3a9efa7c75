// Conversion profile - Target codec, quality and naming parameters for a batch

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Media type identifiers used for codec selection and output registration
pub mod mime {
    pub const VIDEO_H264: &str = "video/avc";
    pub const VIDEO_H265: &str = "video/hevc";
    pub const VIDEO_VP9: &str = "video/x-vnd.on2.vp9";
    pub const VIDEO_AV1: &str = "video/av01";
    pub const VIDEO_MP4: &str = "video/mp4";
    pub const VIDEO_WEBM: &str = "video/webm";
    pub const VIDEO_MATROSKA: &str = "video/x-matroska";
    pub const AUDIO_AAC: &str = "audio/mp4a-latm";
    pub const AUDIO_MPEG: &str = "audio/mpeg";
    pub const AUDIO_VORBIS: &str = "audio/vorbis";
    pub const AUDIO_OPUS: &str = "audio/opus";
    pub const AUDIO_FLAC: &str = "audio/flac";
}

/// Input media types offered to the file picker
pub mod input_formats {
    pub const LEGACY_AVI: &[&str] = &["video/avi", "video/x-msvideo", "video/mj2", "video/*"];
    pub const MODERN_ALL: &[&str] = &["video/mp4", "video/x-matroska", "video/webm"];
}

pub mod video_bitrate {
    /// Extreme high quality
    pub const MBPS_50: u32 = 50_000_000;
    /// Coolpix L25 high quality
    pub const MBPS_30: u32 = 30_000_000;
    /// Standard 1080p
    pub const MBPS_20: u32 = 20_000_000;
    /// High 720p
    pub const MBPS_10: u32 = 10_000_000;
    /// Standard 720p
    pub const MBPS_5: u32 = 5_000_000;
}

pub mod audio_bitrate {
    pub const KBPS_320: u32 = 320_000;
    pub const KBPS_192: u32 = 192_000;
    pub const KBPS_128: u32 = 128_000;
    pub const KBPS_96: u32 = 96_000;
}

/// Keyframe interval in seconds
pub mod keyframe_interval {
    pub const HALF_SECOND: f32 = 0.5;
    pub const ONE_SECOND: f32 = 1.0;
    pub const TWO_SECONDS: f32 = 2.0;
    pub const FIVE_SECONDS: f32 = 5.0;
}

/// Constant rate factor presets
pub mod quality {
    pub const LOSSLESS: u8 = 0;
    pub const NEAR_LOSSLESS: u8 = 12;
    pub const VISUALLY_TRANSPARENT: u8 = 18;
    pub const HIGH_QUALITY: u8 = 23;
    pub const MAX_CRF: u8 = 51;
}

pub mod frame_rate {
    pub const FPS_15: f64 = 15.0;
    pub const FPS_24: f64 = 23.976;
    pub const FPS_30: f64 = 29.97;
    pub const FPS_60: f64 = 60.0;
}

pub mod sample_rate {
    pub const HZ_22050: u32 = 22_050;
    pub const HZ_32000: u32 = 32_000;
    pub const HZ_44100: u32 = 44_100;
    pub const HZ_48000: u32 = 48_000;
}

/// Target video codec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
    Vp9,
    Av1,
    /// Any other codec, identified by media type
    Other(String),
}

impl VideoCodec {
    pub fn mime_type(&self) -> &str {
        match self {
            VideoCodec::H264 => mime::VIDEO_H264,
            VideoCodec::H265 => mime::VIDEO_H265,
            VideoCodec::Vp9 => mime::VIDEO_VP9,
            VideoCodec::Av1 => mime::VIDEO_AV1,
            VideoCodec::Other(mime_type) => mime_type,
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Self {
        match mime_type {
            mime::VIDEO_H264 => VideoCodec::H264,
            mime::VIDEO_H265 => VideoCodec::H265,
            mime::VIDEO_VP9 => VideoCodec::Vp9,
            mime::VIDEO_AV1 => VideoCodec::Av1,
            other => VideoCodec::Other(other.to_string()),
        }
    }

    /// Software encoder name used on the legacy path
    pub fn legacy_encoder(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
            VideoCodec::Vp9 => "libvpx-vp9",
            VideoCodec::Av1 => "libaom-av1",
            VideoCodec::Other(_) => "mpeg4",
        }
    }
}

/// Target audio codec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Mp3,
    Vorbis,
    Opus,
    Flac,
    Other(String),
}

impl AudioCodec {
    pub fn mime_type(&self) -> &str {
        match self {
            AudioCodec::Aac => mime::AUDIO_AAC,
            AudioCodec::Mp3 => mime::AUDIO_MPEG,
            AudioCodec::Vorbis => mime::AUDIO_VORBIS,
            AudioCodec::Opus => mime::AUDIO_OPUS,
            AudioCodec::Flac => mime::AUDIO_FLAC,
            AudioCodec::Other(mime_type) => mime_type,
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Self {
        match mime_type {
            mime::AUDIO_AAC => AudioCodec::Aac,
            mime::AUDIO_MPEG => AudioCodec::Mp3,
            mime::AUDIO_VORBIS => AudioCodec::Vorbis,
            mime::AUDIO_OPUS => AudioCodec::Opus,
            mime::AUDIO_FLAC => AudioCodec::Flac,
            other => AudioCodec::Other(other.to_string()),
        }
    }

    /// Software encoder name used on the legacy path; unknown codecs pass through
    pub fn legacy_encoder(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "libmp3lame",
            AudioCodec::Vorbis => "libvorbis",
            AudioCodec::Opus => "libopus",
            AudioCodec::Flac => "flac",
            AudioCodec::Other(_) => "copy",
        }
    }
}

/// Rate control mode requested from the hardware encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitrateMode {
    /// Constant quality
    Cq,
    /// Variable bitrate
    Vbr,
    /// Constant bitrate
    Cbr,
}

/// Encoder profile for the hardware path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderProfile {
    Baseline,
    Main,
    High,
}

impl EncoderProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderProfile::Baseline => "baseline",
            EncoderProfile::Main => "main",
            EncoderProfile::High => "high",
        }
    }
}

/// Encoder level for the hardware path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderLevel {
    #[serde(rename = "3.0")]
    L3,
    #[serde(rename = "3.1")]
    L31,
    #[serde(rename = "4.0")]
    L4,
    #[serde(rename = "4.1")]
    L41,
    #[serde(rename = "5.0")]
    L5,
}

impl EncoderLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderLevel::L3 => "3.0",
            EncoderLevel::L31 => "3.1",
            EncoderLevel::L4 => "4.0",
            EncoderLevel::L41 => "4.1",
            EncoderLevel::L5 => "5.0",
        }
    }
}

/// Software encoder speed/quality trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderPreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl EncoderPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderPreset::Ultrafast => "ultrafast",
            EncoderPreset::Superfast => "superfast",
            EncoderPreset::Veryfast => "veryfast",
            EncoderPreset::Faster => "faster",
            EncoderPreset::Fast => "fast",
            EncoderPreset::Medium => "medium",
            EncoderPreset::Slow => "slow",
            EncoderPreset::Slower => "slower",
            EncoderPreset::Veryslow => "veryslow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Yuv420p,
    Yuv422p,
    Yuv444p,
    Rgb24,
}

impl PixelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Yuv422p => "yuv422p",
            PixelFormat::Yuv444p => "yuv444p",
            PixelFormat::Rgb24 => "rgb24",
        }
    }
}

/// Content tuning hint for the software encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoTune {
    #[serde(rename = "none")]
    Untuned,
    Film,
    Animation,
    Grain,
    Stillimage,
    Fastdecode,
}

impl VideoTune {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoTune::Untuned => "none",
            VideoTune::Film => "film",
            VideoTune::Animation => "animation",
            VideoTune::Grain => "grain",
            VideoTune::Stillimage => "stillimage",
            VideoTune::Fastdecode => "fastdecode",
        }
    }
}

/// Output frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const SD_480P: Resolution = Resolution { width: 640, height: 480 };
    pub const HD_720P: Resolution = Resolution { width: 1280, height: 720 };
    pub const FHD_1080P: Resolution = Resolution { width: 1920, height: 1080 };
}

/// Active rate-control input for the software encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    /// Constant rate factor
    Quality(u8),
    /// Target bitrate in bits per second
    Bitrate(u32),
}

/// Immutable parameter set applied to every item of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionProfile {
    pub name: String,
    pub input_mime_types: Vec<String>,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub video_bitrate: u32,
    pub bitrate_mode: BitrateMode,
    pub encoder_profile: EncoderProfile,
    pub encoder_level: EncoderLevel,
    /// Seconds between forced keyframes
    pub keyframe_interval: f32,
    /// Quality factor; when present it replaces bitrate on the legacy path
    pub crf: Option<u8>,
    pub encoder_preset: EncoderPreset,
    pub pixel_format: PixelFormat,
    pub tune: VideoTune,
    /// `None` keeps the source resolution
    pub target_resolution: Option<Resolution>,
    /// `None` keeps the source frame rate
    pub target_fps: Option<f64>,
    pub audio_bitrate: u32,
    /// `None` keeps the source sample rate
    pub audio_sample_rate: Option<u32>,
    pub file_extension: String,
    pub output_mime_type: String,
    pub output_directory: String,
    pub filename_prefix: String,
    pub temp_filename_prefix: String,
}

impl ConversionProfile {
    pub const COOLPIX_L25_HIGH_QUALITY: &'static str = "coolpix-l25-high-quality";
    pub const STANDARD_720P: &'static str = "standard-720p";
    pub const PRESET_NAMES: &'static [&'static str] =
        &[Self::COOLPIX_L25_HIGH_QUALITY, Self::STANDARD_720P];

    const DEFAULT_TEMP_PREFIX: &'static str = "processing_";

    /// Near-lossless archive of Coolpix L25 AVI clips
    pub fn coolpix_l25_high_quality() -> Self {
        Self {
            name: Self::COOLPIX_L25_HIGH_QUALITY.to_string(),
            input_mime_types: to_strings(input_formats::LEGACY_AVI),
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            video_bitrate: video_bitrate::MBPS_30,
            bitrate_mode: BitrateMode::Vbr,
            encoder_profile: EncoderProfile::High,
            encoder_level: EncoderLevel::L41,
            keyframe_interval: keyframe_interval::ONE_SECOND,
            crf: Some(quality::NEAR_LOSSLESS),
            encoder_preset: EncoderPreset::Veryslow,
            pixel_format: PixelFormat::Yuv420p,
            tune: VideoTune::Stillimage,
            target_resolution: None,
            target_fps: None,
            audio_bitrate: audio_bitrate::KBPS_192,
            audio_sample_rate: Some(sample_rate::HZ_48000),
            file_extension: "mp4".to_string(),
            output_mime_type: mime::VIDEO_MP4.to_string(),
            output_directory: "CoolpixExports".to_string(),
            filename_prefix: "Coolpix_L25_".to_string(),
            temp_filename_prefix: Self::DEFAULT_TEMP_PREFIX.to_string(),
        }
    }

    /// Bitrate-driven 720p export for sharing
    pub fn standard_720p() -> Self {
        Self {
            name: Self::STANDARD_720P.to_string(),
            input_mime_types: to_strings(input_formats::MODERN_ALL),
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            video_bitrate: video_bitrate::MBPS_5,
            bitrate_mode: BitrateMode::Vbr,
            encoder_profile: EncoderProfile::Main,
            encoder_level: EncoderLevel::L31,
            keyframe_interval: keyframe_interval::TWO_SECONDS,
            crf: None,
            encoder_preset: EncoderPreset::Medium,
            pixel_format: PixelFormat::Yuv420p,
            tune: VideoTune::Film,
            target_resolution: Some(Resolution::HD_720P),
            target_fps: Some(frame_rate::FPS_30),
            audio_bitrate: audio_bitrate::KBPS_128,
            audio_sample_rate: Some(sample_rate::HZ_44100),
            file_extension: "mp4".to_string(),
            output_mime_type: mime::VIDEO_MP4.to_string(),
            output_directory: "Converted".to_string(),
            filename_prefix: "Export_720p_".to_string(),
            temp_filename_prefix: Self::DEFAULT_TEMP_PREFIX.to_string(),
        }
    }

    /// Look up a built-in preset by name
    pub fn preset(name: &str) -> Result<Self, DomainError> {
        match name.trim().to_lowercase().as_str() {
            Self::COOLPIX_L25_HIGH_QUALITY => Ok(Self::coolpix_l25_high_quality()),
            Self::STANDARD_720P => Ok(Self::standard_720p()),
            other => Err(DomainError::BadArgs(format!(
                "Unknown preset: {}. Available presets: {}",
                other,
                Self::PRESET_NAMES.join(", ")
            ))),
        }
    }

    /// Rate control for the legacy path; a quality factor beats bitrate
    pub fn rate_control(&self) -> RateControl {
        match self.crf {
            Some(crf) => RateControl::Quality(crf),
            None => RateControl::Bitrate(self.video_bitrate),
        }
    }

    /// Frame rate to force, if any
    pub fn forced_fps(&self) -> Option<f64> {
        self.target_fps.filter(|fps| *fps > 0.0)
    }

    /// Sample rate to force, if any
    pub fn forced_sample_rate(&self) -> Option<u32> {
        self.audio_sample_rate.filter(|rate| *rate > 0)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(crf) = self.crf {
            if crf > quality::MAX_CRF {
                return Err(DomainError::BadArgs(format!(
                    "CRF value {} is invalid (must be 0-{})",
                    crf,
                    quality::MAX_CRF
                )));
            }
        }
        if self.video_bitrate == 0 {
            return Err(DomainError::BadArgs(
                "Video bitrate must be greater than zero".to_string(),
            ));
        }
        if self.audio_bitrate == 0 {
            return Err(DomainError::BadArgs(
                "Audio bitrate must be greater than zero".to_string(),
            ));
        }
        if !(self.keyframe_interval > 0.0) {
            return Err(DomainError::BadArgs(
                "Keyframe interval must be positive".to_string(),
            ));
        }
        if let Some(resolution) = self.target_resolution {
            if resolution.width == 0 || resolution.height == 0 {
                return Err(DomainError::BadArgs(format!(
                    "Invalid target resolution {}x{}",
                    resolution.width, resolution.height
                )));
            }
        }
        if self.file_extension.is_empty() || self.file_extension.contains('.') {
            return Err(DomainError::BadArgs(format!(
                "Invalid output extension: '{}'",
                self.file_extension
            )));
        }
        for (field, value) in [
            ("output_directory", &self.output_directory),
            ("filename_prefix", &self.filename_prefix),
            ("temp_filename_prefix", &self.temp_filename_prefix),
        ] {
            if value.contains('/') || value.contains('\\') {
                return Err(DomainError::BadArgs(format!(
                    "{} must not contain path separators: '{}'",
                    field, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for ConversionProfile {
    fn default() -> Self {
        Self::coolpix_l25_high_quality()
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
