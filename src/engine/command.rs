//! Software encoder command line derived from a conversion profile

use std::fmt::Write as _;
use std::path::Path;

use crate::domain::model::{ConversionProfile, RateControl, VideoTune};

/// Builds the argument string handed to the software encoder
///
/// The output is deterministic for a given profile and pair of paths.
pub struct LegacyCommand<'a> {
    profile: &'a ConversionProfile,
    input: &'a Path,
    output: &'a Path,
}

impl<'a> LegacyCommand<'a> {
    pub fn new(profile: &'a ConversionProfile, input: &'a Path, output: &'a Path) -> Self {
        Self {
            profile,
            input,
            output,
        }
    }

    pub fn build(&self) -> String {
        let profile = self.profile;
        let mut cmd = String::with_capacity(256);

        let _ = write!(cmd, "-y -i \"{}\" ", self.input.display());
        let _ = write!(cmd, "-c:v {} ", profile.video_codec.legacy_encoder());
        let _ = write!(cmd, "-preset {} ", profile.encoder_preset.as_str());
        if profile.tune != VideoTune::Untuned {
            let _ = write!(cmd, "-tune {} ", profile.tune.as_str());
        }
        let _ = write!(cmd, "-pix_fmt {} ", profile.pixel_format.as_str());

        if let Some(resolution) = profile.target_resolution {
            let _ = write!(
                cmd,
                "-vf \"scale={}:{}\" ",
                resolution.width, resolution.height
            );
        }

        match profile.rate_control() {
            RateControl::Quality(crf) => {
                let _ = write!(cmd, "-crf {} ", crf);
            }
            RateControl::Bitrate(bitrate) => {
                let bufsize = u64::from(bitrate) * 2;
                let _ = write!(
                    cmd,
                    "-b:v {} -maxrate {} -bufsize {} ",
                    bitrate, bitrate, bufsize
                );
            }
        }

        if let Some(fps) = profile.forced_fps() {
            let _ = write!(cmd, "-r {} ", decimal(fps));
        }

        let _ = write!(
            cmd,
            "-force_key_frames \"expr:gte(t,n_forced*{})\" ",
            decimal(f64::from(profile.keyframe_interval))
        );

        let _ = write!(cmd, "-c:a {} ", profile.audio_codec.legacy_encoder());
        let _ = write!(cmd, "-b:a {} ", profile.audio_bitrate);
        if let Some(rate) = profile.forced_sample_rate() {
            let _ = write!(cmd, "-ar {} ", rate);
        }

        let _ = write!(cmd, "\"{}\"", self.output.display());
        cmd
    }
}

/// Shortest decimal form with at least one fractional digit
fn decimal(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{}.0", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::*;

    fn build(profile: &ConversionProfile) -> String {
        LegacyCommand::new(
            profile,
            Path::new("/tmp/ffmpeg_raw_1"),
            Path::new("/tmp/processing_1.mp4"),
        )
        .build()
    }

    #[test]
    fn test_coolpix_command() {
        let profile = ConversionProfile::coolpix_l25_high_quality();
        assert_eq!(
            build(&profile),
            "-y -i \"/tmp/ffmpeg_raw_1\" -c:v libx264 -preset veryslow -tune stillimage \
             -pix_fmt yuv420p -crf 12 -force_key_frames \"expr:gte(t,n_forced*1.0)\" \
             -c:a aac -b:a 192000 -ar 48000 \"/tmp/processing_1.mp4\""
        );
    }

    #[test]
    fn test_bitrate_command_with_scale_and_fps() {
        let profile = ConversionProfile::standard_720p();
        assert_eq!(
            build(&profile),
            "-y -i \"/tmp/ffmpeg_raw_1\" -c:v libx264 -preset medium -tune film \
             -pix_fmt yuv420p -vf \"scale=1280:720\" -b:v 5000000 -maxrate 5000000 \
             -bufsize 10000000 -r 29.97 -force_key_frames \"expr:gte(t,n_forced*2.0)\" \
             -c:a aac -b:a 128000 -ar 44100 \"/tmp/processing_1.mp4\""
        );
    }

    #[test]
    fn test_crf_excludes_bitrate_flags() {
        let mut profile = ConversionProfile::standard_720p();
        profile.crf = Some(18);
        let cmd = build(&profile);
        assert!(cmd.contains("-crf 18 "));
        assert!(!cmd.contains("-b:v"));
        assert!(!cmd.contains("-maxrate"));
        assert!(!cmd.contains("-bufsize"));
    }

    #[test]
    fn test_untuned_profile_omits_tune() {
        let mut profile = ConversionProfile::coolpix_l25_high_quality();
        profile.tune = VideoTune::Untuned;
        let cmd = build(&profile);
        assert!(!cmd.contains("-tune"));
        assert!(cmd.contains("-preset veryslow -pix_fmt yuv420p"));
    }

    #[test]
    fn test_codec_mapping_table() {
        let cases = [
            (VideoCodec::H264, "libx264"),
            (VideoCodec::H265, "libx265"),
            (VideoCodec::Vp9, "libvpx-vp9"),
            (VideoCodec::Av1, "libaom-av1"),
            (VideoCodec::Other("video/mp4v-es".into()), "mpeg4"),
        ];
        for (codec, encoder) in cases {
            let mut profile = ConversionProfile::default();
            profile.video_codec = codec;
            assert!(build(&profile).contains(&format!("-c:v {} ", encoder)));
        }

        let cases = [
            (AudioCodec::Aac, "aac"),
            (AudioCodec::Mp3, "libmp3lame"),
            (AudioCodec::Vorbis, "libvorbis"),
            (AudioCodec::Opus, "libopus"),
            (AudioCodec::Flac, "flac"),
            (AudioCodec::Other("audio/amr-wb".into()), "copy"),
        ];
        for (codec, encoder) in cases {
            let mut profile = ConversionProfile::default();
            profile.audio_codec = codec;
            assert!(build(&profile).contains(&format!("-c:a {} ", encoder)));
        }
    }

    #[test]
    fn test_bufsize_does_not_overflow() {
        let mut profile = ConversionProfile::standard_720p();
        profile.video_bitrate = u32::MAX;
        assert!(build(&profile).contains("-bufsize 8589934590 "));
    }

    #[test]
    fn test_decimal_formatting() {
        assert_eq!(decimal(1.0), "1.0");
        assert_eq!(decimal(0.5), "0.5");
        assert_eq!(decimal(60.0), "60.0");
        assert_eq!(decimal(23.976), "23.976");
    }
}
