// Domain rules - Format heuristics and media-type tables

use crate::domain::model::SourceRef;

#[cfg(test)]
mod tests;

/// Containers the software encoder chain is known to demux
pub const LEGACY_EXTENSIONS: &[&str] = &[
    "avi", "mkv", "flv", "wmv", "mov", "vob", "mpg", "mpeg", "3gp", "asf", "divx", "m2ts", "mts",
    "ts", "webm", "ogv",
];

/// Extension to media-type table; first entry wins when mapping back from a type
const MEDIA_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("3gp", "video/3gpp"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("avi", "video/avi"),
    ("mj2", "video/mj2"),
    ("flv", "video/x-flv"),
    ("wmv", "video/x-ms-wmv"),
    ("asf", "video/x-ms-asf"),
    ("mov", "video/quicktime"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("vob", "video/dvd"),
    ("ts", "video/mp2t"),
    ("m2ts", "video/mp2t"),
    ("mts", "video/mp2t"),
    ("divx", "video/divx"),
    ("ogv", "video/ogg"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("opus", "audio/opus"),
    ("flac", "audio/flac"),
    ("wav", "audio/wav"),
];

/// Extension conventionally used for a media type
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    let mime_type = mime_type.trim().to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(_, mime)| *mime == mime_type)
        .map(|(extension, _)| *extension)
}

/// Media type conventionally declared for an extension
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

pub fn is_legacy_extension(extension: &str) -> bool {
    let extension = extension.to_ascii_lowercase();
    LEGACY_EXTENSIONS.contains(&extension.as_str())
}

/// Decides whether the software encoder is worth trying after the native path fails
///
/// Pure classification: nothing is probed or opened.
pub struct LegacyFormatHeuristic;

impl LegacyFormatHeuristic {
    pub fn is_likely_supported<F>(source: &SourceRef, content_type: F) -> bool
    where
        F: Fn(&SourceRef) -> Option<String>,
    {
        let extension = if source.is_indirect() {
            content_type(source)
                .as_deref()
                .and_then(extension_for_mime)
                .map(str::to_string)
        } else {
            source.extension()
        };

        if extension.as_deref().map(is_legacy_extension).unwrap_or(false) {
            return true;
        }

        match content_type(source) {
            Some(mime) => {
                let mime = mime.to_ascii_lowercase();
                mime.starts_with("video/") || mime.starts_with("audio/")
            }
            None => false,
        }
    }
}
