// Unit tests for format rules

use super::*;

fn no_type(_: &SourceRef) -> Option<String> {
    None
}

#[test]
fn test_legacy_extensions_are_accepted() {
    for name in ["clip.avi", "CLIP.MKV", "dir/movie.vob", "x.m2ts", "y.ogv"] {
        assert!(
            LegacyFormatHeuristic::is_likely_supported(&SourceRef::new(name), no_type),
            "{} should be plausible",
            name
        );
    }
}

#[test]
fn test_declared_media_type_fallback() {
    let source = SourceRef::new("/tmp/recording.bin");
    assert!(LegacyFormatHeuristic::is_likely_supported(&source, |_| Some(
        "video/x-unknown".to_string()
    )));
    assert!(LegacyFormatHeuristic::is_likely_supported(&source, |_| Some(
        "audio/amr".to_string()
    )));
    assert!(!LegacyFormatHeuristic::is_likely_supported(&source, |_| Some(
        "application/pdf".to_string()
    )));
}

#[test]
fn test_unknown_without_type_is_rejected() {
    let source = SourceRef::new("/tmp/notes.txt");
    assert!(!LegacyFormatHeuristic::is_likely_supported(&source, no_type));
}

#[test]
fn test_indirect_reference_uses_content_type_table() {
    let source = SourceRef::new("content://media/external/video/7");
    assert!(LegacyFormatHeuristic::is_likely_supported(&source, |_| Some(
        "video/x-msvideo".to_string()
    )));
    assert!(!LegacyFormatHeuristic::is_likely_supported(&source, no_type));
}

#[test]
fn test_indirect_reference_ignores_text_extension() {
    // The text after the last dot of a content URI is not an extension
    let source = SourceRef::new("content://com.example.provider/clip.avi");
    assert!(!LegacyFormatHeuristic::is_likely_supported(&source, |_| Some(
        "application/octet-stream".to_string()
    )));
}

#[test]
fn test_media_type_table() {
    assert_eq!(extension_for_mime("video/x-msvideo"), Some("avi"));
    assert_eq!(extension_for_mime("VIDEO/MP4"), Some("mp4"));
    assert_eq!(extension_for_mime("video/mp2t"), Some("ts"));
    assert_eq!(mime_for_extension(".MKV"), Some("video/x-matroska"));
    assert_eq!(mime_for_extension("xyz"), None);
}
