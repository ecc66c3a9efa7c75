// Domain models - Core types and data structures

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod profile;

pub use profile::*;


/// Opaque reference to a user-selected source file
///
/// Either a plain filesystem path or a URI such as `file:///videos/a.avi`.
/// Indirect references (`content://…`) carry no usable extension and are
/// resolved through their content type instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef(String);

impl SourceRef {
    pub const CONTENT_SCHEME: &'static str = "content";
    pub const FILE_SCHEME: &'static str = "file";

    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI scheme, if the reference is a URI
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.0.split_once("://")?;
        let valid = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then_some(scheme)
    }

    /// Whether the reference must be resolved through a content-access layer
    pub fn is_indirect(&self) -> bool {
        self.scheme()
            .map(|scheme| scheme.eq_ignore_ascii_case(Self::CONTENT_SCHEME))
            .unwrap_or(false)
    }

    /// Extension of the last path segment, lowercased, ignoring query and fragment
    pub fn extension(&self) -> Option<String> {
        let without_fragment = self.0.split('#').next().unwrap_or_default();
        let without_query = without_fragment.split('?').next().unwrap_or_default();
        let segment = without_query
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or_default();
        let (stem, extension) = segment.rsplit_once('.')?;
        if stem.is_empty() && !segment.starts_with('.') {
            return None;
        }
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(extension.to_ascii_lowercase())
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Event emitted by an encoder adapter
///
/// Failures are not a status: they travel on the error side of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionStatus {
    Progress { fraction: f32 },
    Completed { output_location: String },
}

impl ConversionStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, ConversionStatus::Completed { .. })
    }
}

/// Published, read-only view of the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PresentationState {
    Idle,
    Loading {
        progress: f32,
        /// 1-based index of the item being converted
        current_index: usize,
        total: usize,
    },
    LegacyFormatDetected {
        reason: String,
    },
    /// `None` means the download size is not known yet
    DownloadingComponent {
        progress: Option<f32>,
    },
    Success {
        count: usize,
    },
    Error {
        message: String,
    },
}

impl PresentationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PresentationState::Success { .. } | PresentationState::Error { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            PresentationState::Idle => "idle",
            PresentationState::Loading { .. } => "loading",
            PresentationState::LegacyFormatDetected { .. } => "legacy_format_detected",
            PresentationState::DownloadingComponent { .. } => "downloading_component",
            PresentationState::Success { .. } => "success",
            PresentationState::Error { .. } => "error",
        }
    }
}

impl Default for PresentationState {
    fn default() -> Self {
        PresentationState::Idle
    }
}

/// Orchestrator-owned progress through a submitted batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchState {
    sources: Vec<SourceRef>,
    cursor: usize,
    legacy_sticky: bool,
    processed: usize,
}

impl BatchState {
    pub fn new(sources: Vec<SourceRef>) -> Self {
        Self {
            sources,
            cursor: 0,
            legacy_sticky: false,
            processed: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.sources.len()
    }

    /// Index of the next item to convert
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&SourceRef> {
        self.sources.get(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.sources.len()
    }

    /// Mark the current item processed and move to the next one
    pub fn advance(&mut self) {
        if !self.is_exhausted() {
            self.cursor += 1;
            self.processed += 1;
        }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn is_legacy_sticky(&self) -> bool {
        self.legacy_sticky
    }

    /// Route every remaining item through the legacy path; never reverts
    pub fn enter_legacy_mode(&mut self) {
        self.legacy_sticky = true;
    }
}
