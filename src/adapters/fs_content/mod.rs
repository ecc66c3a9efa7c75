// Local content adapter - Resolves sources given as paths or file:// URIs

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::domain::errors::DomainError;
use crate::domain::model::SourceRef;
use crate::domain::rules::mime_for_extension;
use crate::ports::ContentPort;

/// Content resolver backed by the local filesystem
#[derive(Debug, Default, Clone)]
pub struct FsContentAdapter;

impl FsContentAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Path of a plain path or `file://` reference; `None` for other schemes
    pub fn resolve_path(source: &SourceRef) -> Option<PathBuf> {
        match source.scheme() {
            None => Some(PathBuf::from(source.as_str())),
            Some(scheme) if scheme.eq_ignore_ascii_case(SourceRef::FILE_SCHEME) => {
                let rest = &source.as_str()[scheme.len() + "://".len()..];
                let rest = rest.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
                // file://host/path is not supported; only the empty authority
                let path = rest.strip_prefix("localhost").unwrap_or(rest);
                if !path.starts_with('/') {
                    return None;
                }
                percent_decode(path).map(|decoded| {
                    // file:///C:/clips/a.avi on Windows
                    if cfg!(windows) && decoded.len() > 2 && decoded.as_bytes()[2] == b':' {
                        PathBuf::from(&decoded[1..])
                    } else {
                        PathBuf::from(decoded)
                    }
                })
            }
            Some(_) => None,
        }
    }

    fn require_path(source: &SourceRef) -> Result<PathBuf, DomainError> {
        Self::resolve_path(source).ok_or_else(|| {
            DomainError::PermissionDenied(format!("no local access to {}", source))
        })
    }
}

fn percent_decode(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = text.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl ContentPort for FsContentAdapter {
    async fn grant_read_access(&self, source: &SourceRef) -> Result<(), DomainError> {
        let path = Self::require_path(source)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| DomainError::PermissionDenied(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(DomainError::PermissionDenied(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        tokio::fs::File::open(&path)
            .await
            .map_err(|e| DomainError::PermissionDenied(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    fn content_type(&self, source: &SourceRef) -> Option<String> {
        let path = Self::resolve_path(source)?;
        let extension = path.extension()?.to_str()?;
        mime_for_extension(extension).map(str::to_string)
    }

    async fn open_read(
        &self,
        source: &SourceRef,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, DomainError> {
        let path = Self::require_path(source)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| DomainError::FsFail(format!("{}: {}", path.display(), e)))?;
        Ok(Box::new(file))
    }

    fn local_path(&self, source: &SourceRef) -> Option<PathBuf> {
        Self::resolve_path(source)
    }
}
