// Directory media store - User-visible outputs kept under a media root

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::ports::{MediaHandle, MediaStorePort};

/// Prefix hiding an entry until it is finalized
pub const PENDING_PREFIX: &str = ".pending-";

/// Numbered variants tried before giving up on a taken name
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Media store laid out as `<root>/<relative_path>/<display_name>`
#[derive(Debug, Clone)]
pub struct DirectoryMediaStore {
    root: PathBuf,
}

impl DirectoryMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pending_path(handle: &MediaHandle) -> Result<PathBuf, DomainError> {
        let path = PathBuf::from(&handle.uri);
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| name.starts_with(PENDING_PREFIX))
            .ok_or_else(|| {
                DomainError::PersistFailure(format!("not a pending entry: {}", handle.uri))
            })?;
        if name.len() == PENDING_PREFIX.len() {
            return Err(DomainError::PersistFailure(format!("empty entry name: {}", handle.uri)));
        }
        Ok(path)
    }
}

/// `clip.mp4`, then `clip (1).mp4`, `clip (2).mp4`, ...
fn numbered_name(display_name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return display_name.to_string();
    }
    match display_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, attempt, ext),
        _ => format!("{} ({})", display_name, attempt),
    }
}

/// Relative paths may only descend
fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn persist_error(path: &Path, e: std::io::Error) -> DomainError {
    DomainError::PersistFailure(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl MediaStorePort for DirectoryMediaStore {
    async fn insert_pending(
        &self,
        display_name: &str,
        mime_type: &str,
        relative_path: &str,
    ) -> Result<MediaHandle, DomainError> {
        let relative = Path::new(relative_path);
        if !is_plain_relative(relative)
            || display_name.is_empty()
            || display_name.contains(|c: char| c == '/' || c == '\\')
        {
            return Err(DomainError::PersistFailure(format!(
                "invalid media entry {}/{}",
                relative_path, display_name
            )));
        }

        let directory = self.root.join(relative);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| persist_error(&directory, e))?;
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = numbered_name(display_name, attempt);
            if tokio::fs::try_exists(directory.join(&name)).await.unwrap_or(false) {
                continue;
            }
            let pending = directory.join(format!("{}{}", PENDING_PREFIX, name));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&pending)
                .await
            {
                Ok(_) => {
                    debug!("Created pending media entry {}", pending.display());
                    return Ok(MediaHandle {
                        uri: pending.to_string_lossy().into_owned(),
                        display_name: name,
                        mime_type: mime_type.to_string(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(persist_error(&pending, e)),
            }
        }
        Err(DomainError::PersistFailure(format!(
            "no free name for {} in {}",
            display_name,
            directory.display()
        )))
    }

    async fn open_write(
        &self,
        handle: &MediaHandle,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>, DomainError> {
        let pending = Self::pending_path(handle)?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&pending)
            .await
            .map_err(|e| persist_error(&pending, e))?;
        Ok(Box::new(file))
    }

    async fn finalize(&self, handle: &MediaHandle) -> Result<String, DomainError> {
        let pending = Self::pending_path(handle)?;
        // Linking fails on a taken name, so a published entry is never replaced
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let visible = pending.with_file_name(numbered_name(&handle.display_name, attempt));
            match tokio::fs::hard_link(&pending, &visible).await {
                Ok(()) => {
                    tokio::fs::remove_file(&pending)
                        .await
                        .map_err(|e| persist_error(&pending, e))?;
                    return Ok(visible.to_string_lossy().into_owned());
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("{} is taken", visible.display());
                }
                Err(e) => return Err(persist_error(&visible, e)),
            }
        }
        Err(DomainError::PersistFailure(format!(
            "no free name for {}",
            handle.display_name
        )))
    }

    async fn delete(&self, handle: &MediaHandle) -> Result<(), DomainError> {
        let pending = Self::pending_path(handle)?;
        match tokio::fs::remove_file(&pending).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(persist_error(&pending, e)),
        }
    }
}
