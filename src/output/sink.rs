//! Copies completed temp outputs into the media store

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::ConversionProfile;
use crate::ports::{MediaHandle, MediaStorePort};
use crate::utils::time::unix_millis;
use crate::utils::TempFileGuard;

/// Top-level collection outputs are filed under
pub const MEDIA_COLLECTION: &str = "Movies";

/// Persists finished conversions; the temp file is always removed
pub struct OutputSink {
    store: Arc<dyn MediaStorePort>,
}

impl OutputSink {
    pub fn new(store: Arc<dyn MediaStorePort>) -> Self {
        Self { store }
    }

    /// Final location of the stored entry, or `None` when persisting failed
    pub async fn persist(&self, temp: &Path, profile: &ConversionProfile) -> Option<String> {
        let _temp_guard = TempFileGuard::new(temp);

        let display_name = format!(
            "{}{}.{}",
            profile.filename_prefix,
            unix_millis(),
            profile.file_extension
        );
        let relative_path = format!("{}/{}", MEDIA_COLLECTION, profile.output_directory);

        let handle = match self
            .store
            .insert_pending(&display_name, &profile.output_mime_type, &relative_path)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Could not create media entry {}: {}", display_name, e);
                return None;
            }
        };

        match self.write_and_finalize(temp, &handle).await {
            Ok(location) => {
                info!("Saved {} to {}", handle.display_name, location);
                Some(location)
            }
            Err(e) => {
                warn!("Failed to persist {}: {}", display_name, e);
                if let Err(delete_err) = self.store.delete(&handle).await {
                    warn!("Could not delete media entry {}: {}", handle.uri, delete_err);
                }
                None
            }
        }
    }

    async fn write_and_finalize(
        &self,
        temp: &Path,
        handle: &MediaHandle,
    ) -> Result<String, DomainError> {
        let mut reader = tokio::fs::File::open(temp)
            .await
            .map_err(|e| DomainError::PersistFailure(format!("{}: {}", temp.display(), e)))?;
        let mut writer = self.store.open_write(handle).await?;
        tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| DomainError::PersistFailure(e.to_string()))?;
        writer
            .shutdown()
            .await
            .map_err(|e| DomainError::PersistFailure(e.to_string()))?;
        drop(writer);
        self.store.finalize(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::io::AsyncWrite;

    #[derive(Default)]
    struct MemoryStore {
        inserted: Mutex<Vec<(String, String, String)>>,
        deleted: Mutex<Vec<String>>,
        fail_finalize: bool,
        bytes: Arc<Mutex<Vec<u8>>>,
    }

    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl AsyncWrite for SharedWriter {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            self.0.lock().unwrap().extend_from_slice(buf);
            std::task::Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[async_trait]
    impl MediaStorePort for MemoryStore {
        async fn insert_pending(
            &self,
            display_name: &str,
            mime_type: &str,
            relative_path: &str,
        ) -> Result<MediaHandle, DomainError> {
            self.inserted.lock().unwrap().push((
                display_name.to_string(),
                mime_type.to_string(),
                relative_path.to_string(),
            ));
            Ok(MediaHandle {
                uri: format!("memory://{}", display_name),
                display_name: display_name.to_string(),
                mime_type: mime_type.to_string(),
            })
        }

        async fn open_write(
            &self,
            _handle: &MediaHandle,
        ) -> Result<Box<dyn AsyncWrite + Send + Unpin>, DomainError> {
            Ok(Box::new(SharedWriter(Arc::clone(&self.bytes))))
        }

        async fn finalize(&self, handle: &MediaHandle) -> Result<String, DomainError> {
            if self.fail_finalize {
                return Err(DomainError::PersistFailure("store full".to_string()));
            }
            Ok(handle.uri.clone())
        }

        async fn delete(&self, handle: &MediaHandle) -> Result<(), DomainError> {
            self.deleted.lock().unwrap().push(handle.uri.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_persist_names_entry_and_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("processing_1.mp4");
        std::fs::write(&temp, b"encoded").unwrap();

        let store = Arc::new(MemoryStore::default());
        let sink = OutputSink::new(store.clone());
        let profile = ConversionProfile::coolpix_l25_high_quality();

        let location = sink.persist(&temp, &profile).await.unwrap();
        assert!(location.starts_with("memory://Coolpix_L25_"));
        assert!(location.ends_with(".mp4"));
        assert!(!temp.exists());
        assert_eq!(*store.bytes.lock().unwrap(), b"encoded".to_vec());

        let inserted = store.inserted.lock().unwrap();
        assert_eq!(inserted[0].1, "video/mp4");
        assert_eq!(inserted[0].2, "Movies/CoolpixExports");
    }

    #[tokio::test]
    async fn test_failed_persist_deletes_entry_and_temp() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("processing_2.mp4");
        std::fs::write(&temp, b"encoded").unwrap();

        let store = Arc::new(MemoryStore {
            fail_finalize: true,
            ..Default::default()
        });
        let sink = OutputSink::new(store.clone());

        assert!(sink
            .persist(&temp, &ConversionProfile::default())
            .await
            .is_none());
        assert!(!temp.exists());
        assert_eq!(store.deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_temp_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::default());
        let sink = OutputSink::new(store.clone());

        assert!(sink
            .persist(&dir.path().join("gone.mp4"), &ConversionProfile::default())
            .await
            .is_none());
        assert_eq!(store.deleted.lock().unwrap().len(), 1);
    }
}
