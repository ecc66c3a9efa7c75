// Component directory adapter - Installs components by copying them from a delivery directory

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::errors::DomainError;
use crate::ports::{InstallListener, InstallProgress, InstallStatus, InstallerPort, ListenerId};

/// Marker written once a component is completely in place
pub const INSTALLED_MARKER: &str = ".installed";

const COPY_CHUNK: usize = 64 * 1024;

type ListenerMap = Arc<Mutex<HashMap<ListenerId, InstallListener>>>;

/// Installer that delivers `<source_root>/<id>` into `<root>/<id>`
pub struct ComponentDirInstaller {
    root: PathBuf,
    source_root: PathBuf,
    listeners: ListenerMap,
    next_id: AtomicU64,
}

impl ComponentDirInstaller {
    pub fn new(root: impl Into<PathBuf>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            source_root: source_root.into(),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Directory a component is installed into
    pub fn component_dir(&self, component_id: &str) -> PathBuf {
        self.root.join(component_id)
    }

    fn validate_id(component_id: &str) -> Result<(), DomainError> {
        let valid = !component_id.is_empty()
            && component_id != "."
            && component_id != ".."
            && !component_id.contains(|c: char| c == '/' || c == '\\');
        if valid {
            Ok(())
        } else {
            Err(DomainError::BadArgs(format!(
                "invalid component id: {:?}",
                component_id
            )))
        }
    }
}

/// Delivers progress to every registered listener
#[derive(Clone)]
struct Notifier {
    listeners: ListenerMap,
}

impl Notifier {
    fn notify(&self, status: InstallStatus, bytes_downloaded: u64, total_bytes: Option<u64>) {
        let progress = InstallProgress {
            status,
            bytes_downloaded,
            total_bytes,
        };
        // Snapshot so listeners may unregister themselves
        let listeners: Vec<InstallListener> = match self.listeners.lock() {
            Ok(map) => map.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        };
        for listener in listeners {
            listener(&progress);
        }
    }
}

#[async_trait]
impl InstallerPort for ComponentDirInstaller {
    fn is_installed(&self, component_id: &str) -> bool {
        Self::validate_id(component_id).is_ok()
            && self.component_dir(component_id).join(INSTALLED_MARKER).is_file()
    }

    fn register_listener(&self, listener: InstallListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.listeners.lock() {
            Ok(mut map) => map.insert(id, listener),
            Err(poisoned) => poisoned.into_inner().insert(id, listener),
        };
        id
    }

    fn unregister_listener(&self, id: ListenerId) {
        match self.listeners.lock() {
            Ok(mut map) => map.remove(&id),
            Err(poisoned) => poisoned.into_inner().remove(&id),
        };
    }

    async fn install(&self, component_id: &str) -> Result<(), DomainError> {
        Self::validate_id(component_id)?;
        let notifier = Notifier {
            listeners: Arc::clone(&self.listeners),
        };
        notifier.notify(InstallStatus::Pending, 0, None);

        let source = self.source_root.join(component_id);
        let root = self.root.clone();
        let id = component_id.to_string();
        let worker_notifier = notifier.clone();
        info!("Installing component {} from {}", component_id, source.display());

        let result = tokio::task::spawn_blocking(move || {
            copy_component(&source, &root, &id, &worker_notifier)
        })
        .await
        .map_err(|e| DomainError::InstallFailure(format!("install task failed: {}", e)))
        .and_then(|result| result);

        if let Err(e) = &result {
            warn!("Installing component {} failed: {}", component_id, e);
            notifier.notify(InstallStatus::Failed, 0, None);
        }
        result
    }
}

fn install_error(context: &Path, e: impl std::fmt::Display) -> DomainError {
    DomainError::InstallFailure(format!("{}: {}", context.display(), e))
}

fn copy_component(
    source: &Path,
    root: &Path,
    component_id: &str,
    notifier: &Notifier,
) -> Result<(), DomainError> {
    if !source.is_dir() {
        return Err(DomainError::InstallFailure(format!(
            "component {} is not available at {}",
            component_id,
            source.display()
        )));
    }

    let mut entries = Vec::new();
    let mut total_bytes = 0u64;
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| install_error(source, e))?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata().map_err(|e| install_error(entry.path(), e))?;
            total_bytes += metadata.len();
        }
        entries.push(entry);
    }
    debug!("Component {}: {} entries, {} bytes", component_id, entries.len(), total_bytes);

    fs::create_dir_all(root).map_err(|e| install_error(root, e))?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(root)
        .map_err(|e| install_error(root, e))?;

    let mut copied = 0u64;
    notifier.notify(InstallStatus::Downloading, copied, Some(total_bytes));
    for entry in &entries {
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| install_error(entry.path(), e))?;
        let target = staging.path().join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| install_error(&target, e))?;
            continue;
        }
        if !entry.file_type().is_file() {
            debug!("Skipping non-file entry {}", entry.path().display());
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| install_error(parent, e))?;
        }
        let mut reader = fs::File::open(entry.path()).map_err(|e| install_error(entry.path(), e))?;
        let mut writer = fs::File::create(&target).map_err(|e| install_error(&target, e))?;
        let mut buffer = vec![0u8; COPY_CHUNK];
        loop {
            let read = reader
                .read(&mut buffer)
                .map_err(|e| install_error(entry.path(), e))?;
            if read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..read])
                .map_err(|e| install_error(&target, e))?;
            copied += read as u64;
            notifier.notify(InstallStatus::Downloading, copied, Some(total_bytes));
        }
        writer.flush().map_err(|e| install_error(&target, e))?;

        let permissions = entry
            .metadata()
            .map_err(|e| install_error(entry.path(), e))?
            .permissions();
        fs::set_permissions(&target, permissions).map_err(|e| install_error(&target, e))?;
    }

    notifier.notify(InstallStatus::Installing, copied, Some(total_bytes));
    let marker = staging.path().join(INSTALLED_MARKER);
    fs::write(&marker, component_id).map_err(|e| install_error(&marker, e))?;

    let destination = root.join(component_id);
    if destination.exists() {
        fs::remove_dir_all(&destination).map_err(|e| install_error(&destination, e))?;
    }
    let staged = staging.into_path();
    if let Err(e) = fs::rename(&staged, &destination) {
        let _ = fs::remove_dir_all(&staged);
        return Err(install_error(&destination, e));
    }

    info!("Component {} installed into {}", component_id, destination.display());
    notifier.notify(InstallStatus::Installed, copied, Some(total_bytes));
    Ok(())
}
