//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use av_converter::app::convert_interactor::{ConvertDependencies, ConvertInteractor};
use av_converter::app::publisher::StateObserver;
use av_converter::domain::errors::DomainError;
use av_converter::domain::model::{ConversionProfile, PresentationState, SourceRef};
use av_converter::engine::StatusStream;
use av_converter::ports::*;

pub const COMPONENT_ID: &str = "ffmpeg_feature";

/// Content resolver with declared types and in-memory bytes
#[derive(Default)]
pub struct FakeContent {
    pub types: Mutex<HashMap<String, String>>,
    pub denied: Mutex<HashSet<String>>,
}

impl FakeContent {
    pub fn with_type(self, source: &str, content_type: &str) -> Self {
        self.types
            .lock()
            .unwrap()
            .insert(source.to_string(), content_type.to_string());
        self
    }

    pub fn deny(self, source: &str) -> Self {
        self.denied.lock().unwrap().insert(source.to_string());
        self
    }
}

#[async_trait]
impl ContentPort for FakeContent {
    async fn grant_read_access(&self, source: &SourceRef) -> Result<(), DomainError> {
        if self.denied.lock().unwrap().contains(source.as_str()) {
            return Err(DomainError::PermissionDenied(source.to_string()));
        }
        Ok(())
    }

    fn content_type(&self, source: &SourceRef) -> Option<String> {
        self.types.lock().unwrap().get(source.as_str()).cloned()
    }

    async fn open_read(
        &self,
        source: &SourceRef,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, DomainError> {
        Ok(Box::new(std::io::Cursor::new(
            format!("bytes of {}", source).into_bytes(),
        )))
    }

    fn local_path(&self, _source: &SourceRef) -> Option<PathBuf> {
        None
    }
}

/// What a scripted encoder does for one source
#[derive(Clone, Debug)]
pub enum Script {
    /// Report the given fractions, write the output, complete
    Succeed(Vec<f32>),
    Fail(DomainError),
    /// Never finish; records cancellation when the stream is dropped
    Hang,
}

/// Encoder whose behavior is looked up by source reference
pub struct ScriptedEncoder {
    pub name: &'static str,
    scripts: Mutex<HashMap<String, Script>>,
    default: Script,
    pub calls: Mutex<Vec<String>>,
    pub cancelled: Arc<AtomicUsize>,
}

impl ScriptedEncoder {
    pub fn new(name: &'static str, default: Script) -> Self {
        Self {
            name,
            scripts: Mutex::new(HashMap::new()),
            default,
            calls: Mutex::new(Vec::new()),
            cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn script(self, source: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(source.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl EncoderPort for ScriptedEncoder {
    fn convert(
        &self,
        source: &SourceRef,
        destination: &Path,
        _profile: &ConversionProfile,
    ) -> StatusStream {
        self.calls.lock().unwrap().push(source.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(source.as_str())
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        let (emitter, mut stream) = StatusStream::channel();
        let token = stream.cancellation_token();
        let destination = destination.to_path_buf();
        let cancelled = Arc::clone(&self.cancelled);
        let name = self.name;

        let task = tokio::spawn(async move {
            match script {
                Script::Succeed(fractions) => {
                    for fraction in fractions {
                        emitter.progress(fraction);
                        tokio::task::yield_now().await;
                    }
                    tokio::fs::write(&destination, name.as_bytes()).await.unwrap();
                    emitter.complete(destination.to_string_lossy());
                }
                Script::Fail(error) => emitter.fail(error),
                Script::Hang => {
                    let _guard = DropCounter(cancelled);
                    token.cancelled().await;
                }
            }
        });
        stream.attach(task);
        stream
    }
}

/// Counts teardowns of a hanging conversion
struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Installer with an in-memory installed flag
pub struct FakeInstaller {
    pub installed: Arc<AtomicBool>,
    pub fail: bool,
    pub install_calls: AtomicUsize,
    listeners: Mutex<HashMap<ListenerId, InstallListener>>,
    next_id: AtomicUsize,
}

impl FakeInstaller {
    pub fn new(installed: bool) -> Self {
        Self {
            installed: Arc::new(AtomicBool::new(installed)),
            fail: false,
            install_calls: AtomicUsize::new(0),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(false)
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn notify(&self, status: InstallStatus, bytes: u64) {
        let listeners: Vec<InstallListener> =
            self.listeners.lock().unwrap().values().cloned().collect();
        let progress = InstallProgress {
            status,
            bytes_downloaded: bytes,
            total_bytes: Some(100),
        };
        for listener in listeners {
            listener(&progress);
        }
    }
}

#[async_trait]
impl InstallerPort for FakeInstaller {
    fn is_installed(&self, component_id: &str) -> bool {
        component_id == COMPONENT_ID && self.installed.load(Ordering::SeqCst)
    }

    fn register_listener(&self, listener: InstallListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst) as u64);
        self.listeners.lock().unwrap().insert(id, listener);
        id
    }

    fn unregister_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().remove(&id);
    }

    async fn install(&self, _component_id: &str) -> Result<(), DomainError> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        self.notify(InstallStatus::Downloading, 50);
        tokio::time::sleep(Duration::from_millis(5)).await;
        if self.fail {
            self.notify(InstallStatus::Failed, 50);
            return Err(DomainError::InstallFailure("network unreachable".to_string()));
        }
        self.notify(InstallStatus::Downloading, 100);
        self.installed.store(true, Ordering::SeqCst);
        self.notify(InstallStatus::Installed, 100);
        Ok(())
    }
}

/// Legacy provider gated on the fake installer's flag
pub struct FakeLegacyProvider {
    pub installed: Arc<AtomicBool>,
    pub encoder: Arc<ScriptedEncoder>,
}

impl LegacyEncoderProvider for FakeLegacyProvider {
    fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    fn resolve(&self) -> Option<Arc<dyn EncoderPort>> {
        if self.is_installed() {
            Some(Arc::clone(&self.encoder) as Arc<dyn EncoderPort>)
        } else {
            None
        }
    }
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

/// Media store keeping finalized entries in memory
#[derive(Default)]
pub struct MemoryMediaStore {
    pending: Mutex<HashMap<String, Arc<Mutex<Vec<u8>>>>>,
    pub finalized: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryMediaStore {
    pub fn finalized_contents(&self) -> Vec<String> {
        self.finalized
            .lock()
            .unwrap()
            .iter()
            .map(|(_, bytes)| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }
}

#[async_trait]
impl MediaStorePort for MemoryMediaStore {
    async fn insert_pending(
        &self,
        display_name: &str,
        mime_type: &str,
        relative_path: &str,
    ) -> Result<MediaHandle, DomainError> {
        let uri = format!("memory://{}/{}", relative_path, display_name);
        self.pending
            .lock()
            .unwrap()
            .insert(uri.clone(), Arc::new(Mutex::new(Vec::new())));
        Ok(MediaHandle {
            uri,
            display_name: display_name.to_string(),
            mime_type: mime_type.to_string(),
        })
    }

    async fn open_write(
        &self,
        handle: &MediaHandle,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>, DomainError> {
        let bytes = self
            .pending
            .lock()
            .unwrap()
            .get(&handle.uri)
            .cloned()
            .ok_or_else(|| DomainError::PersistFailure(handle.uri.clone()))?;
        Ok(Box::new(SharedWriter(bytes)))
    }

    async fn finalize(&self, handle: &MediaHandle) -> Result<String, DomainError> {
        let bytes = self
            .pending
            .lock()
            .unwrap()
            .remove(&handle.uri)
            .ok_or_else(|| DomainError::PersistFailure(handle.uri.clone()))?;
        let contents = bytes.lock().unwrap().clone();
        self.finalized
            .lock()
            .unwrap()
            .push((handle.uri.clone(), contents));
        Ok(handle.uri.clone())
    }

    async fn delete(&self, handle: &MediaHandle) -> Result<(), DomainError> {
        self.pending.lock().unwrap().remove(&handle.uri);
        Ok(())
    }
}

/// Records every published state in order
#[derive(Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<PresentationState>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<PresentationState> {
        self.states.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels: Vec<&'static str> = Vec::new();
        for state in self.states() {
            if labels.last() != Some(&state.label()) {
                labels.push(state.label());
            }
        }
        labels
    }
}

impl StateObserver for RecordingObserver {
    fn on_state(&self, state: &PresentationState) {
        self.states.lock().unwrap().push(state.clone());
    }
}

/// Orchestrator wired to fakes
pub struct Harness {
    pub interactor: ConvertInteractor,
    pub content: Arc<FakeContent>,
    pub native: Arc<ScriptedEncoder>,
    pub legacy: Arc<ScriptedEncoder>,
    pub installer: Arc<FakeInstaller>,
    pub store: Arc<MemoryMediaStore>,
    pub observer: Arc<RecordingObserver>,
    pub temp_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(
        content: FakeContent,
        native: ScriptedEncoder,
        legacy: ScriptedEncoder,
        installer: FakeInstaller,
    ) -> Self {
        let content = Arc::new(content);
        let native = Arc::new(native);
        let legacy = Arc::new(legacy);
        let installer = Arc::new(installer);
        let store = Arc::new(MemoryMediaStore::default());
        let observer = Arc::new(RecordingObserver::default());
        let temp_dir = tempfile::tempdir().unwrap();

        let provider = Arc::new(FakeLegacyProvider {
            installed: Arc::clone(&installer.installed),
            encoder: Arc::clone(&legacy),
        });
        let interactor = ConvertInteractor::new(
            ConvertDependencies {
                content: Arc::clone(&content) as Arc<dyn ContentPort>,
                native: Arc::clone(&native) as Arc<dyn EncoderPort>,
                legacy: provider,
                installer: Arc::clone(&installer) as Arc<dyn InstallerPort>,
                media_store: Arc::clone(&store) as Arc<dyn MediaStorePort>,
                component_id: COMPONENT_ID.to_string(),
            },
            ConversionProfile::coolpix_l25_high_quality(),
            temp_dir.path().join("work"),
        );
        interactor.add_observer(Arc::clone(&observer) as Arc<dyn StateObserver>);

        Self {
            interactor,
            content,
            native,
            legacy,
            installer,
            store,
            observer,
            temp_dir,
        }
    }

    /// Files left behind in the scratch directory
    pub fn leftover_temp_files(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path().join("work"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn sources(names: &[&str]) -> Vec<SourceRef> {
    names.iter().map(|name| SourceRef::new(*name)).collect()
}

pub fn native_failure() -> DomainError {
    DomainError::native("hardware encoder rejected input")
}
