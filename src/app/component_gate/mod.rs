// Component gate - Installs the legacy encoder component on demand

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::app::publisher::StatePublisher;
use crate::domain::model::PresentationState;
use crate::ports::{InstallListener, InstallProgress, InstallStatus, InstallerPort, ListenerId};

/// Ensures the legacy component is present, reporting download progress
pub struct ComponentGate {
    installer: Arc<dyn InstallerPort>,
    component_id: String,
    publisher: StatePublisher,
    install_lock: Mutex<()>,
}

/// Unregisters an installation listener when dropped
struct ListenerRegistration {
    installer: Arc<dyn InstallerPort>,
    id: ListenerId,
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        debug!("Unregistering install listener {:?}", self.id);
        self.installer.unregister_listener(self.id);
    }
}

impl ComponentGate {
    pub fn new(
        installer: Arc<dyn InstallerPort>,
        component_id: impl Into<String>,
        publisher: StatePublisher,
    ) -> Self {
        Self {
            installer,
            component_id: component_id.into(),
            publisher,
            install_lock: Mutex::new(()),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installer.is_installed(&self.component_id)
    }

    /// Install the component unless present; `true` once it is usable
    pub async fn ensure_installed(&self) -> bool {
        if self.is_installed() {
            return true;
        }

        let _lock = self.install_lock.lock().await;
        // A concurrent caller may have finished the installation meanwhile
        if self.is_installed() {
            return true;
        }

        info!("Installing component {}", self.component_id);
        self.publisher
            .publish(PresentationState::DownloadingComponent { progress: Some(0.0) });

        let publisher = self.publisher.clone();
        let listener: InstallListener = Arc::new(move |update: &InstallProgress| {
            if update.status == InstallStatus::Downloading {
                publisher.publish(PresentationState::DownloadingComponent {
                    progress: update.fraction(),
                });
            }
        });
        let _registration = ListenerRegistration {
            installer: Arc::clone(&self.installer),
            id: self.installer.register_listener(listener),
        };

        match self.installer.install(&self.component_id).await {
            Ok(()) => {
                info!("Component {} installed", self.component_id);
                true
            }
            Err(e) => {
                warn!("Component {} installation failed: {}", self.component_id, e);
                false
            }
        }
    }
}
