// Legacy encoder registry - Resolves the software encoder once installed

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::ports::{EncoderPort, InstallerPort, LegacyEncoderProvider};

/// Builds the legacy encoder for an installed component
pub type EncoderFactory = Box<dyn Fn() -> Arc<dyn EncoderPort> + Send + Sync>;

/// Registry keyed on installation presence
///
/// The encoder is built on first resolution after installation and reused
/// for the rest of the process lifetime.
pub struct InstalledComponentRegistry {
    installer: Arc<dyn InstallerPort>,
    component_id: String,
    factory: EncoderFactory,
    cached: Mutex<Option<Arc<dyn EncoderPort>>>,
}

impl InstalledComponentRegistry {
    pub fn new(
        installer: Arc<dyn InstallerPort>,
        component_id: impl Into<String>,
        factory: EncoderFactory,
    ) -> Self {
        Self {
            installer,
            component_id: component_id.into(),
            factory,
            cached: Mutex::new(None),
        }
    }
}

impl LegacyEncoderProvider for InstalledComponentRegistry {
    fn is_installed(&self) -> bool {
        self.installer.is_installed(&self.component_id)
    }

    fn resolve(&self) -> Option<Arc<dyn EncoderPort>> {
        if !self.is_installed() {
            return None;
        }
        let mut cached = match self.cached.lock() {
            Ok(cached) => cached,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(encoder) = cached.as_ref() {
            return Some(Arc::clone(encoder));
        }
        debug!("Building legacy encoder for component {}", self.component_id);
        let encoder = (self.factory)();
        *cached = Some(Arc::clone(&encoder));
        Some(encoder)
    }
}
