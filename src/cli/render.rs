//! Progress rendering for presentation states

use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use tracing::warn;

use crate::app::publisher::StateObserver;
use crate::domain::model::PresentationState;

const BAR_WIDTH: usize = 30;

type SharedWriter = Mutex<Box<dyn Write + Send>>;

fn bar(fraction: f32) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn percent(fraction: f32) -> u32 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Human-readable line for a state, `None` for states with nothing to show
pub fn describe(state: &PresentationState) -> Option<String> {
    match state {
        PresentationState::Idle => None,
        PresentationState::Loading {
            progress,
            current_index,
            total,
        } => Some(format!(
            "[{}/{}] Converting {} {:>3}%",
            current_index,
            total,
            bar(*progress),
            percent(*progress)
        )),
        PresentationState::LegacyFormatDetected { reason } => Some(reason.clone()),
        PresentationState::DownloadingComponent { progress: Some(p) } => Some(format!(
            "Downloading legacy converter {} {:>3}%",
            bar(*p),
            percent(*p)
        )),
        PresentationState::DownloadingComponent { progress: None } => {
            Some("Downloading legacy converter...".to_string())
        }
        PresentationState::Success { count } => Some(format!("Converted {} file(s).", count)),
        PresentationState::Error { message } => Some(format!("Error: {}", message)),
    }
}

/// One line per visible state change
pub struct ConsoleRenderer {
    out: SharedWriter,
    last: Mutex<Option<String>>,
}

impl ConsoleRenderer {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            last: Mutex::new(None),
        }
    }

    pub fn stdout() -> Arc<Self> {
        Arc::new(Self::new(Box::new(std::io::stdout())))
    }
}

impl StateObserver for ConsoleRenderer {
    fn on_state(&self, state: &PresentationState) {
        let Some(line) = describe(state) else {
            return;
        };
        {
            let mut last = match self.last.lock() {
                Ok(last) => last,
                Err(poisoned) => poisoned.into_inner(),
            };
            if last.as_deref() == Some(line.as_str()) {
                return;
            }
            *last = Some(line.clone());
        }
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            warn!("Failed to write progress: {}", e);
        }
    }
}

/// One JSON object per state change, stamped with an RFC 3339 time
pub struct JsonRenderer {
    out: SharedWriter,
}

impl JsonRenderer {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Arc<Self> {
        Arc::new(Self::new(Box::new(std::io::stdout())))
    }
}

/// JSON event for a state
pub fn state_event(state: &PresentationState) -> serde_json::Value {
    let mut event = match serde_json::to_value(state) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(other) => {
            let mut map = serde_json::Map::new();
            map.insert("state".to_string(), other);
            map
        }
        Err(e) => {
            let mut map = serde_json::Map::new();
            map.insert("state".to_string(), "unknown".into());
            map.insert("error".to_string(), e.to_string().into());
            map
        }
    };
    event.insert(
        "timestamp".to_string(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true).into(),
    );
    serde_json::Value::Object(event)
}

impl StateObserver for JsonRenderer {
    fn on_state(&self, state: &PresentationState) {
        let event = state_event(state);
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", event).and_then(|_| out.flush()) {
            warn!("Failed to write progress event: {}", e);
        }
    }
}
