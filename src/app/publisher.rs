// State publisher - Broadcasts presentation state snapshots

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::domain::model::PresentationState;

/// Synchronous observer notified on every published state
pub trait StateObserver: Send + Sync {
    fn on_state(&self, state: &PresentationState);
}

/// Single-value state cell; readers get snapshots only
///
/// Watch receivers see the latest value and may skip intermediate ones.
/// Observers registered with `add_observer` see every value in order.
#[derive(Clone)]
pub struct StatePublisher {
    tx: Arc<watch::Sender<PresentationState>>,
    observers: Arc<Mutex<Vec<Arc<dyn StateObserver>>>>,
}

impl StatePublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PresentationState::Idle);
        Self {
            tx: Arc::new(tx),
            observers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn publish(&self, state: PresentationState) {
        self.tx.send_replace(state.clone());
        self.notify_observers(&state);
    }

    pub fn current(&self) -> PresentationState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PresentationState> {
        self.tx.subscribe()
    }

    pub fn add_observer(&self, observer: Arc<dyn StateObserver>) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(observer);
        }
    }

    fn notify_observers(&self, state: &PresentationState) {
        let observers = match self.observers.lock() {
            Ok(observers) => observers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for observer in observers {
            observer.on_state(state);
        }
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Mutex<Vec<PresentationState>>);

    impl StateObserver for Recorder {
        fn on_state(&self, state: &PresentationState) {
            self.0.lock().unwrap().push(state.clone());
        }
    }

    #[test]
    fn test_observers_see_every_state() {
        let publisher = StatePublisher::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        publisher.add_observer(recorder.clone());

        publisher.publish(PresentationState::Success { count: 1 });
        publisher.publish(PresentationState::Idle);

        let seen = recorder.0.lock().unwrap();
        assert_eq!(
            *seen,
            vec![PresentationState::Success { count: 1 }, PresentationState::Idle]
        );
    }

    #[test]
    fn test_receivers_get_latest_snapshot() {
        let publisher = StatePublisher::new();
        let rx = publisher.subscribe();
        publisher.publish(PresentationState::Error {
            message: "x".to_string(),
        });
        assert_eq!(
            *rx.borrow(),
            PresentationState::Error {
                message: "x".to_string()
            }
        );
        assert_eq!(publisher.current(), *rx.borrow());
    }
}
