// Application layer - Use case interactors

pub mod component_gate;
pub mod container;
pub mod convert_interactor;
pub mod publisher;
pub mod registry;

// Re-export interactors
pub use component_gate::ComponentGate;
pub use container::{AppContainer, DefaultAppContainer};
pub use convert_interactor::{BatchCanceller, ConvertDependencies, ConvertInteractor};
pub use publisher::{StateObserver, StatePublisher};
pub use registry::{EncoderFactory, InstalledComponentRegistry};
