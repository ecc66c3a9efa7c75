//! Conversion engine: encoder adapters and the status stream they produce

pub mod command;
pub mod legacy;
pub mod native;
pub mod progress;

pub use command::LegacyCommand;
pub use legacy::LegacyEncoder;
pub use native::NativeEncoder;
pub use progress::{clamp_fraction, StatusEmitter, StatusEvent, StatusStream};
