//! Output persistence into the durable media store

pub mod sink;

pub use sink::{OutputSink, MEDIA_COLLECTION};
