//! A tracker-music (MOD/S3M/XM) playback engine: format decoding, a
//! per-channel effect state machine, and a fixed-point resampling mixer.

pub mod bytereader;
pub mod channel;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod fixed;
pub mod formats;
pub mod instrument;
pub mod module;
pub mod pattern;
pub mod sample;

pub use channel::{Channel, Interpolation};
pub use engine::Engine;
pub use error::EngineError;
pub use formats::FormatRegistry;
pub use module::Module;
