use thiserror::Error;

/// Structural error kinds surfaced by the engine and its format decoders.
///
/// Runtime audio production is total (see the mixer and channel modules) —
/// this enum only ever appears at construction / decode time.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported sampling rate: {rate} (must be in [8000, 128000])")]
    UnsupportedSamplingRate { rate: u32 },

    #[error("unsupported module format")]
    UnsupportedFormat,

    #[error("malformed module data: {reason}")]
    MalformedFormat { reason: String },
}
