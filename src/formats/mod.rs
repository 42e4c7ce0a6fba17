//! Format detection and decoding: each supported container implements
//! [`FormatDecoder`]; [`FormatRegistry`] tries each in turn against a
//! signature check before attempting a full decode.

pub mod mod_file;
pub mod s3m;
pub mod xm;

use crate::error::EngineError;
use crate::module::Module;

pub trait FormatDecoder {
    /// Name of the format, for logging.
    fn name(&self) -> &'static str;

    /// Cheap signature check; does not validate the rest of the file.
    fn recognises(&self, data: &[u8]) -> bool;

    fn decode(&self, data: &[u8]) -> Result<Module, EngineError>;
}

pub struct FormatRegistry {
    decoders: Vec<Box<dyn FormatDecoder>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        FormatRegistry {
            decoders: vec![
                Box::new(mod_file::ModDecoder),
                Box::new(s3m::S3mDecoder),
                Box::new(xm::XmDecoder),
            ],
        }
    }
}

impl FormatRegistry {
    pub fn decode(&self, data: &[u8]) -> Result<Module, EngineError> {
        for decoder in &self.decoders {
            if decoder.recognises(data) {
                tracing::debug!(format = decoder.name(), "recognised module format");
                return decoder.decode(data);
            }
        }
        Err(EngineError::UnsupportedFormat)
    }
}
