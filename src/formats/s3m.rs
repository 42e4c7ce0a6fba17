//! Scream Tracker 3 module recognition. Decoding is not yet implemented;
//! `recognises` lets the registry give a precise "unsupported format"
//! error rather than silently falling through to the MOD decoder.

use crate::error::EngineError;
use crate::module::Module;

pub struct S3mDecoder;

impl super::FormatDecoder for S3mDecoder {
    fn name(&self) -> &'static str {
        "Scream Tracker 3"
    }

    fn recognises(&self, data: &[u8]) -> bool {
        data.len() > 0x2C + 4 && &data[0x2C..0x2C + 4] == b"SCRM"
    }

    fn decode(&self, _data: &[u8]) -> Result<Module, EngineError> {
        Err(EngineError::UnsupportedFormat)
    }
}
