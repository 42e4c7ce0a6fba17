//! FastTracker II module recognition. Decoding is not yet implemented.

use crate::error::EngineError;
use crate::module::Module;

const XM_MAGIC: &[u8] = b"Extended Module: ";

pub struct XmDecoder;

impl super::FormatDecoder for XmDecoder {
    fn name(&self) -> &'static str {
        "FastTracker II XM"
    }

    fn recognises(&self, data: &[u8]) -> bool {
        data.len() >= XM_MAGIC.len() && &data[..XM_MAGIC.len()] == XM_MAGIC
    }

    fn decode(&self, _data: &[u8]) -> Result<Module, EngineError> {
        Err(EngineError::UnsupportedFormat)
    }
}
