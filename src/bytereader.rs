use crate::error::EngineError;

#[derive(Debug)]
pub enum Encoding {
    LittleEndian,
    BigEndian,
}

#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
    encoding: Encoding,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], encoding: Encoding) -> Self {
        ByteReader {
            data,
            encoding,
            offset: 0,
        }
    }

    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], EngineError> {
        if self.offset + count > self.data.len() {
            return Err(EngineError::MalformedFormat {
                reason: format!("not enough data to read {} bytes at offset {}", count, self.offset),
            });
        }

        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;

        Ok(slice)
    }

    pub fn read_str(&mut self, length: usize) -> Result<String, EngineError> {
        let bytes = self.read_bytes(length)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).trim_end().to_string())
    }

    pub fn read_u8(&mut self) -> Result<u8, EngineError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, EngineError> {
        Ok(self.read_bytes(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, EngineError> {
        let bytes = self.read_bytes(2)?;
        Ok(match self.encoding {
            Encoding::BigEndian => u16::from_be_bytes([bytes[0], bytes[1]]),
            Encoding::LittleEndian => u16::from_le_bytes([bytes[0], bytes[1]]),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, EngineError> {
        let bytes = self.read_bytes(4)?;
        Ok(match self.encoding {
            Encoding::BigEndian => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            Encoding::LittleEndian => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, EngineError> {
        let bytes = self.read_bytes(2)?;
        Ok(match self.encoding {
            Encoding::BigEndian => i16::from_be_bytes([bytes[0], bytes[1]]),
            Encoding::LittleEndian => i16::from_le_bytes([bytes[0], bytes[1]]),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, EngineError> {
        let bytes = self.read_bytes(4)?;
        Ok(match self.encoding {
            Encoding::BigEndian => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            Encoding::LittleEndian => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }
}
