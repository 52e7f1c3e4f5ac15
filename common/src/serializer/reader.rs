use std::string::FromUtf8Error;

use thiserror::Error;

use crate::crypto::{Hash, HASH_SIZE};

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Not enough bytes left to read")]
    NotEnoughBytes,

    #[error("Invalid size")]
    InvalidSize,

    #[error("Invalid value")]
    InvalidValue,

    #[error("Invalid UTF-8 string: {0}")]
    InvalidString(#[from] FromUtf8Error),

    #[error("Invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

// Consumes the canonical binary form produced by a Writer.
// Every read checks the remaining length first so a truncated or
// inconsistent payload surfaces as an error instead of a panic.
pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, total: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], ReaderError> {
        if count > self.bytes.len() - self.total {
            return Err(ReaderError::NotEnoughBytes);
        }
        let slice = &self.bytes[self.total..self.total + count];
        self.total += count;
        Ok(slice)
    }

    pub fn read_bool(&mut self) -> Result<bool, ReaderError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes(bytes.try_into().map_err(|_| ReaderError::InvalidSize)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().map_err(|_| ReaderError::InvalidSize)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().map_err(|_| ReaderError::InvalidSize)?))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, ReaderError> {
        Ok(self.take(count)?.to_vec())
    }

    pub fn read_bytes_32(&mut self) -> Result<[u8; 32], ReaderError> {
        let bytes = self.take(32)?;
        bytes.try_into().map_err(|_| ReaderError::InvalidSize)
    }

    pub fn read_hash(&mut self) -> Result<Hash, ReaderError> {
        let bytes = self.take(HASH_SIZE)?;
        Ok(Hash::new(bytes.try_into().map_err(|_| ReaderError::InvalidSize)?))
    }

    // Inverse of Writer::write_string
    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        let size = self.read_u16()? as usize;
        let bytes = self.read_bytes(size)?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn total_read(&self) -> usize {
        self.total
    }

    pub fn total_size(&self) -> usize {
        self.bytes.len()
    }
}
