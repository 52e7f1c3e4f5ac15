// Canonical binary serialization.
//
// Hashing and signing commit to the exact bytes produced here, so the
// layout is fixed: field order is the declaration order of each type,
// integers are big-endian, and variable-length fields carry an explicit
// length prefix. Nothing in this form depends on map iteration order or
// any other source of nondeterminism. Any other implementation that
// wants to interoperate must reproduce this layout byte for byte.

mod reader;
mod writer;

use base64::{engine::general_purpose::STANDARD, Engine};

pub use reader::{Reader, ReaderError};
pub use writer::Writer;

pub trait Serializer {
    fn write(&self, writer: &mut Writer);

    fn read(reader: &mut Reader) -> Result<Self, ReaderError>
    where
        Self: Sized;

    fn size(&self) -> usize;

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::with_capacity(self.size());
        self.write(&mut writer);
        writer.bytes()
    }

    // Strict inverse of to_bytes: trailing bytes are an error
    fn from_bytes(bytes: &[u8]) -> Result<Self, ReaderError>
    where
        Self: Sized,
    {
        let mut reader = Reader::new(bytes);
        let value = Self::read(&mut reader)?;
        if reader.total_read() != reader.total_size() {
            return Err(ReaderError::InvalidSize);
        }
        Ok(value)
    }

    // base64 text form used for JSON transport of binary payloads
    fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    fn from_base64(value: &str) -> Result<Self, ReaderError>
    where
        Self: Sized,
    {
        let bytes = STANDARD.decode(value)?;
        Self::from_bytes(&bytes)
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}
