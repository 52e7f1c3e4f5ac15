use std::fmt::{Display, Error as FmtError, Formatter};

use crate::{
    crypto::{Hash, Hashable, HASH_SIZE},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

/// Header committed to by proof of work.
///
/// `prev_hash` is all zeros for the genesis predecessor. `summary` is the
/// hash of the block's ordered post list, so the header commits to both
/// the chain position and the exact payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    prev_hash: Hash,
    summary: Hash,
    timestamp: TimestampMillis,
    nonce: u32,
}

impl BlockHeader {
    pub fn new(prev_hash: Hash, summary: Hash, timestamp: TimestampMillis) -> Self {
        Self {
            prev_hash,
            summary,
            timestamp,
            nonce: 0,
        }
    }

    pub fn get_prev_hash(&self) -> &Hash {
        &self.prev_hash
    }

    pub fn get_summary(&self) -> &Hash {
        &self.summary
    }

    pub fn get_timestamp(&self) -> TimestampMillis {
        self.timestamp
    }

    pub fn get_nonce(&self) -> u32 {
        self.nonce
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.nonce = nonce;
    }
}

impl Serializer for BlockHeader {
    fn write(&self, writer: &mut Writer) {
        writer.write_hash(&self.prev_hash);
        writer.write_hash(&self.summary);
        writer.write_u64(&self.timestamp);
        writer.write_u32(&self.nonce);
    }

    fn read(reader: &mut Reader) -> Result<BlockHeader, ReaderError> {
        let prev_hash = reader.read_hash()?;
        let summary = reader.read_hash()?;
        let timestamp = reader.read_u64()?;
        let nonce = reader.read_u32()?;

        Ok(BlockHeader {
            prev_hash,
            summary,
            timestamp,
            nonce,
        })
    }

    fn size(&self) -> usize {
        HASH_SIZE * 2 + 8 + 4
    }
}

impl Hashable for BlockHeader {}

impl Display for BlockHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(
            f,
            "BlockHeader[prev: {}, summary: {}, timestamp: {}, nonce: {}]",
            self.prev_hash, self.summary, self.timestamp, self.nonce
        )
    }
}
