use std::{
    fmt::{Display, Error, Formatter},
    sync::Arc,
};

use crate::{
    crypto::{Hash, Hashable},
    difficulty::check_difficulty,
    post::Post,
    serializer::{Reader, ReaderError, Serializer, Writer},
};

use super::BlockHeader;

/// A mined block: header plus the ordered posts it absorbed.
/// Created by successful local mining or received whole from a peer;
/// never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Block {
    header: BlockHeader,
    posts: Vec<Arc<Post>>,
}

impl Block {
    pub fn new(header: BlockHeader, posts: Vec<Arc<Post>>) -> Self {
        Block { header, posts }
    }

    pub fn get_header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn get_posts(&self) -> &Vec<Arc<Post>> {
        &self.posts
    }

    pub fn get_posts_count(&self) -> usize {
        self.posts.len()
    }

    /// True iff the header's summary equals the hash of the post list.
    pub fn summary_matches(&self) -> bool {
        *self.header.get_summary() == summary_hash(&self.posts)
    }

    /// True iff the header hash meets the difficulty target.
    pub fn check_pow(&self, target_bits: u32) -> bool {
        check_difficulty(&self.hash(), target_bits)
    }

    /// True iff every post's signature verifies.
    pub fn verify_posts(&self) -> bool {
        self.posts.iter().all(|post| post.verify())
    }
}

/// Hash over the ordered post list. The order used to build this summary
/// is the order the block must carry; reordering changes the hash.
pub fn summary_hash(posts: &[Arc<Post>]) -> Hash {
    let mut writer = Writer::new();
    for post in posts {
        post.write(&mut writer);
    }
    crate::crypto::hash(writer.as_bytes())
}

impl Serializer for Block {
    fn write(&self, writer: &mut Writer) {
        self.header.write(writer);
        writer.write_u16(&(self.posts.len() as u16));
        for post in &self.posts {
            post.write(writer);
        }
    }

    fn read(reader: &mut Reader) -> Result<Block, ReaderError> {
        let header = BlockHeader::read(reader)?;
        let count = reader.read_u16()?;
        let mut posts = Vec::with_capacity(count as usize);
        for _ in 0..count {
            posts.push(Arc::new(Post::read(reader)?));
        }

        Ok(Block::new(header, posts))
    }

    fn size(&self) -> usize {
        self.header.size() + 2 + self.posts.iter().map(|post| post.size()).sum::<usize>()
    }
}

impl Hashable for Block {
    fn hash(&self) -> Hash {
        self.header.hash()
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "Block[hash: {}, prev: {}, posts: {}]",
            self.hash(),
            self.header.get_prev_hash(),
            self.posts.len()
        )
    }
}
