use thiserror::Error;

use scrawl_common::serializer::ReaderError;

#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Invalid post signature")]
    InvalidPostSignature,

    #[error("Post already on the chain or in the pool")]
    DuplicatePost,

    #[error("First block does not descend from the zero hash")]
    InvalidGenesisLink,

    #[error("Block {0} does not link to its predecessor")]
    InvalidChainLink(usize),

    #[error("Block {0} does not meet the difficulty target")]
    InvalidProofOfWork(usize),

    #[error("Block {0} summary does not match its post list")]
    SummaryMismatch(usize),

    #[error("Block {0} carries a post with an invalid signature")]
    InvalidPostInBlock(usize),

    #[error("A post appears in more than one block")]
    DuplicatePostInChain,

    #[error("Malformed payload: {0}")]
    Deserialization(#[from] ReaderError),
}

pub type BlockchainResult<T> = Result<T, BlockchainError>;
