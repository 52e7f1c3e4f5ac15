use actix_web::{
    error::ResponseError,
    get,
    http::StatusCode,
    post,
    web::{Data, Json},
    HttpResponse, Responder,
};
use log::debug;
use thiserror::Error;

use scrawl_common::{
    api::{decode_chain, decode_posts, encode_chain, ChainPayload, ErrorResponse, SyncRequest},
    post::Post,
    serializer::{ReaderError, Serializer},
};

use crate::core::{blockchain::Blockchain, error::BlockchainError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed request: {0}")]
    MalformedRequest(#[from] ReaderError),

    #[error("Invalid post signature")]
    InvalidPost,

    #[error("Duplicate post")]
    DuplicatePost,
}

impl From<BlockchainError> for ApiError {
    fn from(e: BlockchainError) -> Self {
        match e {
            BlockchainError::InvalidPostSignature => ApiError::InvalidPost,
            BlockchainError::DuplicatePost => ApiError::DuplicatePost,
            BlockchainError::Deserialization(e) => ApiError::MalformedRequest(e),
            // chain validation never surfaces to callers (broadcast is
            // fire-and-forget), any other variant reaching here is a bug
            other => {
                debug!("unexpected blockchain error on the API surface: {}", other);
                ApiError::InvalidPost
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

/// Full chain, oldest block first. Always succeeds, possibly empty.
#[get("/read")]
pub async fn read(blockchain: Data<Blockchain>) -> impl Responder {
    let blocks = blockchain.get_blocks().await;
    HttpResponse::Ok().json(ChainPayload {
        blockchain: encode_chain(blocks.iter()),
    })
}

/// Admit a single user post, sent as a base64 JSON string.
#[post("/write")]
pub async fn write(
    blockchain: Data<Blockchain>,
    body: Json<String>,
) -> Result<HttpResponse, ApiError> {
    let post = Post::from_base64(&body)?;
    blockchain.add_post(post).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Admit a batch of posts gossiped by a peer.
#[post("/sync")]
pub async fn sync(
    blockchain: Data<Blockchain>,
    body: Json<SyncRequest>,
) -> Result<HttpResponse, ApiError> {
    let posts = decode_posts(&body.posts)?;
    blockchain.sync_posts(posts).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Consider a candidate chain. Always 200: byzantine peers must not be
/// able to observe or cause an error here.
#[post("/broadcast")]
pub async fn broadcast(
    blockchain: Data<Blockchain>,
    body: Json<ChainPayload>,
) -> Result<HttpResponse, ApiError> {
    match decode_chain(&body.blockchain) {
        Ok(chain) => {
            blockchain.handle_broadcast(chain).await;
        }
        Err(e) => debug!("ignoring undecodable broadcast: {}", e),
    }
    Ok(HttpResponse::Ok().finish())
}
