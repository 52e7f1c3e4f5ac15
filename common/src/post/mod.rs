use std::fmt::{Display, Error, Formatter};

use crate::{
    crypto::{CryptoError, KeyPair, PublicKey, Signature},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampNanos,
};

/// The signed payload: opaque content plus the signing-time timestamp.
///
/// The timestamp is assumed monotonic within a single author's intent;
/// it is not required to be globally unique.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostBody {
    content: String,
    timestamp: TimestampNanos,
}

impl PostBody {
    pub fn new(content: String, timestamp: TimestampNanos) -> Self {
        Self { content, timestamp }
    }

    pub fn get_content(&self) -> &str {
        &self.content
    }

    pub fn get_timestamp(&self) -> TimestampNanos {
        self.timestamp
    }
}

impl Serializer for PostBody {
    fn write(&self, writer: &mut Writer) {
        writer.write_string(&self.content);
        writer.write_u64(&self.timestamp);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let content = reader.read_string()?;
        let timestamp = reader.read_u64()?;
        Ok(Self { content, timestamp })
    }

    fn size(&self) -> usize {
        2 + self.content.len() + 8
    }
}

/// Identity of a post in the pool and accepted index: timestamp first,
/// then the author's canonical key bytes. Two posts with the same key are
/// treated as the same post; a second post signed by one author in the
/// same nanosecond is indistinguishable from a replay.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostKey {
    pub timestamp: TimestampNanos,
    pub author: Vec<u8>,
}

/// A signed post. Immutable once created; the signature covers the exact
/// canonical bytes of the body.
#[derive(Clone, Debug)]
pub struct Post {
    body: PostBody,
    author: PublicKey,
    signature: Signature,
}

impl Post {
    pub fn new(body: PostBody, author: PublicKey, signature: Signature) -> Self {
        Self {
            body,
            author,
            signature,
        }
    }

    /// Sign a body with the author's key pair.
    pub fn sign(body: PostBody, keypair: &KeyPair) -> Result<Self, CryptoError> {
        let signature = keypair.sign(&body.to_bytes())?;
        Ok(Self {
            body,
            author: keypair.get_public_key().clone(),
            signature,
        })
    }

    pub fn get_body(&self) -> &PostBody {
        &self.body
    }

    pub fn get_author(&self) -> &PublicKey {
        &self.author
    }

    pub fn get_signature(&self) -> &Signature {
        &self.signature
    }

    /// True iff the signature verifies against the stated author over the
    /// exact body bytes.
    pub fn verify(&self) -> bool {
        self.author
            .verify(&self.body.to_bytes(), &self.signature)
            .is_ok()
    }

    pub fn key(&self) -> PostKey {
        PostKey {
            timestamp: self.body.timestamp,
            author: self.author.as_canonical_bytes().to_vec(),
        }
    }
}

// Identity is (body, author); the signature is excluded because a
// deterministic scheme admits exactly one valid signature per pair.
impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body && self.author == other.author
    }
}

impl Eq for Post {}

impl Serializer for Post {
    fn write(&self, writer: &mut Writer) {
        self.body.write(writer);
        self.author.write(writer);
        self.signature.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let body = PostBody::read(reader)?;
        let author = PublicKey::read(reader)?;
        let signature = Signature::read(reader)?;
        Ok(Self {
            body,
            author,
            signature,
        })
    }

    fn size(&self) -> usize {
        self.body.size() + self.author.size() + self.signature.size()
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "Post[timestamp: {}, author: {}, {} bytes]",
            self.body.timestamp,
            self.author,
            self.body.content.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::get_current_time_in_nanos;

    fn signed_post(keypair: &KeyPair, content: &str) -> Post {
        let body = PostBody::new(content.to_owned(), get_current_time_in_nanos());
        Post::sign(body, keypair).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::new().unwrap();
        let post = signed_post(&keypair, "Hello World");
        assert!(post.verify());
    }

    #[test]
    fn test_tampered_content_fails() {
        let keypair = KeyPair::new().unwrap();
        let post = signed_post(&keypair, "Hello World");

        let tampered = Post::new(
            PostBody::new("Bye World".to_owned(), post.get_body().get_timestamp()),
            post.get_author().clone(),
            post.get_signature().clone(),
        );
        assert!(!tampered.verify());
    }

    #[test]
    fn test_tampered_timestamp_fails() {
        let keypair = KeyPair::new().unwrap();
        let post = signed_post(&keypair, "Hello World");

        let tampered = Post::new(
            PostBody::new(
                post.get_body().get_content().to_owned(),
                post.get_body().get_timestamp() + 1,
            ),
            post.get_author().clone(),
            post.get_signature().clone(),
        );
        assert!(!tampered.verify());
    }

    #[test]
    fn test_equality_ignores_signature() {
        let keypair = KeyPair::new().unwrap();
        let body = PostBody::new("same body".to_owned(), 42);
        let a = Post::sign(body.clone(), &keypair).unwrap();
        let b = Post::new(body, keypair.get_public_key().clone(), a.get_signature().clone());
        assert_eq!(a, b);
    }

    #[test]
    fn test_wire_roundtrip() {
        let keypair = KeyPair::new().unwrap();
        let post = signed_post(&keypair, "round trip me");

        let encoded = post.to_base64();
        let decoded = Post::from_base64(&encoded).unwrap();

        assert_eq!(post, decoded);
        assert_eq!(post.to_bytes(), decoded.to_bytes());
        assert!(decoded.verify());
    }

    #[test]
    fn test_malformed_base64_rejected() {
        assert!(Post::from_base64("not!base64!!").is_err());
        assert!(Post::from_base64("aGVsbG8=").is_err()); // valid base64, wrong shape
    }

    #[test]
    fn test_key_ordering() {
        let keypair = KeyPair::new().unwrap();
        let older = Post::sign(PostBody::new("a".into(), 1), &keypair).unwrap();
        let newer = Post::sign(PostBody::new("b".into(), 2), &keypair).unwrap();
        assert!(older.key() < newer.key());
    }

    #[test]
    fn test_size_matches_serialized_length() {
        let keypair = KeyPair::new().unwrap();
        let post = signed_post(&keypair, "sized");
        assert_eq!(post.to_bytes().len(), post.size());
    }
}
