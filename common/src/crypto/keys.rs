//! RSA key material for post authorship.
//!
//! Posts are signed with RSASSA-PKCS1-v1_5 over the SHA-256 of the body's
//! canonical bytes. A public key's canonical form is the exponent `e` as a
//! 4-byte little-endian integer followed by the modulus `n` as its minimal
//! big-endian byte representation; that form is the key's identity and the
//! secondary sort key of the pool ordering.

use std::cmp::Ordering;
use std::fmt;

use rand::rngs::OsRng;
use rsa::{traits::PublicKeyParts, BigUint, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::serializer::{Reader, ReaderError, Serializer, Writer};

/// RSA modulus size in bits.
pub const RSA_KEY_BITS: usize = 2048;

/// Canonical public exponent size in bytes (little-endian).
pub const PUBLIC_EXPONENT_SIZE: usize = 4;

/// Upper bound on modulus/signature length accepted from the wire.
/// Bounds allocation on malformed input; 8192-bit keys are far beyond
/// anything this network produces.
const MAX_MODULUS_SIZE: usize = 1024;

#[derive(Error, Debug, Clone)]
pub enum CryptoError {
    /// Key generation failed. Programmer/environment error, not a peer fault.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid public key encoding")]
    InvalidPublicKey,

    /// Signature does not verify. A normal, caller-handled result.
    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// RSA public key with its canonical byte form cached.
#[derive(Clone, Debug)]
pub struct PublicKey {
    key: RsaPublicKey,
    canonical: Vec<u8>,
}

impl PublicKey {
    pub fn new(key: RsaPublicKey) -> Result<Self, CryptoError> {
        let canonical = canonical_key_bytes(&key)?;
        Ok(Self { key, canonical })
    }

    /// The canonical identity bytes: `e` (4 bytes LE) then `n` (BE minimal).
    pub fn as_canonical_bytes(&self) -> &[u8] {
        &self.canonical
    }

    pub fn as_rsa(&self) -> &RsaPublicKey {
        &self.key
    }

    /// Verify `signature` over the exact `message` bytes.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        let digest = Sha256::digest(message);
        self.key
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature.as_bytes())
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for PublicKey {}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keys are 260 bytes, show a prefix only
        write!(f, "{}…", &hex::encode(&self.canonical[..8]))
    }
}

impl Serializer for PublicKey {
    fn write(&self, writer: &mut Writer) {
        // canonical form, with the modulus length-prefixed for framing
        writer.write_bytes(&self.canonical[..PUBLIC_EXPONENT_SIZE]);
        let n = &self.canonical[PUBLIC_EXPONENT_SIZE..];
        writer.write_u16(&(n.len() as u16));
        writer.write_bytes(n);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let e_bytes: [u8; PUBLIC_EXPONENT_SIZE] = reader
            .read_bytes(PUBLIC_EXPONENT_SIZE)?
            .try_into()
            .map_err(|_| ReaderError::InvalidSize)?;

        let n_size = reader.read_u16()? as usize;
        if n_size == 0 || n_size > MAX_MODULUS_SIZE {
            return Err(ReaderError::InvalidSize);
        }
        let n_bytes = reader.read_bytes(n_size)?;
        // the canonical modulus representation is minimal
        if n_bytes[0] == 0 {
            return Err(ReaderError::InvalidValue);
        }

        let e = BigUint::from_bytes_le(&e_bytes);
        let n = BigUint::from_bytes_be(&n_bytes);
        let key = RsaPublicKey::new(n, e).map_err(|_| ReaderError::InvalidValue)?;
        PublicKey::new(key).map_err(|_| ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        self.canonical.len() + 2
    }
}

/// Detached RSASSA-PKCS1-v1_5 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &hex::encode(&self.0[..self.0.len().min(8)]))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl Serializer for Signature {
    fn write(&self, writer: &mut Writer) {
        writer.write_u16(&(self.0.len() as u16));
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let size = reader.read_u16()? as usize;
        if size == 0 || size > MAX_MODULUS_SIZE {
            return Err(ReaderError::InvalidSize);
        }
        Ok(Self(reader.read_bytes(size)?))
    }

    fn size(&self) -> usize {
        2 + self.0.len()
    }
}

/// RSA key pair. Held by users; miners only ever see public keys.
pub struct KeyPair {
    private: RsaPrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh 2048-bit key pair from the OS CSPRNG.
    pub fn new() -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = PublicKey::new(RsaPublicKey::from(&private))?;
        Ok(Self { private, public })
    }

    pub fn get_public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Sign the exact `message` bytes.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, CryptoError> {
        let digest = Sha256::digest(message);
        let bytes = self
            .private
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        Ok(Signature(bytes))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public.to_hex())
            .field("private", &"[REDACTED]")
            .finish()
    }
}

fn canonical_key_bytes(key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
    let e = key.e().to_bytes_le();
    if e.len() > PUBLIC_EXPONENT_SIZE {
        return Err(CryptoError::InvalidPublicKey);
    }

    let n = key.n().to_bytes_be();
    let mut bytes = Vec::with_capacity(PUBLIC_EXPONENT_SIZE + n.len());
    let mut e_fixed = [0u8; PUBLIC_EXPONENT_SIZE];
    e_fixed[..e.len()].copy_from_slice(&e);
    bytes.extend_from_slice(&e_fixed);
    bytes.extend(n);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::new().unwrap();
        let message = b"Hello World";

        let signature = keypair.sign(message).unwrap();
        assert!(keypair.get_public_key().verify(message, &signature).is_ok());
    }

    #[test]
    fn test_verify_wrong_message() {
        let keypair = KeyPair::new().unwrap();
        let signature = keypair.sign(b"Hello World").unwrap();
        assert!(keypair
            .get_public_key()
            .verify(b"Bye World", &signature)
            .is_err());
    }

    #[test]
    fn test_verify_wrong_key() {
        let keypair = KeyPair::new().unwrap();
        let other = KeyPair::new().unwrap();
        let signature = keypair.sign(b"message").unwrap();
        assert!(other.get_public_key().verify(b"message", &signature).is_err());
    }

    #[test]
    fn test_signature_size() {
        let keypair = KeyPair::new().unwrap();
        let signature = keypair.sign(b"x").unwrap();
        assert_eq!(signature.as_bytes().len(), RSA_KEY_BITS / 8);
    }

    #[test]
    fn test_canonical_bytes_layout() {
        let keypair = KeyPair::new().unwrap();
        let canonical = keypair.get_public_key().as_canonical_bytes();

        // e = 65537 little-endian, then a minimal 256-byte modulus
        assert_eq!(&canonical[..PUBLIC_EXPONENT_SIZE], &[0x01, 0x00, 0x01, 0x00]);
        assert_eq!(canonical.len(), PUBLIC_EXPONENT_SIZE + RSA_KEY_BITS / 8);
        assert_ne!(canonical[PUBLIC_EXPONENT_SIZE], 0);
    }

    #[test]
    fn test_public_key_roundtrip() {
        let keypair = KeyPair::new().unwrap();
        let key = keypair.get_public_key();

        let decoded = PublicKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key, &decoded);

        // the decoded key still verifies signatures
        let signature = keypair.sign(b"roundtrip").unwrap();
        assert!(decoded.verify(b"roundtrip", &signature).is_ok());
    }

    #[test]
    fn test_public_key_rejects_padded_modulus() {
        let keypair = KeyPair::new().unwrap();
        let mut bytes = keypair.get_public_key().to_bytes();

        // grow the declared modulus by one leading zero byte
        let n_size = u16::from_be_bytes([bytes[4], bytes[5]]) + 1;
        bytes[4..6].copy_from_slice(&n_size.to_be_bytes());
        bytes.insert(6, 0);

        assert!(PublicKey::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_key_ordering_by_canonical_bytes() {
        let a = KeyPair::new().unwrap();
        let b = KeyPair::new().unwrap();
        let (ka, kb) = (a.get_public_key(), b.get_public_key());

        assert_eq!(
            ka.cmp(kb),
            ka.as_canonical_bytes().cmp(kb.as_canonical_bytes())
        );
    }
}
