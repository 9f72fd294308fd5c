//! Collection encryption keys.
//!
//! Each encrypted collection has exactly one 256-bit ChaCha20-Poly1305 key,
//! identified by the collection id. The key is generated once and never
//! mutated; replacing a collection's key is a consistency violation caught
//! by the keyring cache layer.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Size of a collection key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;
/// Size of a ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A 256-bit symmetric key protecting a collection's working content.
///
/// Equality is byte equality; the keyring cache relies on it to detect two
/// different keys claimed for one collection id. `Debug` prints a short
/// fingerprint, never the key material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionKey([u8; KEY_SIZE]);

impl CollectionKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice of exactly [`KEY_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CoreError::InvalidKeyLength(bytes.len()));
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Short hex fingerprint for logs; not the key material.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Encrypt data with this key.
    ///
    /// Output is `nonce (12 bytes) || ciphertext || tag`. A random nonce is
    /// generated per call.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt data produced by [`CollectionKey::encrypt`].
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE {
            return Err(CoreError::DecryptionError(
                "data too short for nonce".to_string(),
            ));
        }

        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::DecryptionError(e.to_string()))?;

        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| CoreError::DecryptionError("authentication failed".to_string()))
    }
}

impl fmt::Debug for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionKey({}..)", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = CollectionKey::generate();
        let plaintext = b"{\"title\":\"GDP Q3\"}";

        let ciphertext = key.encrypt(plaintext).unwrap();
        assert_ne!(&ciphertext[NONCE_SIZE..], plaintext.as_slice());

        let decrypted = key.decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = CollectionKey::generate();
        let key2 = CollectionKey::generate();

        let ciphertext = key1.encrypt(b"secret").unwrap();
        assert!(key2.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn test_decrypt_truncated_fails() {
        let key = CollectionKey::generate();
        assert!(key.decrypt(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_from_slice_length_check() {
        assert!(CollectionKey::from_slice(&[1u8; 16]).is_err());
        assert!(CollectionKey::from_slice(&[1u8; KEY_SIZE]).is_ok());
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let key = CollectionKey::from_bytes([0xab; KEY_SIZE]);
        let debug = format!("{:?}", key);
        assert!(debug.starts_with("CollectionKey("));
        assert!(!debug.contains(&hex::encode([0xab; KEY_SIZE])));
    }
}
