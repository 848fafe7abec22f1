//! AES-256-GCM encryption of the `secrets.enc` blob.
//!
//! Format: `base64(nonce || ciphertext)`. Unlike passphrase-based schemes
//! there is no salt: the key is already 256 bits of high-entropy material
//! from [`crate::master_key::MasterKey`], so no KDF is needed.

use aes_gcm::aead::{Aead, KeyInit, OsRng, rand_core::RngCore};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use keenbench_error::{EngineError, ErrorCode};

use crate::master_key::MasterKey;

const NONCE_SIZE: usize = 12;

/// Encrypt `plaintext` under `key`, returning a base64 string.
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> Result<String, EngineError> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| {
        EngineError::new(
            ErrorCode::InvariantViolation,
            format!("failed to initialize AES-256-GCM cipher: {e}"),
        )
    })?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher.encrypt(nonce, plaintext).map_err(|_| {
        EngineError::new(ErrorCode::InvariantViolation, "secret encryption failed")
    })?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(blob))
}

/// Decrypt a base64 blob produced by [`encrypt`].
pub fn decrypt(key: &MasterKey, encoded: &str) -> Result<Vec<u8>, EngineError> {
    let blob = BASE64.decode(encoded).map_err(|e| {
        EngineError::new(
            ErrorCode::InvariantViolation,
            format!("secrets blob is not valid base64: {e}"),
        )
    })?;

    if blob.len() < NONCE_SIZE + 16 {
        return Err(EngineError::new(
            ErrorCode::InvariantViolation,
            "secrets blob too short to contain a valid nonce and auth tag",
        ));
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| {
        EngineError::new(
            ErrorCode::InvariantViolation,
            format!("failed to initialize AES-256-GCM cipher: {e}"),
        )
    })?;
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher.decrypt(nonce, ciphertext).map_err(|_| {
        EngineError::new(
            ErrorCode::InvariantViolation,
            "secrets decryption failed: wrong master key or corrupted data",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> MasterKey {
        MasterKey::from_bytes([7u8; 32])
    }

    #[test]
    fn roundtrip() {
        let k = key();
        let encrypted = encrypt(&k, b"hello secrets").unwrap();
        let decrypted = decrypt(&k, &encrypted).unwrap();
        assert_eq!(decrypted, b"hello secrets");
    }

    #[test]
    fn same_plaintext_produces_different_ciphertext() {
        let k = key();
        let a = encrypt(&k, b"same").unwrap();
        let b = encrypt(&k, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let encrypted = encrypt(&key(), b"payload").unwrap();
        let wrong = MasterKey::from_bytes([9u8; 32]);
        assert!(decrypt(&wrong, &encrypted).is_err());
    }

    #[test]
    fn truncated_blob_fails() {
        let k = key();
        assert!(decrypt(&k, "dGlueQ==").is_err());
    }

    #[test]
    fn invalid_base64_fails() {
        let k = key();
        assert!(decrypt(&k, "not base64!!").is_err());
    }
}
