use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use aes_gcm::aead::rand_core::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};
use crate::error::{AppError, Result};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// The size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Creates a new `SecureKey` from a byte array.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self(key)
    }

    /// Returns a reference to the key as a byte slice.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// An encrypted payload with its nonce and detached authentication tag.
///
/// Ciphertext, nonce and tag are persisted as three separate columns, so the
/// tag is split off the combined AES-GCM output here.
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
    pub tag: [u8; TAG_SIZE],
}

/// Symmetric authenticated encryption for cached financial payloads.
pub struct Cipher {
    key: SecureKey,
}

impl Cipher {
    /// Creates a cipher from exactly `KEY_SIZE` bytes of key material.
    pub fn new(key_material: &[u8]) -> Result<Self> {
        let key: [u8; KEY_SIZE] = key_material
            .try_into()
            .map_err(|_| AppError::Configuration(format!(
                "encryption key must be exactly {} bytes",
                KEY_SIZE
            )))?;
        Ok(Self { key: SecureKey::new(key) })
    }

    /// Encrypts a plaintext under a fresh random nonce.
    ///
    /// A nonce is generated per call and never reused under the same key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<SealedPayload> {
        let cipher = Aes256Gcm::new(self.key.as_bytes().into());

        let nonce_bytes = generate_nonce();
        let nonce = Nonce::from(nonce_bytes);

        let mut combined = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

        // aes-gcm appends the tag to the ciphertext; detach it.
        let split_at = combined.len() - TAG_SIZE;
        let tag_bytes = combined.split_off(split_at);
        let tag: [u8; TAG_SIZE] = tag_bytes
            .as_slice()
            .try_into()
            .map_err(|_| AppError::Encryption("Truncated authentication tag".to_string()))?;

        Ok(SealedPayload {
            ciphertext: combined,
            nonce: nonce_bytes,
            tag,
        })
    }

    /// Decrypts a ciphertext, failing closed if the tag does not verify.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8; NONCE_SIZE],
        tag: &[u8; TAG_SIZE],
    ) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new(self.key.as_bytes().into());
        let nonce = Nonce::from(*nonce);

        let mut combined = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
        combined.extend_from_slice(ciphertext);
        combined.extend_from_slice(tag);

        cipher
            .decrypt(&nonce, combined.as_slice())
            .map_err(|_| AppError::Integrity)
    }
}

/// Generates a new random AES-GCM nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> Cipher {
        Cipher::new(&[7u8; KEY_SIZE]).unwrap()
    }

    #[test]
    fn round_trip_recovers_plaintext() {
        let cipher = test_cipher();
        let plaintext = br#"{"netWorth":500000}"#;

        let sealed = cipher.encrypt(plaintext).unwrap();
        let recovered = cipher
            .decrypt(&sealed.ciphertext, &sealed.nonce, &sealed.tag)
            .unwrap();

        assert_eq!(recovered, plaintext);
        assert_ne!(sealed.ciphertext, plaintext.to_vec());
    }

    #[test]
    fn nonces_are_unique_per_call() {
        let cipher = test_cipher();
        let a = cipher.encrypt(b"same input").unwrap();
        let b = cipher.encrypt(b"same input").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        let cipher = test_cipher();
        let mut sealed = cipher.encrypt(b"sensitive").unwrap();
        sealed.ciphertext[0] ^= 0x01;

        let result = cipher.decrypt(&sealed.ciphertext, &sealed.nonce, &sealed.tag);
        assert!(matches!(result, Err(AppError::Integrity)));
    }

    #[test]
    fn tampered_nonce_fails_closed() {
        let cipher = test_cipher();
        let mut sealed = cipher.encrypt(b"sensitive").unwrap();
        sealed.nonce[0] ^= 0x01;

        let result = cipher.decrypt(&sealed.ciphertext, &sealed.nonce, &sealed.tag);
        assert!(matches!(result, Err(AppError::Integrity)));
    }

    #[test]
    fn tampered_tag_fails_closed() {
        let cipher = test_cipher();
        let mut sealed = cipher.encrypt(b"sensitive").unwrap();
        sealed.tag[0] ^= 0x01;

        let result = cipher.decrypt(&sealed.ciphertext, &sealed.nonce, &sealed.tag);
        assert!(matches!(result, Err(AppError::Integrity)));
    }

    #[test]
    fn wrong_key_fails_closed() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt(b"sensitive").unwrap();

        let other = Cipher::new(&[8u8; KEY_SIZE]).unwrap();
        let result = other.decrypt(&sealed.ciphertext, &sealed.nonce, &sealed.tag);
        assert!(matches!(result, Err(AppError::Integrity)));
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(Cipher::new(&[0u8; 16]).is_err());
    }
}
