//! AES-128-GCM: the default, authenticated encryptor.
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Nonce};
use rand::RngCore;

use super::CryptoError;

/// Bytes of random IV (nonce) GCM requires.
pub const IV_LEN: usize = 12;
/// Bytes of authentication tag GCM appends to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Encrypts `plaintext` under `key`, returning `iv ∥ ciphertext ∥ tag`.
pub fn encrypt(key: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let cipher = Aes128Gcm::new(key.into());
    let nonce = Nonce::from_slice(&iv);
    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
        .expect("GCM encryption cannot fail for valid key/nonce lengths");
    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypts `data` (as produced by [`encrypt`]) under `key`. Fails with
/// [`CryptoError::DecryptionFailed`] on a wrong key or any tampering —
/// GCM's tag check covers both, so this is the only failure mode.
pub fn decrypt(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < IV_LEN + TAG_LEN {
        return Err(CryptoError::Truncated);
    }
    let (iv, ciphertext) = data.split_at(IV_LEN);
    let cipher = Aes128Gcm::new(key.into());
    let nonce = Nonce::from_slice(iv);
    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad: &[] })
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = [9u8; 16];
        let pt = b"hello, authenticated world";
        let ct = encrypt(&key, pt);
        assert_eq!(decrypt(&key, &ct).unwrap(), pt);
    }

    #[test]
    fn wrong_key_fails_loudly() {
        let key = [9u8; 16];
        let other = [1u8; 16];
        let ct = encrypt(&key, b"secret");
        assert!(decrypt(&other, &ct).is_err());
    }

    #[test]
    fn tampering_is_detected() {
        let key = [9u8; 16];
        let mut ct = encrypt(&key, b"secret payload");
        *ct.last_mut().unwrap() ^= 0xFF;
        assert!(decrypt(&key, &ct).is_err());
    }
}
