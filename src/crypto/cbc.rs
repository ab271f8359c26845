//! AES-128-CBC + PKCS7 padding: the legacy, unauthenticated encryptor.
//! Kept only for reading data written before a deployment migrated to
//! GCM. Unlike GCM, a wrong key does not reliably fail here — padding
//! can happen to validate on garbage plaintext — callers that need
//! tamper detection must use the default GCM encryptor instead.
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use super::CryptoError;

type Encryptor = cbc::Encryptor<aes::Aes128>;
type Decryptor = cbc::Decryptor<aes::Aes128>;

/// Bytes of random IV CBC requires (one AES block).
pub const IV_LEN: usize = 16;

/// Encrypts `plaintext` under `key`, returning `iv ∥ ciphertext`. No
/// authentication tag is present.
pub fn encrypt(key: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let ciphertext = Encryptor::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypts `data` (as produced by [`encrypt`]) under `key`. Only fails
/// if the padding ends up malformed; a wrong key can otherwise silently
/// produce garbage plaintext.
pub fn decrypt(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < IV_LEN {
        return Err(CryptoError::Truncated);
    }
    let (iv, ciphertext) = data.split_at(IV_LEN);
    Decryptor::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = [3u8; 16];
        let pt = b"legacy compatible payload";
        let ct = encrypt(&key, pt);
        assert_eq!(decrypt(&key, &ct).unwrap(), pt);
    }

    #[test]
    fn wrong_key_does_not_reliably_fail() {
        // Documents the known weakness: CBC has no integrity check, so a
        // wrong key may still produce output (usually garbage, but not
        // guaranteed to error). We only assert it doesn't panic.
        let key = [3u8; 16];
        let other = [4u8; 16];
        let ct = encrypt(&key, b"0123456789abcdef");
        let _ = decrypt(&other, &ct);
    }
}
