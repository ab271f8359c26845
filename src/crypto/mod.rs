//! The pluggable authenticated-encryption abstraction (§4.6): AES-128-GCM
//! by default, AES-128-CBC for reading legacy unauthenticated data, and
//! password-based key derivation with two operating modes.
mod cbc;
mod gcm;
pub mod kdf;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock};

use rand::RngCore;

/// Errors from the cryptographic submodule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// Authenticated decryption failed: wrong key, or tampered data.
    DecryptionFailed,
    /// The ciphertext was shorter than even an IV.
    Truncated,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CryptoError::DecryptionFailed => write!(f, "decryption failed: wrong password or tampered data"),
            CryptoError::Truncated => write!(f, "ciphertext is too short to contain an IV"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// How a [`Password`]'s key is derived. See SPEC_FULL.md §4.6 for the
/// rationale behind each mode's round count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordMode {
    /// Fresh salt per message, independent per-message keys. Appropriate
    /// for an open-ended set of passwords.
    Salted,
    /// No salt; the derived key is memoized per password. Appropriate
    /// for a small, reused set of passwords.
    Cached,
}

/// A password plus the key-derivation policy to apply to it. The raw
/// secret is never logged or displayed.
#[derive(Clone)]
pub struct Password {
    mode: PasswordMode,
    secret: Vec<u8>,
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Password {{ mode: {:?}, secret: **** }}", self.mode)
    }
}

impl Password {
    /// A password using the salted (per-message, no caching) mode.
    pub fn salted(secret: impl Into<Vec<u8>>) -> Password {
        Password { mode: PasswordMode::Salted, secret: secret.into() }
    }

    /// A password using the cached (no salt, memoized key) mode.
    pub fn cached(secret: impl Into<Vec<u8>>) -> Password {
        Password { mode: PasswordMode::Cached, secret: secret.into() }
    }

    /// Which mode this password uses.
    pub fn mode(&self) -> PasswordMode {
        self.mode
    }
}

/// Which concrete cipher an [`Encryptor`] selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encryptor {
    /// AES-128-GCM, authenticated. The default.
    Gcm,
    /// AES-128-CBC + PKCS7, unauthenticated. Legacy-compatibility only.
    Cbc,
}

impl Default for Encryptor {
    fn default() -> Self {
        Encryptor::Gcm
    }
}

impl Encryptor {
    pub(crate) fn wire_id(&self) -> u8 {
        match self {
            Encryptor::Gcm => 0,
            Encryptor::Cbc => 1,
        }
    }

    pub(crate) fn from_wire_id(id: u8) -> Option<Encryptor> {
        match id {
            0 => Some(Encryptor::Gcm),
            1 => Some(Encryptor::Cbc),
            _ => None,
        }
    }
}

/// Process-wide memoization of `(password bytes) -> derived key` for
/// [`PasswordMode::Cached`] passwords, so the expensive cached-mode KDF
/// round count is paid once per password per process rather than once
/// per message.
static KEY_CACHE: OnceLock<Mutex<HashMap<Vec<u8>, [u8; 16]>>> = OnceLock::new();

fn key_cache() -> &'static Mutex<HashMap<Vec<u8>, [u8; 16]>> {
    KEY_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

const SALT_LEN: usize = 16;

/// Encrypts `plaintext` with `encryptor` under `password`, producing
/// `salt? ∥ iv ∥ ciphertext[∥tag]` (the salt is present only in
/// [`PasswordMode::Salted`]).
pub fn encrypt(password: &Password, encryptor: Encryptor, plaintext: &[u8]) -> Vec<u8> {
    let (salt, key) = match password.mode {
        PasswordMode::Salted => {
            let mut salt = [0u8; SALT_LEN];
            rand::thread_rng().fill_bytes(&mut salt);
            let key = kdf::derive_key(Some(&salt), &password.secret, kdf::SALTED_ROUNDS);
            (Some(salt), key)
        }
        PasswordMode::Cached => {
            let mut cache = key_cache().lock().expect("key cache poisoned");
            let key = *cache
                .entry(password.secret.clone())
                .or_insert_with(|| kdf::derive_key(None, &password.secret, kdf::CACHED_ROUNDS));
            (None, key)
        }
    };

    let body = match encryptor {
        Encryptor::Gcm => gcm::encrypt(&key, plaintext),
        Encryptor::Cbc => cbc::encrypt(&key, plaintext),
    };

    let mut out = Vec::with_capacity(SALT_LEN + body.len());
    if let Some(salt) = salt {
        out.extend_from_slice(&salt);
    }
    out.extend_from_slice(&body);
    out
}

/// Decrypts `data` (as produced by [`encrypt`]) with `encryptor` under
/// `password`.
pub fn decrypt(password: &Password, encryptor: Encryptor, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (salt, body) = match password.mode {
        PasswordMode::Salted => {
            if data.len() < SALT_LEN {
                return Err(CryptoError::Truncated);
            }
            let (salt, rest) = data.split_at(SALT_LEN);
            (Some(salt), rest)
        }
        PasswordMode::Cached => (None, data),
    };

    let key = match password.mode {
        PasswordMode::Salted => kdf::derive_key(salt, &password.secret, kdf::SALTED_ROUNDS),
        PasswordMode::Cached => {
            let mut cache = key_cache().lock().expect("key cache poisoned");
            *cache
                .entry(password.secret.clone())
                .or_insert_with(|| kdf::derive_key(None, &password.secret, kdf::CACHED_ROUNDS))
        }
    };

    match encryptor {
        Encryptor::Gcm => gcm::decrypt(&key, body),
        Encryptor::Cbc => cbc::decrypt(&key, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salted_round_trip() {
        let pw = Password::salted(b"correct horse battery staple".to_vec());
        let ct = encrypt(&pw, Encryptor::Gcm, b"payload bytes");
        assert_eq!(decrypt(&pw, Encryptor::Gcm, &ct).unwrap(), b"payload bytes");
    }

    #[test]
    fn cached_round_trip_reuses_derived_key() {
        let pw = Password::cached(b"shared-secret".to_vec());
        let ct1 = encrypt(&pw, Encryptor::Gcm, b"first message");
        let ct2 = encrypt(&pw, Encryptor::Gcm, b"second message");
        assert_eq!(decrypt(&pw, Encryptor::Gcm, &ct1).unwrap(), b"first message");
        assert_eq!(decrypt(&pw, Encryptor::Gcm, &ct2).unwrap(), b"second message");
    }

    #[test]
    fn wrong_salted_password_fails() {
        let pw = Password::salted(b"right".to_vec());
        let wrong = Password::salted(b"wrong".to_vec());
        let ct = encrypt(&pw, Encryptor::Gcm, b"secret");
        assert!(decrypt(&wrong, Encryptor::Gcm, &ct).is_err());
    }

    #[test]
    fn cbc_legacy_round_trip() {
        let pw = Password::salted(b"legacy".to_vec());
        let ct = encrypt(&pw, Encryptor::Cbc, b"legacy payload data");
        assert_eq!(decrypt(&pw, Encryptor::Cbc, &ct).unwrap(), b"legacy payload data");
    }
}
