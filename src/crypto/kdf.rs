//! Password-based key derivation: iterated SHA-512 over `salt ∥ password`,
//! truncated to an AES-128 key. Two round counts are used depending on
//! [`crate::crypto::PasswordMode`] — see module docs on `crypto` for the
//! rationale.
use sha2::{Digest, Sha512};

/// Rounds used when a fresh salt is generated per message. Cheap enough
/// that an open-ended set of passwords stays usable, since the salt
/// already defeats precomputed dictionaries.
pub const SALTED_ROUNDS: u32 = 163_835;

/// Rounds used when no salt is present and the derived key is cached.
/// Deliberately expensive — the cost is paid once per password per
/// process, not once per message.
pub const CACHED_ROUNDS: u32 = 2_147_450_880;

const KEY_LEN: usize = 16;

/// Derives a 16-byte AES-128 key from `password`, iterating SHA-512
/// `rounds` times over `salt ∥ password` (or just `password` when
/// `salt` is `None`).
pub fn derive_key(salt: Option<&[u8]>, password: &[u8], rounds: u32) -> [u8; KEY_LEN] {
    let mut state = match salt {
        Some(salt) => {
            let mut buf = Vec::with_capacity(salt.len() + password.len());
            buf.extend_from_slice(salt);
            buf.extend_from_slice(password);
            buf
        }
        None => password.to_vec(),
    };
    for _ in 0..rounds {
        let mut hasher = Sha512::new();
        hasher.update(&state);
        state = hasher.finalize().to_vec();
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&state[..KEY_LEN]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_inputs() {
        let a = derive_key(Some(b"salt1234salt1234"), b"hunter2", 10);
        let b = derive_key(Some(b"salt1234salt1234"), b"hunter2", 10);
        assert_eq!(a, b);
    }

    #[test]
    fn different_salts_give_different_keys() {
        let a = derive_key(Some(b"aaaaaaaaaaaaaaaa"), b"hunter2", 10);
        let b = derive_key(Some(b"bbbbbbbbbbbbbbbb"), b"hunter2", 10);
        assert_ne!(a, b);
    }

    #[test]
    fn no_salt_is_deterministic_per_password() {
        let a = derive_key(None, b"hunter2", 10);
        let b = derive_key(None, b"hunter2", 10);
        assert_eq!(a, b);
    }
}
