//! UUID values, encoded on the wire as two big-endian `i64` halves.
use std::fmt;

/// A 128-bit universally unique identifier.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Uuid {
    bytes: [u8; 16],
}

impl Uuid {
    /// Builds a `Uuid` from its two big-endian 64-bit halves, the same
    /// split used on the wire.
    pub fn from_halves(high: i64, low: i64) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&high.to_be_bytes());
        bytes[8..].copy_from_slice(&low.to_be_bytes());
        Uuid { bytes }
    }

    /// Splits this UUID back into its two big-endian 64-bit halves.
    pub fn to_halves(self) -> (i64, i64) {
        let high = i64::from_be_bytes(self.bytes[..8].try_into().unwrap());
        let low = i64::from_be_bytes(self.bytes[8..].try_into().unwrap());
        (high, low)
    }

    /// Builds a `Uuid` from its 16 raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Uuid {
        Uuid { bytes }
    }

    /// The 16 raw bytes of this UUID.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Generates a random (version-agnostic) UUID using the process CSPRNG.
    pub fn new_random() -> Uuid {
        let mut bytes = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Uuid { bytes }
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
