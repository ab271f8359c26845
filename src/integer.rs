//! Integer values: the fixed-width `Integer` type used for everyday
//! numbers, and [`BigInt`] for values that overflow a 64-bit word.
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::ops;

#[derive(Clone, Copy, Eq)]
enum IntPriv {
    PosInt(u64),
    NegInt(i64),
}

/// A signed or unsigned integer up to 64 bits wide, stored in whichever
/// native representation holds it exactly.
#[derive(Clone, Copy, Eq)]
pub struct Integer(IntPriv);

impl Integer {
    /// The smallest value an `Integer` can hold.
    pub fn min_value() -> Integer {
        Integer(IntPriv::NegInt(i64::MIN))
    }

    /// The largest value an `Integer` can hold.
    pub fn max_value() -> Integer {
        Integer(IntPriv::PosInt(u64::MAX))
    }

    /// `true` if this value fits in an `i64`.
    pub fn is_i64(&self) -> bool {
        match self.0 {
            IntPriv::PosInt(v) => v <= i64::MAX as u64,
            IntPriv::NegInt(_) => true,
        }
    }

    /// `true` if this value fits in a `u64`.
    pub fn is_u64(&self) -> bool {
        match self.0 {
            IntPriv::PosInt(_) => true,
            IntPriv::NegInt(v) => v >= 0,
        }
    }

    /// Returns the value as an `i64` if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self.0 {
            IntPriv::PosInt(v) if v <= i64::MAX as u64 => Some(v as i64),
            IntPriv::PosInt(_) => None,
            IntPriv::NegInt(v) => Some(v),
        }
    }

    /// Returns the value as a `u64` if it fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self.0 {
            IntPriv::PosInt(v) => Some(v),
            IntPriv::NegInt(v) if v >= 0 => Some(v as u64),
            IntPriv::NegInt(_) => None,
        }
    }

    /// Lossy conversion to `f64`, matching the wire format's behavior for
    /// values too large to round-trip exactly.
    pub fn as_f64(&self) -> f64 {
        match self.0 {
            IntPriv::PosInt(v) => v as f64,
            IntPriv::NegInt(v) => v as f64,
        }
    }

    /// The minimum number of bytes (1, 2, 4, or 8) needed to hold this
    /// value as a two's-complement big-endian integer.
    pub fn min_encode_bytes(&self) -> usize {
        match (self.as_i64(), self.as_u64()) {
            (Some(v), _) if (i8::MIN as i64..=i8::MAX as i64).contains(&v) => 1,
            (Some(v), _) if (i16::MIN as i64..=i16::MAX as i64).contains(&v) => 2,
            (Some(v), _) if (i32::MIN as i64..=i32::MAX as i64).contains(&v) => 4,
            _ => 8,
        }
    }
}

impl fmt::Debug for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            IntPriv::PosInt(v) => write!(f, "{}", v),
            IntPriv::NegInt(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PartialEq for Integer {
    fn eq(&self, other: &Integer) -> bool {
        match (self.0, other.0) {
            (IntPriv::PosInt(a), IntPriv::PosInt(b)) => a == b,
            (IntPriv::NegInt(a), IntPriv::NegInt(b)) => a == b,
            _ => self.as_i64().is_some() && self.as_i64() == other.as_i64(),
        }
    }
}

impl Ord for Integer {
    fn cmp(&self, other: &Integer) -> Ordering {
        match (self.0, other.0) {
            (IntPriv::PosInt(a), IntPriv::PosInt(b)) => a.cmp(&b),
            (IntPriv::NegInt(a), IntPriv::NegInt(b)) => a.cmp(&b),
            (IntPriv::PosInt(_), IntPriv::NegInt(_)) => Ordering::Greater,
            (IntPriv::NegInt(_), IntPriv::PosInt(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Integer {
    fn partial_cmp(&self, other: &Integer) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl ops::Add<i64> for Integer {
    type Output = Integer;
    fn add(self, rhs: i64) -> Integer {
        match self.0 {
            IntPriv::PosInt(v) => {
                if rhs >= 0 {
                    Integer(IntPriv::PosInt(v.wrapping_add(rhs as u64)))
                } else {
                    Integer::from(v as i128 + rhs as i128)
                }
            }
            IntPriv::NegInt(v) => Integer::from(v as i128 + rhs as i128),
        }
    }
}

impl From<i128> for Integer {
    fn from(v: i128) -> Integer {
        if v >= 0 {
            Integer(IntPriv::PosInt(v as u64))
        } else {
            Integer(IntPriv::NegInt(v as i64))
        }
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(v: $t) -> Integer {
                    Integer(IntPriv::PosInt(v as u64))
                }
            }
        )*
    };
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(v: $t) -> Integer {
                    if v >= 0 {
                        Integer(IntPriv::PosInt(v as u64))
                    } else {
                        Integer(IntPriv::NegInt(v as i64))
                    }
                }
            }
        )*
    };
}

impl_from_unsigned!(u8, u16, u32, u64, usize);
impl_from_signed!(i8, i16, i32, i64, isize);

macro_rules! impl_try_from {
    ($($t:ty),*) => {
        $(
            impl TryFrom<Integer> for $t {
                type Error = std::num::TryFromIntError;
                fn try_from(v: Integer) -> Result<$t, Self::Error> {
                    match v.0 {
                        IntPriv::PosInt(v) => <$t>::try_from(v),
                        IntPriv::NegInt(v) => <$t>::try_from(v),
                    }
                }
            }
        )*
    };
}

impl_try_from!(i8, i16, i32, i64, u8, u16, u32, u64);

/// An arbitrary-precision integer, used only once a value overflows
/// `i64`/`u64`. Stored as sign plus big-endian magnitude bytes, which is
/// also its on-the-wire representation.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct BigInt {
    negative: bool,
    /// Big-endian magnitude, no leading zero bytes (except a single zero
    /// for the value zero itself).
    magnitude: Vec<u8>,
}

impl BigInt {
    /// Builds a `BigInt` from its sign and big-endian magnitude bytes.
    pub fn from_parts(negative: bool, mut magnitude: Vec<u8>) -> BigInt {
        while magnitude.len() > 1 && magnitude[0] == 0 {
            magnitude.remove(0);
        }
        let negative = negative && magnitude.iter().any(|&b| b != 0);
        BigInt { negative, magnitude }
    }

    /// `true` if this value is negative.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Big-endian magnitude bytes, with no leading zero byte.
    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &BigInt) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self
                .magnitude
                .len()
                .cmp(&other.magnitude.len())
                .then_with(|| self.magnitude.cmp(&other.magnitude)),
            (true, true) => self
                .magnitude
                .len()
                .cmp(&other.magnitude.len())
                .then_with(|| self.magnitude.cmp(&other.magnitude))
                .reverse(),
        }
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &BigInt) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for BigInt {
    fn from(v: i64) -> BigInt {
        let negative = v < 0;
        let mag = (v as i128).unsigned_abs();
        let bytes = mag.to_be_bytes();
        let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
        BigInt::from_parts(negative, bytes[first_nonzero..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add() {
        let a = Integer::from(5i64);
        assert_eq!(a + 3, Integer::from(8i64));
        let b = Integer::from(u64::MAX);
        assert_eq!(b + (-1), Integer::from(u64::MAX - 1));
    }

    #[test]
    fn sub_via_negative_add() {
        let a = Integer::from(5i64);
        assert_eq!(a + (-10), Integer::from(-5i64));
    }

    #[test]
    fn min_encode_bytes_boundaries() {
        assert_eq!(Integer::from(0i64).min_encode_bytes(), 1);
        assert_eq!(Integer::from(200i64).min_encode_bytes(), 2);
        assert_eq!(Integer::from(100_000i64).min_encode_bytes(), 4);
        assert_eq!(Integer::from(i64::MAX).min_encode_bytes(), 8);
    }

    #[test]
    fn bigint_strips_leading_zeros() {
        let b = BigInt::from_parts(false, vec![0, 0, 1, 2]);
        assert_eq!(b.magnitude(), &[1, 2]);
    }

    #[test]
    fn bigint_from_i64_round_trips_sign() {
        let b = BigInt::from(-300i64);
        assert!(b.is_negative());
        assert_eq!(b.magnitude(), &[1, 44]);
    }
}
