//! The fixed type-tag table. Each built-in type has a stable, signed 8-bit
//! tag. Positive tags are reserved for this crate; negative tags address
//! user-registered types (see [`crate::ext`]).

/// Reserved, never emitted on the wire.
pub const RESERVED: i8 = 0;

/// A custom value tagged with a symbolic name rather than an integer id:
/// body is a length-prefixed UTF-8 name followed by the registered
/// encoder's own bytes. Integer-tagged customs instead go out directly
/// under their own negative tag byte (see [`is_custom`]).
pub const SYMBOLIC_CUSTOM: i8 = 1;

pub const BYTE_ARRAY: i8 = 2;
pub const NULL: i8 = 3;
pub const BOOLEAN: i8 = 4;
pub const TEXT_FALLBACK: i8 = 5;
pub const OPAQUE: i8 = 6;

pub const CHAR: i8 = 10;
pub const STRING: i8 = 13;
pub const NAME: i8 = 14;

pub const LIST: i8 = 20;
pub const VECTOR: i8 = 21;
pub const SET: i8 = 23;
pub const SEQUENCE: i8 = 24;
pub const METADATA: i8 = 25;
pub const QUEUE: i8 = 26;
pub const MAP: i8 = 27;
pub const SORTED_SET: i8 = 28;
pub const SORTED_MAP: i8 = 29;

pub const I8: i8 = 40;
pub const I16: i8 = 41;
pub const I32: i8 = 42;
pub const I64: i8 = 43;
pub const BIGINT: i8 = 44;
pub const BIGINT_ALT: i8 = 45;

pub const F32: i8 = 60;
pub const F64: i8 = 61;
pub const BIGDEC: i8 = 62;

pub const RATIONAL: i8 = 70;

pub const RECORD: i8 = 80;

pub const CALENDAR_DATE: i8 = 90;
pub const UUID: i8 = 91;

pub const I64_AS_I8: i8 = 100;
pub const I64_AS_I16: i8 = 101;
pub const I64_AS_I32: i8 = 102;

pub const SMALL_STRING: i8 = 105;
pub const SMALL_NAME: i8 = 106;

/// Compact collection tags for 0..=3 elements. `COMPACT_BASE + n` is the
/// tag for a vector literal of length `n`; list/set/map/sorted variants
/// occupy adjoining ranges so each collection kind gets a 4-wide block.
pub const COMPACT_VECTOR_BASE: i8 = 110;
pub const COMPACT_LIST_BASE: i8 = 114;
pub const COMPACT_SET_BASE: i8 = 118;
pub const COMPACT_MAP_BASE: i8 = 122;

/// High-precision instant: (epoch-seconds: i64, nanos: i64).
pub const INSTANT: i8 = 126;

/// Smallest tag value reserved for this crate's own use. Anything below
/// this boundary is in the negative user-extension space.
pub const MIN_BUILTIN: i8 = 0;

/// Maximum number of elements a compact collection tag can represent
/// without falling back to the general counted form.
pub const COMPACT_MAX_LEN: usize = 3;

/// Threshold at or below which strings/names use the small (1-byte
/// length prefix) tag instead of the general (4-byte length prefix) one.
pub const SMALL_LEN_MAX: usize = 127;

/// `true` if `tag` addresses a user-registered custom type.
pub fn is_custom(tag: i8) -> bool {
    tag < 0
}

/// Converts a custom id in `[1, 128]` to its wire tag `-id`.
pub fn custom_tag_for_id(id: u8) -> i8 {
    -(id as i16) as i8
}
