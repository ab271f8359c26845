//! The dynamically-typed [`Value`] every frozen blob ultimately encodes.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::integer::{BigInt, Integer};
use crate::name::Name;
use crate::timestamp::{Instant, Timestamp};
use crate::uuid::Uuid;

/// An arbitrary-precision decimal, stored as `unscaled * 10^-scale`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Decimal {
    /// Unscaled integer value.
    pub unscaled: BigInt,
    /// Number of digits to the right of the decimal point.
    pub scale: i32,
}

/// An exact rational number, stored as a numerator and denominator. Not
/// normalized to lowest terms by the codec itself.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Rational {
    /// Numerator.
    pub numerator: BigInt,
    /// Denominator.
    pub denominator: BigInt,
}

/// A record: a named struct of named fields, encoded as a type name plus
/// a field-name-to-value mapping.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct Record {
    /// Fully-qualified record/struct name.
    pub name: Name,
    /// Field values, keyed by field name.
    pub fields: BTreeMap<String, Value>,
}

/// An opaque, externally-framed object: a class name plus the bytes its
/// own (non-codec) serializer produced. Thawing re-materializes it only
/// if the class name passes the active thaw allow-list; see
/// [`crate::allowlist`].
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Opaque {
    /// The class/type name the external serializer tagged this with.
    pub class: String,
    /// The externally-framed bytes, opaque to this codec.
    pub bytes: Vec<u8>,
}

/// A user-registered type that can appear inside a [`Value`] tree via
/// [`crate::ext::extend_freeze`]/[`crate::ext::extend_thaw`].
pub trait CustomValue: std::any::Any + std::fmt::Debug + Send + Sync {
    /// Upcasts to `&dyn Any` so the extension registry can recover the
    /// concrete type behind a `TypeId` lookup.
    fn as_any(&self) -> &dyn std::any::Any;
    /// Clones this value into a fresh boxed trait object.
    fn clone_box(&self) -> Box<dyn CustomValue>;
}

/// The dynamically-typed value this codec freezes and thaws.
#[derive(Debug)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A single Unicode scalar value.
    Char(char),
    /// An integer that fits in 64 bits.
    Int(Integer),
    /// An integer that does not fit in 64 bits.
    BigInt(BigInt),
    /// A 32-bit float.
    F32(f32),
    /// A 64-bit float.
    F64(f64),
    /// An arbitrary-precision decimal.
    Decimal(Decimal),
    /// An exact rational number.
    Rational(Rational),
    /// A raw byte array.
    Bytes(Vec<u8>),
    /// A UTF-8 string.
    Str(String),
    /// An interned, optionally namespaced name.
    Name(Name),
    /// An ordered, linked-style sequence.
    List(VecDeque<Value>),
    /// An ordered, indexed sequence.
    Vector(Vec<Value>),
    /// An unordered collection of unique values.
    Set(BTreeSet<Value>),
    /// A collection of unique values iterated in sorted order.
    SortedSet(BTreeSet<Value>),
    /// An unordered key-value mapping.
    Map(BTreeMap<Value, Value>),
    /// A key-value mapping iterated in sorted-by-key order.
    SortedMap(BTreeMap<Value, Value>),
    /// A FIFO queue.
    Queue(VecDeque<Value>),
    /// A named struct of named fields.
    Record(Record),
    /// A calendar-date timestamp.
    Timestamp(Timestamp),
    /// A high-precision instant.
    Instant(Instant),
    /// A 128-bit UUID.
    Uuid(Uuid),
    /// An opaque, externally-serialized object.
    Opaque(Opaque),
    /// A sub-tree whose opaque class was denied by the thaw allow-list.
    /// Carries the same shape as [`Opaque`] so [`crate::read_quarantined_unsafe`]
    /// can later decode it under a more permissive policy.
    Quarantined(Opaque),
    /// A sub-tree that failed to thaw (bad text-fallback parse, or a
    /// custom decoder error) without failing the whole decode.
    Unthawable(crate::error::Unthawable),
    /// A value with an attached out-of-band metadata mapping.
    Meta {
        /// The metadata, itself an arbitrary value (typically a map).
        metadata: Box<Value>,
        /// The underlying value the metadata describes.
        value: Box<Value>,
    },
    /// A user-registered custom type, encoded/decoded via the extension
    /// registry under a negative tag.
    Custom(Box<dyn CustomValue>),
}

impl Clone for Value {
    fn clone(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Bool(v) => Value::Bool(*v),
            Value::Char(v) => Value::Char(*v),
            Value::Int(v) => Value::Int(*v),
            Value::BigInt(v) => Value::BigInt(v.clone()),
            Value::F32(v) => Value::F32(*v),
            Value::F64(v) => Value::F64(*v),
            Value::Decimal(v) => Value::Decimal(v.clone()),
            Value::Rational(v) => Value::Rational(v.clone()),
            Value::Bytes(v) => Value::Bytes(v.clone()),
            Value::Str(v) => Value::Str(v.clone()),
            Value::Name(v) => Value::Name(v.clone()),
            Value::List(v) => Value::List(v.clone()),
            Value::Vector(v) => Value::Vector(v.clone()),
            Value::Set(v) => Value::Set(v.clone()),
            Value::SortedSet(v) => Value::SortedSet(v.clone()),
            Value::Map(v) => Value::Map(v.clone()),
            Value::SortedMap(v) => Value::SortedMap(v.clone()),
            Value::Queue(v) => Value::Queue(v.clone()),
            Value::Record(v) => Value::Record(v.clone()),
            Value::Timestamp(v) => Value::Timestamp(*v),
            Value::Instant(v) => Value::Instant(*v),
            Value::Uuid(v) => Value::Uuid(*v),
            Value::Opaque(v) => Value::Opaque(v.clone()),
            Value::Quarantined(v) => Value::Quarantined(v.clone()),
            Value::Unthawable(v) => Value::Unthawable(v.clone()),
            Value::Meta { metadata, value } => Value::Meta { metadata: metadata.clone(), value: value.clone() },
            Value::Custom(v) => Value::Custom(v.clone_box()),
        }
    }
}

impl Value {
    /// `true` if this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` if this is [`Value::Bool`].
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// This value as a `bool`, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// `true` if this is [`Value::Int`] or [`Value::BigInt`].
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_) | Value::BigInt(_))
    }

    /// This value as an `i64`, if it is an in-range integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => v.as_i64(),
            _ => None,
        }
    }

    /// `true` if this is [`Value::Str`].
    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// This value as a `&str`, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// `true` if this is [`Value::Bytes`].
    pub fn is_bytes(&self) -> bool {
        matches!(self, Value::Bytes(_))
    }

    /// This value as a byte slice, if it is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// `true` if this is any of the collection variants.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Value::List(_)
                | Value::Vector(_)
                | Value::Set(_)
                | Value::SortedSet(_)
                | Value::Map(_)
                | Value::SortedMap(_)
                | Value::Queue(_)
        )
    }

    /// This value as a slice of elements, if it is an ordered sequence.
    pub fn as_vector(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// This value as a map, if it is [`Value::Map`] or [`Value::SortedMap`].
    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(m) | Value::SortedMap(m) => Some(m),
            _ => None,
        }
    }

    /// `true` if this is [`Value::Meta`].
    pub fn has_metadata(&self) -> bool {
        matches!(self, Value::Meta { .. })
    }

    /// The metadata attached to this value, if any.
    pub fn metadata(&self) -> Option<&Value> {
        match self {
            Value::Meta { metadata, .. } => Some(metadata),
            _ => None,
        }
    }

    /// Strips any attached metadata, returning the underlying value.
    /// Values without metadata are returned unchanged.
    pub fn strip_metadata(self) -> Value {
        match self {
            Value::Meta { value, .. } => value.strip_metadata(),
            other => other,
        }
    }

    /// The value with metadata ignored, by reference.
    pub fn without_metadata(&self) -> &Value {
        match self {
            Value::Meta { value, .. } => value.without_metadata(),
            other => other,
        }
    }

    /// A rank used to order otherwise-incomparable variants. Stable across
    /// calls, but not guaranteed stable across crate versions.
    fn variant_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Char(_) => 2,
            Value::Int(_) => 3,
            Value::BigInt(_) => 4,
            Value::F32(_) => 5,
            Value::F64(_) => 6,
            Value::Decimal(_) => 7,
            Value::Rational(_) => 8,
            Value::Bytes(_) => 9,
            Value::Str(_) => 10,
            Value::Name(_) => 11,
            Value::List(_) => 12,
            Value::Vector(_) => 13,
            Value::Set(_) => 14,
            Value::SortedSet(_) => 15,
            Value::Map(_) => 16,
            Value::SortedMap(_) => 17,
            Value::Queue(_) => 18,
            Value::Record(_) => 19,
            Value::Timestamp(_) => 20,
            Value::Instant(_) => 21,
            Value::Uuid(_) => 22,
            Value::Opaque(_) => 23,
            Value::Quarantined(_) => 24,
            Value::Unthawable(_) => 25,
            Value::Meta { .. } => 26,
            Value::Custom(_) => 27,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Char(a), Char(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (BigInt(a), BigInt(b)) => a.cmp(b),
            (F32(a), F32(b)) => a.total_cmp(b),
            (F64(a), F64(b)) => a.total_cmp(b),
            (Decimal(a), Decimal(b)) => a.cmp(b),
            (Rational(a), Rational(b)) => a.cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            (Name(a), Name(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            (Vector(a), Vector(b)) => a.cmp(b),
            (Set(a), Set(b)) => a.cmp(b),
            (SortedSet(a), SortedSet(b)) => a.cmp(b),
            (Map(a), Map(b)) => a.cmp(b),
            (SortedMap(a), SortedMap(b)) => a.cmp(b),
            (Queue(a), Queue(b)) => a.cmp(b),
            (Record(a), Record(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (Instant(a), Instant(b)) => a.cmp(b),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            (Opaque(a), Opaque(b)) => a.cmp(b),
            (Quarantined(a), Quarantined(b)) => a.cmp(b),
            (Unthawable(a), Unthawable(b)) => (&a.kind, &a.cause).cmp(&(&b.kind, &b.cause)),
            (
                Meta { metadata: am, value: av },
                Meta { metadata: bm, value: bv },
            ) => av.cmp(bv).then_with(|| am.cmp(bm)),
            (Custom(a), Custom(b)) => format!("{:?}", a).cmp(&format!("{:?}", b)),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl std::hash::Hash for crate::error::Unthawable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.cause.hash(state);
    }
}

impl Eq for crate::error::Unthawable {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_rank_orders_distinct_types() {
        assert!(Value::Null < Value::Bool(false));
        assert!(Value::Int(Integer::from(1i64)) < Value::Str("a".into()));
    }

    #[test]
    fn float_ord_handles_nan_without_panicking() {
        let a = Value::F64(f64::NAN);
        let b = Value::F64(1.0);
        let _ = a.cmp(&b);
    }

    #[test]
    fn metadata_strip_and_access() {
        let v = Value::Meta {
            metadata: Box::new(Value::Str("m".into())),
            value: Box::new(Value::Int(Integer::from(3i64))),
        };
        assert!(v.has_metadata());
        assert_eq!(v.metadata(), Some(&Value::Str("m".into())));
        assert_eq!(v.strip_metadata(), Value::Int(Integer::from(3i64)));
    }
}
