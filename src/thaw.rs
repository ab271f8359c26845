//! The thawer dispatch (§4.3): reads one type tag and recursively consumes
//! exactly the body that tag promises, refusing to allocate past what the
//! remaining bytes could possibly back and bounding nesting depth via
//! [`DepthTracker`].
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use byteorder::{BigEndian, ReadBytesExt};

use crate::allowlist::AllowList;
use crate::depth_tracking::DepthTracker;
use crate::error::{Error, Result, Unthawable, UnthawableKind};
use crate::integer::{BigInt, Integer};
use crate::name::Name;
use crate::tag;
use crate::timestamp::{Instant, Timestamp};
use crate::uuid::Uuid;
use crate::value::{Decimal, Opaque, Rational, Record, Value};

/// Options controlling how [`crate::thaw`] decodes a value.
pub struct ThawOptions<'a> {
    /// Whether a `METADATA` tag should be reconstructed as a
    /// [`Value::Meta`] wrapper, or have its metadata silently dropped.
    /// Defaults to `true`.
    pub include_metadata: bool,
    /// Policy governing which opaque class names may be re-materialized.
    /// A denied class is never instantiated: it becomes a
    /// [`Value::Quarantined`] placeholder instead of failing the decode.
    pub allow_list: Option<&'a AllowList>,
    /// Applied to each decoded element as it is inserted into its parent
    /// container (collection, map, record field, or metadata wrapper).
    /// Defaults to identity.
    pub thaw_transform: Option<&'a dyn Fn(Value) -> Value>,
}

impl Default for ThawOptions<'_> {
    fn default() -> Self {
        ThawOptions { include_metadata: true, allow_list: None, thaw_transform: None }
    }
}

fn transformed(opts: &ThawOptions, value: Value) -> Value {
    match opts.thaw_transform {
        Some(f) => f(value),
        None => value,
    }
}

/// Decodes a single tagged payload from the front of `buf` (no header, no
/// compression, no encryption — those are undone by the orchestration in
/// `lib.rs`), advancing `buf` past the bytes consumed.
pub fn thaw_value(buf: &mut &[u8], opts: &ThawOptions) -> Result<Value> {
    let mut depth = DepthTracker::new();
    thaw_rec(buf, opts, &mut depth)
}

fn check_ceiling(buf: &[u8], declared: u32, step: &'static str) -> Result<()> {
    if declared as usize > buf.len() {
        return Err(Error::CorruptStream { step });
    }
    Ok(())
}

fn read_vec(buf: &mut &[u8], len: usize, step: &'static str) -> Result<Vec<u8>> {
    if len > buf.len() {
        return Err(Error::CorruptStream { step });
    }
    let (head, tail) = buf.split_at(len);
    let out = head.to_vec();
    *buf = tail;
    Ok(out)
}

macro_rules! read_prim {
    ($name:ident, $t:ty, $method:ident) => {
        fn $name(buf: &mut &[u8], step: &'static str) -> Result<$t> {
            buf.$method().map_err(|_| Error::CorruptStream { step })
        }
    };
    ($name:ident, $t:ty, $method:ident, $order:ty) => {
        fn $name(buf: &mut &[u8], step: &'static str) -> Result<$t> {
            buf.$method::<$order>().map_err(|_| Error::CorruptStream { step })
        }
    };
}

read_prim!(read_u8, u8, read_u8);
read_prim!(read_i8, i8, read_i8);
read_prim!(read_u32, u32, read_u32, BigEndian);
read_prim!(read_i32, i32, read_i32, BigEndian);
read_prim!(read_i64, i64, read_i64, BigEndian);
read_prim!(read_u64, u64, read_u64, BigEndian);
read_prim!(read_f32, f32, read_f32, BigEndian);
read_prim!(read_f64, f64, read_f64, BigEndian);

fn read_bigint_body(buf: &mut &[u8], step: &'static str) -> Result<BigInt> {
    let negative = read_u8(buf, step)? != 0;
    let len = read_u32(buf, step)?;
    check_ceiling(buf, len, step)?;
    let magnitude = read_vec(buf, len as usize, step)?;
    Ok(BigInt::from_parts(negative, magnitude))
}

/// Reads a tagged string where the only two tags that can legally appear
/// are `small` (1-byte length prefix) and `general` (4-byte length
/// prefix) — the same pair [`crate::freeze::freeze_text`] chose between.
fn read_tagged_text(buf: &mut &[u8], small: i8, general: i8, step: &'static str) -> Result<String> {
    let t = read_i8(buf, step)?;
    let bytes = if t == small {
        let len = read_u8(buf, step)? as usize;
        read_vec(buf, len, step)?
    } else if t == general {
        let len = read_u32(buf, step)?;
        check_ceiling(buf, len, step)?;
        read_vec(buf, len as usize, step)?
    } else {
        return Err(Error::CorruptStream { step });
    };
    String::from_utf8(bytes).map_err(|_| Error::CorruptStream { step })
}

fn thaw_rec(buf: &mut &[u8], opts: &ThawOptions, depth: &mut DepthTracker) -> Result<Value> {
    let raw_tag = read_i8(buf, "type tag")?;

    if tag::is_custom(raw_tag) {
        depth.consume_scalar()?;
        return crate::ext::decode_custom(raw_tag, buf);
    }

    if raw_tag == tag::SYMBOLIC_CUSTOM {
        depth.consume_scalar()?;
        let len = read_u32(buf, "symbolic custom name length")?;
        check_ceiling(buf, len, "symbolic custom name")?;
        let name_bytes = read_vec(buf, len as usize, "symbolic custom name")?;
        let name = String::from_utf8(name_bytes).map_err(|_| Error::CorruptStream { step: "symbolic custom name utf8" })?;
        return crate::ext::decode_custom_named(&name, buf);
    }

    if raw_tag == tag::METADATA {
        depth.consume_container(2)?;
        let metadata = thaw_rec(buf, opts, depth)?;
        let value = thaw_rec(buf, opts, depth)?;
        return if opts.include_metadata {
            Ok(Value::Meta { metadata: Box::new(metadata), value: Box::new(value) })
        } else {
            Ok(value)
        };
    }

    if raw_tag == tag::NULL {
        depth.consume_scalar()?;
        return Ok(Value::Null);
    }
    if raw_tag == tag::BOOLEAN {
        depth.consume_scalar()?;
        return Ok(Value::Bool(read_u8(buf, "boolean body")? != 0));
    }
    if raw_tag == tag::CHAR {
        depth.consume_scalar()?;
        let code = read_u32(buf, "char body")?;
        let c = char::from_u32(code).ok_or(Error::CorruptStream { step: "char body" })?;
        return Ok(Value::Char(c));
    }
    if matches!(raw_tag, t if t == tag::I8 || t == tag::I64_AS_I8) {
        depth.consume_scalar()?;
        return Ok(Value::Int(Integer::from(read_i8(buf, "i8 body")?)));
    }
    if matches!(raw_tag, t if t == tag::I16 || t == tag::I64_AS_I16) {
        depth.consume_scalar()?;
        let v = buf.read_i16::<BigEndian>().map_err(|_| Error::CorruptStream { step: "i16 body" })?;
        return Ok(Value::Int(Integer::from(v)));
    }
    if matches!(raw_tag, t if t == tag::I32 || t == tag::I64_AS_I32) {
        depth.consume_scalar()?;
        return Ok(Value::Int(Integer::from(read_i32(buf, "i32 body")?)));
    }
    if raw_tag == tag::I64 {
        depth.consume_scalar()?;
        return Ok(Value::Int(Integer::from(read_i64(buf, "i64 body")?)));
    }
    if raw_tag == tag::BIGINT {
        depth.consume_scalar()?;
        return Ok(Value::BigInt(read_bigint_body(buf, "bigint body")?));
    }
    // The alternate framing is only ever emitted for a Value::Int whose
    // magnitude overflowed i64 (see freeze::freeze_int), so it always
    // carries a non-negative magnitude that fits in 8 bytes.
    if raw_tag == tag::BIGINT_ALT {
        depth.consume_scalar()?;
        let big = read_bigint_body(buf, "bigint-alt body")?;
        if big.is_negative() || big.magnitude().len() > 8 {
            return Err(Error::CorruptStream { step: "bigint-alt body" });
        }
        let mut padded = [0u8; 8];
        padded[8 - big.magnitude().len()..].copy_from_slice(big.magnitude());
        return Ok(Value::Int(Integer::from(u64::from_be_bytes(padded))));
    }
    if raw_tag == tag::F32 {
        depth.consume_scalar()?;
        return Ok(Value::F32(read_f32(buf, "f32 body")?));
    }
    if raw_tag == tag::F64 {
        depth.consume_scalar()?;
        return Ok(Value::F64(read_f64(buf, "f64 body")?));
    }
    if raw_tag == tag::BIGDEC {
        depth.consume_scalar()?;
        let scale = read_i32(buf, "bigdec scale")?;
        let unscaled = read_bigint_body(buf, "bigdec unscaled")?;
        return Ok(Value::Decimal(Decimal { unscaled, scale }));
    }
    if raw_tag == tag::RATIONAL {
        depth.consume_scalar()?;
        let numerator = read_bigint_body(buf, "rational numerator")?;
        let denominator = read_bigint_body(buf, "rational denominator")?;
        return Ok(Value::Rational(Rational { numerator, denominator }));
    }
    if raw_tag == tag::BYTE_ARRAY {
        depth.consume_scalar()?;
        let len = read_u32(buf, "byte array length")?;
        check_ceiling(buf, len, "byte array body")?;
        return Ok(Value::Bytes(read_vec(buf, len as usize, "byte array body")?));
    }
    if matches!(raw_tag, t if t == tag::SMALL_STRING || t == tag::STRING) {
        depth.consume_scalar()?;
        let bytes = if raw_tag == tag::SMALL_STRING {
            let len = read_u8(buf, "small string length")? as usize;
            read_vec(buf, len, "small string body")?
        } else {
            let len = read_u32(buf, "string length")?;
            check_ceiling(buf, len, "string body")?;
            read_vec(buf, len as usize, "string body")?
        };
        let s = String::from_utf8(bytes).map_err(|_| Error::CorruptStream { step: "string utf8" })?;
        return Ok(Value::Str(s));
    }
    if matches!(raw_tag, t if t == tag::SMALL_NAME || t == tag::NAME) {
        depth.consume_scalar()?;
        let bytes = if raw_tag == tag::SMALL_NAME {
            let len = read_u8(buf, "small name length")? as usize;
            read_vec(buf, len, "small name body")?
        } else {
            let len = read_u32(buf, "name length")?;
            check_ceiling(buf, len, "name body")?;
            read_vec(buf, len as usize, "name body")?
        };
        let s = String::from_utf8(bytes).map_err(|_| Error::CorruptStream { step: "name utf8" })?;
        return Ok(Value::Name(Name::parse(&s)));
    }
    if raw_tag == tag::CALENDAR_DATE {
        depth.consume_scalar()?;
        let millis = read_i64(buf, "calendar date body")?;
        return Ok(Value::Timestamp(Timestamp::from_epoch_millis(millis)));
    }
    if raw_tag == tag::INSTANT {
        depth.consume_scalar()?;
        let secs = read_i64(buf, "instant secs")?;
        let nanos = read_i64(buf, "instant nanos")?;
        return Ok(Value::Instant(Instant::new(secs, nanos)));
    }
    if raw_tag == tag::UUID {
        depth.consume_scalar()?;
        let hi = read_i64(buf, "uuid high")?;
        let lo = read_i64(buf, "uuid low")?;
        return Ok(Value::Uuid(Uuid::from_halves(hi, lo)));
    }
    if raw_tag == tag::OPAQUE {
        let class = read_tagged_text(buf, tag::SMALL_STRING, tag::STRING, "opaque class name")?;
        let len = read_u32(buf, "opaque body length")?;
        check_ceiling(buf, len, "opaque body")?;
        let bytes = read_vec(buf, len as usize, "opaque body")?;
        depth.consume_scalar()?;
        let opaque = Opaque { class, bytes };
        return match opts.allow_list {
            Some(list) if !list.is_allowed(&opaque.class) => Ok(Value::Quarantined(opaque)),
            _ => Ok(Value::Opaque(opaque)),
        };
    }
    if raw_tag == tag::TEXT_FALLBACK {
        let len = read_u32(buf, "text fallback length")?;
        check_ceiling(buf, len, "text fallback body")?;
        let bytes = read_vec(buf, len as usize, "text fallback body")?;
        depth.consume_scalar()?;
        let cause = match String::from_utf8(bytes) {
            Ok(s) => format!("text-fallback value not re-instantiated: {}", s),
            Err(_) => "text-fallback value was not valid UTF-8".to_string(),
        };
        return Ok(Value::Unthawable(Unthawable { kind: UnthawableKind::Reader, cause }));
    }

    // Sequences: compact (0..=COMPACT_MAX_LEN, tag baked into the base) or
    // general (4-byte count).
    if let Some(len) = compact_len(raw_tag, tag::COMPACT_VECTOR_BASE) {
        return thaw_vector(buf, opts, depth, len);
    }
    if raw_tag == tag::VECTOR {
        let len = read_u32(buf, "vector length")?;
        check_ceiling(buf, len, "vector body")?;
        return thaw_vector(buf, opts, depth, len);
    }
    if let Some(len) = compact_len(raw_tag, tag::COMPACT_LIST_BASE) {
        return thaw_list(buf, opts, depth, len);
    }
    if raw_tag == tag::LIST || raw_tag == tag::SEQUENCE {
        let len = read_u32(buf, "list length")?;
        check_ceiling(buf, len, "list body")?;
        return thaw_list(buf, opts, depth, len);
    }
    if raw_tag == tag::QUEUE {
        let len = read_u32(buf, "queue length")?;
        check_ceiling(buf, len, "queue body")?;
        depth.consume_container(len)?;
        let mut items = VecDeque::new();
        for _ in 0..len {
            let item = thaw_rec(buf, opts, depth)?;
            items.push_back(transformed(opts, item));
        }
        return Ok(Value::Queue(items));
    }
    if let Some(len) = compact_len(raw_tag, tag::COMPACT_SET_BASE) {
        return thaw_set(buf, opts, depth, len, false);
    }
    if raw_tag == tag::SET {
        let len = read_u32(buf, "set length")?;
        check_ceiling(buf, len, "set body")?;
        return thaw_set(buf, opts, depth, len, false);
    }
    if raw_tag == tag::SORTED_SET {
        let len = read_u32(buf, "sorted set length")?;
        check_ceiling(buf, len, "sorted set body")?;
        return thaw_set(buf, opts, depth, len, true);
    }
    if let Some(len) = compact_len(raw_tag, tag::COMPACT_MAP_BASE) {
        return thaw_map(buf, opts, depth, len, false);
    }
    if raw_tag == tag::MAP {
        let pair_count = read_u32(buf, "map entry count")?;
        check_ceiling(buf, pair_count, "map body")?;
        return thaw_map(buf, opts, depth, pair_count / 2, false);
    }
    if raw_tag == tag::SORTED_MAP {
        let pair_count = read_u32(buf, "sorted map entry count")?;
        check_ceiling(buf, pair_count, "sorted map body")?;
        return thaw_map(buf, opts, depth, pair_count / 2, true);
    }
    if raw_tag == tag::RECORD {
        let name = Name::parse(&read_tagged_text(buf, tag::SMALL_NAME, tag::NAME, "record name")?);
        let pair_count = read_u32(buf, "record field count")?;
        check_ceiling(buf, pair_count, "record body")?;
        depth.consume_container(pair_count)?;
        let mut fields = BTreeMap::new();
        for _ in 0..(pair_count / 2) {
            let key = read_tagged_text(buf, tag::SMALL_STRING, tag::STRING, "record field name")?;
            let value = thaw_rec(buf, opts, depth)?;
            fields.insert(key, transformed(opts, value));
        }
        return Ok(Value::Record(Record { name, fields }));
    }

    Err(Error::CorruptStream { step: "unknown type tag" })
}

/// Returns the compact length encoded in `tag` relative to `base`, if
/// `tag` falls within `base ..= base + COMPACT_MAX_LEN`.
fn compact_len(raw_tag: i8, base: i8) -> Option<u32> {
    let max = base + tag::COMPACT_MAX_LEN as i8;
    if raw_tag >= base && raw_tag <= max {
        Some((raw_tag - base) as u32)
    } else {
        None
    }
}

fn thaw_vector(buf: &mut &[u8], opts: &ThawOptions, depth: &mut DepthTracker, len: u32) -> Result<Value> {
    depth.consume_container(len)?;
    let mut items = Vec::with_capacity(len.min(4096) as usize);
    for _ in 0..len {
        let item = thaw_rec(buf, opts, depth)?;
        items.push(transformed(opts, item));
    }
    Ok(Value::Vector(items))
}

fn thaw_list(buf: &mut &[u8], opts: &ThawOptions, depth: &mut DepthTracker, len: u32) -> Result<Value> {
    depth.consume_container(len)?;
    let mut items = VecDeque::new();
    for _ in 0..len {
        let item = thaw_rec(buf, opts, depth)?;
        items.push_back(transformed(opts, item));
    }
    Ok(Value::List(items))
}

fn thaw_set(
    buf: &mut &[u8],
    opts: &ThawOptions,
    depth: &mut DepthTracker,
    len: u32,
    sorted: bool,
) -> Result<Value> {
    depth.consume_container(len)?;
    let mut items = BTreeSet::new();
    for _ in 0..len {
        let item = thaw_rec(buf, opts, depth)?;
        items.insert(transformed(opts, item));
    }
    Ok(if sorted { Value::SortedSet(items) } else { Value::Set(items) })
}

fn thaw_map(
    buf: &mut &[u8],
    opts: &ThawOptions,
    depth: &mut DepthTracker,
    len: u32,
    sorted: bool,
) -> Result<Value> {
    depth.consume_container(2 * len)?;
    let mut items = BTreeMap::new();
    for _ in 0..len {
        let key = thaw_rec(buf, opts, depth)?;
        let value = thaw_rec(buf, opts, depth)?;
        items.insert(transformed(opts, key), transformed(opts, value));
    }
    Ok(if sorted { Value::SortedMap(items) } else { Value::Map(items) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freeze::{freeze_value, FreezeOptions};

    fn round_trip(v: &Value) -> Value {
        let mut buf = Vec::new();
        freeze_value(v, &mut buf, &FreezeOptions::default()).unwrap();
        let mut slice = buf.as_slice();
        thaw_value(&mut slice, &ThawOptions::default()).unwrap()
    }

    #[test]
    fn null_round_trips() {
        assert_eq!(round_trip(&Value::Null), Value::Null);
    }

    #[test]
    fn scalar_round_trips() {
        assert_eq!(round_trip(&Value::Int(Integer::from(-5i64))), Value::Int(Integer::from(-5i64)));
        assert_eq!(round_trip(&Value::Bool(true)), Value::Bool(true));
        assert_eq!(round_trip(&Value::Char('x')), Value::Char('x'));
        assert_eq!(round_trip(&Value::F64(1.5)), Value::F64(1.5));
    }

    #[test]
    fn integer_above_i64_max_round_trips_via_bigint_alt() {
        let v = Value::Int(Integer::from(u64::MAX));
        assert_eq!(round_trip(&v), v);
        let v = Value::Int(Integer::from(i64::MAX as u64 + 1));
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn string_round_trips_small_and_large() {
        assert_eq!(round_trip(&Value::Str("hi".into())), Value::Str("hi".into()));
        let long = "a".repeat(500);
        assert_eq!(round_trip(&Value::Str(long.clone())), Value::Str(long));
    }

    #[test]
    fn collections_round_trip() {
        let v = Value::Vector(vec![Value::Int(Integer::from(1i64)), Value::Int(Integer::from(2i64))]);
        assert_eq!(round_trip(&v), v);
        let v = Value::Vector(vec![Value::Null; 7]);
        assert_eq!(round_trip(&v), v);

        let mut m = BTreeMap::new();
        m.insert(Value::Str("k".into()), Value::Int(Integer::from(1i64)));
        let v = Value::Map(m);
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn record_round_trips() {
        let mut fields = BTreeMap::new();
        fields.insert("x".to_string(), Value::Int(Integer::from(1i64)));
        let v = Value::Record(Record { name: Name::local("Point"), fields });
        assert_eq!(round_trip(&v), v);
    }

    #[test]
    fn metadata_dropped_when_disabled() {
        let v = Value::Meta {
            metadata: Box::new(Value::Str("m".into())),
            value: Box::new(Value::Int(Integer::from(3i64))),
        };
        let mut buf = Vec::new();
        freeze_value(&v, &mut buf, &FreezeOptions::default()).unwrap();
        let mut slice = buf.as_slice();
        let opts = ThawOptions { include_metadata: false, allow_list: None, thaw_transform: None };
        let thawed = thaw_value(&mut slice, &opts).unwrap();
        assert_eq!(thawed, Value::Int(Integer::from(3i64)));
    }

    #[test]
    fn denied_opaque_class_is_quarantined_not_rejected() {
        let opaque = Opaque { class: "danger.Bomb".to_string(), bytes: vec![1, 2, 3] };
        let v = Value::Opaque(opaque);
        let mut buf = Vec::new();
        freeze_value(&v, &mut buf, &FreezeOptions::default()).unwrap();
        let mut slice = buf.as_slice();
        let deny = AllowList::deny_all();
        let opts = ThawOptions { include_metadata: true, allow_list: Some(&deny), thaw_transform: None };
        let thawed = thaw_value(&mut slice, &opts).unwrap();
        assert!(matches!(thawed, Value::Quarantined(_)));
    }

    #[test]
    fn truncated_stream_errors_instead_of_panicking() {
        let mut slice: &[u8] = &[tag::STRING as u8, 0, 0, 0, 100];
        let err = thaw_value(&mut slice, &ThawOptions::default()).unwrap_err();
        assert!(matches!(err, Error::CorruptStream { .. }));
    }

    #[test]
    fn thaw_transform_rewrites_container_elements() {
        let v = Value::Vector(vec![Value::Int(Integer::from(1i64)), Value::Int(Integer::from(2i64))]);
        let mut buf = Vec::new();
        freeze_value(&v, &mut buf, &FreezeOptions::default()).unwrap();
        let mut slice = buf.as_slice();

        let double = |value: Value| match value {
            Value::Int(i) => Value::Int(Integer::from(i.as_i64().unwrap() * 2)),
            other => other,
        };
        let opts = ThawOptions { include_metadata: true, allow_list: None, thaw_transform: Some(&double) };
        let thawed = thaw_value(&mut slice, &opts).unwrap();
        assert_eq!(
            thawed,
            Value::Vector(vec![Value::Int(Integer::from(2i64)), Value::Int(Integer::from(4i64))])
        );
    }

    #[test]
    fn thaw_transform_does_not_touch_the_top_level_value() {
        let v = Value::Int(Integer::from(1i64));
        let mut buf = Vec::new();
        freeze_value(&v, &mut buf, &FreezeOptions::default()).unwrap();
        let mut slice = buf.as_slice();

        let double = |value: Value| match value {
            Value::Int(i) => Value::Int(Integer::from(i.as_i64().unwrap() * 2)),
            other => other,
        };
        let opts = ThawOptions { include_metadata: true, allow_list: None, thaw_transform: Some(&double) };
        let thawed = thaw_value(&mut slice, &opts).unwrap();
        assert_eq!(thawed, Value::Int(Integer::from(1i64)));
    }

    #[test]
    fn deeply_nested_vectors_hit_depth_limit() {
        let mut buf = Vec::new();
        for _ in 0..(crate::MAX_DEPTH + 5) {
            buf.push(tag::VECTOR as u8);
            buf.extend_from_slice(&1u32.to_be_bytes());
        }
        buf.push(tag::NULL as u8);
        let mut slice = buf.as_slice();
        let err = thaw_value(&mut slice, &ThawOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ParseLimit(_)));
    }
}
