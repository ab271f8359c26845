//! The freezer dispatch (§4.2): recursively encodes a [`Value`] tree into
//! the type-tagged byte stream.
use byteorder::{BigEndian, WriteBytesExt};

use crate::allowlist::AllowList;
use crate::error::{Error, Result};
use crate::tag;
use crate::value::Value;

/// Options controlling how [`crate::freeze`] encodes a value.
pub struct FreezeOptions<'a> {
    /// Whether to emit attached metadata (`Value::Meta`). Defaults to
    /// `true`.
    pub include_metadata: bool,
    /// Policy governing which opaque class names may be frozen.
    pub allow_list: Option<&'a AllowList>,
}

impl Default for FreezeOptions<'_> {
    fn default() -> Self {
        FreezeOptions { include_metadata: true, allow_list: None }
    }
}

/// Encodes `value` into `buf` as a single tagged payload (no header, no
/// compression, no encryption — those are applied by the orchestration
/// in `lib.rs`).
pub fn freeze_value(value: &Value, buf: &mut Vec<u8>, opts: &FreezeOptions) -> Result<()> {
    if let Value::Meta { metadata, value } = value {
        if opts.include_metadata {
            buf.push(tag::METADATA as u8);
            freeze_value(metadata, buf, opts)?;
            freeze_value(value, buf, opts)?;
            return Ok(());
        }
        return freeze_value(value, buf, opts);
    }

    match value {
        Value::Null => buf.push(tag::NULL as u8),
        Value::Bool(b) => {
            buf.push(tag::BOOLEAN as u8);
            buf.push(if *b { 1 } else { 0 });
        }
        Value::Char(c) => {
            buf.push(tag::CHAR as u8);
            buf.write_u32::<BigEndian>(*c as u32).unwrap();
        }
        Value::Int(i) => freeze_int(*i, buf),
        Value::BigInt(b) => {
            buf.push(tag::BIGINT as u8);
            buf.push(if b.is_negative() { 1 } else { 0 });
            buf.write_u32::<BigEndian>(b.magnitude().len() as u32).unwrap();
            buf.extend_from_slice(b.magnitude());
        }
        Value::F32(f) => {
            buf.push(tag::F32 as u8);
            buf.write_f32::<BigEndian>(*f).unwrap();
        }
        Value::F64(f) => {
            buf.push(tag::F64 as u8);
            buf.write_f64::<BigEndian>(*f).unwrap();
        }
        Value::Decimal(d) => {
            buf.push(tag::BIGDEC as u8);
            buf.write_i32::<BigEndian>(d.scale).unwrap();
            buf.push(if d.unscaled.is_negative() { 1 } else { 0 });
            buf.write_u32::<BigEndian>(d.unscaled.magnitude().len() as u32).unwrap();
            buf.extend_from_slice(d.unscaled.magnitude());
        }
        Value::Rational(r) => {
            buf.push(tag::RATIONAL as u8);
            for part in [&r.numerator, &r.denominator] {
                buf.push(if part.is_negative() { 1 } else { 0 });
                buf.write_u32::<BigEndian>(part.magnitude().len() as u32).unwrap();
                buf.extend_from_slice(part.magnitude());
            }
        }
        Value::Bytes(b) => {
            buf.push(tag::BYTE_ARRAY as u8);
            buf.write_u32::<BigEndian>(b.len() as u32).unwrap();
            buf.extend_from_slice(b);
        }
        Value::Str(s) => freeze_text(s, buf, tag::SMALL_STRING, tag::STRING),
        Value::Name(n) => freeze_text(&n.printed(), buf, tag::SMALL_NAME, tag::NAME),
        Value::List(items) => freeze_seq(items.iter(), items.len(), tag::COMPACT_LIST_BASE, tag::LIST, buf, opts)?,
        Value::Vector(items) => freeze_seq(items.iter(), items.len(), tag::COMPACT_VECTOR_BASE, tag::VECTOR, buf, opts)?,
        Value::Queue(items) => {
            buf.push(tag::QUEUE as u8);
            buf.write_u32::<BigEndian>(items.len() as u32).unwrap();
            for item in items {
                freeze_value(item, buf, opts)?;
            }
        }
        Value::Set(items) => freeze_seq(items.iter(), items.len(), tag::COMPACT_SET_BASE, tag::SET, buf, opts)?,
        Value::SortedSet(items) => {
            buf.push(tag::SORTED_SET as u8);
            buf.write_u32::<BigEndian>(items.len() as u32).unwrap();
            for item in items {
                freeze_value(item, buf, opts)?;
            }
        }
        Value::Map(map) => freeze_map(map, tag::COMPACT_MAP_BASE, tag::MAP, buf, opts)?,
        Value::SortedMap(map) => {
            buf.push(tag::SORTED_MAP as u8);
            buf.write_u32::<BigEndian>((2 * map.len()) as u32).unwrap();
            for (k, v) in map {
                freeze_value(k, buf, opts)?;
                freeze_value(v, buf, opts)?;
            }
        }
        Value::Record(record) => {
            buf.push(tag::RECORD as u8);
            freeze_text(&record.name.printed(), buf, tag::SMALL_NAME, tag::NAME);
            buf.write_u32::<BigEndian>((2 * record.fields.len()) as u32).unwrap();
            for (k, v) in &record.fields {
                freeze_text(k, buf, tag::SMALL_STRING, tag::STRING);
                freeze_value(v, buf, opts)?;
            }
        }
        Value::Timestamp(ts) => {
            buf.push(tag::CALENDAR_DATE as u8);
            buf.write_i64::<BigEndian>(ts.epoch_millis()).unwrap();
        }
        Value::Instant(instant) => {
            buf.push(tag::INSTANT as u8);
            buf.write_i64::<BigEndian>(instant.epoch_secs()).unwrap();
            buf.write_i64::<BigEndian>(instant.subsec_nanos()).unwrap();
        }
        Value::Uuid(uuid) => {
            buf.push(tag::UUID as u8);
            let (hi, lo) = uuid.to_halves();
            buf.write_i64::<BigEndian>(hi).unwrap();
            buf.write_i64::<BigEndian>(lo).unwrap();
        }
        Value::Opaque(opaque) => {
            if let Some(list) = opts.allow_list {
                if !list.is_allowed(&opaque.class) {
                    return Err(Error::UnfreezableType("opaque class denied by freeze allow-list"));
                }
            }
            buf.push(tag::OPAQUE as u8);
            freeze_text(&opaque.class, buf, tag::SMALL_STRING, tag::STRING);
            buf.write_u32::<BigEndian>(opaque.bytes.len() as u32).unwrap();
            buf.extend_from_slice(&opaque.bytes);
        }
        Value::Quarantined(_) => return Err(Error::UnfreezableType("a quarantined placeholder cannot be re-frozen")),
        Value::Unthawable(_) => return Err(Error::UnfreezableType("an unthawable placeholder cannot be frozen")),
        Value::Meta { .. } => unreachable!("handled above"),
        Value::Custom(custom) => {
            if let Some((tag, encode)) = crate::ext::lookup_freeze(custom.as_ref()) {
                buf.push(tag as u8);
                encode(custom.as_any(), buf);
            } else if let Some((name, encode)) = crate::ext::lookup_freeze_named(custom.as_ref()) {
                buf.push(tag::SYMBOLIC_CUSTOM as u8);
                buf.write_u32::<BigEndian>(name.len() as u32).unwrap();
                buf.extend_from_slice(name.as_bytes());
                encode(custom.as_any(), buf);
            } else {
                return Err(Error::UnfreezableType("no encoder registered for this custom type"));
            }
        }
    }
    Ok(())
}

fn freeze_int(i: crate::integer::Integer, buf: &mut Vec<u8>) {
    match i.min_encode_bytes() {
        1 => {
            buf.push(tag::I8 as u8);
            buf.push(i.as_i64().unwrap() as i8 as u8);
        }
        2 => {
            buf.push(tag::I16 as u8);
            buf.write_i16::<BigEndian>(i.as_i64().unwrap() as i16).unwrap();
        }
        4 => {
            buf.push(tag::I32 as u8);
            buf.write_i32::<BigEndian>(i.as_i64().unwrap() as i32).unwrap();
        }
        _ => match i.as_i64() {
            Some(v) => {
                buf.push(tag::I64 as u8);
                buf.write_i64::<BigEndian>(v).unwrap();
            }
            // Doesn't fit in a two's-complement i64 (an unsigned value above
            // i64::MAX): the 8-byte I64 tag can't hold it without the high
            // bit being misread as a sign on thaw, so it goes out as a
            // length-prefixed magnitude instead, same framing as BigInt but
            // under the alternate tag so thaw hands back a Value::Int.
            None => {
                let v = i.as_u64().unwrap();
                let bytes = v.to_be_bytes();
                let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
                let magnitude = &bytes[first_nonzero..];
                buf.push(tag::BIGINT_ALT as u8);
                buf.push(0);
                buf.write_u32::<BigEndian>(magnitude.len() as u32).unwrap();
                buf.extend_from_slice(magnitude);
            }
        },
    }
}

fn freeze_text(s: &str, buf: &mut Vec<u8>, small_tag: i8, general_tag: i8) {
    let bytes = s.as_bytes();
    if bytes.len() <= tag::SMALL_LEN_MAX {
        buf.push(small_tag as u8);
        buf.push(bytes.len() as u8);
    } else {
        buf.push(general_tag as u8);
        buf.write_u32::<BigEndian>(bytes.len() as u32).unwrap();
    }
    buf.extend_from_slice(bytes);
}

fn freeze_seq<'a, I>(
    items: I,
    len: usize,
    compact_base: i8,
    general_tag: i8,
    buf: &mut Vec<u8>,
    opts: &FreezeOptions,
) -> Result<()>
where
    I: Iterator<Item = &'a Value>,
{
    if len <= tag::COMPACT_MAX_LEN {
        buf.push((compact_base + len as i8) as u8);
    } else {
        buf.push(general_tag as u8);
        buf.write_u32::<BigEndian>(len as u32).unwrap();
    }
    for item in items {
        freeze_value(item, buf, opts)?;
    }
    Ok(())
}

fn freeze_map(
    map: &std::collections::BTreeMap<Value, Value>,
    compact_base: i8,
    general_tag: i8,
    buf: &mut Vec<u8>,
    opts: &FreezeOptions,
) -> Result<()> {
    if map.len() <= tag::COMPACT_MAX_LEN {
        buf.push((compact_base + map.len() as i8) as u8);
    } else {
        buf.push(general_tag as u8);
        buf.write_u32::<BigEndian>((2 * map.len()) as u32).unwrap();
    }
    for (k, v) in map {
        freeze_value(k, buf, opts)?;
        freeze_value(v, buf, opts)?;
    }
    Ok(())
}
