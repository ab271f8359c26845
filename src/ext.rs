//! The custom-type extension registry (§4.7): user code registers an
//! encoder keyed by Rust type and a decoder keyed by wire tag, both held
//! in process-wide maps. A second, independent namespace does the same
//! keyed by a symbolic string name instead of an integer id — the two
//! never collide, even if a type is registered in both. Reads on the
//! freeze/thaw hot path are lock-free against an `RwLock`; writes are
//! expected at init time, mirroring how the crate's process-wide
//! leap-second/allow-list state is held elsewhere via `OnceLock`.
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{Error, Result};
use crate::value::{CustomValue, Value};

type Encoder = Arc<dyn Fn(&dyn Any, &mut Vec<u8>) + Send + Sync>;
type Decoder = Arc<dyn Fn(&mut &[u8]) -> Result<Value> + Send + Sync>;

struct FreezeEntry {
    tag: i8,
    encode: Encoder,
}

struct NamedFreezeEntry {
    name: String,
    encode: Encoder,
}

static FREEZE_EXT: OnceLock<RwLock<HashMap<TypeId, FreezeEntry>>> = OnceLock::new();
static THAW_EXT: OnceLock<RwLock<HashMap<i8, Decoder>>> = OnceLock::new();

/// Symbolic-name namespace (§4.7): independent from the integer-id one
/// above — a type or name registered here never collides with one
/// registered via [`extend_freeze`]/[`extend_thaw`].
static FREEZE_EXT_NAMED: OnceLock<RwLock<HashMap<TypeId, NamedFreezeEntry>>> = OnceLock::new();
static THAW_EXT_NAMED: OnceLock<RwLock<HashMap<String, Decoder>>> = OnceLock::new();

fn freeze_ext() -> &'static RwLock<HashMap<TypeId, FreezeEntry>> {
    FREEZE_EXT.get_or_init(|| RwLock::new(HashMap::new()))
}

fn thaw_ext() -> &'static RwLock<HashMap<i8, Decoder>> {
    THAW_EXT.get_or_init(|| RwLock::new(HashMap::new()))
}

fn freeze_ext_named() -> &'static RwLock<HashMap<TypeId, NamedFreezeEntry>> {
    FREEZE_EXT_NAMED.get_or_init(|| RwLock::new(HashMap::new()))
}

fn thaw_ext_named() -> &'static RwLock<HashMap<String, Decoder>> {
    THAW_EXT_NAMED.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers an encoder for Rust type `T` under `tag`. `tag` must be a
/// small positive id in `[1, 128]`; the wire tag actually emitted is
/// `-tag` (see [`crate::tag`]). Registering the same `T` again replaces
/// the previous encoder (last writer wins).
pub fn extend_freeze<T>(id: u8, encode: impl Fn(&T, &mut Vec<u8>) + Send + Sync + 'static)
where
    T: Any + 'static,
{
    let tag = crate::tag::custom_tag_for_id(id);
    let encode: Encoder = Arc::new(move |any, buf| {
        let value = any
            .downcast_ref::<T>()
            .expect("encoder invoked with mismatched type; registry invariant violated");
        encode(value, buf);
    });
    freeze_ext()
        .write()
        .expect("freeze extension registry poisoned")
        .insert(TypeId::of::<T>(), FreezeEntry { tag, encode });
    tracing::debug!(tag, type_name = std::any::type_name::<T>(), "registered custom freeze encoder");
}

/// Registers a decoder for custom `tag` (the same `id` passed to
/// [`extend_freeze`]; the wire tag is `-id`).
pub fn extend_thaw(id: u8, decode: impl Fn(&mut &[u8]) -> Result<Value> + Send + Sync + 'static) {
    let tag = crate::tag::custom_tag_for_id(id);
    thaw_ext()
        .write()
        .expect("thaw extension registry poisoned")
        .insert(tag, Arc::new(decode));
    tracing::debug!(tag, "registered custom thaw decoder");
}

/// Registers an encoder for Rust type `T` under symbolic `name`, in the
/// namespace separate from [`extend_freeze`]'s integer ids (§4.7).
/// Registering the same `T` again replaces the previous encoder (last
/// writer wins, within this namespace only).
pub fn extend_freeze_named<T>(name: impl Into<String>, encode: impl Fn(&T, &mut Vec<u8>) + Send + Sync + 'static)
where
    T: Any + 'static,
{
    let name = name.into();
    let encode: Encoder = Arc::new(move |any, buf| {
        let value = any
            .downcast_ref::<T>()
            .expect("encoder invoked with mismatched type; registry invariant violated");
        encode(value, buf);
    });
    tracing::debug!(name = name.as_str(), type_name = std::any::type_name::<T>(), "registered custom freeze encoder");
    freeze_ext_named()
        .write()
        .expect("named freeze extension registry poisoned")
        .insert(TypeId::of::<T>(), NamedFreezeEntry { name, encode });
}

/// Registers a decoder for symbolic `name` (the same name passed to
/// [`extend_freeze_named`]).
pub fn extend_thaw_named(name: impl Into<String>, decode: impl Fn(&mut &[u8]) -> Result<Value> + Send + Sync + 'static) {
    let name = name.into();
    tracing::debug!(name = name.as_str(), "registered custom thaw decoder");
    thaw_ext_named()
        .write()
        .expect("named thaw extension registry poisoned")
        .insert(name, Arc::new(decode));
}

/// Looks up the registered `(tag, encoder)` for a boxed custom value by
/// its concrete type, if one was registered via [`extend_freeze`].
pub(crate) fn lookup_freeze(value: &dyn CustomValue) -> Option<(i8, Encoder)> {
    let any = value.as_any();
    let guard = freeze_ext().read().expect("freeze extension registry poisoned");
    guard.get(&any.type_id()).map(|entry| (entry.tag, entry.encode.clone()))
}

/// Looks up the registered `(name, encoder)` for a boxed custom value by
/// its concrete type, if one was registered via [`extend_freeze_named`].
pub(crate) fn lookup_freeze_named(value: &dyn CustomValue) -> Option<(String, Encoder)> {
    let any = value.as_any();
    let guard = freeze_ext_named().read().expect("named freeze extension registry poisoned");
    guard.get(&any.type_id()).map(|entry| (entry.name.clone(), entry.encode.clone()))
}

/// Looks up the registered decoder for `tag`, if any.
pub(crate) fn lookup_thaw(tag: i8) -> Option<Decoder> {
    thaw_ext().read().expect("thaw extension registry poisoned").get(&tag).cloned()
}

/// Looks up the registered decoder for symbolic `name`, if any.
pub(crate) fn lookup_thaw_named(name: &str) -> Option<Decoder> {
    thaw_ext_named().read().expect("named thaw extension registry poisoned").get(name).cloned()
}

/// Decodes a custom tag using its registered decoder.
pub(crate) fn decode_custom(tag: i8, buf: &mut &[u8]) -> Result<Value> {
    match lookup_thaw(tag) {
        Some(decode) => decode(buf),
        None => Err(Error::MissingCustomReader { tag }),
    }
}

/// Decodes a symbolically-tagged custom value using its registered
/// decoder, keyed by the name already read off the wire.
pub(crate) fn decode_custom_named(name: &str, buf: &mut &[u8]) -> Result<Value> {
    match lookup_thaw_named(name) {
        Some(decode) => decode(buf),
        None => Err(Error::MissingCustomReaderNamed { name: name.to_string() }),
    }
}
