//! A binary serialization codec: a type-tagged, self-describing wire
//! format with optional compression, optional password-based encryption,
//! and a registry for freezing/thawing arbitrary Rust types.
//!
//! The two entry points are [`freeze`] and [`thaw`]; everything else
//! (compressors, encryptors, the allow-list policy, the extension
//! registry) configures how those two calls behave.
#![allow(dead_code)]
#![recursion_limit = "500"]

#[cfg(test)]
extern crate hex;

extern crate byteorder;
extern crate regex;

mod allowlist;
mod compress;
pub mod crypto;
mod depth_tracking;
mod error;
mod ext;
mod freeze;
mod header;
mod integer;
mod name;
mod tag;
mod thaw;
mod timestamp;
mod uuid;
mod value;

use std::sync::OnceLock;

pub use allowlist::AllowList;
pub use compress::{CompressionError, Compressor, CompressorKind};
pub use crypto::{CryptoError, Encryptor, Password, PasswordMode};
pub use error::{Error, Result, Unthawable, UnthawableKind};
pub use header::Header;
pub use integer::{BigInt, Integer};
pub use name::Name;
pub use timestamp::{Instant, Timestamp};
pub use uuid::Uuid;
pub use value::{CustomValue, Decimal, Opaque, Rational, Record, Value};

pub use ext::{extend_freeze, extend_thaw};

/// Maximum nesting depth the thawer will follow before refusing a stream
/// as a resource-exhaustion attempt. See [`depth_tracking::DepthTracker`].
pub(crate) const MAX_DEPTH: usize = 512;

/// Default ceiling on a decompressed payload's size, used when a caller
/// doesn't supply their own via [`ThawConfig::max_decompressed_size`].
pub(crate) const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 1 << 30;

/// Class names pre-approved on the thaw side before any environment
/// configuration is applied — a conservative default covering the kind
/// of host-language value types an opaque-object fallback is likely to
/// carry. Everything else starts denied.
const DEFAULT_THAW_ALLOWED_CLASSES: &[&str] =
    &["java.util.UUID", "java.time.Instant", "java.math.BigInteger", "java.math.BigDecimal"];

static INIT: OnceLock<()> = OnceLock::new();

/// Seeds the process-wide freeze-side and thaw-side allow-lists from
/// environment variables (`CODEC_FREEZE_ALLOWLIST_BASE`/`_ADD`,
/// `CODEC_THAW_ALLOWLIST_BASE`/`_ADD`; see SPEC_FULL.md §10.3). Runs at
/// most once per process; [`freeze`] and [`thaw`] call this themselves,
/// so most callers never need to.
pub fn init() {
    INIT.get_or_init(|| {
        let freeze_default = AllowList::allow_all;
        let thaw_default = || AllowList::deny_all_except(DEFAULT_THAW_ALLOWED_CLASSES.iter().copied());

        *allowlist::FREEZE_ALLOWLIST.write().expect("freeze allow-list poisoned") =
            Some(allowlist::from_env("CODEC_FREEZE_ALLOWLIST_BASE", "CODEC_FREEZE_ALLOWLIST_ADD", freeze_default));
        *allowlist::THAW_ALLOWLIST.write().expect("thaw allow-list poisoned") =
            Some(allowlist::from_env("CODEC_THAW_ALLOWLIST_BASE", "CODEC_THAW_ALLOWLIST_ADD", thaw_default));

        tracing::debug!("allow-lists initialized from environment");
    });
}

/// Options controlling [`freeze`].
pub struct FreezeConfig<'a> {
    /// Which compressor (if any) to apply to the encoded payload.
    /// Defaults to a balanced Zstd level.
    pub compressor: Compressor,
    /// Which cipher to use, if `password` is set.
    pub encryptor: Encryptor,
    /// When set, the payload is encrypted under this password.
    pub password: Option<Password>,
    /// Whether to prepend the 4-byte signature-and-flags header.
    pub include_header: bool,
    /// Whether attached [`Value::Meta`] metadata is emitted.
    pub include_metadata: bool,
    /// Policy governing which opaque class names may be frozen. Falls
    /// back to the process-wide freeze allow-list (seeded by [`init`])
    /// when `None`.
    pub allow_list: Option<&'a AllowList>,
}

impl Default for FreezeConfig<'_> {
    fn default() -> Self {
        FreezeConfig {
            compressor: Compressor::default(),
            encryptor: Encryptor::default(),
            password: None,
            include_header: true,
            include_metadata: true,
            allow_list: None,
        }
    }
}

/// Encodes `value` to bytes: tag-dispatch, then optional compression,
/// then optional encryption, then an optional header describing both.
pub fn freeze(value: &Value, config: &FreezeConfig) -> Result<Vec<u8>> {
    init();

    let guard;
    let allow_list = match config.allow_list {
        Some(list) => Some(list),
        None => {
            guard = allowlist::FREEZE_ALLOWLIST.read().expect("freeze allow-list poisoned");
            guard.as_ref()
        }
    };
    let opts = freeze::FreezeOptions { include_metadata: config.include_metadata, allow_list };

    let mut payload = Vec::new();
    freeze::freeze_value(value, &mut payload, &opts)?;

    let compressed = !matches!(config.compressor, Compressor::None);
    if compressed {
        payload = config.compressor.compress(&payload);
    }

    let encrypted = config.password.is_some();
    if let Some(password) = &config.password {
        payload = crypto::encrypt(password, config.encryptor, &payload);
    }

    let mut out = Vec::with_capacity(payload.len() + 4);
    if config.include_header {
        Header { compressed, encrypted }.write(&mut out);
    }
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Options controlling [`thaw`]. `compressor`/`encryptor` must match what
/// the bytes were frozen with — the header records only whether each was
/// applied, not which concrete codec, mirroring `freeze`'s own contract.
pub struct ThawConfig<'a> {
    /// The compressor to use if the header (or `headerless_assumption`)
    /// says the payload is compressed.
    pub compressor: Compressor,
    /// The cipher to use if the payload is encrypted.
    pub encryptor: Encryptor,
    /// Required if the payload is encrypted.
    pub password: Option<Password>,
    /// Policy governing which opaque class names may be re-materialized.
    /// Falls back to the process-wide thaw allow-list (seeded by
    /// [`init`]) when `None`.
    pub allow_list: Option<&'a AllowList>,
    /// Whether a `METADATA` tag is reconstructed as [`Value::Meta`], or
    /// has its metadata silently dropped.
    pub include_metadata: bool,
    /// Used when the input has no recognizable header signature —
    /// treated as if this header had been present. `None` means
    /// headerless input is rejected.
    pub headerless_assumption: Option<Header>,
    /// Ceiling on the decompressed payload size, checked before any
    /// large allocation.
    pub max_decompressed_size: usize,
    /// Applied to each decoded element as it is inserted into its parent
    /// container. Defaults to identity.
    pub thaw_transform: Option<&'a dyn Fn(Value) -> Value>,
}

impl Default for ThawConfig<'_> {
    fn default() -> Self {
        ThawConfig {
            compressor: Compressor::default(),
            encryptor: Encryptor::default(),
            password: None,
            allow_list: None,
            include_metadata: true,
            headerless_assumption: None,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            thaw_transform: None,
        }
    }
}

/// Decodes bytes produced by [`freeze`] back into a [`Value`].
pub fn thaw(bytes: &[u8], config: &ThawConfig) -> Result<Value> {
    init();

    let (header, rest) = Header::split(bytes)?;
    let header = header
        .or(config.headerless_assumption)
        .ok_or(Error::CorruptStream { step: "missing header signature and no headerless assumption supplied" })?;

    let mut payload = rest.to_vec();
    if header.encrypted {
        let password = config.password.as_ref().ok_or(Error::WrongPassword)?;
        payload = crypto::decrypt(password, config.encryptor, &payload)?;
    }
    if header.compressed {
        payload = config.compressor.decompress(&payload, config.max_decompressed_size)?;
    }

    let guard;
    let allow_list = match config.allow_list {
        Some(list) => Some(list),
        None => {
            guard = allowlist::THAW_ALLOWLIST.read().expect("thaw allow-list poisoned");
            guard.as_ref()
        }
    };
    let opts = thaw::ThawOptions {
        include_metadata: config.include_metadata,
        allow_list,
        thaw_transform: config.thaw_transform,
    };

    let mut slice = payload.as_slice();
    thaw::thaw_value(&mut slice, &opts)
}

/// Re-materializes a [`Value::Quarantined`] placeholder into the
/// [`Value::Opaque`] it would have been had its class name passed the
/// thaw allow-list. Errors if `placeholder` isn't quarantined.
pub fn read_quarantined_unsafe(placeholder: &Value) -> Result<Value> {
    match placeholder {
        Value::Quarantined(opaque) => Ok(Value::Opaque(opaque.clone())),
        _ => Err(Error::UnfreezableType("not a quarantined placeholder")),
    }
}

/// Whether [`freeze`] has a dedicated type tag for `value`, can only
/// reach it through the opaque-object fallback, or cannot freeze it at
/// all under `config`'s allow-list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freezability {
    /// Encoded with its own dedicated type tag.
    Native,
    /// Encoded via the opaque-object fallback (class name permitted by
    /// the active allow-list).
    Fallback,
}

/// Reports how (or whether) `value` can be frozen under `config`.
pub fn freezable(value: &Value, config: &FreezeConfig) -> Option<Freezability> {
    match value {
        Value::Quarantined(_) | Value::Unthawable(_) => None,
        Value::Opaque(o) => {
            let allowed = config.allow_list.map(|l| l.is_allowed(&o.class)).unwrap_or(true);
            if allowed {
                Some(Freezability::Fallback)
            } else {
                None
            }
        }
        Value::Custom(c) => {
            if ext::lookup_freeze(c.as_ref()).is_some() {
                Some(Freezability::Native)
            } else {
                None
            }
        }
        _ => Some(Freezability::Native),
    }
}
