//! The pluggable compressor abstraction (§4.5): four interchangeable
//! compressors, all required to honor the same safety contract —
//! `decompress` on arbitrary/hostile bytes must never allocate unbounded
//! memory and must never invoke undefined behavior. Each compressor
//! achieves this by recovering (or storing) the declared uncompressed
//! size and checking it against a caller-supplied ceiling before any
//! output buffer is allocated.
use std::cell::RefCell;
use std::convert::TryFrom;
use std::fmt;

use byteorder::{BigEndian, ByteOrder};

thread_local! {
    static ZSTD_CCTX: RefCell<zstd_safe::CCtx<'static>> = RefCell::new(zstd_safe::CCtx::create());
    static ZSTD_DCTX: RefCell<zstd_safe::DCtx<'static>> = RefCell::new(zstd_safe::DCtx::create());
}

/// Errors a compressor can raise. Never includes a panic or abort path —
/// every failure mode a hostile input can trigger is represented here.
#[derive(Debug, Clone)]
pub enum CompressionError {
    /// The declared (or measured) decompressed size exceeds the caller's
    /// ceiling; decompression was refused before any large allocation.
    ExceededSize { max: usize, actual: usize },
    /// The compressed frame's header could not be parsed.
    Parsing(&'static str),
    /// The underlying compression library reported an error.
    Inner(String),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::ExceededSize { max, actual } => write!(
                f,
                "decompressed size {} exceeds max of {} bytes",
                actual, max
            ),
            CompressionError::Parsing(msg) => write!(f, "malformed compressed frame: {}", msg),
            CompressionError::Inner(msg) => write!(f, "compressor error: {}", msg),
        }
    }
}

impl std::error::Error for CompressionError {}

/// Which compressor produced (or should consume) a payload. Not carried
/// on the wire: the header's `compressed` flag only says *whether*
/// compression was applied, not which codec — callers must supply the
/// same [`Compressor`] on thaw that they used on freeze, the same way
/// [`crate::Encryptor`] must match. Kept as a public enum so callers
/// that build their own out-of-band negotiation (e.g. a fixed per-topic
/// compressor) have a stable discriminant to store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressorKind {
    Lz4 = 0,
    Zstd = 1,
    Lzma = 2,
    Snappy = 3,
}

impl TryFrom<u8> for CompressorKind {
    type Error = CompressionError;
    fn try_from(b: u8) -> Result<Self, CompressionError> {
        match b {
            0 => Ok(CompressorKind::Lz4),
            1 => Ok(CompressorKind::Zstd),
            2 => Ok(CompressorKind::Lzma),
            3 => Ok(CompressorKind::Snappy),
            _ => Err(CompressionError::Parsing("unknown compressor id")),
        }
    }
}

/// A compressor descriptor. `None` disables compression entirely; the
/// others wrap a concrete codec, each tuned for a different point on the
/// speed/ratio curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compressor {
    /// No compression.
    None,
    /// Fast, low compression ratio (LZ4-class).
    Lz4,
    /// Balanced speed and ratio, adjustable level (Zstd-class).
    Zstd { level: i32 },
    /// Slow, high compression ratio (LZMA-class).
    Lzma { preset: u32 },
    /// Very fast, modest ratio, minimal memory (Snappy-class).
    Snappy,
}

impl Default for Compressor {
    fn default() -> Self {
        Compressor::Zstd { level: 3 }
    }
}

impl Compressor {
    pub(crate) fn kind(&self) -> Option<CompressorKind> {
        match self {
            Compressor::None => None,
            Compressor::Lz4 => Some(CompressorKind::Lz4),
            Compressor::Zstd { .. } => Some(CompressorKind::Zstd),
            Compressor::Lzma { .. } => Some(CompressorKind::Lzma),
            Compressor::Snappy => Some(CompressorKind::Snappy),
        }
    }

    /// Compresses `raw`, returning a self-describing frame (the declared
    /// uncompressed length is always recoverable from the frame alone,
    /// whether the underlying codec provides that natively or we prefix
    /// it ourselves).
    pub fn compress(&self, raw: &[u8]) -> Vec<u8> {
        match self {
            Compressor::None => raw.to_vec(),
            Compressor::Lz4 => framed(raw, |out| {
                let mut encoder = lz4::EncoderBuilder::new().build(out).expect("lz4 encoder init");
                std::io::Write::write_all(&mut encoder, raw).expect("lz4 write");
                let (_, result) = encoder.finish();
                result.expect("lz4 finish");
            }),
            Compressor::Zstd { level } => zstd_compress(raw, *level),
            Compressor::Lzma { preset } => framed(raw, |out| {
                let mut encoder = xz2::write::XzEncoder::new(out, *preset);
                std::io::Write::write_all(&mut encoder, raw).expect("xz write");
                encoder.finish().expect("xz finish");
            }),
            Compressor::Snappy => {
                let mut encoder = snap::raw::Encoder::new();
                encoder.compress_vec(raw).expect("snappy compress")
            }
        }
    }

    /// Decompresses `data`, refusing to allocate more than `max_size`
    /// bytes of output. Never panics or aborts on malformed input —
    /// every failure path returns [`CompressionError`].
    pub fn decompress(&self, data: &[u8], max_size: usize) -> Result<Vec<u8>, CompressionError> {
        match self {
            Compressor::None => {
                if data.len() > max_size {
                    return Err(CompressionError::ExceededSize { max: max_size, actual: data.len() });
                }
                Ok(data.to_vec())
            }
            Compressor::Lz4 => unframe(data, max_size, |raw, expected| {
                let mut decoder = lz4::Decoder::new(raw).map_err(|e| CompressionError::Inner(e.to_string()))?;
                let mut out = Vec::with_capacity(expected.min(max_size));
                std::io::Read::read_to_end(&mut decoder, &mut out)
                    .map_err(|e| CompressionError::Inner(e.to_string()))?;
                Ok(out)
            }),
            Compressor::Zstd { .. } => zstd_decompress(data, max_size),
            Compressor::Lzma { .. } => unframe(data, max_size, |raw, expected| {
                let mut decoder = xz2::read::XzDecoder::new(raw);
                let mut out = Vec::with_capacity(expected.min(max_size));
                std::io::Read::read_to_end(&mut decoder, &mut out)
                    .map_err(|e| CompressionError::Inner(e.to_string()))?;
                Ok(out)
            }),
            Compressor::Snappy => {
                let expected = snap::raw::decompress_len(data)
                    .map_err(|e| CompressionError::Inner(e.to_string()))?;
                if expected > max_size {
                    return Err(CompressionError::ExceededSize { max: max_size, actual: expected });
                }
                let mut decoder = snap::raw::Decoder::new();
                decoder
                    .decompress_vec(data)
                    .map_err(|e| CompressionError::Inner(e.to_string()))
            }
        }
    }
}

/// Wraps an encoder closure's output with an 8-byte big-endian declared
/// uncompressed length, for codecs (LZ4, LZMA) whose own frame format
/// either omits the size or is awkward to probe without a full decode.
fn framed(raw: &[u8], encode: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() / 2 + 8);
    out.extend_from_slice(&(raw.len() as u64).to_be_bytes());
    encode(&mut out);
    out
}

fn unframe<T>(
    data: &[u8],
    max_size: usize,
    decode: impl FnOnce(&[u8], usize) -> Result<T, CompressionError>,
) -> Result<T, CompressionError> {
    if data.len() < 8 {
        return Err(CompressionError::Parsing("frame shorter than length prefix"));
    }
    let expected = BigEndian::read_u64(&data[..8]) as usize;
    if expected > max_size {
        return Err(CompressionError::ExceededSize { max: max_size, actual: expected });
    }
    decode(&data[8..], expected)
}

fn zstd_compress(raw: &[u8], level: i32) -> Vec<u8> {
    ZSTD_CCTX.with_borrow_mut(|cctx| {
        cctx.set_parameter(zstd_safe::CParameter::CompressionLevel(level)).ok();
        let bound = zstd_safe::compress_bound(raw.len());
        let mut out = Vec::with_capacity(bound);
        out.resize(bound, 0);
        let written = cctx
            .compress2(&mut out, raw)
            .expect("zstd compress2 failed unexpectedly");
        out.truncate(written);
        out
    })
}

fn zstd_decompress(data: &[u8], max_size: usize) -> Result<Vec<u8>, CompressionError> {
    let expected = decompressed_size(data)?;
    if expected > max_size {
        return Err(CompressionError::ExceededSize { max: max_size, actual: expected });
    }
    ZSTD_DCTX.with_borrow_mut(|dctx| {
        let mut out = vec![0u8; expected];
        let written = dctx
            .decompress(&mut out, data)
            .map_err(|code| CompressionError::Inner(zstd_safe::get_error_name(code).to_string()))?;
        out.truncate(written);
        Ok(out)
    })
}

/// Parses just enough of a zstd frame header to learn the promised
/// decompressed size, without allocating an output buffer. Mirrors the
/// same "peek the frame header before you trust it" discipline zstd's
/// own C API exposes via `ZSTD_getFrameContentSize`.
fn decompressed_size(header: &[u8]) -> Result<usize, CompressionError> {
    match zstd_safe::get_frame_content_size(header) {
        Ok(Some(size)) => usize::try_from(size).map_err(|_| CompressionError::Parsing("frame size overflows usize")),
        Ok(None) => Err(CompressionError::Parsing("zstd frame omits content size")),
        Err(_) => Err(CompressionError::Parsing("not a valid zstd frame")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(c: Compressor) {
        let raw = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = c.compress(&raw);
        let out = c.decompress(&compressed, raw.len() * 2).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn zstd_round_trip() {
        round_trip(Compressor::Zstd { level: 3 });
    }

    #[test]
    fn lz4_round_trip() {
        round_trip(Compressor::Lz4);
    }

    #[test]
    fn lzma_round_trip() {
        round_trip(Compressor::Lzma { preset: 1 });
    }

    #[test]
    fn snappy_round_trip() {
        round_trip(Compressor::Snappy);
    }

    #[test]
    fn none_passes_through() {
        round_trip(Compressor::None);
    }

    #[test]
    fn zstd_refuses_to_allocate_past_ceiling() {
        let raw = vec![7u8; 1 << 20];
        let compressed = Compressor::Zstd { level: 3 }.compress(&raw);
        let err = Compressor::Zstd { level: 3 }.decompress(&compressed, 16).unwrap_err();
        assert!(matches!(err, CompressionError::ExceededSize { .. }));
    }

    #[test]
    fn lz4_refuses_to_allocate_past_ceiling() {
        let raw = vec![7u8; 1 << 20];
        let compressed = Compressor::Lz4.compress(&raw);
        let err = Compressor::Lz4.decompress(&compressed, 16).unwrap_err();
        assert!(matches!(err, CompressionError::ExceededSize { .. }));
    }

    #[test]
    fn hostile_bytes_never_panic() {
        let mut buf = vec![0u8; 64];
        for seed in 0u32..20_000 {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = ((seed.wrapping_mul(2654435761).wrapping_add(i as u32)) >> 8) as u8;
            }
            let _ = Compressor::Zstd { level: 3 }.decompress(&buf, 1 << 20);
            let _ = Compressor::Lz4.decompress(&buf, 1 << 20);
            let _ = Compressor::Lzma { preset: 1 }.decompress(&buf, 1 << 20);
            let _ = Compressor::Snappy.decompress(&buf, 1 << 20);
        }
    }
}
