//! Library error types.
use crate::compress::CompressionError;
use crate::crypto::CryptoError;
use std::fmt;

/// A nippy-rs Result, normally returning a nippy-rs [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A nippy-rs error. Encompasses any issues that can happen during freezing
/// or thawing a value.
#[derive(Clone, Debug)]
pub enum Error {
    /// The 4-byte header was present but its flags byte did not match any
    /// recognized (version, compressed, encrypted) tuple.
    UnrecognizedHeader(u8),
    /// The payload ran out of bytes, contained an out-of-range count, or
    /// otherwise could not be parsed as a well-formed tagged stream.
    CorruptStream {
        /// What step of decoding we were on when it failed.
        step: &'static str,
    },
    /// A negative (custom) type tag had no registered decoder.
    MissingCustomReader {
        /// The custom tag that had no decoder.
        tag: i8,
    },
    /// A symbolically-tagged custom value had no registered decoder for
    /// its name.
    MissingCustomReaderNamed {
        /// The symbolic name that had no decoder.
        name: String,
    },
    /// Decompression failed. Usually means the wrong compressor was
    /// selected, or the data was never compressed at all.
    CompressorMismatch(CompressionError),
    /// Authenticated decryption failed. Usually means the wrong password,
    /// but can also mean the ciphertext was tampered with.
    WrongPassword,
    /// An opaque externally-serialized object's class name was denied by
    /// the active allow-list.
    NotAllowed {
        /// The class name that was denied.
        class_name: String,
    },
    /// No encoder path applies to a value being frozen.
    UnfreezableType(&'static str),
    /// Failure within the cryptographic submodule.
    CryptoError(CryptoError),
    /// Hit a parsing/resource limit (depth, declared length, etc).
    ParseLimit(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnrecognizedHeader(flags) => {
                write!(f, "Unrecognized header flags byte: {:#04x}", flags)
            }
            Error::CorruptStream { step } => {
                write!(f, "Stream is corrupt or truncated at step [{}]", step)
            }
            Error::MissingCustomReader { tag } => {
                write!(f, "No reader registered for custom tag {}", tag)
            }
            Error::MissingCustomReaderNamed { name } => {
                write!(f, "No reader registered for custom name {:?}", name)
            }
            Error::CompressorMismatch(_) => write!(f, "Compressor mismatch or corrupt frame"),
            Error::WrongPassword => write!(f, "Decryption failed: wrong password or tampered data"),
            Error::NotAllowed { class_name } => {
                write!(f, "Class not allowed by policy: {}", class_name)
            }
            Error::UnfreezableType(ty) => write!(f, "No encoder available for type: {}", ty),
            Error::CryptoError(_) => write!(f, "Cryptographic error"),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::CryptoError(ref err) => Some(err),
            Error::CompressorMismatch(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::convert::From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        Self::CryptoError(e)
    }
}

impl std::convert::From<CompressionError> for Error {
    fn from(e: CompressionError) -> Self {
        Self::CompressorMismatch(e)
    }
}

/// A placeholder substituted in place of a sub-tree that could not be
/// thawed, so that a single bad custom type or fallback value does not
/// fail the whole decode.
#[derive(Clone, Debug, PartialEq)]
pub struct Unthawable {
    /// What kind of failure occurred while thawing this sub-tree.
    pub kind: UnthawableKind,
    /// Human-readable cause.
    pub cause: String,
}

/// The specific reason a sub-tree was not thawed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnthawableKind {
    /// The text-fallback reader could not parse the printed form.
    Reader,
    /// A registered custom decoder returned an error.
    CustomDecoder,
}
