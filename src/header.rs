//! The 4-byte header envelope (§4.4): a 3-byte signature followed by a
//! flags byte encoding version, compressed?, and encrypted?.
use crate::error::{Error, Result};

const SIGNATURE: [u8; 3] = *b"NPY";

/// The parsed form of the header's flags byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub compressed: bool,
    pub encrypted: bool,
}

impl Header {
    fn flags_byte(&self) -> u8 {
        match (self.compressed, self.encrypted) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    fn from_flags_byte(b: u8) -> Option<Header> {
        match b {
            0 => Some(Header { compressed: false, encrypted: false }),
            1 => Some(Header { compressed: true, encrypted: false }),
            2 => Some(Header { compressed: false, encrypted: true }),
            3 => Some(Header { compressed: true, encrypted: true }),
            _ => None,
        }
    }

    /// Writes the 4-byte header to `buf`.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&SIGNATURE);
        buf.push(self.flags_byte());
    }

    /// Parses a 4-byte header from the front of `buf`, if the signature
    /// matches. Returns `Ok(None)` (not an error) when the signature
    /// doesn't match — callers fall back to a headerless assumption in
    /// that case, per §4.4.
    pub fn split(buf: &[u8]) -> Result<(Option<Header>, &[u8])> {
        if buf.len() < 4 || buf[0..3] != SIGNATURE {
            return Ok((None, buf));
        }
        let header = Header::from_flags_byte(buf[3]).ok_or(Error::UnrecognizedHeader(buf[3]))?;
        Ok((Some(header), &buf[4..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_split_round_trips() {
        let header = Header { compressed: true, encrypted: false };
        let mut buf = Vec::new();
        header.write(&mut buf);
        buf.extend_from_slice(b"payload");
        let (parsed, rest) = Header::split(&buf).unwrap();
        assert_eq!(parsed, Some(header));
        assert_eq!(rest, b"payload");
    }

    #[test]
    fn missing_signature_is_not_an_error() {
        let (parsed, rest) = Header::split(b"not a header at all").unwrap();
        assert_eq!(parsed, None);
        assert_eq!(rest, b"not a header at all");
    }

    #[test]
    fn unrecognized_flags_byte_errors() {
        let mut buf = b"NPY".to_vec();
        buf.push(0xFF);
        let err = Header::split(&buf).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedHeader(0xFF)));
    }
}
