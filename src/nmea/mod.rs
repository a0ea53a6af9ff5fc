use core::fmt;

use thiserror::Error;
use tinyvec::ArrayVec;

pub mod parser;
pub mod sentences;

pub use parser::{NmeaParser, Parsed};
pub use sentences::{Sentence, SentenceKind, Talker};

/// Longest single field (between delimiters) the parser will hold.
pub const TOKEN_CAPACITY: usize = 16;
/// Longest sentence, `$` through the second checksum digit.
pub const SENTENCE_LIMIT: usize = 96;
/// Longest talker+type code kept in a [`SentenceId`].
pub const ID_CAPACITY: usize = 8;

#[derive(Default, Debug, Copy, Clone)]
pub struct NmeaToken(pub ArrayVec<[u8; TOKEN_CAPACITY]>);

impl NmeaToken {
    pub fn new() -> Self {
        Self(ArrayVec::new())
    }

    /// Returns `false` when the token is full and `b` was dropped.
    pub fn push(&mut self, b: u8) -> bool {
        self.0.try_push(b).is_none()
    }

    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.0.as_slice()).ok()
    }
}

impl core::ops::Deref for NmeaToken {
    type Target = ArrayVec<[u8; TOKEN_CAPACITY]>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::ops::DerefMut for NmeaToken {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Running XOR of everything between `$` and `*`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct NmeaChecksum(pub u8);

impl NmeaChecksum {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(self, byte: u8) -> Self {
        Self(self.0 ^ byte)
    }

    /// Parses the two trailing hex digits, either case.
    pub fn from_hex(hi: u8, lo: u8) -> Option<u8> {
        Some(hex_digit(hi)? << 4 | hex_digit(lo)?)
    }
}

impl PartialEq<u8> for NmeaChecksum {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Talker+type code of a sentence, e.g. `GPRMC`.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct SentenceId(pub ArrayVec<[u8; ID_CAPACITY]>);

impl SentenceId {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > ID_CAPACITY {
            return None;
        }
        let mut id = ArrayVec::new();
        id.extend_from_slice(bytes);
        Some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.0.as_slice()).unwrap_or("")
    }
}

impl PartialEq<&str> for SentenceId {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_slice() == other.as_bytes()
    }
}

impl fmt::Debug for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SentenceId({:?})", self.as_str())
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SentenceId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str())
    }
}

/// Why a field interpreter refused a token.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldError {
    #[error("not a number")]
    Number,
    #[error("value out of range")]
    Range,
    #[error("unexpected hemisphere")]
    Hemisphere,
    #[error("unexpected status flag")]
    Status,
    #[error("position value and hemisphere must appear together")]
    Incomplete,
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmeaError {
    #[error("unsupported sentence {0}")]
    Unsupported(SentenceId),
    #[error("{id}: checksum expected {expect:02X}, saw {saw:02X}")]
    BadChecksum { id: SentenceId, expect: u8, saw: u8 },
    #[error("{0}: checksum digits are not hex")]
    MalformedChecksum(SentenceId),
    #[error("{id}: field {field}: {kind}")]
    BadField {
        id: SentenceId,
        field: u8,
        kind: FieldError,
    },
    #[error("sentence exceeded parser capacity")]
    TooLarge(Option<SentenceId>),
}

impl NmeaError {
    pub fn sentence(&self) -> Option<SentenceId> {
        match *self {
            NmeaError::Unsupported(id)
            | NmeaError::BadChecksum { id, .. }
            | NmeaError::MalformedChecksum(id)
            | NmeaError::BadField { id, .. } => Some(id),
            NmeaError::TooLarge(id) => id,
        }
    }

    /// Everything except an unsupported type counts as a failed sentence.
    pub fn is_failure(&self) -> bool {
        !matches!(self, NmeaError::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_xor_of_body() {
        let sum = b"GPGLL,4916.45,N,12311.12,W,225444,A,"
            .iter()
            .fold(NmeaChecksum::new(), |c, &b| c.next(b));
        assert_eq!(sum, 0x1d);
    }

    #[test]
    fn test_checksum_hex_either_case() {
        assert_eq!(NmeaChecksum::from_hex(b'6', b'A'), Some(0x6a));
        assert_eq!(NmeaChecksum::from_hex(b'6', b'a'), Some(0x6a));
        assert_eq!(NmeaChecksum::from_hex(b'G', b'0'), None);
    }

    #[test]
    fn test_token_is_bounded() {
        let mut token = NmeaToken::new();
        for _ in 0..TOKEN_CAPACITY {
            assert!(token.push(b'9'));
        }
        assert!(!token.push(b'9'));
        assert_eq!(token.len(), TOKEN_CAPACITY);
    }

    #[test]
    fn test_sentence_id_rejects_long_codes() {
        assert!(SentenceId::from_bytes(b"PMTK001").is_some());
        assert!(SentenceId::from_bytes(b"PMTKLONGER").is_none());
        assert_eq!(SentenceId::from_bytes(b"GPRMC").unwrap(), "GPRMC");
    }
}
