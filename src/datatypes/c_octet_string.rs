// ABOUTME: Bounded C-Octet String type for SMPP text fields (system_id, addresses, dates)
// ABOUTME: Validates the per-field maximum at construction and encodes as NUL terminated octets

use crate::codec::{CodecError, decode_cstring, encode_cstring};
use bytes::BytesMut;
use std::fmt;
use std::io::Cursor;
use std::str;
use std::str::FromStr;

/// A NUL terminated string of at most `N` octets on the wire (terminator
/// included).
///
/// The content is stored inline without the terminator. SMPP allows any
/// non-NUL octet, so the content is not required to be UTF-8.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct COctetString<const N: usize> {
    data: [u8; N],
    length: u8,
}

impl<const N: usize> COctetString<N> {
    /// Largest content length accepted
    pub const MAX_LEN: usize = N - 1;

    /// Creates a new value from a byte slice
    pub fn new(s: &[u8]) -> Result<Self, COctetStringError> {
        if s.len() >= N {
            return Err(COctetStringError::TooLong {
                max_len: N - 1,
                actual_len: s.len(),
            });
        }
        if s.contains(&0) {
            return Err(COctetStringError::EmbeddedNul);
        }

        let mut data = [0u8; N];
        data[..s.len()].copy_from_slice(s);
        Ok(Self {
            data,
            length: s.len() as u8,
        })
    }

    /// Returns the content octets, without terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.length as usize]
    }

    /// Returns the content as a str
    pub fn as_str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(self.as_bytes())
    }

    /// Returns the length of the content
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns true if the string is empty (a lone NUL on the wire)
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Octets this value occupies on the wire
    pub fn encoded_len(&self) -> usize {
        self.len() + 1
    }

    /// Write the content and its terminator
    pub fn encode(&self, buf: &mut BytesMut, field: &'static str) -> Result<(), CodecError> {
        encode_cstring(buf, self.as_bytes(), N, field)
    }

    /// Read a value, failing if no terminator appears within `N` octets
    pub fn decode(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<Self, CodecError> {
        let raw = decode_cstring(buf, N, field)?;
        Self::new(&raw).map_err(|e| CodecError::FieldValidation {
            field,
            reason: e.to_string(),
        })
    }
}

impl<const N: usize> fmt::Display for COctetString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl<const N: usize> fmt::Debug for COctetString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "{s:?}"),
            Err(_) => write!(f, "{:?}", self.as_bytes()),
        }
    }
}

impl<const N: usize> Default for COctetString<N> {
    fn default() -> Self {
        Self {
            data: [0u8; N],
            length: 0,
        }
    }
}

impl<const N: usize> TryFrom<&str> for COctetString<N> {
    type Error = COctetStringError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s.as_bytes())
    }
}

impl<const N: usize> TryFrom<String> for COctetString<N> {
    type Error = COctetStringError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s.as_bytes())
    }
}

impl<const N: usize> FromStr for COctetString<N> {
    type Err = COctetStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.as_bytes())
    }
}

impl<const N: usize> AsRef<[u8]> for COctetString<N> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<const N: usize> PartialEq<str> for COctetString<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const N: usize> PartialEq<&str> for COctetString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

/// Errors that can occur when creating COctetString instances
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum COctetStringError {
    #[error("String too long: {actual_len} octets (max {max_len})")]
    TooLong { max_len: usize, actual_len: usize },

    #[error("String contains a NUL octet")]
    EmbeddedNul,
}

// SMPP field sizes, terminator included
pub type SystemId = COctetString<16>;
pub type Password = COctetString<9>;
pub type SystemType = COctetString<13>;
pub type ServiceType = COctetString<6>;
pub type MessageId = COctetString<65>;
pub type AddressValue = COctetString<21>;
pub type DataAddressValue = COctetString<65>;
pub type AddressRangeValue = COctetString<41>;
pub type DistributionListName = COctetString<21>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation() {
        let system_id = "test_system".parse::<SystemId>().unwrap();
        assert_eq!(system_id.as_str().unwrap(), "test_system");
        assert_eq!(system_id.len(), 11);
        assert_eq!(system_id.encoded_len(), 12);
    }

    #[test]
    fn test_too_long() {
        let result = "a".repeat(16).parse::<SystemId>();
        assert!(matches!(
            result,
            Err(COctetStringError::TooLong {
                max_len: 15,
                actual_len: 16
            })
        ));
        assert!("a".repeat(15).parse::<SystemId>().is_ok());
    }

    #[test]
    fn test_embedded_nul() {
        assert_eq!(
            Password::new(b"ab\0cd"),
            Err(COctetStringError::EmbeddedNul)
        );
    }

    #[test]
    fn test_display() {
        let system_id = "test".parse::<SystemId>().unwrap();
        assert_eq!(format!("{system_id}"), "test");
        assert_eq!(format!("{system_id:?}"), "\"test\"");
    }

    #[test]
    fn test_wire_roundtrip() {
        let value = "only".parse::<SystemType>().unwrap();
        let mut buf = BytesMut::new();
        value.encode(&mut buf, "system_type").unwrap();
        assert_eq!(buf.as_ref(), b"only\0");

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = SystemType::decode(&mut cursor, "system_type").unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_empty() {
        let empty = ServiceType::default();
        assert!(empty.is_empty());
        assert_eq!(empty.as_str().unwrap(), "");
        assert_eq!(empty, "");
    }
}
