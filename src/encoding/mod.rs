// ABOUTME: Short message character encodings selected by the SMPP data_coding octet
// ABOUTME: Text conversion per encoding plus boundary-safe splitting of encoded payloads

pub mod gsm7;

use bytes::Bytes;
use thiserror::Error;

/// Errors raised while converting short message text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Unexpected byte {byte:#04x} at position {position}")]
    UnexpectedByte { byte: u8, position: usize },

    #[error("Invalid UCS2 payload: {0}")]
    InvalidUcs2(String),

    #[error("data_coding {0:#04x} does not carry text")]
    NotText(u8),

    #[error("Message needs {segments} segments, at most 255 are allowed")]
    TooManySegments { segments: usize },

    #[error("Short message is {length} octets, maximum is {max}")]
    MessageTooLong { length: usize, max: usize },

    #[error("Invalid user data header: {0}")]
    InvalidUdh(String),
}

/// Character encoding of a short message, mapped to the data_coding octet.
///
/// data_coding 0x00 decodes as unpacked GSM 7-bit. Packed GSM 7-bit shares
/// the same octet and has to be chosen explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    #[default]
    Gsm7,
    Gsm7Packed,
    Ascii,
    Binary8Bit1,
    Latin1,
    Binary8Bit2,
    Ucs2,
    Other(u8),
}

impl Encoding {
    pub fn data_coding(self) -> u8 {
        match self {
            Encoding::Gsm7 | Encoding::Gsm7Packed => 0x00,
            Encoding::Ascii => 0x01,
            Encoding::Binary8Bit1 => 0x02,
            Encoding::Latin1 => 0x03,
            Encoding::Binary8Bit2 => 0x04,
            Encoding::Ucs2 => 0x08,
            Encoding::Other(value) => value,
        }
    }

    pub fn from_data_coding(value: u8) -> Self {
        match value {
            0x00 => Encoding::Gsm7,
            0x01 => Encoding::Ascii,
            0x02 => Encoding::Binary8Bit1,
            0x03 => Encoding::Latin1,
            0x04 => Encoding::Binary8Bit2,
            0x08 => Encoding::Ucs2,
            other => Encoding::Other(other),
        }
    }

    /// Whether payloads in this encoding are opaque octets
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Encoding::Binary8Bit1 | Encoding::Binary8Bit2 | Encoding::Other(_)
        )
    }

    /// Encode text. Characters the encoding cannot carry become '?'.
    ///
    /// Binary encodings take the UTF-8 octets as they are.
    pub fn encode(self, text: &str) -> Bytes {
        match self {
            Encoding::Gsm7 => gsm7::encode(text).into(),
            Encoding::Gsm7Packed => gsm7::encode_packed(text).into(),
            Encoding::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect::<Vec<u8>>()
                .into(),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect::<Vec<u8>>()
                .into(),
            Encoding::Ucs2 => text
                .encode_utf16()
                .flat_map(u16::to_be_bytes)
                .collect::<Vec<u8>>()
                .into(),
            Encoding::Binary8Bit1 | Encoding::Binary8Bit2 | Encoding::Other(_) => {
                Bytes::copy_from_slice(text.as_bytes())
            }
        }
    }

    pub fn decode(self, data: &[u8]) -> Result<String, EncodingError> {
        match self {
            Encoding::Gsm7 => gsm7::decode(data),
            Encoding::Gsm7Packed => gsm7::decode_packed(data),
            Encoding::Ascii => match data.iter().position(|b| !b.is_ascii()) {
                Some(position) => Err(EncodingError::UnexpectedByte {
                    byte: data[position],
                    position,
                }),
                None => Ok(data.iter().map(|&b| b as char).collect()),
            },
            Encoding::Latin1 => Ok(data.iter().map(|&b| b as char).collect()),
            Encoding::Ucs2 => {
                if data.len() % 2 != 0 {
                    return Err(EncodingError::InvalidUcs2(format!(
                        "odd payload length {}",
                        data.len()
                    )));
                }
                let units: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|e| EncodingError::InvalidUcs2(e.to_string()))
            }
            Encoding::Binary8Bit1 | Encoding::Binary8Bit2 | Encoding::Other(_) => {
                Err(EncodingError::NotText(self.data_coding()))
            }
        }
    }

    /// Split an encoded payload into pieces of at most `octet_limit` octets.
    ///
    /// A boundary never separates a GSM escape pair, a UCS2 code unit or a
    /// UTF-16 surrogate pair. Packed GSM is unpacked, split on septets and
    /// each piece packed again.
    pub fn split(self, data: &[u8], octet_limit: usize) -> Vec<Bytes> {
        match self {
            Encoding::Gsm7 => gsm7::split_septets(data, octet_limit)
                .into_iter()
                .map(Bytes::copy_from_slice)
                .collect(),
            Encoding::Gsm7Packed => {
                // One septet of headroom for the CR pad `pack` may append
                let septet_limit = (octet_limit * 8 / 7).saturating_sub(1);
                let septets = gsm7::unpack(data);
                gsm7::split_septets(&septets, septet_limit)
                    .into_iter()
                    .map(|chunk| Bytes::from(gsm7::pack(chunk)))
                    .collect()
            }
            Encoding::Ucs2 => split_ucs2(data, octet_limit),
            _ => data
                .chunks(octet_limit.max(1))
                .map(Bytes::copy_from_slice)
                .collect(),
        }
    }
}

fn is_high_surrogate(unit: &[u8]) -> bool {
    (0xD8..=0xDB).contains(&unit[0])
}

fn split_ucs2(data: &[u8], octet_limit: usize) -> Vec<Bytes> {
    let limit = (octet_limit / 2).max(2) * 2;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < data.len() {
        let mut end = (start + limit).min(data.len());
        if end < data.len() && end >= start + 2 && is_high_surrogate(&data[end - 2..end]) {
            end -= 2;
        }
        chunks.push(Bytes::copy_from_slice(&data[start..end]));
        start = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(data: &[u8]) -> String {
        data.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn ucs2_vector() {
        let encoded = Encoding::Ucs2.encode("agjwklgjkwP");
        assert_eq!(hex(&encoded), "00610067006a0077006b006c0067006a006b00770050");
        assert_eq!(Encoding::Ucs2.decode(&encoded).unwrap(), "agjwklgjkwP");
    }

    #[test]
    fn data_coding_mapping() {
        assert_eq!(Encoding::from_data_coding(0x00), Encoding::Gsm7);
        assert_eq!(Encoding::Gsm7Packed.data_coding(), 0x00);
        assert_eq!(Encoding::from_data_coding(0x08), Encoding::Ucs2);
        assert_eq!(Encoding::from_data_coding(0xF5), Encoding::Other(0xF5));
        assert_eq!(Encoding::Other(0xF5).data_coding(), 0xF5);
        assert!(Encoding::Binary8Bit2.is_binary());
    }

    #[test]
    fn latin1_and_ascii() {
        assert_eq!(Encoding::Latin1.encode("café€").as_ref(), b"caf\xe9?");
        assert_eq!(Encoding::Latin1.decode(b"caf\xe9").unwrap(), "café");
        assert_eq!(Encoding::Ascii.encode("naïve").as_ref(), b"na?ve");
        assert!(Encoding::Ascii.decode(b"\xff").is_err());
    }

    #[test]
    fn binary_is_not_text() {
        assert_eq!(
            Encoding::Binary8Bit1.decode(&[1, 2, 3]),
            Err(EncodingError::NotText(0x02))
        );
    }

    #[test]
    fn ucs2_split_keeps_surrogate_pairs() {
        // 'a' then U+1F600 (a surrogate pair) then 'b'
        let encoded = Encoding::Ucs2.encode("a😀b");
        assert_eq!(encoded.len(), 8);

        let chunks = Encoding::Ucs2.split(&encoded, 4);
        assert_eq!(chunks[0].as_ref(), &[0x00, 0x61]);
        assert_eq!(chunks[1].len(), 4);
        assert_eq!(Encoding::Ucs2.decode(&chunks[1]).unwrap(), "😀");
        assert_eq!(Encoding::Ucs2.decode(&chunks[2]).unwrap(), "b");
    }

    #[test]
    fn odd_ucs2_limit_never_splits_a_code_unit() {
        let encoded = Encoding::Ucs2.encode("abcdef");
        for chunk in Encoding::Ucs2.split(&encoded, 5) {
            assert_eq!(chunk.len() % 2, 0);
        }
    }

    #[test]
    fn packed_split_repacks_each_piece() {
        let text = "a".repeat(20);
        let packed = Encoding::Gsm7Packed.encode(&text);
        let chunks = Encoding::Gsm7Packed.split(&packed, 7);

        let rebuilt: String = chunks
            .iter()
            .map(|c| Encoding::Gsm7Packed.decode(c).unwrap())
            .collect();
        assert_eq!(rebuilt, text);
        assert!(chunks.iter().all(|c| c.len() <= 7));
    }
}
