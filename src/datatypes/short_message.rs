// ABOUTME: Short message payload (data_coding, sm_default_msg_id, sm_length, short_message)
// ABOUTME: Handles the optional User Data Header and splits long text into concatenated segments

use crate::codec::{CodecError, decode_bytes, decode_u8, encode_u8};
use crate::datatypes::{InfoElement, Udh};
use crate::encoding::{Encoding, EncodingError, gsm7};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Largest sm_length allowed in a PDU body
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// Octets available to one SMS on the air interface
pub const SEGMENT_BUDGET: usize = 140;

/// Payload octets per segment once a 6 octet concatenation UDH is reserved
pub const DEFAULT_SEGMENT_LIMIT: usize = SEGMENT_BUDGET - 6;

const MIN_SEGMENT_LIMIT: usize = 64;

/// The message part of submit_sm, deliver_sm, submit_multi and replace_sm.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShortMessage {
    pub encoding: Encoding,
    pub sm_default_msg_id: u8,
    data: Bytes,
    udh: Option<Udh>,
}

impl ShortMessage {
    /// Encode `text` as GSM 7-bit when every character fits, UCS2 otherwise
    pub fn new(text: &str) -> Result<Self, EncodingError> {
        let encoding = if gsm7::is_representable(text) {
            Encoding::Gsm7
        } else {
            Encoding::Ucs2
        };
        Self::with_encoding(text, encoding)
    }

    pub fn with_encoding(text: &str, encoding: Encoding) -> Result<Self, EncodingError> {
        let message = Self::long_with_encoding(text, encoding);
        message.check_length()?;
        Ok(message)
    }

    /// Like `new`, without the single-PDU length check, for text that will
    /// be split into segments
    pub fn long(text: &str) -> Self {
        let encoding = if gsm7::is_representable(text) {
            Encoding::Gsm7
        } else {
            Encoding::Ucs2
        };
        Self::long_with_encoding(text, encoding)
    }

    pub fn long_with_encoding(text: &str, encoding: Encoding) -> Self {
        Self {
            encoding,
            sm_default_msg_id: 0,
            data: encoding.encode(text),
            udh: None,
        }
    }

    /// Raw payload, typically for the binary encodings
    pub fn from_bytes(encoding: Encoding, data: impl Into<Bytes>) -> Result<Self, EncodingError> {
        let message = Self {
            encoding,
            sm_default_msg_id: 0,
            data: data.into(),
            udh: None,
        };
        message.check_length()?;
        Ok(message)
    }

    pub fn with_udh(mut self, udh: Udh) -> Self {
        self.udh = Some(udh);
        self
    }

    /// Payload without the UDH
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn udh(&self) -> Option<&Udh> {
        self.udh.as_ref()
    }

    /// Decode the payload with the declared encoding
    pub fn text(&self) -> Result<String, EncodingError> {
        self.encoding.decode(&self.data)
    }

    /// sm_length: UDH plus payload
    pub fn len(&self) -> usize {
        self.udh.as_ref().map_or(0, Udh::encoded_len) + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_length(&self) -> Result<(), EncodingError> {
        if self.len() > MAX_SHORT_MESSAGE_LENGTH {
            return Err(EncodingError::MessageTooLong {
                length: self.len(),
                max: MAX_SHORT_MESSAGE_LENGTH,
            });
        }
        Ok(())
    }

    /// Split into concatenated segments of at most `DEFAULT_SEGMENT_LIMIT`
    /// payload octets. See `split_with_limit`.
    pub fn split(&self) -> Result<Vec<ShortMessage>, EncodingError> {
        self.split_with_limit(DEFAULT_SEGMENT_LIMIT)
    }

    /// Split into concatenated segments.
    ///
    /// A message that fits one SMS comes back unchanged as a single segment.
    /// Otherwise every segment carries a concatenation UDH with a shared
    /// random reference. Limits below 64 octets fall back to the default.
    ///
    /// Information elements already on the message, other than a previous
    /// concatenation element, are repeated in every segment and their octets
    /// come out of `octet_limit`.
    pub fn split_with_limit(&self, octet_limit: usize) -> Result<Vec<ShortMessage>, EncodingError> {
        if self.len() <= SEGMENT_BUDGET {
            return Ok(vec![self.clone()]);
        }

        let octet_limit = if octet_limit < MIN_SEGMENT_LIMIT {
            DEFAULT_SEGMENT_LIMIT
        } else {
            octet_limit
        };

        let kept: Vec<InfoElement> = self
            .udh
            .iter()
            .flat_map(Udh::elements)
            .filter(|ie| !ie.is_concat())
            .cloned()
            .collect();
        let kept_len: usize = kept.iter().map(InfoElement::encoded_len).sum();
        let payload_limit = octet_limit.saturating_sub(kept_len);
        if payload_limit < 2 {
            return Err(EncodingError::InvalidUdh(format!(
                "{kept_len} octets of information elements leave no room for text"
            )));
        }

        let chunks = self.encoding.split(&self.data, payload_limit);
        let total = u8::try_from(chunks.len()).map_err(|_| EncodingError::TooManySegments {
            segments: chunks.len(),
        })?;
        let reference = u16::from(rand::random::<u8>());

        chunks
            .into_iter()
            .zip(1..=total)
            .map(|(data, part_number)| {
                let segment = Self {
                    encoding: self.encoding,
                    sm_default_msg_id: self.sm_default_msg_id,
                    data,
                    udh: Some(Udh::new(
                        std::iter::once(InfoElement::concat(reference, total, part_number))
                            .chain(kept.iter().cloned())
                            .collect(),
                    )),
                };
                segment.check_length()?;
                Ok(segment)
            })
            .collect()
    }

    /// Write data_coding, sm_default_msg_id, sm_length and short_message
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_u8(buf, self.encoding.data_coding());
        self.encode_without_coding(buf)
    }

    /// The replace_sm layout, which has no data_coding octet
    pub fn encode_without_coding(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.check_length()?;
        encode_u8(buf, self.sm_default_msg_id);
        encode_u8(buf, self.len() as u8);
        if let Some(udh) = &self.udh {
            udh.encode(buf)?;
        }
        buf.put_slice(&self.data);
        Ok(())
    }

    /// Read the message; `udhi` is the esm_class UDH indicator of the PDU
    pub fn decode(buf: &mut Cursor<&[u8]>, udhi: bool) -> Result<Self, CodecError> {
        let encoding = Encoding::from_data_coding(decode_u8(buf)?);
        Self::decode_without_coding(buf, udhi, encoding)
    }

    pub fn decode_without_coding(
        buf: &mut Cursor<&[u8]>,
        udhi: bool,
        encoding: Encoding,
    ) -> Result<Self, CodecError> {
        let sm_default_msg_id = decode_u8(buf)?;
        let sm_length = decode_u8(buf)? as usize;
        let mut data = decode_bytes(buf, sm_length)?;

        let udh = if udhi && !data.is_empty() {
            let (udh, read) = Udh::decode(&data)?;
            data = data.slice(read..);
            Some(udh)
        } else {
            None
        };

        Ok(Self {
            encoding,
            sm_default_msg_id,
            data,
            udh,
        })
    }

}
