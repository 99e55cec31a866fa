// ABOUTME: SMPP v3.4 optional parameters (Tag-Length-Value) and the per-PDU tag map
// ABOUTME: Known tags carry length bounds that are enforced when a value is set

use crate::codec::{CodecError, decode_bytes, decode_u16};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;
use std::io::Cursor;

/// A single optional parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// Its length is written as the Length field on the wire.
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len()).map_err(|_| CodecError::TlvLength {
            tag: self.tag,
            length: self.value.len(),
            min: 0,
            max: u16::MAX as usize,
        })?;
        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let tag = decode_u16(buf)?;
        let length = decode_u16(buf)? as usize;
        let value = decode_bytes(buf, length)?;
        Ok(Self { tag, value })
    }

    pub fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }
}

/// Optional parameters of one PDU, keyed by tag.
///
/// A tag appears at most once; setting it again replaces the earlier value.
/// Iteration (and therefore encoding) runs in ascending tag order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tlvs {
    fields: BTreeMap<u16, Bytes>,
}

impl Tlvs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, validating the length of well-known tags
    pub fn set(&mut self, tag: u16, value: impl Into<Bytes>) -> Result<(), CodecError> {
        let value = value.into();
        if let Some((min, max)) = tags::length_bounds(tag) {
            if value.len() < min || value.len() > max {
                return Err(CodecError::TlvLength {
                    tag,
                    length: value.len(),
                    min,
                    max,
                });
            }
        }
        self.fields.insert(tag, value);
        Ok(())
    }

    pub fn set_u8(&mut self, tag: u16, value: u8) -> Result<(), CodecError> {
        self.set(tag, vec![value])
    }

    pub fn set_u16(&mut self, tag: u16, value: u16) -> Result<(), CodecError> {
        self.set(tag, value.to_be_bytes().to_vec())
    }

    /// Set a C-Octet String parameter, appending the terminator
    pub fn set_cstring(&mut self, tag: u16, value: &str) -> Result<(), CodecError> {
        let mut raw = Vec::with_capacity(value.len() + 1);
        raw.extend_from_slice(value.as_bytes());
        raw.push(0);
        self.set(tag, raw)
    }

    pub fn get(&self, tag: u16) -> Option<&Bytes> {
        self.fields.get(&tag)
    }

    pub fn get_u8(&self, tag: u16) -> Option<u8> {
        match self.get(tag)?.as_ref() {
            [value] => Some(*value),
            _ => None,
        }
    }

    pub fn get_u16(&self, tag: u16) -> Option<u16> {
        match self.get(tag)?.as_ref() {
            [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }

    /// Read a C-Octet String parameter, dropping the terminator if present
    pub fn get_cstring(&self, tag: u16) -> Option<String> {
        let raw = self.get(tag)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Some(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    pub fn remove(&mut self, tag: u16) -> Option<Bytes> {
        self.fields.remove(&tag)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.fields.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tlv> + '_ {
        self.fields.iter().map(|(tag, value)| Tlv {
            tag: *tag,
            value: value.clone(),
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        for tlv in self.iter() {
            tlv.encode(buf)?;
        }
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        self.fields.values().map(|value| 4 + value.len()).sum()
    }

    /// Read parameters until the buffer is exhausted
    ///
    /// Decoding is lenient: bounds of known tags are only enforced by `set`,
    /// so a peer's slightly off value does not break the stream.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mut tlvs = Tlvs::new();
        while buf.has_remaining() {
            let tlv = Tlv::decode(buf)?;
            tlvs.fields.insert(tlv.tag, tlv.value);
        }
        Ok(tlvs)
    }
}

impl FromIterator<Tlv> for Tlvs {
    fn from_iter<I: IntoIterator<Item = Tlv>>(iter: I) -> Self {
        Tlvs {
            fields: iter.into_iter().map(|tlv| (tlv.tag, tlv.value)).collect(),
        }
    }
}

/// Well-known optional parameter tags (SMPP v3.4 section 5.3.2)
pub mod tags {
    pub const DEST_ADDR_SUBUNIT: u16 = 0x0005;
    pub const DEST_NETWORK_TYPE: u16 = 0x0006;
    pub const DEST_BEARER_TYPE: u16 = 0x0007;
    pub const DEST_TELEMATICS_ID: u16 = 0x0008;
    pub const SOURCE_ADDR_SUBUNIT: u16 = 0x000D;
    pub const SOURCE_NETWORK_TYPE: u16 = 0x000E;
    pub const SOURCE_BEARER_TYPE: u16 = 0x000F;
    pub const SOURCE_TELEMATICS_ID: u16 = 0x0010;
    pub const QOS_TIME_TO_LIVE: u16 = 0x0017;
    pub const PAYLOAD_TYPE: u16 = 0x0019;
    pub const ADDITIONAL_STATUS_INFO_TEXT: u16 = 0x001D;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const MS_MSG_WAIT_FACILITIES: u16 = 0x0030;
    pub const PRIVACY_INDICATOR: u16 = 0x0201;
    pub const SOURCE_SUBADDRESS: u16 = 0x0202;
    pub const DEST_SUBADDRESS: u16 = 0x0203;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const USER_RESPONSE_CODE: u16 = 0x0205;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const LANGUAGE_INDICATOR: u16 = 0x020D;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const CALLBACK_NUM_PRES_IND: u16 = 0x0302;
    pub const CALLBACK_NUM_ATAG: u16 = 0x0303;
    pub const NUMBER_OF_MESSAGES: u16 = 0x0304;
    pub const CALLBACK_NUM: u16 = 0x0381;
    pub const DPF_RESULT: u16 = 0x0420;
    pub const SET_DPF: u16 = 0x0421;
    pub const MS_AVAILABILITY_STATUS: u16 = 0x0422;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const DELIVERY_FAILURE_REASON: u16 = 0x0425;
    pub const MORE_MESSAGES_TO_SEND: u16 = 0x0426;
    pub const MESSAGE_STATE: u16 = 0x0427;
    pub const USSD_SERVICE_OP: u16 = 0x0501;
    pub const DISPLAY_TIME: u16 = 0x1201;
    pub const SMS_SIGNAL: u16 = 0x1203;
    pub const MS_VALIDITY: u16 = 0x1204;
    pub const ALERT_ON_MESSAGE_DELIVERY: u16 = 0x130C;
    pub const ITS_REPLY_TYPE: u16 = 0x1380;
    pub const ITS_SESSION_INFO: u16 = 0x1383;

    /// Allowed value length (min, max) for tags with a fixed definition
    pub fn length_bounds(tag: u16) -> Option<(usize, usize)> {
        let bounds = match tag {
            DEST_ADDR_SUBUNIT | DEST_NETWORK_TYPE | DEST_BEARER_TYPE | SOURCE_ADDR_SUBUNIT
            | SOURCE_NETWORK_TYPE | SOURCE_BEARER_TYPE | SOURCE_TELEMATICS_ID | PAYLOAD_TYPE
            | MS_MSG_WAIT_FACILITIES | PRIVACY_INDICATOR | USER_RESPONSE_CODE
            | LANGUAGE_INDICATOR | SAR_TOTAL_SEGMENTS | SAR_SEGMENT_SEQNUM
            | SC_INTERFACE_VERSION | CALLBACK_NUM_PRES_IND | NUMBER_OF_MESSAGES | DPF_RESULT
            | SET_DPF | MS_AVAILABILITY_STATUS | DELIVERY_FAILURE_REASON
            | MORE_MESSAGES_TO_SEND | MESSAGE_STATE | USSD_SERVICE_OP | DISPLAY_TIME
            | MS_VALIDITY | ITS_REPLY_TYPE => (1, 1),
            DEST_TELEMATICS_ID | USER_MESSAGE_REFERENCE | SOURCE_PORT | DESTINATION_PORT
            | SAR_MSG_REF_NUM | SMS_SIGNAL | ITS_SESSION_INFO => (2, 2),
            NETWORK_ERROR_CODE => (3, 3),
            QOS_TIME_TO_LIVE => (4, 4),
            ALERT_ON_MESSAGE_DELIVERY => (0, 0),
            ADDITIONAL_STATUS_INFO_TEXT => (1, 256),
            RECEIPTED_MESSAGE_ID => (1, 65),
            SOURCE_SUBADDRESS | DEST_SUBADDRESS => (2, 23),
            CALLBACK_NUM_ATAG => (0, 65),
            CALLBACK_NUM => (4, 19),
            MESSAGE_PAYLOAD => (0, u16::MAX as usize),
            _ => return None,
        };
        Some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut tlvs = Tlvs::new();
        tlvs.set_u16(tags::SAR_MSG_REF_NUM, 1).unwrap();
        tlvs.set_u16(tags::SAR_MSG_REF_NUM, 2).unwrap();
        assert_eq!(tlvs.len(), 1);
        assert_eq!(tlvs.get_u16(tags::SAR_MSG_REF_NUM), Some(2));
    }

    #[test]
    fn known_tag_bounds_are_enforced() {
        let mut tlvs = Tlvs::new();
        let result = tlvs.set(tags::SAR_TOTAL_SEGMENTS, vec![1, 2]);
        assert!(matches!(
            result,
            Err(CodecError::TlvLength {
                tag: tags::SAR_TOTAL_SEGMENTS,
                length: 2,
                min: 1,
                max: 1
            })
        ));
        assert!(tlvs.is_empty());

        // Vendor tags are not checked
        tlvs.set(0x1400, vec![0u8; 300]).unwrap();
        assert!(tlvs.contains(0x1400));
    }

    #[test]
    fn wire_format() {
        let mut tlvs = Tlvs::new();
        tlvs.set_u8(tags::USER_RESPONSE_CODE, 0x11).unwrap();
        tlvs.set_u16(tags::DESTINATION_PORT, 0x0B84).unwrap();

        let mut buf = BytesMut::new();
        tlvs.encode(&mut buf).unwrap();
        assert_eq!(
            buf.as_ref(),
            &[
                0x02, 0x05, 0x00, 0x01, 0x11, // user_response_code
                0x02, 0x0B, 0x00, 0x02, 0x0B, 0x84, // destination_port
            ]
        );
        assert_eq!(tlvs.encoded_size(), buf.len());

        let mut cursor = Cursor::new(buf.as_ref());
        assert_eq!(Tlvs::decode(&mut cursor).unwrap(), tlvs);
    }

    #[test]
    fn truncated_value_is_incomplete() {
        let data: &[u8] = &[0x04, 0x24, 0x00, 0x05, b'h', b'i'];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            Tlvs::decode(&mut cursor),
            Err(CodecError::Incomplete)
        ));
    }

    #[test]
    fn cstring_values() {
        let mut tlvs = Tlvs::new();
        tlvs.set_cstring(tags::RECEIPTED_MESSAGE_ID, "abc123").unwrap();
        assert_eq!(tlvs.get(tags::RECEIPTED_MESSAGE_ID).unwrap().as_ref(), b"abc123\0");
        assert_eq!(
            tlvs.get_cstring(tags::RECEIPTED_MESSAGE_ID).as_deref(),
            Some("abc123")
        );
    }
}
