// ABOUTME: User Data Header (3GPP TS 23.040 9.2.3.24) carried at the start of a short message
// ABOUTME: Supports the concatenation elements used to reassemble multi-part messages

use crate::encoding::EncodingError;
use bytes::{BufMut, Bytes, BytesMut};

/// Concatenated short message, 8-bit reference number
pub const IE_CONCAT_8BIT_REF: u8 = 0x00;
/// Concatenated short message, 16-bit reference number
pub const IE_CONCAT_16BIT_REF: u8 = 0x08;

/// One information element: identifier plus data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoElement {
    pub id: u8,
    pub data: Bytes,
}

impl InfoElement {
    pub fn new(id: u8, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Identifier, length and data octets
    pub fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }

    pub fn is_concat(&self) -> bool {
        matches!(self.id, IE_CONCAT_8BIT_REF | IE_CONCAT_16BIT_REF)
    }

    /// Concatenation element; references above 255 use the 16-bit form
    pub fn concat(reference: u16, total_parts: u8, part_number: u8) -> Self {
        match u8::try_from(reference) {
            Ok(reference) => {
                Self::new(IE_CONCAT_8BIT_REF, vec![reference, total_parts, part_number])
            }
            Err(_) => {
                let [hi, lo] = reference.to_be_bytes();
                Self::new(IE_CONCAT_16BIT_REF, vec![hi, lo, total_parts, part_number])
            }
        }
    }
}

/// Concatenation details of one segment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcatInfo {
    pub reference: u16,
    pub total_parts: u8,
    pub part_number: u8,
}

/// Ordered list of information elements
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Udh {
    elements: Vec<InfoElement>,
}

impl Udh {
    pub fn new(elements: Vec<InfoElement>) -> Self {
        Self { elements }
    }

    /// A header holding only a concatenation element
    pub fn concat(reference: u16, total_parts: u8, part_number: u8) -> Self {
        Self::new(vec![InfoElement::concat(
            reference,
            total_parts,
            part_number,
        )])
    }

    pub fn elements(&self) -> &[InfoElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Octets on the wire, including the leading UDHL octet
    pub fn encoded_len(&self) -> usize {
        1 + self
            .elements
            .iter()
            .map(InfoElement::encoded_len)
            .sum::<usize>()
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodingError> {
        let udhl = u8::try_from(self.encoded_len() - 1)
            .map_err(|_| EncodingError::InvalidUdh("header longer than 255 octets".to_string()))?;
        buf.put_u8(udhl);
        for ie in &self.elements {
            buf.put_u8(ie.id);
            buf.put_u8(ie.data.len() as u8);
            buf.put_slice(&ie.data);
        }
        Ok(())
    }

    /// Parse a header from the start of `data`, returning it and the number
    /// of octets it occupied
    pub fn decode(data: &[u8]) -> Result<(Udh, usize), EncodingError> {
        let Some((&udhl, rest)) = data.split_first() else {
            return Err(EncodingError::InvalidUdh("missing UDHL".to_string()));
        };
        let udhl = udhl as usize;
        if udhl > rest.len() {
            return Err(EncodingError::InvalidUdh(format!(
                "UDHL {udhl} exceeds the {} remaining octets",
                rest.len()
            )));
        }

        let mut payload = &rest[..udhl];
        let mut elements = Vec::new();
        while !payload.is_empty() {
            let [id, length, tail @ ..] = payload else {
                return Err(EncodingError::InvalidUdh(
                    "truncated information element".to_string(),
                ));
            };
            let length = *length as usize;
            if length > tail.len() {
                return Err(EncodingError::InvalidUdh(format!(
                    "information element {id:#04x} overruns the header"
                )));
            }
            elements.push(InfoElement::new(*id, Bytes::copy_from_slice(&tail[..length])));
            payload = &tail[length..];
        }

        Ok((Udh { elements }, udhl + 1))
    }

    /// Last occurrence of the element with identifier `id`
    pub fn find_info_element(&self, id: u8) -> Option<&InfoElement> {
        self.elements.iter().rev().find(|ie| ie.id == id)
    }

    /// Concatenation details from an 8-bit or 16-bit reference element
    pub fn concat_info(&self) -> Option<ConcatInfo> {
        self.elements.iter().find_map(|ie| match (ie.id, ie.data.as_ref()) {
            (IE_CONCAT_8BIT_REF, &[reference, total_parts, part_number]) => Some(ConcatInfo {
                reference: u16::from(reference),
                total_parts,
                part_number,
            }),
            (IE_CONCAT_16BIT_REF, &[hi, lo, total_parts, part_number]) => Some(ConcatInfo {
                reference: u16::from_be_bytes([hi, lo]),
                total_parts,
                part_number,
            }),
            _ => None,
        })
    }
}
