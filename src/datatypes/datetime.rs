// ABOUTME: SMPP absolute/relative time fields (schedule_delivery_time, validity_period, final_date)
// ABOUTME: Validates the YYMMDDhhmmsstnnp layout and encodes as a 17 octet C-Octet String

use crate::codec::CodecError;
use crate::datatypes::COctetString;
use bytes::BytesMut;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// A time value in `YYMMDDhhmmsstnnp` format, or empty for "immediate" /
/// "SMSC default".
///
/// `p` is `+` or `-` for an absolute time with a quarter-hour UTC offset of
/// `nn`, or `R` for a time relative to the SMSC's current time.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SmppTime(COctetString<17>);

impl SmppTime {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_relative(&self) -> bool {
        self.0.as_bytes().last() == Some(&b'R')
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn encode(&self, buf: &mut BytesMut, field: &'static str) -> Result<(), CodecError> {
        self.0.encode(buf, field)
    }

    pub fn decode(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<Self, CodecError> {
        let raw = COctetString::<17>::decode(buf, field)?;
        validate(raw.as_bytes()).map_err(|reason| CodecError::FieldValidation { field, reason })?;
        Ok(SmppTime(raw))
    }
}

fn validate(value: &[u8]) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() != 16 {
        return Err(format!("expected 16 characters, got {}", value.len()));
    }
    if let Some(position) = value[..15].iter().position(|b| !b.is_ascii_digit()) {
        return Err(format!("non-digit at position {position}"));
    }

    let two = |at: usize| (value[at] - b'0') * 10 + (value[at + 1] - b'0');
    match value[15] {
        b'R' => Ok(()),
        b'+' | b'-' => {
            let month = two(2);
            let day = two(4);
            if !(1..=12).contains(&month) {
                return Err(format!("month {month} out of range"));
            }
            if !(1..=31).contains(&day) {
                return Err(format!("day {day} out of range"));
            }
            if two(6) > 23 || two(8) > 59 || two(10) > 59 {
                return Err("time of day out of range".to_string());
            }
            if two(13) > 48 {
                return Err(format!("UTC offset {} quarter hours out of range", two(13)));
            }
            Ok(())
        }
        other => Err(format!(
            "expected '+', '-' or 'R' at position 15, got {:?}",
            other as char
        )),
    }
}

impl FromStr for SmppTime {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s.as_bytes()).map_err(|reason| CodecError::FieldValidation {
            field: "smpp_time",
            reason,
        })?;
        let raw = COctetString::new(s.as_bytes()).map_err(|e| CodecError::FieldValidation {
            field: "smpp_time",
            reason: e.to_string(),
        })?;
        Ok(SmppTime(raw))
    }
}

impl fmt::Debug for SmppTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SmppTime({})", self.0)
    }
}

impl fmt::Display for SmppTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
