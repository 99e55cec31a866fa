// ABOUTME: SMPP address groups (TON, NPI, C-Octet String) and submit_multi destination lists
// ABOUTME: Shared by every PDU body that names an originator, recipient or bind address range

use crate::codec::{CodecError, decode_u8, decode_u32, encode_u8, encode_u32};
use crate::datatypes::{
    COctetString, COctetStringError, CommandStatus, DistributionListName, NumericPlanIndicator,
    TypeOfNumber,
};
use bytes::BytesMut;
use std::fmt;
use std::io::Cursor;

/// An address triple: TON, NPI and a NUL terminated value of at most `N`
/// octets (terminator included).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SmeAddress<const N: usize> {
    pub ton: TypeOfNumber,
    pub npi: NumericPlanIndicator,
    pub value: COctetString<N>,
}

/// Address used by submit_sm, deliver_sm and friends (max 20 characters)
pub type Address = SmeAddress<21>;

/// Address used by data_sm and alert_notification (max 64 characters)
pub type DataAddress = SmeAddress<65>;

/// Bind address_range (max 40 characters)
pub type AddressRange = SmeAddress<41>;

impl<const N: usize> SmeAddress<N> {
    pub fn new(
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        value: &str,
    ) -> Result<Self, COctetStringError> {
        Ok(Self {
            ton,
            npi,
            value: value.parse()?,
        })
    }

    /// Address with unknown TON/NPI
    pub fn unknown(value: &str) -> Result<Self, COctetStringError> {
        Self::new(TypeOfNumber::Unknown, NumericPlanIndicator::Unknown, value)
    }

    /// International E.164 number
    pub fn international(value: &str) -> Result<Self, COctetStringError> {
        Self::new(TypeOfNumber::International, NumericPlanIndicator::Isdn, value)
    }

    /// Alphanumeric sender id
    pub fn alphanumeric(value: &str) -> Result<Self, COctetStringError> {
        Self::new(
            TypeOfNumber::Alphanumeric,
            NumericPlanIndicator::Unknown,
            value,
        )
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.value.encoded_len()
    }

    pub fn encode(&self, buf: &mut BytesMut, field: &'static str) -> Result<(), CodecError> {
        encode_u8(buf, self.ton.into());
        encode_u8(buf, self.npi.into());
        self.value.encode(buf, field)
    }

    pub fn decode(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<Self, CodecError> {
        let ton = TypeOfNumber::from(decode_u8(buf)?);
        let npi = NumericPlanIndicator::from(decode_u8(buf)?);
        let value = COctetString::decode(buf, field)?;
        Ok(Self { ton, npi, value })
    }
}

impl<const N: usize> fmt::Debug for SmeAddress<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}/{:?}",
            self.ton, self.npi, self.value
        )
    }
}

impl<const N: usize> fmt::Display for SmeAddress<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

const DEST_FLAG_SME_ADDRESS: u8 = 0x01;
const DEST_FLAG_DISTRIBUTION_LIST: u8 = 0x02;

/// One submit_multi destination, selected by the dest_flag octet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DestinationAddress {
    /// dest_flag = 1
    SmeAddress(Address),
    /// dest_flag = 2
    DistributionList(DistributionListName),
}

impl DestinationAddress {
    pub fn sme(address: Address) -> Self {
        DestinationAddress::SmeAddress(address)
    }

    pub fn distribution_list(name: &str) -> Result<Self, COctetStringError> {
        Ok(DestinationAddress::DistributionList(name.parse()?))
    }

    pub fn dest_flag(&self) -> u8 {
        match self {
            DestinationAddress::SmeAddress(_) => DEST_FLAG_SME_ADDRESS,
            DestinationAddress::DistributionList(_) => DEST_FLAG_DISTRIBUTION_LIST,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_u8(buf, self.dest_flag());
        match self {
            DestinationAddress::SmeAddress(address) => address.encode(buf, "destination_addr"),
            DestinationAddress::DistributionList(name) => name.encode(buf, "dl_name"),
        }
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        match decode_u8(buf)? {
            DEST_FLAG_SME_ADDRESS => Ok(DestinationAddress::SmeAddress(Address::decode(
                buf,
                "destination_addr",
            )?)),
            DEST_FLAG_DISTRIBUTION_LIST => Ok(DestinationAddress::DistributionList(
                COctetString::decode(buf, "dl_name")?,
            )),
            other => Err(CodecError::FieldValidation {
                field: "dest_flag",
                reason: format!("unknown destination flag {other:#04x}"),
            }),
        }
    }
}

/// Maximum number of destinations in one submit_multi
pub const MAX_DESTINATIONS: usize = 254;

/// Encode a count-prefixed destination list
pub(crate) fn encode_destinations(
    buf: &mut BytesMut,
    destinations: &[DestinationAddress],
) -> Result<(), CodecError> {
    if destinations.len() > MAX_DESTINATIONS {
        return Err(CodecError::FieldValidation {
            field: "number_of_dests",
            reason: format!(
                "{} destinations exceeds maximum of {MAX_DESTINATIONS}",
                destinations.len()
            ),
        });
    }
    encode_u8(buf, destinations.len() as u8);
    for destination in destinations {
        destination.encode(buf)?;
    }
    Ok(())
}

pub(crate) fn decode_destinations(
    buf: &mut Cursor<&[u8]>,
) -> Result<Vec<DestinationAddress>, CodecError> {
    let count = decode_u8(buf)? as usize;
    (0..count).map(|_| DestinationAddress::decode(buf)).collect()
}

/// A submit_multi destination the SMSC refused, with the reason
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsuccessSme {
    pub address: Address,
    pub error_status: CommandStatus,
}

impl UnsuccessSme {
    pub fn new(address: Address, error_status: CommandStatus) -> Self {
        Self {
            address,
            error_status,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.address.encode(buf, "destination_addr")?;
        encode_u32(buf, self.error_status.into());
        Ok(())
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let address = Address::decode(buf, "destination_addr")?;
        let error_status = CommandStatus::from(decode_u32(buf)?);
        Ok(Self {
            address,
            error_status,
        })
    }
}
