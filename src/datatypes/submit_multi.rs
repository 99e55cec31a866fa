// ABOUTME: Implements SMPP v3.4 submit_multi and submit_multi_resp PDUs for multi-destination messaging
// ABOUTME: Destinations are SME addresses or distribution lists; the response lists refused SMEs

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, Respondable, decode_u8, encode_u8,
};
use crate::datatypes::address::{MAX_DESTINATIONS, decode_destinations, encode_destinations};
use crate::datatypes::{
    Address, CommandId, CommandStatus, DestinationAddress, EsmClass, MessageId, ServiceType,
    ShortMessage, SmppTime, Tlvs, UnsuccessSme,
};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

/// SMPP v3.4 submit_multi PDU (Section 4.5.1)
///
/// Submits one short message to up to 254 destinations. The body matches
/// submit_sm except that the single destination address is replaced by a
/// counted list of SME addresses and distribution list names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitMulti {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    pub service_type: ServiceType,
    pub source_addr: Address,
    /// number_of_dests followed by dest_address entries
    pub destinations: Vec<DestinationAddress>,
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: SmppTime,
    pub validity_period: SmppTime,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub short_message: ShortMessage,

    pub tlvs: Tlvs,
}

impl SubmitMulti {
    pub fn new(
        sequence_number: u32,
        source_addr: Address,
        destinations: Vec<DestinationAddress>,
        short_message: ShortMessage,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: ServiceType::default(),
            source_addr,
            destinations,
            esm_class: EsmClass::default(),
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: SmppTime::empty(),
            validity_period: SmppTime::empty(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            short_message,
            tlvs: Tlvs::new(),
        }
    }
}

impl Encodable for SubmitMulti {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.destinations.is_empty() {
            return Err(CodecError::FieldValidation {
                field: "number_of_dests",
                reason: "at least one destination is required".to_string(),
            });
        }

        PduHeader::placeholder(
            CommandId::SubmitMulti,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf)?;

        self.service_type.encode(buf, "service_type")?;
        self.source_addr.encode(buf, "source_addr")?;
        encode_destinations(buf, &self.destinations)?;
        encode_u8(buf, self.esm_class.into());
        encode_u8(buf, self.protocol_id);
        encode_u8(buf, self.priority_flag);
        self.schedule_delivery_time
            .encode(buf, "schedule_delivery_time")?;
        self.validity_period.encode(buf, "validity_period")?;
        encode_u8(buf, self.registered_delivery);
        encode_u8(buf, self.replace_if_present_flag);
        self.short_message.encode(buf)?;
        self.tlvs.encode(buf)
    }
}

impl Decodable for SubmitMulti {
    fn command_id() -> CommandId {
        CommandId::SubmitMulti
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let service_type = ServiceType::decode(buf, "service_type")?;
        let source_addr = Address::decode(buf, "source_addr")?;
        let destinations = decode_destinations(buf)?;
        let esm_class = EsmClass::from(decode_u8(buf)?);
        let protocol_id = decode_u8(buf)?;
        let priority_flag = decode_u8(buf)?;
        let schedule_delivery_time = SmppTime::decode(buf, "schedule_delivery_time")?;
        let validity_period = SmppTime::decode(buf, "validity_period")?;
        let registered_delivery = decode_u8(buf)?;
        let replace_if_present_flag = decode_u8(buf)?;
        let short_message = ShortMessage::decode(buf, esm_class.has_udhi())?;
        let tlvs = Tlvs::decode(buf)?;

        Ok(SubmitMulti {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            service_type,
            source_addr,
            destinations,
            esm_class,
            protocol_id,
            priority_flag,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            replace_if_present_flag,
            short_message,
            tlvs,
        })
    }
}

impl Respondable for SubmitMulti {
    type Response = SubmitMultiResponse;

    fn response(&self) -> SubmitMultiResponse {
        SubmitMultiResponse::new(self.sequence_number, MessageId::default())
    }
}

/// SMPP v3.4 submit_multi_resp PDU (Section 4.5.2)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitMultiResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: MessageId,
    /// Destinations the SMSC could not accept
    pub unsuccess_smes: Vec<UnsuccessSme>,
    pub tlvs: Tlvs,
}

impl SubmitMultiResponse {
    pub fn new(sequence_number: u32, message_id: MessageId) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id,
            unsuccess_smes: Vec::new(),
            tlvs: Tlvs::new(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            ..Self::new(sequence_number, MessageId::default())
        }
    }

    pub fn all_delivered(&self) -> bool {
        self.unsuccess_smes.is_empty()
    }
}

impl Encodable for SubmitMultiResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.unsuccess_smes.len() > MAX_DESTINATIONS {
            return Err(CodecError::FieldValidation {
                field: "no_unsuccess",
                reason: format!(
                    "{} unsuccessful SMEs exceeds maximum of {MAX_DESTINATIONS}",
                    self.unsuccess_smes.len()
                ),
            });
        }

        PduHeader::placeholder(
            CommandId::SubmitMultiResp,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf)?;

        self.message_id.encode(buf, "message_id")?;
        encode_u8(buf, self.unsuccess_smes.len() as u8);
        for sme in &self.unsuccess_smes {
            sme.encode(buf)?;
        }
        self.tlvs.encode(buf)
    }
}

impl Decodable for SubmitMultiResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitMultiResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        // Error responses may stop after the header or after message_id
        let message_id = if buf.has_remaining() {
            MessageId::decode(buf, "message_id")?
        } else {
            MessageId::default()
        };
        let unsuccess_smes = if buf.has_remaining() {
            let count = decode_u8(buf)? as usize;
            (0..count)
                .map(|_| UnsuccessSme::decode(buf))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        let tlvs = Tlvs::decode(buf)?;

        Ok(SubmitMultiResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
            unsuccess_smes,
            tlvs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<T: Decodable>(bytes: &[u8]) -> T {
        let mut cursor = Cursor::new(bytes);
        let header = PduHeader::decode(&mut cursor).unwrap();
        T::decode(header, &mut cursor).unwrap()
    }

    fn submit_multi() -> SubmitMulti {
        SubmitMulti::new(
            12,
            Address::alphanumeric("ACME").unwrap(),
            vec![
                DestinationAddress::sme(Address::international("447700900123").unwrap()),
                DestinationAddress::distribution_list("friends").unwrap(),
            ],
            ShortMessage::new("Hello all").unwrap(),
        )
    }

    #[test]
    fn submit_multi_roundtrip() {
        let original = submit_multi();
        let decoded: SubmitMulti = decode(&original.to_bytes().unwrap());
        assert_eq!(decoded, original);
        assert_eq!(decoded.destinations[1].dest_flag(), 2);
    }

    #[test]
    fn destination_list_layout() {
        let bytes = submit_multi().to_bytes().unwrap();
        // header, service_type, source (ton, npi, "ACME\0")
        let offset = 16 + 1 + 2 + 5;
        assert_eq!(bytes[offset], 2); // number_of_dests
        assert_eq!(bytes[offset + 1], 1); // dest_flag SME
        assert_eq!(&bytes[offset + 2..offset + 4], &[0x01, 0x01]);
    }

    #[test]
    fn empty_destination_list_is_rejected() {
        let mut pdu = submit_multi();
        pdu.destinations.clear();
        assert!(matches!(
            pdu.to_bytes(),
            Err(CodecError::FieldValidation {
                field: "number_of_dests",
                ..
            })
        ));
    }

    #[test]
    fn unknown_dest_flag_is_rejected() {
        let mut bytes = submit_multi().to_bytes().unwrap().to_vec();
        bytes[16 + 1 + 2 + 5 + 1] = 0x07;
        let mut cursor = Cursor::new(bytes.as_slice());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let result = SubmitMulti::decode(header, &mut cursor);
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation {
                field: "dest_flag",
                ..
            })
        ));
        assert_eq!(
            result.unwrap_err().to_command_status(),
            CommandStatus::InvalidDestinationFlag
        );
    }

    #[test]
    fn response_with_unsuccessful_smes() {
        let mut response = SubmitMultiResponse::new(12, "batch-7".parse().unwrap());
        response.unsuccess_smes.push(UnsuccessSme::new(
            Address::international("447700900999").unwrap(),
            CommandStatus::InvalidDestinationAddress,
        ));

        let decoded: SubmitMultiResponse = decode(&response.to_bytes().unwrap());
        assert_eq!(decoded, response);
        assert!(!decoded.all_delivered());
    }

    #[test]
    fn error_response_without_body() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, 0x80, 0x00, 0x00, 0x21, 0x00, 0x00, 0x00, 0x33, 0x00, 0x00,
            0x00, 0x0C,
        ];
        let decoded: SubmitMultiResponse = decode(data);
        assert_eq!(
            decoded.command_status,
            CommandStatus::InvalidNumberOfDestinations
        );
        assert!(decoded.all_delivered());
    }

    #[test]
    fn default_response_is_ok() {
        let response = submit_multi().response();
        assert_eq!(response.sequence_number, 12);
        assert!(response.command_status.is_ok());
    }
}
