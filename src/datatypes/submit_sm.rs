use crate::codec::Respondable;
use crate::datatypes::{
    Address, CommandId, CommandStatus, EsmClass, MessageId, ServiceType, ShortMessage, SmppTime,
    Tlvs,
};
use crate::encoding::EncodingError;
use crate::macros::{impl_message_id_response, impl_short_message_pdu};
use crate::sequence::SequenceNumber;

/// This operation is used by an ESME to submit a short message to the SMSC for onward transmission
/// to a specified short message entity (SME). The submit_sm PDU does not support the transaction
/// message mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.1.1 service_type: The SMS Application service associated with the message. Set to
    ///       NULL if not applicable. Max length: 5 octets (6 with null terminator).
    pub service_type: ServiceType,

    /// 4.1.2 - 4.1.4 source_addr_ton, source_addr_npi, source_addr: Address of the SME which
    ///       originated this message. Max length: 20 octets (21 with null terminator).
    pub source_addr: Address,

    /// 4.1.5 - 4.1.7 dest_addr_ton, dest_addr_npi, destination_addr: Destination address of
    ///       this short message.
    pub destination_addr: Address,

    /// 4.1.8 esm_class: Message Mode, Message Type and GSM features (UDHI, reply path).
    pub esm_class: EsmClass,

    /// 4.1.9 protocol_id: Protocol Identifier. Network specific field.
    pub protocol_id: u8,

    /// 4.1.10 priority_flag: Level 0 (lowest) to Level 3 (highest).
    pub priority_flag: u8,

    /// 4.1.11 schedule_delivery_time: Empty for immediate delivery.
    pub schedule_delivery_time: SmppTime,

    /// 4.1.12 validity_period: Empty to request the SMSC default validity period.
    pub validity_period: SmppTime,

    /// 4.1.13 registered_delivery: Requests SMSC delivery receipts, SME acknowledgements and
    ///        intermediate notifications.
    pub registered_delivery: u8,

    /// 4.1.14 replace_if_present_flag: 1 to replace an existing message with the same source,
    ///        destination and service_type.
    pub replace_if_present_flag: u8,

    /// 4.1.15 - 4.1.18 data_coding, sm_default_msg_id, sm_length, short_message
    pub short_message: ShortMessage,

    /// Optional parameters
    pub tlvs: Tlvs,
}

impl SubmitSm {
    pub fn new(
        sequence_number: u32,
        source_addr: Address,
        destination_addr: Address,
        short_message: ShortMessage,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: ServiceType::default(),
            source_addr,
            destination_addr,
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

    pub fn with_registered_delivery(mut self, registered_delivery: u8) -> Self {
        self.registered_delivery = registered_delivery;
        self
    }

    /// Split a long message into concatenated submit_sm PDUs.
    ///
    /// The first part keeps this PDU's sequence number; later parts draw
    /// from `sequence`. Every part of a split message has UDHI set.
    pub fn split(&self, sequence: &SequenceNumber) -> Result<Vec<SubmitSm>, EncodingError> {
        let segments = self.short_message.split()?;
        if segments.len() == 1 {
            return Ok(vec![self.clone()]);
        }

        Ok(segments
            .into_iter()
            .enumerate()
            .map(|(index, short_message)| SubmitSm {
                sequence_number: if index == 0 {
                    self.sequence_number
                } else {
                    sequence.next()
                },
                esm_class: self.esm_class.with_udhi(),
                short_message,
                ..self.clone()
            })
            .collect())
    }
}

impl_short_message_pdu!(SubmitSm, CommandId::SubmitSm);

impl Respondable for SubmitSm {
    type Response = SubmitSmResponse;

    fn response(&self) -> SubmitSmResponse {
        SubmitSmResponse::new(self.sequence_number, MessageId::default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// 4.2.1 message_id: SMSC assigned identifier of the submitted message. Omitted by some
    ///       SMSCs when command_status is an error.
    pub message_id: MessageId,

    pub tlvs: Tlvs,
}

impl_message_id_response!(SubmitSmResponse, CommandId::SubmitSmResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decodable, Encodable, PduHeader};
    use crate::datatypes::tags;
    use std::io::Cursor;

    fn submit() -> SubmitSm {
        SubmitSm::new(
            7,
            Address::international("1234").unwrap(),
            Address::international("5678").unwrap(),
            ShortMessage::new("Hi").unwrap(),
        )
    }

    #[test]
    fn submit_sm_wire_format() {
        let bytes = submit().to_bytes().unwrap();

        let mut expected: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x2B, // command_length (43)
            0x00, 0x00, 0x00, 0x04, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x07, // sequence_number
            0x00, // service_type
            0x01, 0x01, b'1', b'2', b'3', b'4', 0x00, // source
            0x01, 0x01, b'5', b'6', b'7', b'8', 0x00, // destination
            0x00, 0x00, 0x00, // esm_class, protocol_id, priority_flag
            0x00, 0x00, // schedule_delivery_time, validity_period
            0x00, 0x00, // registered_delivery, replace_if_present_flag
            0x00, 0x00, 0x02, // data_coding, sm_default_msg_id, sm_length
        ];
        expected.extend_from_slice(b"Hi");

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn submit_sm_roundtrip_with_tlvs() {
        let mut original = submit().with_registered_delivery(1);
        original.validity_period = "000001000000000R".parse().unwrap();
        original.tlvs.set_u16(tags::USER_MESSAGE_REFERENCE, 99).unwrap();
        original.tlvs.set_u16(tags::SOURCE_PORT, 2948).unwrap();

        let bytes = original.to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = SubmitSm::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn split_assigns_sequences_and_udhi() {
        let mut original = submit();
        original.short_message = ShortMessage::long(&"x".repeat(300));

        let sequence = SequenceNumber::starting_after(100);
        let parts = original.split(&sequence).unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].sequence_number, 7);
        assert_eq!(parts[1].sequence_number, 101);
        assert_eq!(parts[2].sequence_number, 102);
        assert!(parts.iter().all(|p| p.esm_class.has_udhi()));

        // Each part survives the wire with its UDH intact
        let bytes = parts[1].to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = SubmitSm::decode(header, &mut cursor).unwrap();
        assert_eq!(
            decoded.short_message.udh().unwrap().concat_info().unwrap().part_number,
            2
        );
    }

    #[test]
    fn split_single_segment_is_unchanged() {
        let original = submit();
        let parts = original.split(&SequenceNumber::new()).unwrap();
        assert_eq!(parts, vec![original]);
    }

    #[test]
    fn response_copies_sequence() {
        let response = submit().response();
        assert_eq!(response.sequence_number, 7);
        assert!(response.message_id.is_empty());
    }

    #[test]
    fn error_response_without_body() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, 0x80, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x45, 0x00, 0x00,
            0x00, 0x09,
        ];
        let mut cursor = Cursor::new(data);
        let header = PduHeader::decode(&mut cursor).unwrap();
        let response = SubmitSmResponse::decode(header, &mut cursor).unwrap();
        assert_eq!(response.command_status, CommandStatus::SubmitFailed);
        assert!(response.message_id.is_empty());
    }

    #[test]
    fn response_roundtrip() {
        let original = SubmitSmResponse::new(3, "msg-0001".parse().unwrap());
        let bytes = original.to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        assert_eq!(
            SubmitSmResponse::decode(header, &mut cursor).unwrap(),
            original
        );
    }
}
