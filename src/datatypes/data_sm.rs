// ABOUTME: Implements SMPP v3.4 data_sm and data_sm_resp PDUs for TLV driven messaging
// ABOUTME: The message travels in the message_payload TLV rather than a short_message field

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, Respondable, decode_u8, encode_u8,
};
use crate::datatypes::{
    CommandId, CommandStatus, DataAddress, EsmClass, MessageId, ServiceType, Tlvs, tags,
};
use crate::encoding::Encoding;
use crate::macros::impl_message_id_response;
use bytes::{Bytes, BytesMut};
use std::io::Cursor;

/// SMPP v3.4 data_sm PDU (Section 4.7.1)
///
/// data_sm is an alternative to submit_sm and deliver_sm that can be sent in
/// either direction. It has no short_message field: the payload is carried in
/// the message_payload TLV, and concatenation, ports and receipts are all
/// expressed as optional parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    pub service_type: ServiceType,
    /// Address of the originator, up to 64 octets
    pub source_addr: DataAddress,
    pub destination_addr: DataAddress,
    pub esm_class: EsmClass,
    pub registered_delivery: u8,
    pub data_coding: Encoding,

    pub tlvs: Tlvs,
}

impl DataSm {
    pub fn new(
        sequence_number: u32,
        source_addr: DataAddress,
        destination_addr: DataAddress,
        data_coding: Encoding,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: ServiceType::default(),
            source_addr,
            destination_addr,
            esm_class: EsmClass::default(),
            registered_delivery: 0,
            data_coding,
            tlvs: Tlvs::new(),
        }
    }

    /// data_sm carrying `text` in message_payload, encoded with `data_coding`
    pub fn with_text(
        sequence_number: u32,
        source_addr: DataAddress,
        destination_addr: DataAddress,
        data_coding: Encoding,
        text: &str,
    ) -> Result<Self, CodecError> {
        let mut pdu = Self::new(sequence_number, source_addr, destination_addr, data_coding);
        pdu.set_message_payload(data_coding.encode(text))?;
        Ok(pdu)
    }

    pub fn set_message_payload(&mut self, payload: impl Into<Bytes>) -> Result<(), CodecError> {
        self.tlvs.set(tags::MESSAGE_PAYLOAD, payload)
    }

    pub fn message_payload(&self) -> Option<&Bytes> {
        self.tlvs.get(tags::MESSAGE_PAYLOAD)
    }

    /// Decode message_payload with the PDU's data_coding
    pub fn text(&self) -> Option<Result<String, crate::encoding::EncodingError>> {
        self.message_payload()
            .map(|payload| self.data_coding.decode(payload))
    }

    pub fn set_ports(&mut self, source: u16, destination: u16) -> Result<(), CodecError> {
        self.tlvs.set_u16(tags::SOURCE_PORT, source)?;
        self.tlvs.set_u16(tags::DESTINATION_PORT, destination)
    }

    pub fn source_port(&self) -> Option<u16> {
        self.tlvs.get_u16(tags::SOURCE_PORT)
    }

    pub fn destination_port(&self) -> Option<u16> {
        self.tlvs.get_u16(tags::DESTINATION_PORT)
    }

    /// Segmentation and reassembly parameters for a concatenated message
    pub fn set_sar(&mut self, reference: u16, total: u8, part: u8) -> Result<(), CodecError> {
        self.tlvs.set_u16(tags::SAR_MSG_REF_NUM, reference)?;
        self.tlvs.set_u8(tags::SAR_TOTAL_SEGMENTS, total)?;
        self.tlvs.set_u8(tags::SAR_SEGMENT_SEQNUM, part)
    }

    pub fn is_concatenated(&self) -> bool {
        self.tlvs.contains(tags::SAR_MSG_REF_NUM)
    }
}

impl Encodable for DataSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(CommandId::DataSm, self.command_status, self.sequence_number)
            .encode(buf)?;

        self.service_type.encode(buf, "service_type")?;
        self.source_addr.encode(buf, "source_addr")?;
        self.destination_addr.encode(buf, "destination_addr")?;
        encode_u8(buf, self.esm_class.into());
        encode_u8(buf, self.registered_delivery);
        encode_u8(buf, self.data_coding.data_coding());
        self.tlvs.encode(buf)
    }
}

impl Decodable for DataSm {
    fn command_id() -> CommandId {
        CommandId::DataSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        Ok(DataSm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            service_type: ServiceType::decode(buf, "service_type")?,
            source_addr: DataAddress::decode(buf, "source_addr")?,
            destination_addr: DataAddress::decode(buf, "destination_addr")?,
            esm_class: EsmClass::from(decode_u8(buf)?),
            registered_delivery: decode_u8(buf)?,
            data_coding: Encoding::from_data_coding(decode_u8(buf)?),
            tlvs: Tlvs::decode(buf)?,
        })
    }
}

impl Respondable for DataSm {
    type Response = DataSmResponse;

    fn response(&self) -> DataSmResponse {
        DataSmResponse::new(self.sequence_number, MessageId::default())
    }
}

/// data_sm_resp (Section 4.7.2)
///
/// Failures are usually detailed with the delivery_failure_reason,
/// network_error_code and additional_status_info_text TLVs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: MessageId,
    pub tlvs: Tlvs,
}

impl_message_id_response!(DataSmResponse, CommandId::DataSmResp);

impl DataSmResponse {
    pub fn delivery_failure_reason(&self) -> Option<u8> {
        self.tlvs.get_u8(tags::DELIVERY_FAILURE_REASON)
    }

    pub fn additional_status_info_text(&self) -> Option<String> {
        self.tlvs.get_cstring(tags::ADDITIONAL_STATUS_INFO_TEXT)
    }
}
