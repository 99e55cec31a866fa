// ABOUTME: Implements SMPP v3.4 replace_sm and replace_sm_resp PDUs
// ABOUTME: Replaces the text and timing of a message still pending in the SMSC

use crate::codec::{CodecError, Decodable, Encodable, PduHeader, decode_u8, encode_u8};
use crate::datatypes::{Address, CommandId, CommandStatus, MessageId, ShortMessage, SmppTime};
use crate::encoding::Encoding;
use crate::macros::{impl_complete_header_only_pdu, impl_header_only_response};
use bytes::BytesMut;
use std::io::Cursor;

/// SMPP v3.4 replace_sm PDU (Section 4.10.1)
///
/// The body has no data_coding octet: the replacement text keeps the coding
/// of the original submission. On decode the payload is tagged with the
/// default encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplaceSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    pub message_id: MessageId,
    pub source_addr: Address,
    pub schedule_delivery_time: SmppTime,
    pub validity_period: SmppTime,
    pub registered_delivery: u8,
    /// sm_default_msg_id, sm_length and short_message
    pub short_message: ShortMessage,
}

impl ReplaceSm {
    pub fn new(
        sequence_number: u32,
        message_id: MessageId,
        source_addr: Address,
        short_message: ShortMessage,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id,
            source_addr,
            schedule_delivery_time: SmppTime::empty(),
            validity_period: SmppTime::empty(),
            registered_delivery: 0,
            short_message,
        }
    }
}

impl Encodable for ReplaceSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(CommandId::ReplaceSm, self.command_status, self.sequence_number)
            .encode(buf)?;
        self.message_id.encode(buf, "message_id")?;
        self.source_addr.encode(buf, "source_addr")?;
        self.schedule_delivery_time
            .encode(buf, "schedule_delivery_time")?;
        self.validity_period.encode(buf, "validity_period")?;
        encode_u8(buf, self.registered_delivery);
        self.short_message.encode_without_coding(buf)
    }
}

impl Decodable for ReplaceSm {
    fn command_id() -> CommandId {
        CommandId::ReplaceSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        Ok(ReplaceSm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id: MessageId::decode(buf, "message_id")?,
            source_addr: Address::decode(buf, "source_addr")?,
            schedule_delivery_time: SmppTime::decode(buf, "schedule_delivery_time")?,
            validity_period: SmppTime::decode(buf, "validity_period")?,
            registered_delivery: decode_u8(buf)?,
            short_message: ShortMessage::decode_without_coding(buf, false, Encoding::default())?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplaceSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(ReplaceSmResponse, CommandId::ReplaceSmResp);
impl_header_only_response!(ReplaceSm => ReplaceSmResponse);
