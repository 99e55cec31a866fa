// ABOUTME: Implements SMPP v3.4 cancel_sm and cancel_sm_resp PDUs
// ABOUTME: Cancels one pending message by id, or all messages matching source, destination and service_type

use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
use crate::datatypes::{Address, CommandId, CommandStatus, MessageId, ServiceType};
use crate::macros::{impl_complete_header_only_pdu, impl_header_only_response};
use bytes::BytesMut;
use std::io::Cursor;

/// SMPP v3.4 cancel_sm PDU (Section 4.9.1)
///
/// With a message_id set, exactly that message is cancelled. With an empty
/// message_id the SMSC cancels every pending message matching source_addr,
/// destination_addr and service_type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    pub service_type: ServiceType,
    pub message_id: MessageId,
    pub source_addr: Address,
    pub destination_addr: Address,
}

impl CancelSm {
    /// Cancel one message by id
    pub fn new(sequence_number: u32, message_id: MessageId, source_addr: Address) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: ServiceType::default(),
            message_id,
            source_addr,
            destination_addr: Address::default(),
        }
    }

    /// Cancel everything pending from `source_addr` to `destination_addr`
    pub fn all_matching(
        sequence_number: u32,
        source_addr: Address,
        destination_addr: Address,
    ) -> Self {
        Self {
            destination_addr,
            ..Self::new(sequence_number, MessageId::default(), source_addr)
        }
    }
}

impl Encodable for CancelSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(CommandId::CancelSm, self.command_status, self.sequence_number)
            .encode(buf)?;
        self.service_type.encode(buf, "service_type")?;
        self.message_id.encode(buf, "message_id")?;
        self.source_addr.encode(buf, "source_addr")?;
        self.destination_addr.encode(buf, "destination_addr")
    }
}

impl Decodable for CancelSm {
    fn command_id() -> CommandId {
        CommandId::CancelSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        Ok(CancelSm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            service_type: ServiceType::decode(buf, "service_type")?,
            message_id: MessageId::decode(buf, "message_id")?,
            source_addr: Address::decode(buf, "source_addr")?,
            destination_addr: Address::decode(buf, "destination_addr")?,
        })
    }
}

/// cancel_sm_resp carries only the header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(CancelSmResponse, CommandId::CancelSmResp);
impl_header_only_response!(CancelSm => CancelSmResponse);
