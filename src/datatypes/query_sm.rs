// ABOUTME: Implements SMPP v3.4 query_sm and query_sm_resp PDUs for message status queries
// ABOUTME: The response reports the message state, final date and network error code

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, Respondable, decode_u8, encode_u8,
};
use crate::datatypes::{Address, CommandId, CommandStatus, MessageId, SmppTime};
use bytes::BytesMut;
use num_enum::{FromPrimitive, IntoPrimitive};
use std::io::Cursor;

/// SMPP v3.4 query_sm PDU (Section 4.8.1)
///
/// Queries the state of a previously submitted message. The SMSC matches on
/// message_id and source_addr, so source_addr must be the one used in the
/// original submit_sm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// message_id returned in the submit_sm_resp
    pub message_id: MessageId,
    pub source_addr: Address,
}

impl QuerySm {
    pub fn new(sequence_number: u32, message_id: MessageId, source_addr: Address) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id,
            source_addr,
        }
    }
}

impl Encodable for QuerySm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(CommandId::QuerySm, self.command_status, self.sequence_number)
            .encode(buf)?;
        self.message_id.encode(buf, "message_id")?;
        self.source_addr.encode(buf, "source_addr")
    }
}

impl Decodable for QuerySm {
    fn command_id() -> CommandId {
        CommandId::QuerySm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        Ok(QuerySm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id: MessageId::decode(buf, "message_id")?,
            source_addr: Address::decode(buf, "source_addr")?,
        })
    }
}

impl Respondable for QuerySm {
    type Response = QuerySmResponse;

    fn response(&self) -> QuerySmResponse {
        QuerySmResponse::new(self.sequence_number, self.message_id, MessageState::Unknown)
    }
}

/// Message state values for query_sm_resp (Section 5.2.28)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageState {
    Enroute = 0x01,
    Delivered = 0x02,
    Expired = 0x03,
    Deleted = 0x04,
    Undeliverable = 0x05,
    Accepted = 0x06,
    Unknown = 0x07,
    Rejected = 0x08,
    #[num_enum(catch_all)]
    Other(u8),
}

impl MessageState {
    /// Whether the message has left the SMSC's retry queue
    pub fn is_final(self) -> bool {
        !matches!(
            self,
            MessageState::Enroute | MessageState::Accepted | MessageState::Unknown
        )
    }
}

/// SMPP v3.4 query_sm_resp PDU (Section 4.8.2)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: MessageId,
    /// When the message reached its final state; empty while it is in flight
    pub final_date: SmppTime,
    pub message_state: MessageState,
    /// Network specific error code for the state
    pub error_code: u8,
}

impl QuerySmResponse {
    pub fn new(sequence_number: u32, message_id: MessageId, message_state: MessageState) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id,
            final_date: SmppTime::empty(),
            message_state,
            error_code: 0,
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            ..Self::new(sequence_number, MessageId::default(), MessageState::Unknown)
        }
    }
}

impl Encodable for QuerySmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(
            CommandId::QuerySmResp,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf)?;
        self.message_id.encode(buf, "message_id")?;
        self.final_date.encode(buf, "final_date")?;
        encode_u8(buf, self.message_state.into());
        encode_u8(buf, self.error_code);
        Ok(())
    }
}

impl Decodable for QuerySmResponse {
    fn command_id() -> CommandId {
        CommandId::QuerySmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        use bytes::Buf;

        Self::validate_header(&header)?;

        // An error response may carry only the header
        if !buf.has_remaining() {
            return Ok(QuerySmResponse::error(
                header.sequence_number,
                header.command_status,
            ));
        }

        Ok(QuerySmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id: MessageId::decode(buf, "message_id")?,
            final_date: SmppTime::decode(buf, "final_date")?,
            message_state: MessageState::from(decode_u8(buf)?),
            error_code: decode_u8(buf)?,
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

    #[test]
    fn query_sm_roundtrip() {
        let query = QuerySm::new(
            31,
            "abc123".parse().unwrap(),
            Address::international("447700900123").unwrap(),
        );
        let decoded: QuerySm = decode(&query.to_bytes().unwrap());
        assert_eq!(decoded, query);
    }

    #[test]
    fn delivered_response_roundtrip() {
        let mut response =
            QuerySmResponse::new(31, "abc123".parse().unwrap(), MessageState::Delivered);
        response.final_date = "240101120000000+".parse().unwrap();

        let decoded: QuerySmResponse = decode(&response.to_bytes().unwrap());
        assert_eq!(decoded, response);
        assert!(decoded.message_state.is_final());
    }

    #[test]
    fn vendor_message_state_is_kept() {
        assert_eq!(MessageState::from(0x42), MessageState::Other(0x42));
        assert_eq!(u8::from(MessageState::Other(0x42)), 0x42);
        assert!(!MessageState::Enroute.is_final());
    }

    #[test]
    fn error_response_without_body() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, 0x80, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x67, 0x00, 0x00,
            0x00, 0x05,
        ];
        let decoded: QuerySmResponse = decode(data);
        assert_eq!(decoded.command_status, CommandStatus::QuerySmRequestFailed);
        assert_eq!(decoded.sequence_number, 5);
    }
}
