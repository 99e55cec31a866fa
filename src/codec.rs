// SMPP v3.4 Codec - Separates parsing/encoding logic from domain models
//
// This module provides a clean separation between the wire format (codec)
// and the domain models (PDUs). Each PDU implements Encodable/Decodable traits
// rather than having all parsing logic in a monolithic frame parser, and the
// PduRegistry dispatch table maps a command_id onto the matching decoder.

use crate::datatypes::{CommandId, CommandStatus};
use crate::encoding::EncodingError;
use crate::frame::Frame;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::OnceLock;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        // Validate PDU size constraints
        if command_length < Self::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        let command_id =
            CommandId::try_from(command_id_raw).map_err(|_| CodecError::UnknownCommandId {
                command_id: command_id_raw,
                sequence_number,
            })?;

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u32(self.command_length);
        buf.put_u32(u32::from(self.command_id));
        buf.put_u32(u32::from(self.command_status));
        buf.put_u32(self.sequence_number);
        Ok(())
    }

    /// Header with a zero length placeholder, backpatched by `Encodable::to_bytes`
    pub fn placeholder(
        command_id: CommandId,
        command_status: CommandStatus,
        sequence_number: u32,
    ) -> Self {
        PduHeader {
            command_length: 0,
            command_id,
            command_status,
            sequence_number,
        }
    }
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU to the buffer, header first
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Calculate the encoded size without keeping the encoded bytes
    fn encoded_size(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).map(|_| buf.len()).unwrap_or(0)
    }

    /// Convert this PDU to bytes
    ///
    /// Encodes into a fresh buffer, backpatches the command_length field with
    /// the final size and returns the frozen bytes.
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf)?;

        if buf.len() < PduHeader::SIZE {
            return Err(CodecError::InvalidPdu(format!(
                "encoded PDU is {} octets, shorter than its header",
                buf.len()
            )));
        }

        let length = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        if length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer after header
    ///
    /// The buffer is bounded to exactly `command_length - 16` octets, so
    /// reading until it is exhausted consumes the optional parameters.
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Return the expected command_id for this PDU type
    fn command_id() -> CommandId;

    /// Whether a header with this command_id can be decoded as this type
    fn accepts(command_id: CommandId) -> bool {
        command_id == Self::command_id()
    }

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if !Self::accepts(header.command_id) {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Requests that have a default response carrying their sequence number
pub trait Respondable {
    type Response;

    /// Build the ESME_ROK response for this request
    fn response(&self) -> Self::Response;
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Unknown command_id {command_id:#010x} (sequence {sequence_number})")]
    UnknownCommandId {
        command_id: u32,
        sequence_number: u32,
    },

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Invalid PDU: {0}")]
    InvalidPdu(String),

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV {tag:#06x} has length {length}, must be {min}-{max}")]
    TlvLength {
        tag: u16,
        length: usize,
        min: usize,
        max: usize,
    },

    #[error("Short message encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

/// Convert codec errors to appropriate SMPP command_status codes
impl CodecError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } | CodecError::InvalidPdu(_) => {
                CommandStatus::InvalidCommandLength
            }
            CodecError::UnknownCommandId { .. } => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => {
                // Map specific field errors to appropriate status codes
                match *field {
                    "source_addr" => CommandStatus::InvalidSourceAddress,
                    "destination_addr" => CommandStatus::InvalidDestinationAddress,
                    "short_message" => CommandStatus::InvalidMsgLength,
                    "message_id" => CommandStatus::InvalidMessageId,
                    "service_type" => CommandStatus::InvalidServiceType,
                    "system_id" => CommandStatus::InvalidSystemId,
                    "password" => CommandStatus::InvalidPassword,
                    "dest_flag" => CommandStatus::InvalidDestinationFlag,
                    "schedule_delivery_time" => CommandStatus::InvalidScheduledDeliveryTime,
                    "validity_period" => CommandStatus::InvalidExpiryTime,
                    _ => CommandStatus::SystemError,
                }
            }
            CodecError::TlvLength { .. } => CommandStatus::InvalidParameterLength,
            CodecError::Encoding(_) => CommandStatus::InvalidMsgLength,
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a NUL terminated C-Octet String of at most `max_len` octets
/// (terminator included)
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<Bytes, CodecError> {
    let chunk = buf.chunk();

    match chunk.iter().take(max_len).position(|&b| b == 0) {
        Some(end) => {
            let value = Bytes::copy_from_slice(&chunk[..end]);
            buf.advance(end + 1);
            Ok(value)
        }
        None if chunk.len() < max_len => Err(CodecError::Incomplete),
        None => Err(CodecError::FieldValidation {
            field: field_name,
            reason: format!("no NUL terminator within {max_len} octets"),
        }),
    }
}

/// Encode a C-Octet String, rejecting values that do not fit `max_len`
/// octets including the terminator
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &[u8],
    max_len: usize,
    field_name: &'static str,
) -> Result<(), CodecError> {
    if value.len() >= max_len {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: format!("{} octets exceeds maximum of {}", value.len(), max_len - 1),
        });
    }
    if value.contains(&0) {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: "embedded NUL octet".to_string(),
        });
    }

    buf.put_slice(value);
    buf.put_u8(0);
    Ok(())
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

/// Decode a 32-bit big-endian integer
pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u32())
}

/// Decode exactly `len` raw octets
pub fn decode_bytes(buf: &mut Cursor<&[u8]>, len: usize) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Peek at next 4 bytes without advancing cursor (for command_length)
pub fn peek_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }

    let pos = buf.position();
    let value = buf.get_u32();
    buf.set_position(pos); // Reset position
    Ok(value)
}

/// Encode a single byte
pub fn encode_u8(buf: &mut BytesMut, value: u8) {
    buf.put_u8(value);
}

/// Encode a 16-bit big-endian integer
pub fn encode_u16(buf: &mut BytesMut, value: u16) {
    buf.put_u16(value);
}

/// Encode a 32-bit big-endian integer
pub fn encode_u32(buf: &mut BytesMut, value: u32) {
    buf.put_u32(value);
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

impl PduRegistry {
    /// Create a new registry with standard SMPP v3.4 PDUs registered
    pub fn new() -> Self {
        use crate::datatypes::*;

        let mut registry = Self {
            decoders: HashMap::new(),
        };

        // Session management PDUs
        registry.register_pdu::<EnquireLink, _>(Frame::EnquireLink);
        registry.register_pdu::<EnquireLinkResponse, _>(Frame::EnquireLinkResp);
        registry.register_pdu::<Unbind, _>(Frame::Unbind);
        registry.register_pdu::<UnbindResponse, _>(Frame::UnbindResp);
        registry.register_pdu::<GenericNack, _>(Frame::GenericNack);
        registry.register_pdu::<Outbind, _>(Frame::Outbind);

        // All three bind flavours share one body layout
        for command_id in [
            CommandId::BindTransmitter,
            CommandId::BindReceiver,
            CommandId::BindTransceiver,
        ] {
            registry.register_pdu_as::<BindRequest, _>(command_id, Frame::BindRequest);
        }
        for command_id in [
            CommandId::BindTransmitterResp,
            CommandId::BindReceiverResp,
            CommandId::BindTransceiverResp,
        ] {
            registry.register_pdu_as::<BindResponse, _>(command_id, Frame::BindResponse);
        }

        // Message PDUs (boxed for large structs)
        registry.register_pdu::<SubmitSm, _>(|pdu| Frame::SubmitSm(Box::new(pdu)));
        registry.register_pdu::<SubmitSmResponse, _>(Frame::SubmitSmResp);
        registry.register_pdu::<SubmitMulti, _>(|pdu| Frame::SubmitMulti(Box::new(pdu)));
        registry.register_pdu::<SubmitMultiResponse, _>(Frame::SubmitMultiResp);
        registry.register_pdu::<DeliverSm, _>(|pdu| Frame::DeliverSm(Box::new(pdu)));
        registry.register_pdu::<DeliverSmResponse, _>(Frame::DeliverSmResp);
        registry.register_pdu::<DataSm, _>(|pdu| Frame::DataSm(Box::new(pdu)));
        registry.register_pdu::<DataSmResponse, _>(Frame::DataSmResp);
        registry.register_pdu::<QuerySm, _>(Frame::QuerySm);
        registry.register_pdu::<QuerySmResponse, _>(Frame::QuerySmResp);
        registry.register_pdu::<CancelSm, _>(Frame::CancelSm);
        registry.register_pdu::<CancelSmResponse, _>(Frame::CancelSmResp);
        registry.register_pdu::<ReplaceSm, _>(|pdu| Frame::ReplaceSm(Box::new(pdu)));
        registry.register_pdu::<ReplaceSmResponse, _>(Frame::ReplaceSmResp);

        // Notification PDUs
        registry.register_pdu::<AlertNotification, _>(Frame::AlertNotification);

        registry
    }

    /// Shared registry used by `Frame::parse`
    pub fn global() -> &'static PduRegistry {
        static REGISTRY: OnceLock<PduRegistry> = OnceLock::new();
        REGISTRY.get_or_init(PduRegistry::new)
    }

    /// Register a PDU type under its own command_id
    fn register_pdu<T, F>(&mut self, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        self.register_pdu_as::<T, F>(T::command_id(), frame_constructor);
    }

    /// Register a PDU type under an explicit command_id
    fn register_pdu_as<T, F>(&mut self, command_id: CommandId, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
            let pdu = T::decode(header, buf)?;
            Ok(frame_constructor(pdu))
        });
        self.decoders.insert(command_id, decoder);
    }

    /// Decode a PDU given its header and exactly its body octets
    ///
    /// Running past the end of `body` or leaving octets unread means the
    /// declared command_length does not match the content, which is reported
    /// as `InvalidPdu`.
    pub fn decode_pdu(&self, header: PduHeader, body: &[u8]) -> Result<Frame, CodecError> {
        let decoder = self.decoders.get(&header.command_id).ok_or_else(|| {
            CodecError::UnknownCommandId {
                command_id: u32::from(header.command_id),
                sequence_number: header.sequence_number,
            }
        })?;

        let command_id = header.command_id;
        let mut cursor = Cursor::new(body);
        let frame = decoder(header, &mut cursor).map_err(|err| match err {
            CodecError::Incomplete => CodecError::InvalidPdu(format!(
                "{command_id:?} body is longer than its command_length"
            )),
            other => other,
        })?;

        if cursor.has_remaining() {
            return Err(CodecError::InvalidPdu(format!(
                "{command_id:?} left {} unread octets",
                cursor.remaining()
            )));
        }

        Ok(frame)
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }

    /// Get all registered command_ids
    pub fn registered_commands(&self) -> Vec<CommandId> {
        self.decoders.keys().copied().collect()
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{EnquireLink, EnquireLinkResponse, Unbind};

    #[test]
    fn pdu_header_encode_decode() {
        let header = PduHeader {
            command_length: 24,
            command_id: CommandId::EnquireLink,
            command_status: CommandStatus::Ok,
            sequence_number: 42,
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = PduHeader::decode(&mut cursor).unwrap();

        assert_eq!(header, decoded);
    }

    #[test]
    fn pdu_header_truncated() {
        let data: &[u8] = &[0x00, 0x00, 0x00, 0x10, 0x00, 0x00];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            PduHeader::decode(&mut cursor),
            Err(CodecError::Incomplete)
        ));
    }

    #[test]
    fn pdu_header_validation() {
        // Test PDU length validation
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x08, // command_length too small
            0x00, 0x00, 0x00, 0x15, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        let mut cursor = Cursor::new(data);

        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(result, Err(CodecError::InvalidPduLength { .. })));

        // Reserved command_id carries the sequence number for a generic_nack
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x00, 0x00, 0x00, 0x0A, // command_id (reserved)
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x07, // sequence_number
        ];
        let mut cursor = Cursor::new(data);

        let result = PduHeader::decode(&mut cursor);
        assert!(matches!(
            result,
            Err(CodecError::UnknownCommandId {
                command_id: 0x0A,
                sequence_number: 7
            })
        ));
    }

    #[test]
    fn pdu_header_keeps_vendor_status() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x04, // submit_sm_resp
            0x00, 0x00, 0x04, 0x01, // vendor specific status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        let mut cursor = Cursor::new(data);
        let header = PduHeader::decode(&mut cursor).unwrap();
        assert_eq!(header.command_status, CommandStatus::Other(0x401));
    }

    #[test]
    fn decode_cstring_normal() {
        let data = b"hello\0rest";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring(&mut cursor, 10, "test").unwrap();
        assert_eq!(result.as_ref(), b"hello");
        assert_eq!(cursor.position(), 6);
    }

    #[test]
    fn decode_cstring_without_terminator() {
        let data = b"abcdefghijkl";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring(&mut cursor, 5, "system_id");
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation {
                field: "system_id",
                ..
            })
        ));

        let data = b"abc";
        let mut cursor = Cursor::new(&data[..]);
        let result = decode_cstring(&mut cursor, 5, "system_id");
        assert!(matches!(result, Err(CodecError::Incomplete)));
    }

    #[test]
    fn encode_cstring_normal() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, b"hello", 10, "test").unwrap();

        assert_eq!(buf.as_ref(), b"hello\0");
    }

    #[test]
    fn encode_cstring_too_long() {
        let mut buf = BytesMut::new();
        let result = encode_cstring(&mut buf, b"123456789", 9, "password");
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation {
                field: "password",
                ..
            })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn enquire_link_roundtrip() {
        let original = EnquireLink::new(42);

        let encoded_bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(encoded_bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = EnquireLink::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn enquire_link_response_roundtrip() {
        let original = EnquireLinkResponse::error(123, CommandStatus::SystemError);

        let encoded_bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(encoded_bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = EnquireLinkResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn registry_decode_enquire_link() {
        let registry = PduRegistry::new();
        let encoded_bytes = EnquireLink::new(42).to_bytes().unwrap();

        let mut cursor = Cursor::new(encoded_bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();

        let frame = registry
            .decode_pdu(header, &encoded_bytes[PduHeader::SIZE..])
            .unwrap();

        match frame {
            Frame::EnquireLink(decoded) => {
                assert_eq!(decoded.sequence_number, 42);
                assert_eq!(decoded.command_status, CommandStatus::Ok);
            }
            _ => panic!("Expected EnquireLink frame"),
        }
    }

    #[test]
    fn registry_rejects_trailing_octets() {
        let registry = PduRegistry::new();
        let header = PduHeader {
            command_length: 20,
            command_id: CommandId::Unbind,
            command_status: CommandStatus::Ok,
            sequence_number: 3,
        };

        let result = registry.decode_pdu(header, &[1, 2, 3, 4]);
        assert!(matches!(result, Err(CodecError::InvalidPdu(_))));
    }

    #[test]
    fn registry_has_every_v34_command() {
        let registry = PduRegistry::global();

        for command_id in [
            CommandId::GenericNack,
            CommandId::BindReceiver,
            CommandId::BindReceiverResp,
            CommandId::BindTransmitter,
            CommandId::BindTransmitterResp,
            CommandId::QuerySm,
            CommandId::QuerySmResp,
            CommandId::SubmitSm,
            CommandId::SubmitSmResp,
            CommandId::DeliverSm,
            CommandId::DeliverSmResp,
            CommandId::Unbind,
            CommandId::UnbindResp,
            CommandId::ReplaceSm,
            CommandId::ReplaceSmResp,
            CommandId::CancelSm,
            CommandId::CancelSmResp,
            CommandId::BindTransceiver,
            CommandId::BindTransceiverResp,
            CommandId::Outbind,
            CommandId::EnquireLink,
            CommandId::EnquireLinkResp,
            CommandId::SubmitMulti,
            CommandId::SubmitMultiResp,
            CommandId::AlertNotification,
            CommandId::DataSm,
            CommandId::DataSmResp,
        ] {
            assert!(registry.is_registered(command_id), "{command_id:?}");
        }
        assert_eq!(registry.registered_commands().len(), 27);
    }

    #[test]
    fn unbind_roundtrip() {
        let original = Unbind::new(123);

        let encoded_bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(encoded_bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = Unbind::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn codec_error_status_mapping() {
        let err = CodecError::UnknownCommandId {
            command_id: 0x0A,
            sequence_number: 1,
        };
        assert_eq!(err.to_command_status(), CommandStatus::InvalidCommandId);

        let err = CodecError::FieldValidation {
            field: "source_addr",
            reason: "too long".to_string(),
        };
        assert_eq!(err.to_command_status(), CommandStatus::InvalidSourceAddress);
    }
}
