//! SMPP v3.4 protocol frames.
//!
//! A `Frame` is one complete PDU of any supported type. Frames are read off
//! the wire with `Frame::parse`, which slices exactly `command_length` octets
//! and hands the body to the `PduRegistry` decoder for the header's
//! command_id.

use crate::codec::{CodecError, Encodable, MAX_PDU_SIZE, PduHeader, PduRegistry, peek_u32};
use crate::datatypes::*;
use bytes::{Buf, BytesMut};
use std::io::Cursor;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    // Keep-alive PDUs
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),

    // Session management PDUs
    BindRequest(BindRequest),
    BindResponse(BindResponse),
    Unbind(Unbind),
    UnbindResp(UnbindResponse),
    Outbind(Outbind),

    // Message PDUs
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    SubmitMulti(Box<SubmitMulti>),
    SubmitMultiResp(SubmitMultiResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),
    DataSm(Box<DataSm>),
    DataSmResp(DataSmResponse),
    QuerySm(QuerySm),
    QuerySmResp(QuerySmResponse),
    CancelSm(CancelSm),
    CancelSmResp(CancelSmResponse),
    ReplaceSm(Box<ReplaceSm>),
    ReplaceSmResp(ReplaceSmResponse),

    // Notification PDUs
    AlertNotification(AlertNotification),
    GenericNack(GenericNack),
}

/// Apply the same expression to the PDU inside any frame variant
macro_rules! with_pdu {
    ($frame:expr, $pdu:ident => $body:expr) => {
        match $frame {
            Frame::EnquireLink($pdu) => $body,
            Frame::EnquireLinkResp($pdu) => $body,
            Frame::BindRequest($pdu) => $body,
            Frame::BindResponse($pdu) => $body,
            Frame::Unbind($pdu) => $body,
            Frame::UnbindResp($pdu) => $body,
            Frame::Outbind($pdu) => $body,
            Frame::SubmitSm($pdu) => $body,
            Frame::SubmitSmResp($pdu) => $body,
            Frame::SubmitMulti($pdu) => $body,
            Frame::SubmitMultiResp($pdu) => $body,
            Frame::DeliverSm($pdu) => $body,
            Frame::DeliverSmResp($pdu) => $body,
            Frame::DataSm($pdu) => $body,
            Frame::DataSmResp($pdu) => $body,
            Frame::QuerySm($pdu) => $body,
            Frame::QuerySmResp($pdu) => $body,
            Frame::CancelSm($pdu) => $body,
            Frame::CancelSmResp($pdu) => $body,
            Frame::ReplaceSm($pdu) => $body,
            Frame::ReplaceSmResp($pdu) => $body,
            Frame::AlertNotification($pdu) => $body,
            Frame::GenericNack($pdu) => $body,
        }
    };
}

impl Frame {
    /// Get the command_id for this frame
    pub fn command_id(&self) -> CommandId {
        match self {
            Frame::EnquireLink(_) => CommandId::EnquireLink,
            Frame::EnquireLinkResp(_) => CommandId::EnquireLinkResp,
            Frame::BindRequest(pdu) => pdu.binding_type.command_id(),
            Frame::BindResponse(pdu) => pdu.binding_type.response_command_id(),
            Frame::Unbind(_) => CommandId::Unbind,
            Frame::UnbindResp(_) => CommandId::UnbindResp,
            Frame::Outbind(_) => CommandId::Outbind,
            Frame::SubmitSm(_) => CommandId::SubmitSm,
            Frame::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Frame::SubmitMulti(_) => CommandId::SubmitMulti,
            Frame::SubmitMultiResp(_) => CommandId::SubmitMultiResp,
            Frame::DeliverSm(_) => CommandId::DeliverSm,
            Frame::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Frame::DataSm(_) => CommandId::DataSm,
            Frame::DataSmResp(_) => CommandId::DataSmResp,
            Frame::QuerySm(_) => CommandId::QuerySm,
            Frame::QuerySmResp(_) => CommandId::QuerySmResp,
            Frame::CancelSm(_) => CommandId::CancelSm,
            Frame::CancelSmResp(_) => CommandId::CancelSmResp,
            Frame::ReplaceSm(_) => CommandId::ReplaceSm,
            Frame::ReplaceSmResp(_) => CommandId::ReplaceSmResp,
            Frame::AlertNotification(_) => CommandId::AlertNotification,
            Frame::GenericNack(_) => CommandId::GenericNack,
        }
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        with_pdu!(self, pdu => pdu.sequence_number)
    }

    pub fn command_status(&self) -> CommandStatus {
        with_pdu!(self, pdu => pdu.command_status)
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    /// Whether the peer expects a response to this frame.
    ///
    /// False for every response, generic_nack, outbind and alert_notification.
    pub fn can_respond(&self) -> bool {
        matches!(
            self,
            Frame::EnquireLink(_)
                | Frame::BindRequest(_)
                | Frame::Unbind(_)
                | Frame::SubmitSm(_)
                | Frame::SubmitMulti(_)
                | Frame::DeliverSm(_)
                | Frame::DataSm(_)
                | Frame::QuerySm(_)
                | Frame::CancelSm(_)
                | Frame::ReplaceSm(_)
        )
    }

    /// Requests whose responses are correlated through the request window.
    /// Bind and unbind are answered on the handshake path instead.
    pub fn is_windowable(&self) -> bool {
        self.can_respond() && !matches!(self, Frame::BindRequest(_) | Frame::Unbind(_))
    }

    /// Default ESME_ROK response carrying this frame's sequence number
    pub fn response(&self) -> Option<Frame> {
        use crate::codec::Respondable;

        let response = match self {
            Frame::EnquireLink(pdu) => Frame::EnquireLinkResp(pdu.response()),
            Frame::BindRequest(pdu) => Frame::BindResponse(pdu.response()),
            Frame::Unbind(pdu) => Frame::UnbindResp(pdu.response()),
            Frame::SubmitSm(pdu) => Frame::SubmitSmResp(pdu.response()),
            Frame::SubmitMulti(pdu) => Frame::SubmitMultiResp(pdu.response()),
            Frame::DeliverSm(pdu) => Frame::DeliverSmResp(pdu.response()),
            Frame::DataSm(pdu) => Frame::DataSmResp(pdu.response()),
            Frame::QuerySm(pdu) => Frame::QuerySmResp(pdu.response()),
            Frame::CancelSm(pdu) => Frame::CancelSmResp(pdu.response()),
            Frame::ReplaceSm(pdu) => Frame::ReplaceSmResp(pdu.response()),
            _ => return None,
        };
        Some(response)
    }

    /// Check that a whole frame is buffered, returning its command_length.
    ///
    /// The cursor position is left unchanged.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        let command_length = peek_u32(buf)?;

        if command_length < PduHeader::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Parse one frame from the buffer.
    ///
    /// Once `check` passes, the cursor is advanced past the whole frame even
    /// when decoding fails, so an unknown command_id leaves the stream
    /// aligned on the next PDU.
    pub fn parse(buf: &mut Cursor<&[u8]>) -> Result<Frame, CodecError> {
        let command_length = Frame::check(buf)?;

        let data: &[u8] = *buf.get_ref();
        let start = buf.position() as usize;
        let pdu = &data[start..start + command_length];
        buf.set_position((start + command_length) as u64);

        let mut cursor = Cursor::new(pdu);
        let header = PduHeader::decode(&mut cursor)?;
        PduRegistry::global().decode_pdu(header, &pdu[PduHeader::SIZE..])
    }
}

impl Encodable for Frame {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        with_pdu!(self, pdu => pdu.encode(buf))
    }
}

macro_rules! impl_into_frame {
    ($($pdu:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$pdu> for Frame {
                fn from(pdu: $pdu) -> Self {
                    Frame::$variant(pdu)
                }
            }
        )*
    };
}

macro_rules! impl_into_boxed_frame {
    ($($pdu:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$pdu> for Frame {
                fn from(pdu: $pdu) -> Self {
                    Frame::$variant(Box::new(pdu))
                }
            }
        )*
    };
}

impl_into_frame! {
    EnquireLink => EnquireLink,
    EnquireLinkResponse => EnquireLinkResp,
    BindRequest => BindRequest,
    BindResponse => BindResponse,
    Unbind => Unbind,
    UnbindResponse => UnbindResp,
    Outbind => Outbind,
    SubmitSmResponse => SubmitSmResp,
    SubmitMultiResponse => SubmitMultiResp,
    DeliverSmResponse => DeliverSmResp,
    DataSmResponse => DataSmResp,
    QuerySm => QuerySm,
    QuerySmResponse => QuerySmResp,
    CancelSm => CancelSm,
    CancelSmResponse => CancelSmResp,
    ReplaceSmResponse => ReplaceSmResp,
    AlertNotification => AlertNotification,
    GenericNack => GenericNack,
}

impl_into_boxed_frame! {
    SubmitSm => SubmitSm,
    SubmitMulti => SubmitMulti,
    DeliverSm => DeliverSm,
    DataSm => DataSm,
    ReplaceSm => ReplaceSm,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_enquire_link() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01,
        ];
        let mut cursor = Cursor::new(data);
        let frame = Frame::parse(&mut cursor).unwrap();

        assert_eq!(frame, Frame::EnquireLink(EnquireLink::new(1)));
        assert_eq!(cursor.position(), 16);
        assert!(frame.can_respond());
        assert!(frame.is_windowable());
    }

    #[test]
    fn check_needs_whole_frame() {
        let data: &[u8] = &[0x00, 0x00, 0x00, 0x11, 0x80, 0x00, 0x00, 0x09];
        let mut cursor = Cursor::new(data);
        assert!(matches!(Frame::check(&mut cursor), Err(CodecError::Incomplete)));
        assert_eq!(cursor.position(), 0);

        let data: &[u8] = &[0x00, 0x00];
        let mut cursor = Cursor::new(data);
        assert!(matches!(Frame::check(&mut cursor), Err(CodecError::Incomplete)));
    }

    #[test]
    fn check_rejects_bad_length() {
        let data: &[u8] = &[0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x15];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            Frame::check(&mut cursor),
            Err(CodecError::InvalidPduLength {
                length: 0x0001_0001,
                ..
            })
        ));
    }

    #[test]
    fn unknown_command_id_consumes_frame() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x09, 0xde, 0xad, 0xbe, 0xef, // reserved command with a body
            0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x0A, // unbind
        ];
        let mut cursor = Cursor::new(data);

        assert!(matches!(
            Frame::parse(&mut cursor),
            Err(CodecError::UnknownCommandId {
                command_id: 0x0A,
                sequence_number: 9
            })
        ));
        assert_eq!(cursor.position(), 20);
        assert_eq!(
            Frame::parse(&mut cursor).unwrap(),
            Frame::Unbind(Unbind::new(10))
        );
    }

    #[test]
    fn body_on_header_only_pdu_is_invalid() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01, 0x00,
        ];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            Frame::parse(&mut cursor),
            Err(CodecError::InvalidPdu(_))
        ));
    }

    #[test]
    fn truncated_body_is_invalid() {
        // submit_sm_resp declaring a message_id that never terminates
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x13, 0x80, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01, b'a', b'b', b'c',
        ];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            Frame::parse(&mut cursor),
            Err(CodecError::InvalidPdu(_))
        ));
    }

    #[test]
    fn responses_keep_sequence_numbers() {
        let requests: Vec<Frame> = vec![
            EnquireLink::new(1).into(),
            Unbind::new(2).into(),
            SubmitSm::new(3, Address::default(), Address::default(), ShortMessage::default())
                .into(),
            DeliverSm::new(4, Address::default(), Address::default(), ShortMessage::default())
                .into(),
            DataSm::new(5, DataAddress::default(), DataAddress::default(), Default::default())
                .into(),
            QuerySm::new(6, MessageId::default(), Address::default()).into(),
            CancelSm::new(7, MessageId::default(), Address::default()).into(),
        ];

        for request in requests {
            let response = request.response().unwrap();
            assert!(response.is_response());
            assert!(!response.can_respond());
            assert_eq!(response.sequence_number(), request.sequence_number());
            assert_eq!(
                u32::from(response.command_id()),
                u32::from(request.command_id()) | 0x8000_0000
            );
        }
    }

    #[test]
    fn frames_without_responses() {
        let alert = Frame::from(AlertNotification::new(
            1,
            DataAddress::default(),
            DataAddress::default(),
        ));
        assert!(!alert.can_respond());
        assert!(alert.response().is_none());

        let nack = Frame::from(GenericNack::invalid_command_id(2));
        assert!(!nack.can_respond());
        assert!(nack.is_response());
    }

    #[test]
    fn bind_and_unbind_are_not_windowed() {
        let bind = Frame::from(BindRequest::new(
            BindingType::Receiver,
            1,
            SystemId::default(),
            Password::default(),
        ));
        assert!(bind.can_respond());
        assert!(!bind.is_windowable());
        assert_eq!(bind.command_id(), CommandId::BindReceiver);
        assert!(!Frame::from(Unbind::new(1)).is_windowable());
    }

    #[test]
    fn encode_matches_pdu_encoding() {
        let pdu = SubmitSmResponse::new(5, "id-1".parse().unwrap());
        let frame = Frame::from(pdu.clone());
        assert_eq!(frame.to_bytes().unwrap(), pdu.to_bytes().unwrap());
        assert_eq!(frame.command_status(), CommandStatus::Ok);
    }
}
