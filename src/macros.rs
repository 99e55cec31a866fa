// ABOUTME: This module provides macros to reduce boilerplate in SMPP PDU implementations
// ABOUTME: Includes macros for header-only PDUs and their request/response pairing

/// Macro for implementing codec traits on header-only PDUs (no body)
///
/// This macro generates Encodable/Decodable implementations for PDUs that
/// only contain the standard SMPP header. Stray body octets are rejected by
/// `PduRegistry::decode_pdu`, which checks the body was fully consumed.
///
/// # Arguments
/// * `$pdu_type` - The PDU struct name (e.g., EnquireLink)
/// * `$command_id` - The CommandId variant (e.g., CommandId::EnquireLink)
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                _buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                Self::validate_header(&header)?;

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                let header = $crate::codec::PduHeader {
                    command_length: $crate::codec::PduHeader::SIZE as u32,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                };
                header.encode(buf)
            }

            fn encoded_size(&self) -> usize {
                $crate::codec::PduHeader::SIZE
            }
        }
    };
}

/// Macro for generating constructor methods for header-only PDUs
///
/// # Generated code
/// - `new(sequence_number: u32)` - Creates PDU with Ok status
/// - `error(sequence_number: u32, status: CommandStatus)` - Creates PDU with error status
macro_rules! impl_header_only_constructors {
    ($pdu_type:ident) => {
        impl $pdu_type {
            /// Create a new PDU with Ok status
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            /// Create a PDU with error status
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }
    };
}

/// Macro for implementing the complete header-only PDU pattern
///
/// Combines the codec implementation and constructor generation.
macro_rules! impl_complete_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        $crate::macros::impl_header_only_pdu!($pdu_type, $command_id);
        $crate::macros::impl_header_only_constructors!($pdu_type);
    };
}

/// Macro for pairing a request with a header-only response
///
/// The generated `response()` copies the request's sequence number and
/// reports ESME_ROK.
macro_rules! impl_header_only_response {
    ($request:ident => $response:ident) => {
        impl $crate::codec::Respondable for $request {
            type Response = $response;

            fn response(&self) -> $response {
                $response::new(self.sequence_number)
            }
        }
    };
}

/// Macro for the submit_sm / deliver_sm body, which both PDUs share
///
/// The struct needs the fields `service_type`, `source_addr`,
/// `destination_addr`, `esm_class`, `protocol_id`, `priority_flag`,
/// `schedule_delivery_time`, `validity_period`, `registered_delivery`,
/// `replace_if_present_flag`, `short_message` and `tlvs`.
macro_rules! impl_short_message_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use $crate::codec::encode_u8;

                $crate::codec::PduHeader::placeholder(
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                )
                .encode(buf)?;

                self.service_type.encode(buf, "service_type")?;
                self.source_addr.encode(buf, "source_addr")?;
                self.destination_addr.encode(buf, "destination_addr")?;
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

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::decode_u8;
                use $crate::datatypes::{
                    Address, EsmClass, ServiceType, ShortMessage, SmppTime, Tlvs,
                };

                Self::validate_header(&header)?;

                let service_type = ServiceType::decode(buf, "service_type")?;
                let source_addr = Address::decode(buf, "source_addr")?;
                let destination_addr = Address::decode(buf, "destination_addr")?;
                let esm_class = EsmClass::from(decode_u8(buf)?);
                let protocol_id = decode_u8(buf)?;
                let priority_flag = decode_u8(buf)?;
                let schedule_delivery_time = SmppTime::decode(buf, "schedule_delivery_time")?;
                let validity_period = SmppTime::decode(buf, "validity_period")?;
                let registered_delivery = decode_u8(buf)?;
                let replace_if_present_flag = decode_u8(buf)?;
                let short_message = ShortMessage::decode(buf, esm_class.has_udhi())?;
                let tlvs = Tlvs::decode(buf)?;

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr,
                    destination_addr,
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
    };
}

/// Macro for responses whose body is a message_id plus optional parameters
///
/// Decoding accepts a missing body, which SMSCs send with error statuses.
macro_rules! impl_message_id_response {
    ($pdu_type:ident, $command_id:expr) => {
        impl $pdu_type {
            pub fn new(sequence_number: u32, message_id: $crate::datatypes::MessageId) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    message_id,
                    tlvs: $crate::datatypes::Tlvs::new(),
                }
            }

            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    ..Self::new(sequence_number, Default::default())
                }
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::PduHeader::placeholder(
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                )
                .encode(buf)?;
                self.message_id.encode(buf, "message_id")?;
                self.tlvs.encode(buf)
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                let message_id = if buf.has_remaining() {
                    $crate::datatypes::MessageId::decode(buf, "message_id")?
                } else {
                    Default::default()
                };
                let tlvs = $crate::datatypes::Tlvs::decode(buf)?;

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    message_id,
                    tlvs,
                })
            }
        }
    };
}

// Make macros available to the rest of the crate
pub(crate) use {
    impl_complete_header_only_pdu, impl_header_only_constructors, impl_header_only_pdu,
    impl_header_only_response, impl_message_id_response, impl_short_message_pdu,
};
