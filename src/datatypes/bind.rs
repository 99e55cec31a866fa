// ABOUTME: bind_transmitter, bind_receiver and bind_transceiver requests and their responses
// ABOUTME: The three bind flavours share one body layout and differ only in command_id

use crate::codec::{CodecError, Decodable, Encodable, PduHeader, Respondable, decode_u8, encode_u8};
use crate::datatypes::{
    AddressRange, CommandId, CommandStatus, InterfaceVersion, Password, SystemId, SystemType, Tlvs,
    tags,
};
use bytes::{Buf, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Which way messages flow over a bound session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BindingType {
    Transmitter,
    Receiver,
    #[default]
    Transceiver,
}

impl BindingType {
    /// command_id of the bind request
    pub fn command_id(self) -> CommandId {
        match self {
            BindingType::Transmitter => CommandId::BindTransmitter,
            BindingType::Receiver => CommandId::BindReceiver,
            BindingType::Transceiver => CommandId::BindTransceiver,
        }
    }

    /// command_id of the matching bind response
    pub fn response_command_id(self) -> CommandId {
        match self {
            BindingType::Transmitter => CommandId::BindTransmitterResp,
            BindingType::Receiver => CommandId::BindReceiverResp,
            BindingType::Transceiver => CommandId::BindTransceiverResp,
        }
    }

    pub fn from_command_id(command_id: CommandId) -> Option<Self> {
        match command_id {
            CommandId::BindTransmitter | CommandId::BindTransmitterResp => {
                Some(BindingType::Transmitter)
            }
            CommandId::BindReceiver | CommandId::BindReceiverResp => Some(BindingType::Receiver),
            CommandId::BindTransceiver | CommandId::BindTransceiverResp => {
                Some(BindingType::Transceiver)
            }
            _ => None,
        }
    }
}

impl fmt::Display for BindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindingType::Transmitter => "transmitter",
            BindingType::Receiver => "receiver",
            BindingType::Transceiver => "transceiver",
        };
        f.write_str(name)
    }
}

/// Bind request sent by an ESME to open a session with the SMSC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindRequest {
    pub binding_type: BindingType,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// 5.2.1 system_id: identification of the ESME requesting to bind.
    pub system_id: SystemId,

    /// 5.2.2 password: used by the SMSC to authenticate the ESME. An empty
    ///       password is sent as a lone NUL.
    pub password: Password,

    /// 5.2.3 system_type: categorizes the ESME, e.g. "VMS" or "OTA".
    pub system_type: SystemType,

    /// 5.2.4 interface_version: SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 - 5.2.7 addr_ton, addr_npi and address_range: the SME
    ///       addresses served by this ESME. Usually left empty.
    pub address_range: AddressRange,
}

impl BindRequest {
    pub fn new(
        binding_type: BindingType,
        sequence_number: u32,
        system_id: SystemId,
        password: Password,
    ) -> Self {
        Self {
            binding_type,
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id,
            password,
            system_type: SystemType::default(),
            interface_version: InterfaceVersion::SmppV34,
            address_range: AddressRange::default(),
        }
    }

    pub fn with_system_type(mut self, system_type: SystemType) -> Self {
        self.system_type = system_type;
        self
    }

    pub fn with_address_range(mut self, address_range: AddressRange) -> Self {
        self.address_range = address_range;
        self
    }

    pub fn with_interface_version(mut self, interface_version: InterfaceVersion) -> Self {
        self.interface_version = interface_version;
        self
    }
}

impl Encodable for BindRequest {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(
            self.binding_type.command_id(),
            self.command_status,
            self.sequence_number,
        )
        .encode(buf)?;

        self.system_id.encode(buf, "system_id")?;
        self.password.encode(buf, "password")?;
        self.system_type.encode(buf, "system_type")?;
        encode_u8(buf, self.interface_version.into());
        self.address_range.encode(buf, "address_range")?;
        Ok(())
    }
}

impl Decodable for BindRequest {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn accepts(command_id: CommandId) -> bool {
        matches!(
            command_id,
            CommandId::BindTransmitter | CommandId::BindReceiver | CommandId::BindTransceiver
        )
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        let binding_type = BindingType::from_command_id(header.command_id)
            .unwrap_or(BindingType::Transceiver);

        let system_id = SystemId::decode(buf, "system_id")?;
        let password = Password::decode(buf, "password")?;
        let system_type = SystemType::decode(buf, "system_type")?;
        let interface_version = InterfaceVersion::from(decode_u8(buf)?);
        let address_range = AddressRange::decode(buf, "address_range")?;

        Ok(BindRequest {
            binding_type,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            address_range,
        })
    }
}

impl Respondable for BindRequest {
    type Response = BindResponse;

    fn response(&self) -> BindResponse {
        BindResponse::new(self.binding_type, self.sequence_number, SystemId::default())
    }
}

/// Response to a bind request. An error response may omit the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindResponse {
    pub binding_type: BindingType,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// Identifies the SMSC to the ESME
    pub system_id: SystemId,

    /// Optional parameters, normally only sc_interface_version
    pub tlvs: Tlvs,
}

impl BindResponse {
    pub fn new(binding_type: BindingType, sequence_number: u32, system_id: SystemId) -> Self {
        Self {
            binding_type,
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id,
            tlvs: Tlvs::new(),
        }
    }

    pub fn error(binding_type: BindingType, sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            ..Self::new(binding_type, sequence_number, SystemId::default())
        }
    }

    /// Interface version advertised by the SMSC, if any
    pub fn sc_interface_version(&self) -> Option<InterfaceVersion> {
        self.tlvs
            .get_u8(tags::SC_INTERFACE_VERSION)
            .map(InterfaceVersion::from)
    }
}

impl Encodable for BindResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(
            self.binding_type.response_command_id(),
            self.command_status,
            self.sequence_number,
        )
        .encode(buf)?;

        self.system_id.encode(buf, "system_id")?;
        self.tlvs.encode(buf)
    }
}

impl Decodable for BindResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransceiverResp
    }

    fn accepts(command_id: CommandId) -> bool {
        matches!(
            command_id,
            CommandId::BindTransmitterResp
                | CommandId::BindReceiverResp
                | CommandId::BindTransceiverResp
        )
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        let binding_type = BindingType::from_command_id(header.command_id)
            .unwrap_or(BindingType::Transceiver);

        let system_id = if buf.has_remaining() {
            SystemId::decode(buf, "system_id")?
        } else {
            SystemId::default()
        };
        let tlvs = Tlvs::decode(buf)?;

        Ok(BindResponse {
            binding_type,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            tlvs,
        })
    }
}
