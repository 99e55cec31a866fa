// ABOUTME: Implements the SMPP v3.4 alert_notification PDU sent by the SMSC
// ABOUTME: Signals that a subscriber flagged by set_dpf has become available again

use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
use crate::datatypes::{CommandId, CommandStatus, DataAddress, Tlvs, tags};
use bytes::BytesMut;
use std::io::Cursor;

/// SMPP v3.4 alert_notification PDU (Section 4.12.1)
///
/// Sent by the SMSC when a mobile subscriber becomes available after a
/// delivery pending flag was set. There is no response PDU.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertNotification {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// The subscriber that became available
    pub source_addr: DataAddress,
    /// The ESME that asked to be alerted
    pub esme_addr: DataAddress,

    /// May carry ms_availability_status
    pub tlvs: Tlvs,
}

impl AlertNotification {
    pub fn new(sequence_number: u32, source_addr: DataAddress, esme_addr: DataAddress) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            source_addr,
            esme_addr,
            tlvs: Tlvs::new(),
        }
    }

    /// 0 = available, 1 = denied, 2 = unavailable
    pub fn ms_availability_status(&self) -> Option<u8> {
        self.tlvs.get_u8(tags::MS_AVAILABILITY_STATUS)
    }
}

impl Encodable for AlertNotification {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(
            CommandId::AlertNotification,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf)?;
        self.source_addr.encode(buf, "source_addr")?;
        self.esme_addr.encode(buf, "esme_addr")?;
        self.tlvs.encode(buf)
    }
}

impl Decodable for AlertNotification {
    fn command_id() -> CommandId {
        CommandId::AlertNotification
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        Ok(AlertNotification {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            source_addr: DataAddress::decode(buf, "source_addr")?,
            esme_addr: DataAddress::decode(buf, "esme_addr")?,
            tlvs: Tlvs::decode(buf)?,
        })
    }
}
