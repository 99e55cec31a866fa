//! The purpose of the outbind operation is to allow the SMSC signal an ESME to
//! originate a bind_receiver request to the SMSC. An example of where such a
//! facility might be applicable would be where the SMSC had outstanding
//! messages for delivery to the ESME.
//!
//! Outbind has no response PDU. The ESME answers with a bind_receiver on the
//! same connection, or disconnects if it does not accept the session.

use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
use crate::datatypes::{CommandId, CommandStatus, Password, SystemId};
use bytes::BytesMut;
use std::io::Cursor;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbind {
    /// Unused for outbind and always 0 on the wire
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    /// 5.2.1: Identifies the SMSC to the ESME
    pub system_id: SystemId,
    pub password: Password,
}

impl Outbind {
    pub fn new(sequence_number: u32, system_id: SystemId, password: Password) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id,
            password,
        }
    }
}

impl Encodable for Outbind {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(CommandId::Outbind, self.command_status, self.sequence_number)
            .encode(buf)?;
        self.system_id.encode(buf, "system_id")?;
        self.password.encode(buf, "password")
    }
}

impl Decodable for Outbind {
    fn command_id() -> CommandId {
        CommandId::Outbind
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        Ok(Outbind {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id: SystemId::decode(buf, "system_id")?,
            password: Password::decode(buf, "password")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbind_wire_format() {
        let outbind = Outbind::new(1, "SMSC".parse().unwrap(), "pw".parse().unwrap());
        let bytes = outbind.to_bytes().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x00, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x01, b'S', b'M', b'S', b'C', 0x00, b'p', b'w', 0x00,
            ]
        );

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        assert_eq!(Outbind::decode(header, &mut cursor).unwrap(), outbind);
    }
}
