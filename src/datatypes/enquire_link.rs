// ABOUTME: enquire_link and enquire_link_resp, the header-only keep-alive pair
// ABOUTME: Sent periodically by the transmitting side to check the link is still up

use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::{impl_complete_header_only_pdu, impl_header_only_response};

/// Link confirmation request. Either peer may send it; the body is empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnquireLink {
    // EnquireLink always sets the command status to NULL
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnquireLinkResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(EnquireLink, CommandId::EnquireLink);
impl_complete_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);
impl_header_only_response!(EnquireLink => EnquireLinkResponse);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encodable, Respondable};

    #[test]
    fn enquire_link_wire_format() {
        let bytes = EnquireLink::new(1).to_bytes().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x00, 0x00, 0x00, 0x10, // command_length
                0x00, 0x00, 0x00, 0x15, // command_id
                0x00, 0x00, 0x00, 0x00, // command_status
                0x00, 0x00, 0x00, 0x01, // sequence_number
            ]
        );
    }

    #[test]
    fn response_echoes_sequence() {
        let response = EnquireLink::new(77).response();
        assert_eq!(response.sequence_number, 77);
        assert_eq!(response.command_status, CommandStatus::Ok);

        let bytes = response.to_bytes().unwrap();
        assert_eq!(&bytes[4..8], &[0x80, 0x00, 0x00, 0x15]);
    }
}
