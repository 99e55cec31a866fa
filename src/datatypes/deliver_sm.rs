use crate::codec::Respondable;
use crate::datatypes::{
    Address, CommandId, CommandStatus, EsmClass, MessageId, ServiceType, ShortMessage, SmppTime,
    Tlvs, tags,
};
use crate::macros::{impl_message_id_response, impl_short_message_pdu};

/// This operation is used by the SMSC to deliver a short message to an ESME.
/// The deliver_sm PDU is used to deliver both mobile originated messages and
/// delivery receipts from the SMSC to the ESME.
///
/// The body layout is identical to submit_sm. schedule_delivery_time,
/// validity_period and replace_if_present_flag are unused and sent empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    pub service_type: ServiceType,
    pub source_addr: Address,
    pub destination_addr: Address,
    /// 4.3.8 esm_class: Message Type bit 2 marks an SMSC delivery receipt.
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: SmppTime,
    pub validity_period: SmppTime,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub short_message: ShortMessage,

    /// Optional parameters
    pub tlvs: Tlvs,
}

impl DeliverSm {
    pub fn new(
        sequence_number: u32,
        source_addr: Address,
        destination_addr: Address,
        short_message: ShortMessage,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: ServiceType::default(),
            source_addr,
            destination_addr,
            esm_class: EsmClass::default(),
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: SmppTime::empty(),
            validity_period: SmppTime::empty(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            short_message,
            tlvs: Tlvs::new(),
        }
    }

    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class.is_delivery_receipt()
    }

    /// receipted_message_id of a delivery receipt, when the SMSC sends it
    pub fn receipted_message_id(&self) -> Option<String> {
        self.tlvs.get_cstring(tags::RECEIPTED_MESSAGE_ID)
    }
}

impl_short_message_pdu!(DeliverSm, CommandId::DeliverSm);

impl Respondable for DeliverSm {
    type Response = DeliverSmResponse;

    fn response(&self) -> DeliverSmResponse {
        DeliverSmResponse::new(self.sequence_number, MessageId::default())
    }
}

/// deliver_sm_resp: message_id is unused and always sent as a lone NUL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: MessageId,
    pub tlvs: Tlvs,
}

impl_message_id_response!(DeliverSmResponse, CommandId::DeliverSmResp);
