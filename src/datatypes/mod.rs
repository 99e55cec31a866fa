pub(crate) mod address;
mod alert_notification;
mod bind;
mod c_octet_string;
mod cancel_sm;
mod command_id;
mod command_status;
mod data_sm;
mod datetime;
mod deliver_sm;
mod enquire_link;
mod esm_class;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
mod outbind;
mod query_sm;
mod replace_sm;
mod short_message;
mod submit_multi;
mod submit_sm;
mod tlv;
mod type_of_number;
mod udh;
mod unbind;

pub use address::{
    Address, AddressRange, DataAddress, DestinationAddress, MAX_DESTINATIONS, SmeAddress,
    UnsuccessSme,
};
pub use alert_notification::AlertNotification;
pub use bind::{BindRequest, BindResponse, BindingType};
pub use c_octet_string::{
    AddressRangeValue, AddressValue, COctetString, COctetStringError, DataAddressValue,
    DistributionListName, MessageId, Password, ServiceType, SystemId, SystemType,
};
pub use cancel_sm::{CancelSm, CancelSmResponse};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use data_sm::{DataSm, DataSmResponse};
pub use datetime::SmppTime;
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use esm_class::EsmClass;
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use outbind::Outbind;
pub use query_sm::{MessageState, QuerySm, QuerySmResponse};
pub use replace_sm::{ReplaceSm, ReplaceSmResponse};
pub use short_message::{
    DEFAULT_SEGMENT_LIMIT, MAX_SHORT_MESSAGE_LENGTH, SEGMENT_BUDGET, ShortMessage,
};
pub use submit_multi::{SubmitMulti, SubmitMultiResponse};
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use tlv::{Tlv, Tlvs, tags};
pub use type_of_number::TypeOfNumber;
pub use udh::{ConcatInfo, IE_CONCAT_8BIT_REF, IE_CONCAT_16BIT_REF, InfoElement, Udh};
pub use unbind::{Unbind, UnbindResponse};
