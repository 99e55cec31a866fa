use num_enum::{FromPrimitive, IntoPrimitive};

/// This parameter is used to indicate the version of the SMPP protocol.
///
/// Peers in the field send other values too; they are kept as `Other`.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    SmppV34 = 0x34,
    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for InterfaceVersion {
    fn default() -> Self {
        InterfaceVersion::SmppV34
    }
}
