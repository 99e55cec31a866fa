// ABOUTME: SMPP esm_class bitfield (messaging mode, message type and GSM network features)
// ABOUTME: Keeps the raw octet so unusual combinations survive a decode/encode cycle

use std::fmt;

/// ESM (External Short Message) class octet.
///
/// Bits 1-0 select the messaging mode, bits 5-2 the message type and
/// bits 7-6 the GSM features (UDHI and reply path).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EsmClass(u8);

impl EsmClass {
    const MODE_MASK: u8 = 0b0000_0011;
    const TYPE_MASK: u8 = 0b0011_1100;

    pub const DEFAULT_MODE: u8 = 0b0000_0000;
    pub const DATAGRAM_MODE: u8 = 0b0000_0001;
    pub const FORWARD_MODE: u8 = 0b0000_0010;
    pub const STORE_AND_FORWARD_MODE: u8 = 0b0000_0011;

    pub const DELIVERY_RECEIPT: u8 = 0b0000_0100;
    pub const DELIVERY_ACKNOWLEDGEMENT: u8 = 0b0000_1000;
    pub const USER_ACKNOWLEDGEMENT: u8 = 0b0001_0000;
    pub const INTERMEDIATE_NOTIFICATION: u8 = 0b0010_0000;

    /// User Data Header Indicator: the short message starts with a UDH
    pub const UDHI: u8 = 0b0100_0000;
    pub const REPLY_PATH: u8 = 0b1000_0000;

    pub const fn new(value: u8) -> Self {
        EsmClass(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub fn messaging_mode(self) -> u8 {
        self.0 & Self::MODE_MASK
    }

    pub fn message_type(self) -> u8 {
        self.0 & Self::TYPE_MASK
    }

    pub fn has_udhi(self) -> bool {
        self.0 & Self::UDHI != 0
    }

    pub fn with_udhi(self) -> Self {
        EsmClass(self.0 | Self::UDHI)
    }

    pub fn has_reply_path(self) -> bool {
        self.0 & Self::REPLY_PATH != 0
    }

    /// A deliver_sm carrying an SMSC delivery receipt
    pub fn is_delivery_receipt(self) -> bool {
        self.message_type() == Self::DELIVERY_RECEIPT
    }
}

impl From<u8> for EsmClass {
    fn from(value: u8) -> Self {
        EsmClass(value)
    }
}

impl From<EsmClass> for u8 {
    fn from(esm_class: EsmClass) -> Self {
        esm_class.0
    }
}

impl fmt::Debug for EsmClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EsmClass({:#04x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udhi_bit() {
        let esm_class = EsmClass::new(EsmClass::STORE_AND_FORWARD_MODE);
        assert!(!esm_class.has_udhi());

        let with_udhi = esm_class.with_udhi();
        assert!(with_udhi.has_udhi());
        assert_eq!(with_udhi.value(), 0x43);
        assert_eq!(with_udhi.messaging_mode(), EsmClass::STORE_AND_FORWARD_MODE);
    }

    #[test]
    fn delivery_receipt_type() {
        assert!(EsmClass::new(0x04).is_delivery_receipt());
        assert!(!EsmClass::new(0x44).has_reply_path());
        assert!(EsmClass::new(0x44).is_delivery_receipt());
    }

    #[test]
    fn raw_value_is_preserved() {
        for value in [0x00u8, 0x3F, 0xC3, 0xFF] {
            assert_eq!(u8::from(EsmClass::from(value)), value);
        }
    }
}
