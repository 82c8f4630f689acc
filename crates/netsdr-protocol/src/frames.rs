//! Message kinds and control item codes for the NetSDR protocol.
//!
//! Every NetSDR message starts with a 16-bit header whose top three bits
//! select one of eight message kinds. Kinds `0..=3` carry a control item
//! code after the header; kinds `4..=7` carry sample data.

use bytes::Bytes;
use std::fmt;

/// Message kind identifiers (the 3-bit field in the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Host sets a control item / target reports the new value.
    SetControlItem = 0,
    /// Host requests the current value of a control item.
    CurrentControlItem = 1,
    /// Host requests the valid range of a control item.
    ControlItemRange = 2,
    /// Data item acknowledgement.
    Ack = 3,
    DataItem0 = 4,
    DataItem1 = 5,
    DataItem2 = 6,
    DataItem3 = 7,
}

impl MessageType {
    /// Build a message type from the low three bits of `bits`.
    ///
    /// All eight 3-bit values are valid kinds, so this never fails.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => MessageType::SetControlItem,
            1 => MessageType::CurrentControlItem,
            2 => MessageType::ControlItemRange,
            3 => MessageType::Ack,
            4 => MessageType::DataItem0,
            5 => MessageType::DataItem1,
            6 => MessageType::DataItem2,
            _ => MessageType::DataItem3,
        }
    }

    /// Whether messages of this kind carry sample data instead of a control item code.
    #[must_use]
    pub const fn is_data_item(self) -> bool {
        (self as u8) >= MessageType::DataItem0 as u8
    }

    /// Whether messages of this kind carry a control item code.
    #[must_use]
    pub const fn is_control_item(self) -> bool {
        !self.is_data_item()
    }
}

impl From<MessageType> for u8 {
    fn from(mt: MessageType) -> u8 {
        mt as u8
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Control item codes understood by the client.
///
/// Codes are transmitted as little-endian signed 16-bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ControlItemCode {
    /// Sentinel for data items and for code bytes that match no known item.
    None = 0x0000,
    ReceiverState = 0x0018,
    ReceiverFrequency = 0x0020,
    RfFilter = 0x0044,
    AdModes = 0x008A,
    IqOutputDataSampleRate = 0x00B8,
}

impl ControlItemCode {
    /// Look up a known control item. `None` (the sentinel) is never returned
    /// here: unmapped values yield `Option::None`.
    #[must_use]
    pub const fn from_raw(raw: i16) -> Option<Self> {
        match raw {
            0x0018 => Some(ControlItemCode::ReceiverState),
            0x0020 => Some(ControlItemCode::ReceiverFrequency),
            0x0044 => Some(ControlItemCode::RfFilter),
            0x008A => Some(ControlItemCode::AdModes),
            0x00B8 => Some(ControlItemCode::IqOutputDataSampleRate),
            _ => None,
        }
    }

    /// Raw wire value.
    #[must_use]
    pub const fn raw(self) -> i16 {
        self as i16
    }
}

impl From<ControlItemCode> for i16 {
    fn from(code: ControlItemCode) -> i16 {
        code as i16
    }
}

impl TryFrom<i16> for ControlItemCode {
    type Error = &'static str;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        ControlItemCode::from_raw(value).ok_or("Unknown control item code")
    }
}

/// A decoded NetSDR message.
///
/// Decoding never fails outright: when the frame is malformed `success` is
/// `false` and the remaining fields hold whatever could be recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Whether the header length matched and the control item code was known.
    pub success: bool,
    /// Message kind from the header.
    pub msg_type: MessageType,
    /// Control item code, or [`ControlItemCode::None`] for data items and unknown codes.
    pub code: ControlItemCode,
    /// Data item sequence number; always 0 for control items.
    pub sequence_number: u16,
    /// Message body following the code or sequence number.
    pub body: Bytes,
}

impl DecodedMessage {
    pub(crate) fn empty() -> Self {
        Self {
            success: false,
            msg_type: MessageType::SetControlItem,
            code: ControlItemCode::None,
            sequence_number: 0,
            body: Bytes::new(),
        }
    }
}
