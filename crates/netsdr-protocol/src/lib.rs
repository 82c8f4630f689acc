//! # netsdr-protocol
//!
//! Wire protocol definitions for the NetSDR receiver control protocol.
//!
//! This crate defines the binary message format used between a host and a
//! NetSDR receiver: message kinds, control item codes, the message codec and
//! sample extraction for IQ data items.
//!
//! ## Message Families
//!
//! - Control items (`SetControlItem`, `CurrentControlItem`, `ControlItemRange`, `Ack`)
//!   carry a 16-bit control item code after the header.
//! - Data items (`DataItem0` to `DataItem3`) carry a 16-bit sequence number
//!   followed by sample data.
//!
//! ## Example
//!
//! ```rust
//! use netsdr_protocol::{codec, ControlItemCode, MessageType};
//!
//! let msg = codec::encode_control_item(
//!     MessageType::SetControlItem,
//!     ControlItemCode::ReceiverFrequency,
//!     &[0x00, 0x40, 0x42, 0x0F, 0x00, 0x00],
//! )
//! .unwrap();
//!
//! let decoded = codec::decode(&msg);
//! assert!(decoded.success);
//! assert_eq!(decoded.code, ControlItemCode::ReceiverFrequency);
//! ```

pub mod codec;
pub mod frames;
pub mod samples;

pub use codec::{decode, encode_control_item, encode_data_item, MessageCodec, ProtocolError};
pub use frames::{ControlItemCode, DecodedMessage, MessageType};
pub use samples::{unpack, Samples};
