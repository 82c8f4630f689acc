//! Codec for encoding and decoding NetSDR messages.
//!
//! Wire layout:
//!
//! ```text
//! ┌────────────────────────────┬──────────────────────┬─────────────┐
//! │ Header (u16 LE)            │ Code / Seq (u16 LE)  │ Payload     │
//! │ kind: 3 bits, length: 13   │ control / data items │ variable    │
//! └────────────────────────────┴──────────────────────┴─────────────┘
//! ```
//!
//! The length field counts the whole message including the header. A message
//! of exactly [`MAX_MESSAGE_LENGTH`] bytes does not fit in 13 bits and is
//! written with a length field of 0.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::frames::{ControlItemCode, DecodedMessage, MessageType};

/// Maximum total message size in bytes.
pub const MAX_MESSAGE_LENGTH: usize = 8192;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 2;

/// Size of the control item code field.
pub const CODE_SIZE: usize = 2;

/// Size of the data item sequence number field.
pub const SEQUENCE_SIZE: usize = 2;

const LENGTH_MASK: u16 = 0x1FFF;
const TYPE_SHIFT: u16 = 13;

/// Protocol errors that can occur during encoding or sample extraction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Message exceeds [`MAX_MESSAGE_LENGTH`].
    #[error("Message length exceeds allowed value: {0} > {MAX_MESSAGE_LENGTH}")]
    MessageTooLong(usize),

    /// Message type belongs to the wrong family for the requested encoding.
    #[error("Invalid message type for this encoding: {0}")]
    InvalidMessageType(MessageType),

    /// Sample width is not a non-zero multiple of 8 up to 32 bits.
    #[error("Sample size {0} is out of range (must be a multiple of 8, at most 32)")]
    InvalidSampleSize(u32),
}

/// Encode a control item message.
///
/// The encoded format is header, 2-byte code, then `payload`.
///
/// # Errors
///
/// Returns an error if `msg_type` is a data item kind or the message would be
/// longer than [`MAX_MESSAGE_LENGTH`].
pub fn encode_control_item(
    msg_type: MessageType,
    code: ControlItemCode,
    payload: &[u8],
) -> Result<Bytes, ProtocolError> {
    if msg_type.is_data_item() {
        return Err(ProtocolError::InvalidMessageType(msg_type));
    }

    let total = HEADER_SIZE + CODE_SIZE + payload.len();
    let header = header_word(msg_type, total)?;

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u16_le(header);
    buf.put_i16_le(code.raw());
    buf.extend_from_slice(payload);

    Ok(buf.freeze())
}

/// Encode a data item message.
///
/// The payload is written directly after the header. By convention its first
/// two bytes are the little-endian sequence number.
///
/// # Errors
///
/// Returns an error if `msg_type` is a control item kind or the message would
/// be longer than [`MAX_MESSAGE_LENGTH`].
pub fn encode_data_item(msg_type: MessageType, payload: &[u8]) -> Result<Bytes, ProtocolError> {
    if msg_type.is_control_item() {
        return Err(ProtocolError::InvalidMessageType(msg_type));
    }

    let total = HEADER_SIZE + payload.len();
    let header = header_word(msg_type, total)?;

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u16_le(header);
    buf.extend_from_slice(payload);

    Ok(buf.freeze())
}

fn header_word(msg_type: MessageType, total: usize) -> Result<u16, ProtocolError> {
    if total > MAX_MESSAGE_LENGTH {
        return Err(ProtocolError::MessageTooLong(total));
    }

    // 8192 wraps to 0 in the 13-bit field
    let length = if total == MAX_MESSAGE_LENGTH {
        0
    } else {
        total as u16
    };

    Ok((u16::from(u8::from(msg_type)) << TYPE_SHIFT) | (length & LENGTH_MASK))
}

/// Decode a message.
///
/// Never fails: a length mismatch or an unknown control item code clears
/// [`DecodedMessage::success`] but the other fields are still filled in so the
/// caller can inspect the frame.
#[must_use]
pub fn decode(data: &[u8]) -> DecodedMessage {
    if data.len() < HEADER_SIZE {
        return DecodedMessage::empty();
    }

    let word = u16::from_le_bytes([data[0], data[1]]);
    let msg_type = MessageType::from_bits((word >> TYPE_SHIFT) as u8);
    let length_field = usize::from(word & LENGTH_MASK);
    let expected = if length_field == 0 {
        data.len()
    } else {
        length_field
    };
    let length_matches = expected == data.len();

    let field = data
        .get(HEADER_SIZE..HEADER_SIZE + CODE_SIZE)
        .map(|b| [b[0], b[1]]);
    let body = data
        .get(HEADER_SIZE + CODE_SIZE..)
        .map(Bytes::copy_from_slice)
        .unwrap_or_default();

    if msg_type.is_control_item() {
        let code = field.and_then(|b| ControlItemCode::from_raw(i16::from_le_bytes(b)));

        DecodedMessage {
            success: length_matches && code.is_some(),
            msg_type,
            code: code.unwrap_or(ControlItemCode::None),
            sequence_number: 0,
            body,
        }
    } else {
        DecodedMessage {
            success: length_matches,
            msg_type,
            code: ControlItemCode::None,
            sequence_number: field.map(u16::from_le_bytes).unwrap_or(0),
            body,
        }
    }
}

/// Stateless codec handle for callers that prefer a value to free functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageCodec;

impl MessageCodec {
    /// Create a new codec instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encode a control item message.
    ///
    /// # Errors
    ///
    /// See [`encode_control_item`].
    pub fn encode_control_item(
        &self,
        msg_type: MessageType,
        code: ControlItemCode,
        payload: &[u8],
    ) -> Result<Bytes, ProtocolError> {
        encode_control_item(msg_type, code, payload)
    }

    /// Encode a data item message.
    ///
    /// # Errors
    ///
    /// See [`encode_data_item`].
    pub fn encode_data_item(
        &self,
        msg_type: MessageType,
        payload: &[u8],
    ) -> Result<Bytes, ProtocolError> {
        encode_data_item(msg_type, payload)
    }

    /// Decode a message.
    #[must_use]
    pub fn decode(&self, data: &[u8]) -> DecodedMessage {
        decode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(msg: &[u8]) -> (MessageType, usize) {
        let word = u16::from_le_bytes([msg[0], msg[1]]);
        (
            MessageType::from_bits((word >> 13) as u8),
            usize::from(word & 0x1FFF),
        )
    }

    #[test]
    fn test_control_item_layout() {
        let msg = encode_control_item(
            MessageType::Ack,
            ControlItemCode::ReceiverState,
            &vec![0u8; 7500],
        )
        .unwrap();

        let (msg_type, length) = header(&msg);
        assert_eq!(msg_type, MessageType::Ack);
        assert_eq!(length, msg.len());
        assert_eq!(i16::from_le_bytes([msg[2], msg[3]]), 0x0018);
        assert_eq!(msg.len() - 4, 7500);
    }

    #[test]
    fn test_data_item_layout() {
        let msg = encode_data_item(MessageType::DataItem2, &vec![0u8; 7500]).unwrap();

        let (msg_type, length) = header(&msg);
        assert_eq!(msg_type, MessageType::DataItem2);
        assert_eq!(length, msg.len());
        assert_eq!(msg.len() - 2, 7500);
    }

    #[test]
    fn test_decode_control_item() {
        let params = [0x01, 0x02, 0x03];
        let msg = encode_control_item(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverFrequency,
            &params,
        )
        .unwrap();

        let decoded = decode(&msg);
        assert!(decoded.success);
        assert_eq!(decoded.msg_type, MessageType::SetControlItem);
        assert_eq!(decoded.code, ControlItemCode::ReceiverFrequency);
        assert_eq!(decoded.sequence_number, 0);
        assert_eq!(&decoded.body[..], &params);
    }

    #[test]
    fn test_decode_data_item() {
        let mut params = 123u16.to_le_bytes().to_vec();
        params.extend_from_slice(&[10, 20, 30, 40]);
        let msg = encode_data_item(MessageType::DataItem1, &params).unwrap();

        let decoded = decode(&msg);
        assert!(decoded.success);
        assert_eq!(decoded.msg_type, MessageType::DataItem1);
        assert_eq!(decoded.code, ControlItemCode::None);
        assert_eq!(decoded.sequence_number, 123);
        assert_eq!(&decoded.body[..], &[10, 20, 30, 40]);
    }

    #[test]
    fn test_unknown_code_fails_with_partial_fields() {
        let params = [1, 2, 3, 4];
        let msg = encode_control_item(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &params,
        )
        .unwrap();
        let mut corrupted = msg.to_vec();
        corrupted[2] = 0xFF;
        corrupted[3] = 0xFF;

        let decoded = decode(&corrupted);
        assert!(!decoded.success);
        assert_eq!(decoded.msg_type, MessageType::SetControlItem);
        assert_eq!(decoded.code, ControlItemCode::None);
        assert_eq!(decoded.sequence_number, 0);
        assert_eq!(&decoded.body[..], &params);
    }

    #[test]
    fn test_truncated_message_fails() {
        let params = [1, 2, 3, 4, 5];
        let msg =
            encode_control_item(MessageType::Ack, ControlItemCode::ReceiverState, &params).unwrap();
        let truncated = &msg[..msg.len() - 1];

        let decoded = decode(truncated);
        assert!(!decoded.success);
        assert_eq!(decoded.msg_type, MessageType::Ack);
        assert_eq!(decoded.code, ControlItemCode::ReceiverState);
        assert_eq!(decoded.body.len(), params.len() - 1);
    }

    #[test]
    fn test_message_too_long() {
        let params = vec![0u8; 9000];

        let err = encode_control_item(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverState,
            &params,
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("Message length exceeds allowed value"));

        match encode_data_item(MessageType::DataItem0, &params) {
            Err(ProtocolError::MessageTooLong(9002)) => {}
            other => panic!("Expected MessageTooLong error, got {:?}", other),
        }
    }

    #[test]
    fn test_max_length_data_item_wraps_to_zero() {
        let mut params = vec![0u8; MAX_MESSAGE_LENGTH - HEADER_SIZE];
        params[..2].copy_from_slice(&0x1234u16.to_le_bytes());

        let msg = encode_data_item(MessageType::DataItem0, &params).unwrap();
        assert_eq!(msg.len(), MAX_MESSAGE_LENGTH);
        assert_eq!(header(&msg), (MessageType::DataItem0, 0));

        let decoded = decode(&msg);
        assert!(decoded.success);
        assert_eq!(decoded.code, ControlItemCode::None);
        assert_eq!(decoded.sequence_number, 0x1234);
        assert_eq!(decoded.body.len(), params.len() - 2);
    }

    #[test]
    fn test_max_length_control_item_wraps_to_zero() {
        let params = vec![7u8; MAX_MESSAGE_LENGTH - HEADER_SIZE - CODE_SIZE];
        let msg = encode_control_item(
            MessageType::SetControlItem,
            ControlItemCode::RfFilter,
            &params,
        )
        .unwrap();
        assert_eq!(header(&msg), (MessageType::SetControlItem, 0));

        let decoded = decode(&msg);
        assert!(decoded.success);
        assert_eq!(decoded.code, ControlItemCode::RfFilter);
        assert_eq!(decoded.body.len(), params.len());

        // One byte more no longer fits
        let mut params = params;
        params.push(0);
        assert_eq!(
            encode_control_item(MessageType::SetControlItem, ControlItemCode::RfFilter, &params),
            Err(ProtocolError::MessageTooLong(MAX_MESSAGE_LENGTH + 1))
        );
    }

    #[test]
    fn test_wrong_family_rejected() {
        assert_eq!(
            encode_control_item(MessageType::DataItem0, ControlItemCode::RfFilter, &[]),
            Err(ProtocolError::InvalidMessageType(MessageType::DataItem0))
        );
        assert_eq!(
            encode_data_item(MessageType::Ack, &[]),
            Err(ProtocolError::InvalidMessageType(MessageType::Ack))
        );
    }

    #[test]
    fn test_decode_short_input() {
        assert!(!decode(&[]).success);
        assert!(!decode(&[0x04]).success);

        // Header only, claims 4 bytes, no code present
        let decoded = decode(&[0x04, 0x00]);
        assert!(!decoded.success);
        assert_eq!(decoded.code, ControlItemCode::None);
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn test_empty_data_item() {
        let msg = encode_data_item(MessageType::DataItem3, &[]).unwrap();
        let decoded = decode(&msg);
        assert!(decoded.success);
        assert_eq!(decoded.msg_type, MessageType::DataItem3);
        assert_eq!(decoded.sequence_number, 0);
        assert!(decoded.body.is_empty());
    }
}
