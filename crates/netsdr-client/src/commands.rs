//! Control item payloads sent by the client.
//!
//! The byte patterns are passed through to the receiver as-is.

use bytes::Bytes;
use netsdr_protocol::{codec, ControlItemCode, MessageType, ProtocolError};

/// Default IQ output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE_HZ: u64 = 100_000;

/// Number of low-order bytes used for frequency and sample rate values.
const FIVE_BYTE_FIELD: usize = 5;

/// Low 40 bits of `value`, little endian. Higher bits are dropped.
fn five_bytes(value: u64) -> [u8; FIVE_BYTE_FIELD] {
    let mut out = [0u8; FIVE_BYTE_FIELD];
    out.copy_from_slice(&value.to_le_bytes()[..FIVE_BYTE_FIELD]);
    out
}

fn set(code: ControlItemCode, payload: &[u8]) -> Result<Bytes, ProtocolError> {
    codec::encode_control_item(MessageType::SetControlItem, code, payload)
}

/// Set the IQ output sample rate.
///
/// # Errors
///
/// Propagates codec errors.
pub fn sample_rate(hz: u64) -> Result<Bytes, ProtocolError> {
    set(ControlItemCode::IqOutputDataSampleRate, &five_bytes(hz))
}

/// Put the RF filter in automatic mode.
///
/// # Errors
///
/// Propagates codec errors.
pub fn rf_filter_auto() -> Result<Bytes, ProtocolError> {
    set(ControlItemCode::RfFilter, &[0x00, 0x00])
}

/// Set the A/D converter mode.
///
/// # Errors
///
/// Propagates codec errors.
pub fn ad_mode() -> Result<Bytes, ProtocolError> {
    set(ControlItemCode::AdModes, &[0x00, 0x03])
}

/// Start the receiver in complex IQ mode, contiguous 16-bit capture.
///
/// # Errors
///
/// Propagates codec errors.
pub fn receiver_start() -> Result<Bytes, ProtocolError> {
    const IQ_DATA_MODE: u8 = 0x80;
    const RUN: u8 = 0x02;
    const FIFO_16BIT_CAPTURE: u8 = 0x01;
    const BLOCK_COUNT: u8 = 0x01;

    set(
        ControlItemCode::ReceiverState,
        &[IQ_DATA_MODE, RUN, FIFO_16BIT_CAPTURE, BLOCK_COUNT],
    )
}

/// Stop the receiver.
///
/// # Errors
///
/// Propagates codec errors.
pub fn receiver_stop() -> Result<Bytes, ProtocolError> {
    const IDLE: u8 = 0x01;

    set(ControlItemCode::ReceiverState, &[0x00, IDLE, 0x00, 0x00])
}

/// Tune `channel` to `hz`.
///
/// Only the low 40 bits of `hz` fit in the field; anything above is truncated.
///
/// # Errors
///
/// Propagates codec errors.
pub fn receiver_frequency(hz: u64, channel: u8) -> Result<Bytes, ProtocolError> {
    let mut payload = [0u8; 1 + FIVE_BYTE_FIELD];
    payload[0] = channel;
    payload[1..].copy_from_slice(&five_bytes(hz));

    set(ControlItemCode::ReceiverFrequency, &payload)
}

/// Request the current value of a control item.
///
/// # Errors
///
/// Propagates codec errors.
pub fn current_value(code: ControlItemCode) -> Result<Bytes, ProtocolError> {
    codec::encode_control_item(MessageType::CurrentControlItem, code, &[])
}
