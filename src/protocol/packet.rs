//! Frame encoding and decoding for the PULSE wire format.
//!
//! Outbound frames come in two layouts, selected by packet type:
//!
//! ```text
//! Legacy:    +--------+---------------------+-------------+
//!            | Type   | Timestamp           | Payload     |
//!            | 1 byte | 8 bytes (BE64)      | N bytes     |
//!            +--------+---------------------+-------------+
//!
//! Extended:  +--------+---------------------+----------------+-------------+
//!            | Type   | Timestamp           | Payload Length | Payload     |
//!            | 1 byte | 8 bytes (BE64)      | 2 bytes (LE16) | N bytes     |
//!            +--------+---------------------+----------------+-------------+
//! ```
//!
//! The extended layout applies to the UI interaction types (`0x05`, `0x07`,
//! `0x08`). Inbound frames always carry the 11-byte extended header. The
//! big-endian timestamp next to a little-endian length field is the wire
//! contract as the server implements it; both orders are reproduced exactly.

use thiserror::Error;

use crate::core::constants::{
    INBOUND_HEADER_SIZE, LEGACY_HEADER_SIZE, MAX_PAYLOAD_SIZE, PACKET_TYPE_ACCEL, PACKET_TYPE_ACK,
    PACKET_TYPE_DEVICE_INFO, PACKET_TYPE_GYRO, PACKET_TYPE_PING, PACKET_TYPE_TOUCH,
    PACKET_TYPE_UI_EVENT, PACKET_TYPE_UI_LONG_PRESS, PACKET_TYPE_UI_PRESS_DOWN,
};

/// Errors raised by frame encoding/decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame or header shorter than the layout requires.
    #[error("frame too short: need {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum byte count the layout requires.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Type code not defined by the protocol.
    #[error("unknown packet type: {0:#04x}")]
    UnknownType(u8),

    /// Declared payload length does not match the bytes present.
    #[error("declared payload length {declared} does not match remaining {actual} bytes")]
    LengthMismatch {
        /// Length from the frame's length field.
        declared: usize,
        /// Payload bytes actually present.
        actual: usize,
    },

    /// Payload does not fit the u16 length field of the extended layout.
    #[error("payload too large for a length-prefixed frame: {0} bytes")]
    PayloadTooLarge(usize),
}

/// Packet type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Pointer/touch telemetry batch.
    Touch = PACKET_TYPE_TOUCH,
    /// Gyroscope sample.
    Gyroscope = PACKET_TYPE_GYRO,
    /// Liveness/latency probe.
    Ping = PACKET_TYPE_PING,
    /// Accelerometer sample.
    Accelerometer = PACKET_TYPE_ACCEL,
    /// UI click event.
    UiEvent = PACKET_TYPE_UI_EVENT,
    /// Device information.
    DeviceInfo = PACKET_TYPE_DEVICE_INFO,
    /// UI long-press event (press end).
    UiLongPress = PACKET_TYPE_UI_LONG_PRESS,
    /// UI press-down event (press start).
    UiPressDown = PACKET_TYPE_UI_PRESS_DOWN,
    /// Server acknowledgment.
    Ack = PACKET_TYPE_ACK,
}

impl PacketType {
    /// Parse a packet type from its wire code.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            PACKET_TYPE_TOUCH => Some(Self::Touch),
            PACKET_TYPE_GYRO => Some(Self::Gyroscope),
            PACKET_TYPE_PING => Some(Self::Ping),
            PACKET_TYPE_ACCEL => Some(Self::Accelerometer),
            PACKET_TYPE_UI_EVENT => Some(Self::UiEvent),
            PACKET_TYPE_DEVICE_INFO => Some(Self::DeviceInfo),
            PACKET_TYPE_UI_LONG_PRESS => Some(Self::UiLongPress),
            PACKET_TYPE_UI_PRESS_DOWN => Some(Self::UiPressDown),
            PACKET_TYPE_ACK => Some(Self::Ack),
            _ => None,
        }
    }

    /// Wire code for this packet type.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether the outbound layout carries the little-endian length field.
    pub fn has_length_prefix(self) -> bool {
        matches!(self, Self::UiEvent | Self::UiLongPress | Self::UiPressDown)
    }
}

/// Inbound frame header.
///
/// Every server frame starts with these 11 bytes, followed by exactly
/// `payload_len` payload bytes. The type is kept raw so unknown server
/// codes pass through to subscribers untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw packet type code.
    pub packet_type: u8,
    /// Sender timestamp in nanoseconds (big-endian on the wire).
    pub timestamp_nanos: i64,
    /// Payload length (little-endian on the wire).
    pub payload_len: u16,
}

impl FrameHeader {
    /// Header size in bytes.
    pub const SIZE: usize = INBOUND_HEADER_SIZE;

    /// Create a new header.
    pub fn new(packet_type: u8, timestamp_nanos: i64, payload_len: u16) -> Self {
        Self {
            packet_type,
            timestamp_nanos,
            payload_len,
        }
    }

    /// Serialize the header to its 11-byte wire form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.packet_type;
        buf[1..9].copy_from_slice(&self.timestamp_nanos.to_be_bytes());
        buf[9..11].copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Parse a header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < Self::SIZE {
            return Err(FrameError::TooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[1..9]);

        Ok(Self {
            packet_type: bytes[0],
            timestamp_nanos: i64::from_be_bytes(ts),
            payload_len: u16::from_le_bytes([bytes[9], bytes[10]]),
        })
    }

    /// Whether this header announces a server acknowledgment.
    pub fn is_ack(&self) -> bool {
        self.packet_type == PACKET_TYPE_ACK
    }
}

/// A decoded non-ACK server frame as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPacket {
    /// Raw packet type code.
    pub packet_type: u8,
    /// Payload bytes, `None` when the frame carried none.
    pub payload: Option<Vec<u8>>,
}

/// Encode an outbound frame.
///
/// The layout is selected by the packet type; length-prefixed frames reject
/// payloads over 65535 bytes.
pub fn encode_frame(
    packet_type: PacketType,
    timestamp_nanos: i64,
    payload: &[u8],
) -> Result<Vec<u8>, FrameError> {
    let mut buf = Vec::with_capacity(INBOUND_HEADER_SIZE + payload.len());
    buf.push(packet_type.as_byte());
    buf.extend_from_slice(&timestamp_nanos.to_be_bytes());

    if packet_type.has_length_prefix() {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge(payload.len()));
        }
        buf.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    }

    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Decode a complete outbound frame back into its parts.
///
/// Legacy frames treat everything after the 9-byte header as payload;
/// extended frames require the declared length to match the remainder.
pub fn decode_frame(frame: &[u8]) -> Result<(PacketType, i64, Vec<u8>), FrameError> {
    if frame.len() < LEGACY_HEADER_SIZE {
        return Err(FrameError::TooShort {
            expected: LEGACY_HEADER_SIZE,
            actual: frame.len(),
        });
    }

    let packet_type = PacketType::from_byte(frame[0]).ok_or(FrameError::UnknownType(frame[0]))?;

    let mut ts = [0u8; 8];
    ts.copy_from_slice(&frame[1..9]);
    let timestamp_nanos = i64::from_be_bytes(ts);

    if packet_type.has_length_prefix() {
        if frame.len() < INBOUND_HEADER_SIZE {
            return Err(FrameError::TooShort {
                expected: INBOUND_HEADER_SIZE,
                actual: frame.len(),
            });
        }
        let declared = u16::from_le_bytes([frame[9], frame[10]]) as usize;
        let actual = frame.len() - INBOUND_HEADER_SIZE;
        if declared != actual {
            return Err(FrameError::LengthMismatch { declared, actual });
        }
        Ok((
            packet_type,
            timestamp_nanos,
            frame[INBOUND_HEADER_SIZE..].to_vec(),
        ))
    } else {
        Ok((
            packet_type,
            timestamp_nanos,
            frame[LEGACY_HEADER_SIZE..].to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_codes() {
        assert_eq!(PacketType::Touch.as_byte(), 0x01);
        assert_eq!(PacketType::Ping.as_byte(), 0x03);
        assert_eq!(PacketType::Ack.as_byte(), 0xFE);
        assert_eq!(PacketType::from_byte(0x05), Some(PacketType::UiEvent));
        assert_eq!(PacketType::from_byte(0x99), None);
    }

    #[test]
    fn test_length_prefix_applies_to_ui_types_only() {
        for ty in [
            PacketType::UiEvent,
            PacketType::UiLongPress,
            PacketType::UiPressDown,
        ] {
            assert!(ty.has_length_prefix());
        }
        for ty in [
            PacketType::Touch,
            PacketType::Gyroscope,
            PacketType::Ping,
            PacketType::Accelerometer,
            PacketType::DeviceInfo,
            PacketType::Ack,
        ] {
            assert!(!ty.has_length_prefix());
        }
    }

    #[test]
    fn test_legacy_wire_image() {
        let frame = encode_frame(PacketType::Ping, 1000, &[]).unwrap();
        assert_eq!(frame, hex::decode("030000000000000003e8").unwrap());
    }

    #[test]
    fn test_extended_wire_image_mixed_endianness() {
        let frame = encode_frame(PacketType::UiEvent, 1000, &[0xAA, 0xBB, 0xCC]).unwrap();
        // BE timestamp, LE length: 0x0003 encodes as 03 00.
        assert_eq!(frame, hex::decode("050000000000000003e80300aabbcc").unwrap());
    }

    #[test]
    fn test_round_trip_legacy() {
        let payload = vec![1u8, 2, 3, 4, 5];
        let frame = encode_frame(PacketType::Gyroscope, -42, &payload).unwrap();
        let (ty, ts, body) = decode_frame(&frame).unwrap();
        assert_eq!(ty, PacketType::Gyroscope);
        assert_eq!(ts, -42);
        assert_eq!(body, payload);
    }

    #[test]
    fn test_round_trip_extended() {
        let payload = b"button_a".to_vec();
        let frame = encode_frame(PacketType::UiPressDown, i64::MAX, &payload).unwrap();
        let (ty, ts, body) = decode_frame(&frame).unwrap();
        assert_eq!(ty, PacketType::UiPressDown);
        assert_eq!(ts, i64::MAX);
        assert_eq!(body, payload);
    }

    #[test]
    fn test_round_trip_empty_payload() {
        let frame = encode_frame(PacketType::UiLongPress, 7, &[]).unwrap();
        assert_eq!(frame.len(), 11);
        let (ty, ts, body) = decode_frame(&frame).unwrap();
        assert_eq!(ty, PacketType::UiLongPress);
        assert_eq!(ts, 7);
        assert!(body.is_empty());
    }

    #[test]
    fn test_header_decode_example() {
        let bytes = hex::decode("010000000000000003e80000").unwrap();
        let header = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.packet_type, 0x01);
        assert_eq!(header.timestamp_nanos, 1000);
        assert_eq!(header.payload_len, 0);
    }

    #[test]
    fn test_header_round_trip() {
        let header = FrameHeader::new(0xFE, -123_456_789, 512);
        let parsed = FrameHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.is_ack());
    }

    #[test]
    fn test_header_preserves_unknown_types() {
        let header = FrameHeader::new(0x7F, 0, 4);
        let parsed = FrameHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed.packet_type, 0x7F);
    }

    #[test]
    fn test_header_too_short() {
        let err = FrameHeader::from_bytes(&[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            FrameError::TooShort {
                expected: 11,
                actual: 10
            }
        );
    }

    #[test]
    fn test_decode_rejects_truncated_extended_payload() {
        let mut frame = encode_frame(PacketType::UiEvent, 0, b"hello").unwrap();
        frame.truncate(frame.len() - 2);
        let err = decode_frame(&frame).unwrap_err();
        assert_eq!(
            err,
            FrameError::LengthMismatch {
                declared: 5,
                actual: 3
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let mut frame = encode_frame(PacketType::Ping, 0, &[]).unwrap();
        frame[0] = 0x42;
        assert_eq!(decode_frame(&frame).unwrap_err(), FrameError::UnknownType(0x42));
    }

    #[test]
    fn test_encode_rejects_oversized_prefixed_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        let err = encode_frame(PacketType::UiEvent, 0, &payload).unwrap_err();
        assert_eq!(err, FrameError::PayloadTooLarge(MAX_PAYLOAD_SIZE + 1));
    }

    #[test]
    fn test_timestamp_is_big_endian() {
        let frame = encode_frame(PacketType::Touch, 0x0102030405060708, &[]).unwrap();
        assert_eq!(&frame[1..9], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
