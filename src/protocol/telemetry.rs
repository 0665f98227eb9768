//! Payload encoders for the telemetry packet bodies.
//!
//! These produce the payload bytes only; pair them with the matching
//! [`PacketType`](super::PacketType) when calling the send path. Payload
//! fields are little-endian except the motion sample, which keeps the
//! big-endian layout of its producer.

use crate::core::constants::MAX_TOUCH_POINTS;

/// One tracked pointer within a touch batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPoint {
    /// Pointer identifier, -1 when unknown.
    pub id: i32,
    /// Screen X coordinate in pixels.
    pub x: i32,
    /// Screen Y coordinate in pixels.
    pub y: i32,
}

/// A batch of concurrent touch points (packet type `Touch`).
///
/// Wire layout (little-endian):
/// `timestamp_ms(8) | count(1) | count × (id(4) | x(4) | y(4))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchBatch {
    /// Event timestamp in milliseconds.
    pub timestamp_ms: i64,
    /// Tracked pointers; at most [`MAX_TOUCH_POINTS`] are encoded.
    pub points: Vec<TouchPoint>,
}

impl TouchBatch {
    /// Encode the payload. Points beyond the cap are dropped.
    pub fn encode(&self) -> Vec<u8> {
        let count = self.points.len().min(MAX_TOUCH_POINTS);
        let mut buf = Vec::with_capacity(8 + 1 + count * 12);
        buf.extend_from_slice(&self.timestamp_ms.to_le_bytes());
        buf.push(count as u8);
        for point in &self.points[..count] {
            buf.extend_from_slice(&point.id.to_le_bytes());
            buf.extend_from_slice(&point.x.to_le_bytes());
            buf.extend_from_slice(&point.y.to_le_bytes());
        }
        buf
    }
}

/// A three-axis motion sample (packet types `Gyroscope` and
/// `Accelerometer`).
///
/// Wire layout (big-endian, 28 bytes):
/// `timestamp_ms(8) | reserved(8, zero) | x(4) | y(4) | z(4)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    /// Sensor event timestamp in milliseconds.
    pub timestamp_ms: i64,
    /// X-axis reading.
    pub x: f32,
    /// Y-axis reading.
    pub y: f32,
    /// Z-axis reading.
    pub z: f32,
}

impl MotionSample {
    /// Encoded payload size.
    pub const SIZE: usize = 28;

    /// Encode the payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        buf.extend_from_slice(&[0u8; 8]); // reserved
        buf.extend_from_slice(&self.x.to_be_bytes());
        buf.extend_from_slice(&self.y.to_be_bytes());
        buf.extend_from_slice(&self.z.to_be_bytes());
        buf
    }
}

/// A UI tap at a screen position (packet types `UiEvent` and
/// `UiLongPress`).
///
/// Wire layout (little-endian): `x(4) | y(4) | element UTF-8 bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiTap {
    /// Tap X coordinate in pixels.
    pub x: i32,
    /// Tap Y coordinate in pixels.
    pub y: i32,
    /// Name of the UI element that was hit.
    pub element: String,
}

impl UiTap {
    /// Encode the payload.
    pub fn encode(&self) -> Vec<u8> {
        let name = self.element.as_bytes();
        let mut buf = Vec::with_capacity(8 + name.len());
        buf.extend_from_slice(&self.x.to_le_bytes());
        buf.extend_from_slice(&self.y.to_le_bytes());
        buf.extend_from_slice(name);
        buf
    }
}

/// The start of a press gesture (packet type `UiPressDown`).
///
/// Wire layout (little-endian):
/// `x(4) | y(4) | pressed_at_ms(8) | element UTF-8 bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiPressDown {
    /// Press X coordinate in pixels.
    pub x: i32,
    /// Press Y coordinate in pixels.
    pub y: i32,
    /// When the press started, in milliseconds.
    pub pressed_at_ms: i64,
    /// Name of the UI element that was hit.
    pub element: String,
}

impl UiPressDown {
    /// Encode the payload.
    pub fn encode(&self) -> Vec<u8> {
        let name = self.element.as_bytes();
        let mut buf = Vec::with_capacity(16 + name.len());
        buf.extend_from_slice(&self.x.to_le_bytes());
        buf.extend_from_slice(&self.y.to_le_bytes());
        buf.extend_from_slice(&self.pressed_at_ms.to_le_bytes());
        buf.extend_from_slice(name);
        buf
    }
}

/// Reported device screen dimensions (packet type `DeviceInfo`), sent once
/// after a connection is first established.
///
/// Wire layout (little-endian, 8 bytes): `width(4) | height(4)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Screen width in pixels.
    pub width: i32,
    /// Screen height in pixels.
    pub height: i32,
}

impl DeviceInfo {
    /// Encode the payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_batch_layout() {
        let batch = TouchBatch {
            timestamp_ms: 1,
            points: vec![TouchPoint {
                id: 7,
                x: 100,
                y: 200,
            }],
        };
        let bytes = batch.encode();
        assert_eq!(bytes.len(), 21);
        assert_eq!(&bytes[0..8], &1i64.to_le_bytes());
        assert_eq!(bytes[8], 1);
        assert_eq!(&bytes[9..13], &7i32.to_le_bytes());
        assert_eq!(&bytes[13..17], &100i32.to_le_bytes());
        assert_eq!(&bytes[17..21], &200i32.to_le_bytes());
    }

    #[test]
    fn test_touch_batch_caps_points() {
        let batch = TouchBatch {
            timestamp_ms: 0,
            points: (0..12)
                .map(|i| TouchPoint { id: i, x: 0, y: 0 })
                .collect(),
        };
        let bytes = batch.encode();
        assert_eq!(bytes[8] as usize, MAX_TOUCH_POINTS);
        assert_eq!(bytes.len(), 8 + 1 + MAX_TOUCH_POINTS * 12);
    }

    #[test]
    fn test_motion_sample_layout() {
        let sample = MotionSample {
            timestamp_ms: 2,
            x: 1.0,
            y: -1.0,
            z: 0.5,
        };
        let bytes = sample.encode();
        assert_eq!(bytes.len(), MotionSample::SIZE);
        assert_eq!(&bytes[0..8], &2i64.to_be_bytes());
        assert_eq!(&bytes[8..16], &[0u8; 8]);
        assert_eq!(&bytes[16..20], &1.0f32.to_be_bytes());
        assert_eq!(&bytes[20..24], &(-1.0f32).to_be_bytes());
        assert_eq!(&bytes[24..28], &0.5f32.to_be_bytes());
    }

    #[test]
    fn test_ui_tap_layout() {
        let tap = UiTap {
            x: 5,
            y: 6,
            element: "ok".to_owned(),
        };
        let bytes = tap.encode();
        assert_eq!(&bytes[0..4], &5i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &6i32.to_le_bytes());
        assert_eq!(&bytes[8..], b"ok");
    }

    #[test]
    fn test_ui_press_down_layout() {
        let press = UiPressDown {
            x: -1,
            y: 9,
            pressed_at_ms: 123_456,
            element: "fire".to_owned(),
        };
        let bytes = press.encode();
        assert_eq!(&bytes[0..4], &(-1i32).to_le_bytes());
        assert_eq!(&bytes[4..8], &9i32.to_le_bytes());
        assert_eq!(&bytes[8..16], &123_456i64.to_le_bytes());
        assert_eq!(&bytes[16..], b"fire");
    }

    #[test]
    fn test_device_info_layout() {
        let info = DeviceInfo {
            width: 1080,
            height: 2400,
        };
        let bytes = info.encode();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..4], &1080i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2400i32.to_le_bytes());
    }
}
