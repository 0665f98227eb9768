//! Protocol constants for the PULSE wire format and link timing.
//!
//! The packet type codes and header layout are fixed by the server contract
//! and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// PACKET TYPE CODES
// =============================================================================

/// Pointer/touch telemetry batch.
pub const PACKET_TYPE_TOUCH: u8 = 0x01;

/// Gyroscope sample.
pub const PACKET_TYPE_GYRO: u8 = 0x02;

/// Client liveness/latency probe (empty payload).
pub const PACKET_TYPE_PING: u8 = 0x03;

/// Accelerometer sample.
pub const PACKET_TYPE_ACCEL: u8 = 0x04;

/// UI click event (length-prefixed layout).
pub const PACKET_TYPE_UI_EVENT: u8 = 0x05;

/// Device information (screen dimensions).
pub const PACKET_TYPE_DEVICE_INFO: u8 = 0x06;

/// UI long-press event, sent when the press ends (length-prefixed layout).
pub const PACKET_TYPE_UI_LONG_PRESS: u8 = 0x07;

/// UI press-down event, sent when the press starts (length-prefixed layout).
pub const PACKET_TYPE_UI_PRESS_DOWN: u8 = 0x08;

/// Server acknowledgment echoing a prior send timestamp.
pub const PACKET_TYPE_ACK: u8 = 0xFE;

// =============================================================================
// WIRE SIZES
// =============================================================================

/// Inbound frame header size: type(1) + timestamp(8) + payload_len(2).
pub const INBOUND_HEADER_SIZE: usize = 11;

/// Legacy outbound header size: type(1) + timestamp(8).
pub const LEGACY_HEADER_SIZE: usize = 9;

/// Maximum payload length expressible by the u16 length field.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Maximum touch points carried by a single touch batch.
pub const MAX_TOUCH_POINTS: usize = 10;

// =============================================================================
// LINK TIMING
// =============================================================================

/// TCP connect timeout per attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Socket read timeout; bounds how long the listener blocks per read.
pub const READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Interval between heartbeat PING probes while connected.
pub const PING_INTERVAL: Duration = Duration::from_millis(1000);

/// Delay before reconnecting after an I/O fault on an established link.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Initial delay between failed connect attempts.
pub const RETRY_DELAY_INITIAL: Duration = Duration::from_millis(1000);

/// Upper bound for the doubling retry delay.
pub const RETRY_DELAY_MAX: Duration = Duration::from_millis(30000);

// =============================================================================
// OBSERVABILITY
// =============================================================================

/// Emit a round-trip summary log line every this many samples.
pub const RTT_LOG_INTERVAL: u32 = 100;

/// Pending-packet capacity of the inbound event bus, per subscriber.
pub const EVENT_BUS_CAPACITY: usize = 64;
