//! # PULSE Protocol
//!
//! **P**ersistent **U**plink for **L**ow-latency **S**ensor **E**vents
//!
//! PULSE streams telemetry (pointer, motion-sensor, and UI-interaction
//! events) to a single remote endpoint over one persistent TCP connection.
//! It provides:
//!
//! - **Low latency**: Nagle disabled, tiny self-describing frames, no
//!   queuing — a frame is written now or not at all
//! - **Liveness**: a heartbeat PING every second, answered by server ACKs
//!   that feed running round-trip statistics
//! - **Resilience**: indefinite connect retries with capped exponential
//!   backoff, and automatic reconnection after mid-session faults
//! - **Observability**: watch streams for connection status and RTT, plus
//!   a bounded fan-out of decoded inbound packets
//!
//! ## Feature Flags
//!
//! - `client` (default): the link layer (state machine, dispatcher,
//!   listener, heartbeat) and its tokio/tracing dependencies
//!
//! Without `client` the crate is just the dependency-free wire format,
//! which is enough for tools that only parse or synthesize frames.
//!
//! ## Modules
//!
//! - [`core`]: constants, errors, and the monotonic clock (always included)
//! - [`protocol`]: frame codec and telemetry payload encoders (always
//!   included)
//! - [`transport`]: RTT tracking, retry backoff, event fan-out (requires
//!   `client`)
//! - [`client`]: the connection state machine and [`PulseClient`] facade
//!   (requires `client`)
//!
//! ## Example Usage
//!
//! ```ignore
//! use pulse_protocol::prelude::*;
//! use pulse_protocol::protocol::telemetry::MotionSample;
//!
//! let client = PulseClient::new();
//! client.connect("192.168.1.50", 12345);
//!
//! // React to inbound server packets.
//! let mut packets = client.subscribe_packets();
//! tokio::spawn(async move {
//!     while let Some(packet) = packets.recv().await {
//!         println!("server packet {:#04x}", packet.packet_type);
//!     }
//! });
//!
//! // Stream sensor samples; drops are fine while the link is down.
//! let sample = MotionSample { timestamp_ms: 17, x: 0.1, y: 0.0, z: 9.8 };
//! client
//!     .send_packet(PacketType::Gyroscope, &sample.encode(), "gyro sample")
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire format (always included)
pub mod protocol;

// Link support layer (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod transport;

// Link layer and facade (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use crate::core::{MonotonicClock, PulseError};

    // Wire format
    pub use crate::protocol::{
        decode_frame, encode_frame, FrameError, FrameHeader, PacketType, ServerPacket,
    };

    // Link layer (when enabled)
    #[cfg(feature = "client")]
    pub use crate::client::{LinkConfig, LinkStatus, PulseClient};

    #[cfg(feature = "client")]
    pub use crate::transport::{EventBus, PacketStream, RetryBackoff, RttStats, RttTracker};
}

// Re-export commonly used items at crate root
pub use crate::core::{MonotonicClock, PulseError};
pub use crate::protocol::{FrameError, FrameHeader, PacketType, ServerPacket};

#[cfg(feature = "client")]
pub use crate::client::{LinkConfig, LinkStatus, PulseClient};

#[cfg(feature = "client")]
pub use crate::transport::{EventBus, PacketStream, RttStats, RttTracker};
