//! PULSE Protocol - Wire Format
//!
//! Stateless encoding and decoding for the PULSE wire contract:
//!
//! - **Frame codec**: [`encode_frame`], [`decode_frame`], [`FrameHeader`],
//!   and [`PacketType`] covering the legacy and length-prefixed layouts
//! - **Payload encoders**: [`telemetry`] builders for the packet bodies
//!   (touch batches, motion samples, UI interactions, device info)
//!
//! This layer owns no I/O and no state; the link layer feeds it bytes.

mod packet;

pub mod telemetry;

pub use packet::{decode_frame, encode_frame, FrameError, FrameHeader, PacketType, ServerPacket};
