//! PULSE Protocol - Link Layer
//!
//! The connection state machine and its public facade:
//!
//! - [`PulseClient`]: `connect` / `disconnect` / `send_packet` plus the
//!   observable status, RTT, and inbound-packet streams
//! - [`LinkConfig`]: timing and capacity tunables
//! - [`LinkStatus`]: the lifecycle states other components react to
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │        Producers (sensors, UI, device)        │
//! ├───────────────────────────────────────────────┤
//! │           Link Layer  (this module)           │
//! │   state machine, dispatcher, listener, ping   │
//! ├───────────────────────────────────────────────┤
//! │   Wire Format  (codec, payload encoders)      │
//! ├───────────────────────────────────────────────┤
//! │                     TCP                       │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Delivery is best-effort by design: frames sent while not Connected are
//! dropped, never queued, and failures surface only through the status
//! stream.

mod communicator;
mod heartbeat;
mod listener;

pub use communicator::{LinkConfig, LinkStatus, PulseClient};
