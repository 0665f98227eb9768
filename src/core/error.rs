//! Error types for the PULSE client.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::FrameError;

/// Failures observed by the link layer.
///
/// None of these are returned to `send_packet`/`connect` callers; they feed
/// the recovery machinery and the diagnostic log, and their effect is
/// observable through the status stream.
#[derive(Debug, Error)]
pub enum PulseError {
    /// I/O error on the socket.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A connect attempt did not complete within the configured timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The remote endpoint closed the stream.
    #[error("remote closed the connection")]
    RemoteClosed,

    /// Malformed frame on the wire.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Reconnect was requested but no endpoint has ever been recorded.
    #[error("no remembered endpoint to reconnect to")]
    NoEndpoint,
}
