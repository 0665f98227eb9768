//! Inbound frame listener.
//!
//! Owns the read half of the active connection. ACK frames feed the RTT
//! tracker; everything else is decoded and published to the event bus.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::core::PulseError;
use crate::protocol::{FrameError, FrameHeader, ServerPacket};

use super::communicator::{LinkStatus, Shared};

/// Read loop for one connection generation.
///
/// Headers are expected to arrive as a single 11-byte read; a shorter read
/// means the stream desynced and the link is recycled. A read timeout is
/// not an error — it is the window in which cancellation and status changes
/// are observed.
pub(crate) async fn run_listener(shared: Arc<Shared>, epoch: u64, mut reader: OwnedReadHalf) {
    debug!("inbound listener started");
    let mut header = [0u8; FrameHeader::SIZE];

    loop {
        if shared.is_stale(epoch) || shared.status() != LinkStatus::Connected {
            break;
        }

        let n = match timeout(shared.config.read_timeout, reader.read(&mut header)).await {
            Err(_) => continue, // idle link
            Ok(Err(err)) => {
                warn!(error = %err, "read failed");
                shared.handle_link_fault(epoch, "listener-read");
                break;
            }
            Ok(Ok(n)) => n,
        };

        if n == 0 {
            debug!(error = %PulseError::RemoteClosed, "stream ended");
            shared.handle_link_fault(epoch, "listener-eof");
            break;
        }
        if n != FrameHeader::SIZE {
            let err = PulseError::Frame(FrameError::TooShort {
                expected: FrameHeader::SIZE,
                actual: n,
            });
            warn!(error = %err, "unexpected header length");
            shared.handle_link_fault(epoch, "listener-header");
            break;
        }

        let Ok(frame) = FrameHeader::from_bytes(&header) else {
            shared.handle_link_fault(epoch, "listener-header");
            break;
        };

        if frame.is_ack() {
            if frame.payload_len != 0 {
                // Tolerated; the server contract says ACKs are empty.
                warn!(len = frame.payload_len, "ACK with non-empty payload");
            }
            let rtt_nanos = shared.clock.now_nanos() - frame.timestamp_nanos;
            shared.rtt.record(rtt_nanos);
            continue;
        }

        let payload = if frame.payload_len > 0 {
            let mut buf = vec![0u8; frame.payload_len as usize];
            match timeout(shared.config.read_timeout, reader.read_exact(&mut buf)).await {
                Err(_) => {
                    warn!(packet_type = frame.packet_type, "timed out reading payload");
                    shared.handle_link_fault(epoch, "listener-payload");
                    break;
                }
                Ok(Err(err)) => {
                    // Covers a stream that ends inside a declared payload.
                    warn!(packet_type = frame.packet_type, error = %err, "payload read failed");
                    shared.handle_link_fault(epoch, "listener-payload");
                    break;
                }
                Ok(Ok(_)) => Some(buf),
            }
        } else {
            None
        };

        let packet_type = frame.packet_type;
        let published = shared.events.publish(ServerPacket {
            packet_type,
            payload,
        });
        if !published {
            warn!(packet_type, "event bus full, inbound packet dropped");
        }
    }

    debug!("inbound listener stopped");
}
