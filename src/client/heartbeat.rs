//! Periodic liveness probe.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::debug;

use crate::protocol::PacketType;

use super::communicator::{LinkStatus, Shared};

/// Send an empty PING at the configured interval while the link stays
/// Connected. The server echoes each ping's timestamp in an ACK, which the
/// listener turns into an RTT sample.
pub(crate) async fn run_heartbeat(shared: Arc<Shared>, epoch: u64) {
    debug!("heartbeat started");
    while !shared.is_stale(epoch) && shared.status() == LinkStatus::Connected {
        shared.send_frame(PacketType::Ping, &[], "ping").await;
        sleep(shared.config.ping_interval).await;
    }
    debug!("heartbeat stopped");
}
