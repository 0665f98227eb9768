//! Bounded fan-out of inbound server packets.
//!
//! The listener publishes every decoded non-ACK frame here. Publishing is
//! strictly non-blocking: a subscriber that stops draining loses the newest
//! packets rather than stalling the read loop.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::protocol::ServerPacket;

/// Multicast channel for decoded server packets.
///
/// Each subscriber gets its own bounded buffer; a packet is cloned into
/// every live buffer that has room. With no subscribers, publishing
/// succeeds and the packet is discarded.
#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<mpsc::Sender<ServerPacket>>>,
}

impl EventBus {
    /// Create a bus with the given per-subscriber capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> PacketStream {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        PacketStream { rx }
    }

    /// Deliver a packet to every live subscriber without blocking.
    ///
    /// Returns `false` if at least one subscriber's buffer was full and the
    /// packet was dropped for it. Subscribers whose stream was dropped are
    /// pruned.
    pub fn publish(&self, packet: ServerPacket) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());

        let mut delivered_everywhere = true;
        for tx in subscribers.iter() {
            match tx.try_send(packet.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => delivered_everywhere = false,
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered_everywhere
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

/// A subscriber's view of the event bus.
#[derive(Debug)]
pub struct PacketStream {
    rx: mpsc::Receiver<ServerPacket>,
}

impl PacketStream {
    /// Receive the next packet, waiting if none is buffered.
    ///
    /// Returns `None` once the bus side has been dropped and the buffer is
    /// drained.
    pub async fn recv(&mut self) -> Option<ServerPacket> {
        self.rx.recv().await
    }

    /// Take a buffered packet without waiting.
    pub fn try_recv(&mut self) -> Option<ServerPacket> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(seq: u8) -> ServerPacket {
        ServerPacket {
            packet_type: 0x10,
            payload: Some(vec![seq]),
        }
    }

    #[test]
    fn test_publish_without_subscribers_succeeds() {
        let bus = EventBus::new(4);
        assert!(bus.publish(packet(0)));
    }

    #[tokio::test]
    async fn test_multicast_to_all_subscribers() {
        let bus = EventBus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert!(bus.publish(packet(1)));
        assert_eq!(a.recv().await, Some(packet(1)));
        assert_eq!(b.recv().await, Some(packet(1)));
    }

    #[test]
    fn test_drop_newest_on_full_buffer() {
        let bus = EventBus::new(64);
        let mut stream = bus.subscribe();

        let mut drops = 0;
        for seq in 0..100u8 {
            if !bus.publish(packet(seq)) {
                drops += 1;
            }
        }
        assert_eq!(drops, 36);

        // The first 64 packets arrive in submission order; the rest were
        // dropped at publish time.
        for seq in 0..64u8 {
            assert_eq!(stream.try_recv(), Some(packet(seq)));
        }
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new(4);
        let stream = bus.subscribe();
        drop(stream);

        assert!(bus.publish(packet(9)));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_affect_others() {
        let bus = EventBus::new(2);
        let mut fast = bus.subscribe();
        let _slow = bus.subscribe();

        assert!(bus.publish(packet(1)));
        assert!(bus.publish(packet(2)));
        assert_eq!(fast.recv().await, Some(packet(1)));

        // Slow subscriber is now full; fast still gets its own copy.
        assert!(!bus.publish(packet(3)));
        assert_eq!(fast.recv().await, Some(packet(2)));
        assert_eq!(fast.recv().await, Some(packet(3)));
    }
}
