//! The PULSE client: connection state machine and public facade.
//!
//! One [`PulseClient`] owns one logical connection. Background work (the
//! connect/retry loop, the heartbeat, the inbound listener) runs as tokio
//! tasks registered under a lifecycle epoch; tearing a generation down
//! cancels its tasks first and releases the socket after, and a bumped
//! epoch keeps any still-unwinding task from touching the next generation.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};

use crate::core::constants::{
    CONNECT_TIMEOUT, EVENT_BUS_CAPACITY, PING_INTERVAL, READ_TIMEOUT, RECONNECT_DELAY,
    RETRY_DELAY_INITIAL, RETRY_DELAY_MAX,
};
use crate::core::{MonotonicClock, PulseError};
use crate::protocol::{encode_frame, PacketType};
use crate::transport::{EventBus, PacketStream, RetryBackoff, RttStats, RttTracker};

use super::heartbeat::run_heartbeat;
use super::listener::run_listener;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Not connected and not trying to be.
    Disconnected,
    /// A connect/retry loop is running.
    Connecting,
    /// Link established, telemetry flowing.
    Connected,
    /// Recovery is impossible without a fresh `connect()`.
    Error,
}

/// Tunable link parameters.
///
/// The defaults are the protocol's reference values; the wire format itself
/// is not configurable.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// TCP connect timeout per attempt.
    pub connect_timeout: Duration,
    /// Socket read timeout applied per listener read.
    pub read_timeout: Duration,
    /// Interval between heartbeat PING probes.
    pub ping_interval: Duration,
    /// Delay before reconnecting after an I/O fault.
    pub reconnect_delay: Duration,
    /// Initial delay between failed connect attempts.
    pub retry_delay_initial: Duration,
    /// Cap for the doubling retry delay.
    pub retry_delay_max: Duration,
    /// Pending-packet capacity of the event bus, per subscriber.
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            ping_interval: PING_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
            retry_delay_initial: RETRY_DELAY_INITIAL,
            retry_delay_max: RETRY_DELAY_MAX,
            event_capacity: EVENT_BUS_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    host: String,
    port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Task registry for one connection generation.
#[derive(Debug, Default)]
struct Lifecycle {
    /// Bumped on every teardown; tasks spawned under an older epoch are
    /// stale and must not touch the link.
    epoch: u64,
    tasks: Vec<JoinHandle<()>>,
}

/// The write half together with the epoch it was installed under, so a
/// deferred release never clobbers a newer connection's socket.
#[derive(Debug)]
struct WriterSlot {
    epoch: u64,
    half: OwnedWriteHalf,
}

/// State shared between the facade and the background tasks.
pub(crate) struct Shared {
    pub(crate) config: LinkConfig,
    pub(crate) clock: MonotonicClock,
    pub(crate) rtt: RttTracker,
    pub(crate) events: EventBus,
    status_tx: watch::Sender<LinkStatus>,
    /// Exclusive output path; every outbound frame is written under this
    /// lock so concurrent producers never interleave.
    writer: AsyncMutex<Option<WriterSlot>>,
    /// Endpoint from the most recent `connect()`, kept for reconnects.
    endpoint: Mutex<Option<Endpoint>>,
    lifecycle: Mutex<Lifecycle>,
    runtime: Handle,
}

impl Shared {
    /// Current connection status.
    pub(crate) fn status(&self) -> LinkStatus {
        *self.status_tx.borrow()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn current_epoch(&self) -> u64 {
        self.lifecycle().epoch
    }

    /// Whether the given epoch has been superseded by a teardown.
    pub(crate) fn is_stale(&self, epoch: u64) -> bool {
        self.current_epoch() != epoch
    }

    fn current_endpoint(&self) -> Option<Endpoint> {
        self.endpoint
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_status_if_current(&self, epoch: u64, status: LinkStatus) -> bool {
        let guard = self.lifecycle();
        if guard.epoch != epoch {
            return false;
        }
        self.status_tx.send_replace(status);
        true
    }

    fn register_task(&self, epoch: u64, handle: JoinHandle<()>) {
        let mut guard = self.lifecycle();
        if guard.epoch == epoch {
            guard.tasks.push(handle);
        } else {
            handle.abort();
        }
    }

    /// End the current generation: cancel its tasks, publish the final
    /// status, then release the socket. Returns the new epoch.
    fn teardown(self: &Arc<Self>, final_status: LinkStatus) -> u64 {
        let mut guard = self.lifecycle();
        guard.epoch += 1;
        let epoch = guard.epoch;
        for handle in guard.tasks.drain(..) {
            handle.abort();
        }
        self.status_tx.send_replace(final_status);
        drop(guard);
        self.release_writer(epoch);
        epoch
    }

    /// Drop any write half installed before `epoch`, waiting out an
    /// in-flight write if one holds the lock.
    fn release_writer(self: &Arc<Self>, epoch: u64) {
        if let Ok(mut writer) = self.writer.try_lock() {
            if writer.as_ref().is_some_and(|slot| slot.epoch < epoch) {
                *writer = None;
            }
            return;
        }
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let mut writer = shared.writer.lock().await;
            if writer.as_ref().is_some_and(|slot| slot.epoch < epoch) {
                *writer = None;
            }
        });
    }

    /// Launch the connect/retry loop under the given epoch.
    fn spawn_retry_loop(self: &Arc<Self>, epoch: u64, initial_delay: Duration) {
        let shared = Arc::clone(self);
        let handle = self
            .runtime
            .spawn(run_retry_loop(shared, epoch, initial_delay));
        self.register_task(epoch, handle);
    }

    /// Adopt a freshly connected stream: install the write half, publish
    /// `Connected`, start the listener and heartbeat.
    async fn install_connection(self: &Arc<Self>, epoch: u64, stream: TcpStream) -> bool {
        let (read_half, write_half) = stream.into_split();
        {
            let mut writer = self.writer.lock().await;
            if self.is_stale(epoch) {
                return false;
            }
            *writer = Some(WriterSlot {
                epoch,
                half: write_half,
            });
        }
        if !self.set_status_if_current(epoch, LinkStatus::Connected) {
            return false;
        }

        let listener = self
            .runtime
            .spawn(run_listener(Arc::clone(self), epoch, read_half));
        self.register_task(epoch, listener);

        let heartbeat = self.runtime.spawn(run_heartbeat(Arc::clone(self), epoch));
        self.register_task(epoch, heartbeat);

        true
    }

    /// Encode and write one frame under the output lock; not connected
    /// means the frame is silently dropped.
    pub(crate) async fn send_frame(
        self: &Arc<Self>,
        packet_type: PacketType,
        payload: &[u8],
        description: &str,
    ) {
        if self.status() != LinkStatus::Connected {
            trace!(description, "link not connected, dropping frame");
            return;
        }
        let epoch = self.current_epoch();
        let timestamp = self.clock.now_nanos();
        let frame = match encode_frame(packet_type, timestamp, payload) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(description, error = %err, "failed to encode frame");
                return;
            }
        };

        let mut guard = self.writer.lock().await;
        let Some(slot) = guard.as_mut() else {
            return;
        };
        if slot.epoch != epoch {
            return;
        }
        let mut result = slot.half.write_all(&frame).await;
        if result.is_ok() {
            result = slot.half.flush().await;
        }
        drop(guard);

        if let Err(err) = result {
            warn!(description, error = %err, "write failed");
            self.handle_link_fault(epoch, "send_packet");
        }
    }

    /// React to an I/O fault on the active link: tear this generation down
    /// and schedule a reconnect to the remembered endpoint, or land in
    /// `Error` when there is none.
    pub(crate) fn handle_link_fault(self: &Arc<Self>, epoch: u64, phase: &str) {
        // Grab the endpoint before tearing anything down.
        let endpoint = self.current_endpoint();

        let mut guard = self.lifecycle();
        if guard.epoch != epoch {
            return;
        }
        if !matches!(self.status(), LinkStatus::Connected | LinkStatus::Connecting) {
            return;
        }

        guard.epoch += 1;
        let new_epoch = guard.epoch;
        for handle in guard.tasks.drain(..) {
            handle.abort();
        }

        match endpoint {
            Some(endpoint) => {
                warn!(
                    phase,
                    %endpoint,
                    "link fault, reconnecting in {:?}",
                    self.config.reconnect_delay
                );
                self.status_tx.send_replace(LinkStatus::Connecting);
                drop(guard);
                self.release_writer(new_epoch);
                self.spawn_retry_loop(new_epoch, self.config.reconnect_delay);
            }
            None => {
                warn!(phase, "link fault: {}", PulseError::NoEndpoint);
                self.status_tx.send_replace(LinkStatus::Error);
                drop(guard);
                self.release_writer(new_epoch);
            }
        }
    }
}

/// One TCP connect attempt under the configured timeout.
async fn attempt_connect(config: &LinkConfig, endpoint: &Endpoint) -> Result<TcpStream, PulseError> {
    let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
    let stream = timeout(config.connect_timeout, connect)
        .await
        .map_err(|_| PulseError::ConnectTimeout(config.connect_timeout))??;
    // Telemetry frames are tiny; coalescing them would defeat the point.
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Connect to the remembered endpoint, retrying with exponential backoff
/// until established or cancelled.
async fn run_retry_loop(shared: Arc<Shared>, epoch: u64, initial_delay: Duration) {
    if !initial_delay.is_zero() {
        sleep(initial_delay).await;
    }

    let Some(endpoint) = shared.current_endpoint() else {
        warn!("{}", PulseError::NoEndpoint);
        shared.set_status_if_current(epoch, LinkStatus::Error);
        return;
    };

    let mut backoff = RetryBackoff::new(
        shared.config.retry_delay_initial,
        shared.config.retry_delay_max,
    );
    let mut attempt: u32 = 1;

    loop {
        if shared.is_stale(epoch) {
            return;
        }
        debug!(%endpoint, attempt, "connecting");
        match attempt_connect(&shared.config, &endpoint).await {
            Ok(stream) => {
                if shared.install_connection(epoch, stream).await {
                    info!(%endpoint, attempt, "connected");
                }
                return;
            }
            Err(err) => {
                warn!(%endpoint, attempt, error = %err, "connect attempt failed");
                let delay = backoff.next_delay();
                debug!("retrying in {:?}", delay);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// A PULSE telemetry uplink client.
///
/// The facade is intentionally fire-and-forget: `connect` and `send_packet`
/// never fail synchronously; all outcomes are observable through the
/// status, RTT, and packet streams.
///
/// # Example
///
/// ```ignore
/// use pulse_protocol::{LinkStatus, PacketType, PulseClient};
///
/// let client = PulseClient::new();
/// client.connect("192.168.1.50", 12345);
///
/// let mut status = client.status_stream();
/// while *status.borrow() != LinkStatus::Connected {
///     status.changed().await?;
/// }
///
/// client.send_packet(PacketType::Gyroscope, &sample, "gyro sample").await;
/// ```
pub struct PulseClient {
    shared: Arc<Shared>,
}

impl PulseClient {
    /// Create a client with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime: the client captures the runtime
    /// handle at construction so `connect`/`disconnect` stay plain sync
    /// calls usable from sensor and UI callback threads.
    pub fn new() -> Self {
        Self::with_config(LinkConfig::default())
    }

    /// Create a client with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime, as [`PulseClient::new`].
    pub fn with_config(config: LinkConfig) -> Self {
        let (status_tx, _) = watch::channel(LinkStatus::Disconnected);
        let events = EventBus::new(config.event_capacity);
        Self {
            shared: Arc::new(Shared {
                config,
                clock: MonotonicClock::new(),
                rtt: RttTracker::new(),
                events,
                status_tx,
                writer: AsyncMutex::new(None),
                endpoint: Mutex::new(None),
                lifecycle: Mutex::new(Lifecycle::default()),
                runtime: Handle::current(),
            }),
        }
    }

    /// Start connecting to `host:port`.
    ///
    /// A no-op while already Connecting or Connected. Otherwise records the
    /// endpoint, tears down stale resources, resets the RTT statistics, and
    /// starts the retry loop; progress is visible on the status stream.
    pub fn connect(&self, host: &str, port: u16) {
        let status = self.shared.status();
        if matches!(status, LinkStatus::Connecting | LinkStatus::Connected) {
            debug!(?status, "connect requested while already active");
            return;
        }

        {
            let mut endpoint = self
                .shared
                .endpoint
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *endpoint = Some(Endpoint {
                host: host.to_owned(),
                port,
            });
        }

        let epoch = self.shared.teardown(LinkStatus::Connecting);
        self.shared.rtt.reset();
        self.shared.spawn_retry_loop(epoch, Duration::ZERO);
    }

    /// Disconnect and release the link. Idempotent.
    pub fn disconnect(&self) {
        self.shared.teardown(LinkStatus::Disconnected);
        info!("disconnected");
    }

    /// Send one telemetry frame, best-effort.
    ///
    /// Silently dropped unless Connected; nothing is queued for later
    /// delivery. `description` is used only in diagnostics.
    pub async fn send_packet(&self, packet_type: PacketType, payload: &[u8], description: &str) {
        self.shared
            .send_frame(packet_type, payload, description)
            .await;
    }

    /// Current connection status.
    pub fn status(&self) -> LinkStatus {
        self.shared.status()
    }

    /// Subscribe to connection status changes.
    pub fn status_stream(&self) -> watch::Receiver<LinkStatus> {
        self.shared.status_tx.subscribe()
    }

    /// The most recent RTT statistics, `None` before the first ACK.
    pub fn rtt_snapshot(&self) -> Option<RttStats> {
        self.shared.rtt.snapshot()
    }

    /// Subscribe to RTT statistics updates.
    pub fn rtt_stream(&self) -> watch::Receiver<Option<RttStats>> {
        self.shared.rtt.subscribe()
    }

    /// Subscribe to decoded inbound packets (ACKs excluded).
    pub fn subscribe_packets(&self) -> PacketStream {
        self.shared.events.subscribe()
    }
}

impl Default for PulseClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PulseClient {
    fn drop(&mut self) {
        self.shared.teardown(LinkStatus::Disconnected);
    }
}
