//! PULSE Feeder Example
//!
//! Runs either side of a PULSE session:
//!
//! - `server`: accepts clients, ACKs every PING by echoing its timestamp,
//!   and prints the telemetry it receives
//! - `feeder` (default): drives the client facade with synthetic gyroscope
//!   samples and logs round-trip statistics
//!
//! Environment variables:
//! - PULSE_MODE: "server" or "feeder" (default "feeder")
//! - PULSE_HOST: endpoint host (default 127.0.0.1)
//! - PULSE_PORT: endpoint port (default 12345)
//! - PULSE_LOG: tracing filter (default "info")

use std::env;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use pulse_protocol::core::constants::{
    PACKET_TYPE_ACCEL, PACKET_TYPE_ACK, PACKET_TYPE_DEVICE_INFO, PACKET_TYPE_GYRO,
    PACKET_TYPE_PING, PACKET_TYPE_TOUCH, PACKET_TYPE_UI_EVENT, PACKET_TYPE_UI_LONG_PRESS,
    PACKET_TYPE_UI_PRESS_DOWN,
};
use pulse_protocol::protocol::telemetry::{DeviceInfo, MotionSample};
use pulse_protocol::{FrameHeader, LinkStatus, MonotonicClock, PacketType, PulseClient};

#[tokio::main]
async fn main() {
    let filter = env::var("PULSE_LOG").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let host = env::var("PULSE_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let port: u16 = env::var("PULSE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(12345);

    match env::var("PULSE_MODE").as_deref() {
        Ok("server") => run_server(&host, port).await,
        _ => run_feeder(&host, port).await,
    }
}

async fn run_server(host: &str, port: u16) {
    let listener = TcpListener::bind((host, port))
        .await
        .expect("failed to bind server socket");
    info!("listening on {host}:{port}");

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        info!(%peer, "client connected");
        tokio::spawn(async move {
            if let Err(err) = serve_client(socket).await {
                info!(%peer, error = %err, "client session ended");
            }
        });
    }
}

/// Read client frames until the stream ends, acknowledging pings.
///
/// Legacy frames carry no length field, so the server knows each type's
/// payload size from the contract; the UI types are self-describing.
async fn serve_client(mut socket: TcpStream) -> io::Result<()> {
    loop {
        let mut head = [0u8; 9];
        socket.read_exact(&mut head).await?;
        let ty = head[0];
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&head[1..9]);
        let timestamp = i64::from_be_bytes(ts);

        match ty {
            PACKET_TYPE_PING => {
                let ack = FrameHeader::new(PACKET_TYPE_ACK, timestamp, 0);
                socket.write_all(&ack.to_bytes()).await?;
            }
            PACKET_TYPE_GYRO | PACKET_TYPE_ACCEL => {
                let mut payload = [0u8; 28];
                socket.read_exact(&mut payload).await?;
                let x = f32::from_be_bytes([payload[16], payload[17], payload[18], payload[19]]);
                let y = f32::from_be_bytes([payload[20], payload[21], payload[22], payload[23]]);
                let z = f32::from_be_bytes([payload[24], payload[25], payload[26], payload[27]]);
                info!(ty, "motion sample x={x:.2} y={y:.2} z={z:.2}");
            }
            PACKET_TYPE_DEVICE_INFO => {
                let mut payload = [0u8; 8];
                socket.read_exact(&mut payload).await?;
                let width = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let height = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
                info!(width, height, "device info");
            }
            PACKET_TYPE_TOUCH => {
                let mut prefix = [0u8; 9];
                socket.read_exact(&mut prefix).await?;
                let count = prefix[8] as usize;
                let mut points = vec![0u8; count * 12];
                socket.read_exact(&mut points).await?;
                info!(count, "touch batch");
            }
            PACKET_TYPE_UI_EVENT | PACKET_TYPE_UI_LONG_PRESS | PACKET_TYPE_UI_PRESS_DOWN => {
                let mut len = [0u8; 2];
                socket.read_exact(&mut len).await?;
                let mut payload = vec![0u8; u16::from_le_bytes(len) as usize];
                socket.read_exact(&mut payload).await?;
                info!(ty, bytes = payload.len(), "ui interaction");
            }
            other => {
                warn!(ty = other, "unknown packet type, closing");
                return Ok(());
            }
        }
    }
}

async fn run_feeder(host: &str, port: u16) {
    let client = PulseClient::new();
    client.connect(host, port);

    let mut status = client.status_stream();
    loop {
        let current = *status.borrow();
        if current == LinkStatus::Connected {
            break;
        }
        info!(?current, "waiting for link");
        status.changed().await.expect("status stream closed");
    }
    info!("link up");

    // Report the (synthetic) display size once per session.
    let device = DeviceInfo {
        width: 1080,
        height: 2400,
    };
    client
        .send_packet(PacketType::DeviceInfo, &device.encode(), "device info")
        .await;

    // Print whatever the server pushes back.
    let mut packets = client.subscribe_packets();
    tokio::spawn(async move {
        while let Some(packet) = packets.recv().await {
            let bytes = packet.payload.as_ref().map_or(0, Vec::len);
            info!(packet_type = packet.packet_type, bytes, "server packet");
        }
    });

    // Log round-trip statistics as they update.
    let mut rtt = client.rtt_stream();
    tokio::spawn(async move {
        while rtt.changed().await.is_ok() {
            if let Some(stats) = rtt.borrow_and_update().clone() {
                if stats.count % 5 == 0 {
                    info!(%stats, "round-trip");
                }
            }
        }
    });

    // Stream a synthetic gyroscope wave at 50 Hz.
    let clock = MonotonicClock::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(20));
    let mut phase = 0.0f32;
    loop {
        ticker.tick().await;
        phase += 0.02;
        let sample = MotionSample {
            timestamp_ms: clock.now_nanos() / 1_000_000,
            x: phase.sin(),
            y: phase.cos(),
            z: 9.81,
        };
        client
            .send_packet(PacketType::Gyroscope, &sample.encode(), "gyro sample")
            .await;
    }
}
