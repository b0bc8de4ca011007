//! Periodic sender.
//!
//! Connects to the loopback server and writes the fixed payload on every
//! tick until interrupted. Connection failure is fatal: there is no retry
//! and no reconnect.

use crate::config::ClientConfig;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpSocket, TcpStream};
use tokio::signal;
use tokio::time;
use tracing::{debug, info};

/// Fixed payload written on every tick.
pub(crate) const PAYLOAD: &[u8] = b"hello";

/// Connect and send until interrupted.
pub async fn run(config: ClientConfig) -> io::Result<()> {
    let stream = connect(&config).await?;
    info!(local = %stream.local_addr()?, peer = %stream.peer_addr()?, "Connected");

    tokio::select! {
        res = send_loop(stream, config.interval) => res,
        _ = signal::ctrl_c() => {
            info!("Interrupted, closing connection");
            Ok(())
        }
    }
}

/// Build the socket per configuration and connect to the server.
pub(crate) async fn connect(config: &ClientConfig) -> io::Result<TcpStream> {
    let socket = build_socket(config)?;
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.port));
    let stream = socket.connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Create the client socket, applying the optional SO_REUSEADDR and
/// local-port bind before any connect.
fn build_socket(config: &ClientConfig) -> io::Result<TcpSocket> {
    let socket = TcpSocket::new_v4()?;
    if config.reuse_addr {
        socket.set_reuseaddr(true)?;
    }
    if let Some(local_port) = config.local_port {
        socket.bind(SocketAddr::from((Ipv4Addr::LOCALHOST, local_port)))?;
    }
    Ok(socket)
}

/// Write the payload, then wait out the interval, forever. The first tick
/// fires immediately, so one payload goes out right after connecting.
pub(crate) async fn send_loop(mut stream: TcpStream, interval: Duration) -> io::Result<()> {
    let mut ticker = time::interval(interval);

    loop {
        ticker.tick().await;
        stream.write_all(PAYLOAD).await?;
        debug!(bytes = PAYLOAD.len(), "Payload sent");
    }
}
