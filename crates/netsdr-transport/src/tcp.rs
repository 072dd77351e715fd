//! TCP control channel.
//!
//! This module provides [`TcpControlChannel`], the socket-backed
//! implementation of [`ControlChannel`] for a receiver's control port.
//! Writes go straight to the socket; reads are drained by a background
//! task that broadcasts each received chunk to all subscribers.
//!
//! # Example
//!
//! ```no_run
//! use netsdr_transport::TcpControlChannel;
//! use netsdr_core::ControlChannel;
//!
//! # async fn example() -> netsdr_core::Result<()> {
//! let channel = TcpControlChannel::new("192.168.1.100:50000");
//! channel.connect().await?;
//! channel.send(&[0x04, 0x20, 0x18, 0x00]).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use netsdr_core::{ControlChannel, Error, Result};

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read buffer size: one maximum-size frame.
const READ_BUFFER_SIZE: usize = 8194;

/// Broadcast capacity for inbound control payloads.
const CHANNEL_CAPACITY: usize = 64;

/// TCP-backed control channel.
///
/// `connect()` establishes the socket and spawns a read loop that
/// broadcasts every received chunk; `disconnect()` tears both down.
/// All methods take `&self` -- the channel is shared behind an `Arc` by
/// the client and its dispatch tasks.
pub struct TcpControlChannel {
    /// The `host:port` endpoint of the receiver's control port.
    addr: String,
    /// Connection timeout used by `connect()`.
    connect_timeout: Duration,
    /// Write half of the socket, `None` while disconnected.
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Background read loop, `None` while disconnected.
    read_task: Mutex<Option<JoinHandle<()>>>,
    /// Shared with the read loop, which clears it on EOF or error.
    connected: Arc<AtomicBool>,
    /// Broadcast sender for inbound payloads.
    tx: broadcast::Sender<Vec<u8>>,
}

impl TcpControlChannel {
    /// Create a channel for the given `host:port` endpoint. No socket is
    /// opened until [`connect`](ControlChannel::connect) is called.
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_timeout(addr, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a channel with a non-default connection timeout.
    pub fn with_timeout(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        TcpControlChannel {
            addr: addr.into(),
            connect_timeout,
            writer: Mutex::new(None),
            read_task: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// The endpoint this channel connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl ControlChannel for TcpControlChannel {
    async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            tracing::debug!(addr = %self.addr, "Already connected");
            return Ok(());
        }

        tracing::debug!(
            addr = %self.addr,
            timeout_ms = self.connect_timeout.as_millis(),
            "Connecting to control port"
        );

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                tracing::warn!(addr = %self.addr, "Control connection timed out");
                Error::Timeout
            })?
            .map_err(|e| map_connect_error(e, &self.addr))?;

        // Control frames are small and latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %self.addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();

        *self.writer.lock().await = Some(write_half);
        self.connected.store(true, Ordering::SeqCst);

        let task = {
            let tx = self.tx.clone();
            let connected = Arc::clone(&self.connected);
            let addr = self.addr.clone();
            tokio::spawn(async move {
                read_loop(read_half, tx, connected, addr).await;
            })
        };
        *self.read_task.lock().await = Some(task);

        tracing::debug!(addr = %self.addr, "Control connection established");
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);

        if let Some(task) = self.read_task.lock().await.take() {
            task.abort();
        }

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::warn!(addr = %self.addr, error = %e, "Shutdown failed");
            }
            tracing::debug!(addr = %self.addr, "Control connection closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(addr = %self.addr, bytes = data.len(), "Sending control frame");

        writer.write_all(data).await.map_err(map_io_error)?;
        writer.flush().await.map_err(map_io_error)?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.tx.subscribe()
    }
}

/// Background reader: each successful read is broadcast as one payload.
///
/// The protocol sends one frame per acknowledgement, so in practice one
/// read corresponds to one frame; subscribers run the codec on whatever
/// arrives and drop garbled chunks.
async fn read_loop(
    mut read_half: OwnedReadHalf,
    tx: broadcast::Sender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    addr: String,
) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                tracing::warn!(addr = %addr, "Control peer closed connection");
                break;
            }
            Ok(n) => {
                tracing::trace!(addr = %addr, bytes = n, "Control data received");
                let _ = tx.send(buf[..n].to_vec());
            }
            Err(e) => {
                tracing::warn!(addr = %addr, error = %e, "Control read failed");
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}

/// Map a connection-time I/O error to the appropriate [`Error`] variant.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            Error::Transport(format!("connection refused: {}", addr))
        }
        _ => Error::Io(e),
    }
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn test_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn connect_send_and_receive() {
        let (listener, addr) = test_listener().await;

        // Server reads one frame and echoes it back.
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let n = stream.read(&mut buf).await.unwrap();
            stream.write_all(&buf[..n]).await.unwrap();
            stream.flush().await.unwrap();
            buf[..n].to_vec()
        });

        let channel = TcpControlChannel::new(&addr);
        channel.connect().await.unwrap();
        assert!(channel.is_connected());

        let mut rx = channel.subscribe();
        channel.send(&[0x04, 0x00, 0x18, 0x00]).await.unwrap();

        let reply = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, vec![0x04, 0x00, 0x18, 0x00]);

        channel.disconnect().await;
        assert!(!channel.is_connected());
        assert_eq!(server.await.unwrap(), vec![0x04, 0x00, 0x18, 0x00]);
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let channel = TcpControlChannel::new(&addr);
        let err = channel.connect().await.unwrap_err();
        match err {
            Error::Transport(msg) => assert!(msg.contains("connection refused")),
            other => panic!("expected Transport error, got: {:?}", other),
        }
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn connect_timeout_to_black_hole() {
        // RFC 5737 TEST-NET-1: packets are black-holed, not refused.
        let channel =
            TcpControlChannel::with_timeout("192.0.2.1:50000", Duration::from_millis(100));
        let err = channel.connect().await.unwrap_err();
        assert!(
            matches!(err, Error::Timeout | Error::Io(_)),
            "expected Timeout or Io, got: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn send_without_connection_fails() {
        let channel = TcpControlChannel::new("127.0.0.1:1");
        let err = channel.send(&[0x00]).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn connect_twice_is_noop() {
        let (listener, addr) = test_listener().await;
        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let channel = TcpControlChannel::new(&addr);
        channel.connect().await.unwrap();
        channel.connect().await.unwrap();
        assert!(channel.is_connected());

        channel.disconnect().await;
        server.abort();
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let channel = TcpControlChannel::new("127.0.0.1:1");
        channel.disconnect().await;
        channel.disconnect().await;
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn peer_close_clears_connected_flag() {
        let (listener, addr) = test_listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let channel = TcpControlChannel::new(&addr);
        channel.connect().await.unwrap();
        server.await.unwrap();

        // Give the read loop a moment to observe the FIN.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!channel.is_connected());
    }
}
