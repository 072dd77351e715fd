//! UDP streaming channel.
//!
//! [`UdpStreamChannel`] receives the receiver's IQ data stream. UDP is
//! connectionless, so "listening" is just a bound socket and a receive
//! loop; each datagram is broadcast to subscribers whole, since the
//! protocol puts exactly one data frame in each datagram.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use netsdr_core::{Error, Result, StreamChannel};

/// Receive buffer size: one maximum-size data frame.
const RECV_BUFFER_SIZE: usize = 8194;

/// Broadcast capacity for inbound datagrams.
///
/// Larger than the control channel's -- at 100 ksps the stream can burst
/// while a subscriber is busy writing to disk.
const CHANNEL_CAPACITY: usize = 256;

/// UDP-backed streaming channel.
///
/// The socket is bound lazily by
/// [`start_listening`](StreamChannel::start_listening) and released by
/// [`stop_listening`](StreamChannel::stop_listening); subscriptions
/// survive across listen cycles.
pub struct UdpStreamChannel {
    /// Local port the receiver sends IQ datagrams to.
    port: u16,
    /// Receive loop, `None` while not listening.
    recv_task: Mutex<Option<JoinHandle<()>>>,
    listening: AtomicBool,
    /// Broadcast sender for inbound datagrams.
    tx: broadcast::Sender<Vec<u8>>,
}

impl UdpStreamChannel {
    /// Create a channel that will listen on the given local port. Port 0
    /// asks the OS for any free port, which is mainly useful in tests.
    pub fn new(port: u16) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        UdpStreamChannel {
            port,
            recv_task: Mutex::new(None),
            listening: AtomicBool::new(false),
            tx,
        }
    }

    /// Whether the receive loop is currently running.
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamChannel for UdpStreamChannel {
    async fn start_listening(&self) -> Result<()> {
        let mut task = self.recv_task.lock().await;
        if task.is_some() {
            tracing::debug!(port = self.port, "Already listening");
            return Ok(());
        }

        let socket = UdpSocket::bind(("0.0.0.0", self.port))
            .await
            .map_err(|e| {
                tracing::warn!(port = self.port, error = %e, "Failed to bind stream socket");
                Error::Io(e)
            })?;
        let local = socket.local_addr().map_err(Error::Io)?;
        tracing::debug!(local = %local, "Stream socket bound");

        self.listening.store(true, Ordering::SeqCst);
        let handle = {
            let tx = self.tx.clone();
            tokio::spawn(async move {
                recv_loop(socket, tx).await;
            })
        };
        *task = Some(handle);
        Ok(())
    }

    async fn stop_listening(&self) {
        self.listening.store(false, Ordering::SeqCst);
        if let Some(task) = self.recv_task.lock().await.take() {
            task.abort();
            tracing::debug!(port = self.port, "Stream socket released");
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.tx.subscribe()
    }
}

/// Background receiver: every datagram is broadcast whole.
///
/// Receive errors are transient on UDP (e.g. ICMP-induced resets on
/// some platforms), so the loop logs and keeps going.
async fn recv_loop(socket: UdpSocket, tx: broadcast::Sender<Vec<u8>>) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, src)) => {
                tracing::trace!(bytes = n, src = %src, "Datagram received");
                let _ = tx.send(buf[..n].to_vec());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Datagram receive failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Grab a free local port by binding and releasing a probe socket.
    async fn free_port() -> u16 {
        let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        probe.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn receives_datagrams_while_listening() {
        let port = free_port().await;
        let channel = UdpStreamChannel::new(port);
        let mut rx = channel.subscribe();
        channel.start_listening().await.unwrap();
        assert!(channel.is_listening());

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(&[0x01, 0x02, 0x03], ("127.0.0.1", port))
            .await
            .unwrap();

        let datagram = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(datagram, vec![0x01, 0x02, 0x03]);

        channel.stop_listening().await;
        assert!(!channel.is_listening());
    }

    #[tokio::test]
    async fn start_twice_is_noop() {
        let channel = UdpStreamChannel::new(0);
        channel.start_listening().await.unwrap();
        channel.start_listening().await.unwrap();
        assert!(channel.is_listening());
        channel.stop_listening().await;
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let channel = UdpStreamChannel::new(0);
        channel.stop_listening().await;
        assert!(!channel.is_listening());
    }

    #[tokio::test]
    async fn listen_cycle_can_restart() {
        let port = free_port().await;
        let channel = UdpStreamChannel::new(port);
        channel.start_listening().await.unwrap();
        channel.stop_listening().await;

        // The port must be free again for the second cycle.
        channel.start_listening().await.unwrap();
        let mut rx = channel.subscribe();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(&[0xAA], ("127.0.0.1", port)).await.unwrap();

        let datagram = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(datagram, vec![0xAA]);

        channel.stop_listening().await;
    }
}
