//! In-process mock of the TCP control channel.
//!
//! [`MockControlChannel`] records every call made through the
//! [`ControlChannel`] trait and lets tests script the receiver's side of
//! the exchange: automatic echo acknowledgements for the common happy
//! path, scripted connect failures, and manual message injection for
//! unsolicited traffic.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use netsdr_core::{ControlChannel, Error, Result};

/// Broadcast capacity for inbound control payloads.
const CHANNEL_CAPACITY: usize = 64;

/// A scriptable, recording stand-in for the TCP control channel.
///
/// By default every sent frame is echoed back as its own
/// acknowledgement, so request/response flows complete without any test
/// choreography. Call [`set_auto_respond(false)`](Self::set_auto_respond)
/// to leave requests pending and drive replies by hand with
/// [`inject`](Self::inject).
pub struct MockControlChannel {
    connected: AtomicBool,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    fail_next_connect: AtomicBool,
    auto_respond: AtomicBool,
    sent: Mutex<Vec<Vec<u8>>>,
    tx: broadcast::Sender<Vec<u8>>,
}

impl MockControlChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        MockControlChannel {
            connected: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            fail_next_connect: AtomicBool::new(false),
            auto_respond: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            tx,
        }
    }

    /// Make the next `connect()` fail with a transport error.
    pub fn fail_next_connect(&self) {
        self.fail_next_connect.store(true, Ordering::SeqCst);
    }

    /// Enable or disable the automatic echo acknowledgement of sent
    /// frames. Enabled by default.
    pub fn set_auto_respond(&self, enabled: bool) {
        self.auto_respond.store(enabled, Ordering::SeqCst);
    }

    /// Push an inbound payload to all subscribers, as if the receiver
    /// had sent it.
    pub fn inject(&self, payload: Vec<u8>) {
        let _ = self.tx.send(payload);
    }

    /// Every frame sent through the channel, in order.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of times `connect()` was called (including failures).
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Number of times `disconnect()` was called.
    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockControlChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlChannel for MockControlChannel {
    async fn connect(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_connect.swap(false, Ordering::SeqCst) {
            return Err(Error::Transport("mock connect failure".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, data: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.sent.lock().unwrap().push(data.to_vec());
        if self.auto_respond.load(Ordering::SeqCst) {
            // Echo the frame back as its own acknowledgement.
            let _ = self.tx.send(data.to_vec());
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.tx.subscribe()
    }
}
