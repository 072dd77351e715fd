//! In-process mock of the UDP streaming channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use netsdr_core::{Result, StreamChannel};

/// Broadcast capacity for injected datagrams.
const CHANNEL_CAPACITY: usize = 64;

type Hook = Box<dyn Fn() + Send>;

/// A recording stand-in for the UDP streaming channel.
///
/// Tests inject datagrams with [`inject_datagram`](Self::inject_datagram)
/// and can install [`on_start`](Self::on_start) /
/// [`on_stop`](Self::on_stop) hooks that fire synchronously inside the
/// trait calls, which makes call-ordering assertions possible.
pub struct MockStreamChannel {
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    on_start: Mutex<Option<Hook>>,
    on_stop: Mutex<Option<Hook>>,
    tx: broadcast::Sender<Vec<u8>>,
}

impl MockStreamChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        MockStreamChannel {
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            on_start: Mutex::new(None),
            on_stop: Mutex::new(None),
            tx,
        }
    }

    /// Install a hook invoked at the top of `start_listening()`.
    pub fn on_start(&self, hook: impl Fn() + Send + 'static) {
        *self.on_start.lock().unwrap() = Some(Box::new(hook));
    }

    /// Install a hook invoked at the top of `stop_listening()`.
    pub fn on_stop(&self, hook: impl Fn() + Send + 'static) {
        *self.on_stop.lock().unwrap() = Some(Box::new(hook));
    }

    /// Push a datagram to all subscribers, as if it had arrived on the
    /// wire.
    pub fn inject_datagram(&self, datagram: Vec<u8>) {
        let _ = self.tx.send(datagram);
    }

    /// Number of times `start_listening()` was called.
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    /// Number of times `stop_listening()` was called.
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockStreamChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamChannel for MockStreamChannel {
    async fn start_listening(&self) -> Result<()> {
        if let Some(hook) = self.on_start.lock().unwrap().as_ref() {
            hook();
        }
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_listening(&self) {
        if let Some(hook) = self.on_stop.lock().unwrap().as_ref() {
            hook();
        }
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[tokio::test]
    async fn counts_and_hooks_fire() {
        let mock = MockStreamChannel::new();
        let fired = Arc::new(AtomicBool::new(false));
        {
            let fired = Arc::clone(&fired);
            mock.on_start(move || fired.store(true, Ordering::SeqCst));
        }

        mock.start_listening().await.unwrap();
        mock.stop_listening().await;

        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(mock.start_calls(), 1);
        assert_eq!(mock.stop_calls(), 1);
    }

    #[tokio::test]
    async fn injected_datagrams_reach_subscribers() {
        let mock = MockStreamChannel::new();
        let mut rx = mock.subscribe();

        mock.inject_datagram(vec![0x01, 0x02, 0x03]);
        assert_eq!(rx.recv().await.unwrap(), vec![0x01, 0x02, 0x03]);
    }
}
