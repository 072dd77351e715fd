//! NetSDR client orchestrator.
//!
//! [`NetSdrClient`] sequences control commands over the TCP channel,
//! correlates request/response pairs, and keeps the IQ-streaming state in
//! step with what the receiver actually acknowledged. It owns no sockets
//! itself -- both channels are injected as trait objects, so the same
//! orchestrator runs against real transports or the mocks in
//! `netsdr-test-harness`.
//!
//! # Request correlation
//!
//! The NetSDR wire carries no transaction id: replies are matched to
//! requests purely by arrival order, and the protocol allows at most one
//! request in flight. The client enforces that rule with an internal
//! mutex held across each send-and-await, so concurrent callers queue up
//! instead of silently stranding each other.
//!
//! # "Not connected" policy
//!
//! Control operations on a disconnected client are silent no-ops, never
//! errors. The client is meant to be driven opportunistically from a UI
//! loop without precondition checks; only `connect()` itself surfaces
//! transport failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;

use netsdr_core::{ClientEvent, ControlChannel, Error, Result, SampleSink, StreamChannel};

use crate::codec::{self, ControlItem, MessageKind};
use crate::samples;

/// Sample rate requested during the connect setup sequence, in samples
/// per second.
const DEFAULT_IQ_SAMPLE_RATE: u64 = 100_000;

/// RF filter selection byte pair: 0 selects automatic filter switching.
const RF_FILTER_AUTOMATIC: u16 = 0;

/// Fixed A/D mode setup value.
const AD_MODES: [u8; 2] = [0x00, 0x03];

/// ReceiverState argument: complex I/Q baseband data.
const DATA_MODE_IQ: u8 = 0x80;

/// ReceiverState argument: start capture.
const RUN_START: u8 = 0x02;

/// ReceiverState argument: stop capture.
const RUN_STOP: u8 = 0x01;

/// ReceiverState argument: 16-bit FIFO capture mode.
const CAPTURE_FIFO_16BIT: u8 = 0x01;

/// Receiver channel used for IQ capture.
const IQ_CHANNEL: u8 = 1;

/// Sample width of the streamed IQ data.
const IQ_SAMPLE_BITS: u16 = 16;

/// Broadcast channel capacity for [`ClientEvent`] subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Single pending-response slot shared with the control dispatch loop.
type PendingSlot = Arc<Mutex<Option<oneshot::Sender<Vec<u8>>>>>;

/// Client for a NetSDR receiver.
///
/// Construction spawns two background dispatch tasks (one per channel
/// subscription), so a tokio runtime must be active. Dropping the client
/// aborts both tasks.
pub struct NetSdrClient {
    /// The TCP control channel collaborator.
    control: Arc<dyn ControlChannel>,

    /// The UDP streaming channel collaborator.
    stream: Arc<dyn StreamChannel>,

    /// Whether IQ streaming has been started (and not yet stopped).
    ///
    /// Owned exclusively by this client; flips strictly before the stream
    /// channel is told to start or stop listening.
    iq_started: AtomicBool,

    /// The single pending-request slot.
    pending: PendingSlot,

    /// Serializes `send_request` callers: one request in flight, ever.
    request_gate: Mutex<()>,

    /// Event broadcast channel sender.
    event_tx: broadcast::Sender<ClientEvent>,

    /// Background control-channel dispatch task.
    control_task: JoinHandle<()>,

    /// Background streaming-channel dispatch task.
    stream_task: JoinHandle<()>,
}

impl NetSdrClient {
    /// Create a client over the given channels, forwarding decoded IQ
    /// samples to `sink`.
    pub fn new(
        control: Arc<dyn ControlChannel>,
        stream: Arc<dyn StreamChannel>,
        sink: Arc<dyn SampleSink>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let pending: PendingSlot = Arc::new(Mutex::new(None));

        let control_task = {
            let rx = control.subscribe();
            let pending = Arc::clone(&pending);
            let event_tx = event_tx.clone();
            tokio::spawn(async move {
                control_dispatch_loop(rx, pending, event_tx).await;
            })
        };

        let stream_task = {
            let rx = stream.subscribe();
            tokio::spawn(async move {
                stream_dispatch_loop(rx, sink).await;
            })
        };

        NetSdrClient {
            control,
            stream,
            iq_started: AtomicBool::new(false),
            pending,
            request_gate: Mutex::new(()),
            event_tx,
            control_task,
            stream_task,
        }
    }

    /// Connect the control channel and run the setup sequence.
    ///
    /// No-op when already connected. On a fresh connection, three setup
    /// frames are sent in order -- IQ output sample rate, RF filter mode
    /// (automatic), A/D modes -- each awaiting its acknowledgement before
    /// the next is sent. A transport failure during the connect step
    /// aborts the sequence before any setup frame goes out and is
    /// returned to the caller.
    pub async fn connect(&self) -> Result<()> {
        if self.control.is_connected() {
            tracing::debug!("Already connected");
            return Ok(());
        }

        self.control.connect().await?;

        let sample_rate = &DEFAULT_IQ_SAMPLE_RATE.to_le_bytes()[..5];
        let filter_mode = RF_FILTER_AUTOMATIC.to_le_bytes();

        let setup = [
            codec::encode_control(
                MessageKind::SetControlItem,
                ControlItem::IqOutputSampleRate,
                sample_rate,
            )?,
            codec::encode_control(MessageKind::SetControlItem, ControlItem::RfFilter, &filter_mode)?,
            codec::encode_control(MessageKind::SetControlItem, ControlItem::AdModes, &AD_MODES)?,
        ];

        for msg in &setup {
            self.send_request(msg).await?;
        }

        let _ = self.event_tx.send(ClientEvent::Connected);
        tracing::debug!("Receiver connected and configured");
        Ok(())
    }

    /// Disconnect from the receiver.
    ///
    /// Idempotent; always delegates to the transport, resets the IQ flag,
    /// and abandons any pending request (its waiter resolves with
    /// [`Error::ConnectionLost`]).
    pub async fn disconnect(&self) {
        self.control.disconnect().await;
        self.iq_started.store(false, Ordering::SeqCst);
        self.pending.lock().await.take();
        let _ = self.event_tx.send(ClientEvent::Disconnected);
        tracing::debug!("Disconnected");
    }

    /// Send a pre-encoded frame and await the next inbound control
    /// message as its reply.
    ///
    /// Silent no-op returning an empty reply when not connected. Callers
    /// are serialized internally; the reply is whatever payload arrives
    /// next on the control channel (arrival-order correlation -- the
    /// protocol has no transaction ids).
    pub async fn send_request(&self, frame: &[u8]) -> Result<Vec<u8>> {
        if !self.control.is_connected() {
            tracing::debug!("No active connection; request dropped");
            return Ok(Vec::new());
        }

        // One request in flight: later callers wait here until the
        // current exchange resolves.
        let _gate = self.request_gate.lock().await;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            *pending = Some(tx);
        }

        self.control.send(frame).await?;
        tracing::trace!(bytes = frame.len(), "Request sent, awaiting reply");

        // The sender is dropped (not fired) when the slot is abandoned by
        // a disconnect.
        rx.await.map_err(|_| Error::ConnectionLost)
    }

    /// Send a pre-encoded frame without awaiting a reply.
    ///
    /// Silent no-op when not connected.
    pub async fn send_message(&self, frame: &[u8]) -> Result<()> {
        if !self.control.is_connected() {
            tracing::debug!("No active connection; message dropped");
            return Ok(());
        }
        self.control.send(frame).await
    }

    /// Start IQ streaming.
    ///
    /// No-op when not connected. Sends the ReceiverState start frame,
    /// awaits its acknowledgement, flips [`iq_started`](Self::iq_started)
    /// and only then tells the stream channel to start listening --
    /// observers must see the flag before data begins to flow.
    pub async fn start_iq(&self) -> Result<()> {
        if !self.control.is_connected() {
            tracing::warn!("No active connection; cannot start IQ");
            return Ok(());
        }

        let args = [DATA_MODE_IQ, RUN_START, CAPTURE_FIFO_16BIT, IQ_CHANNEL];
        let msg = codec::encode_control(MessageKind::SetControlItem, ControlItem::ReceiverState, &args)?;
        self.send_request(&msg).await?;

        self.iq_started.store(true, Ordering::SeqCst);
        self.stream.start_listening().await?;

        tracing::debug!("IQ streaming started");
        Ok(())
    }

    /// Stop IQ streaming.
    ///
    /// No-op when not connected. The flag flips false strictly before the
    /// stream channel stops listening, mirroring [`start_iq`](Self::start_iq).
    pub async fn stop_iq(&self) -> Result<()> {
        if !self.control.is_connected() {
            tracing::warn!("No active connection; cannot stop IQ");
            return Ok(());
        }

        let args = [0, RUN_STOP, 0, 0];
        let msg = codec::encode_control(MessageKind::SetControlItem, ControlItem::ReceiverState, &args)?;
        self.send_request(&msg).await?;

        self.iq_started.store(false, Ordering::SeqCst);
        self.stream.stop_listening().await;

        tracing::debug!("IQ streaming stopped");
        Ok(())
    }

    /// Tune the given receiver channel to `hz`.
    ///
    /// The frame body is the channel byte followed by the low 5 bytes of
    /// the frequency, little-endian. Silent no-op when not connected.
    pub async fn change_frequency(&self, hz: u64, channel: u8) -> Result<()> {
        let mut body = Vec::with_capacity(6);
        body.push(channel);
        body.extend_from_slice(&hz.to_le_bytes()[..5]);

        let msg = codec::encode_control(
            MessageKind::SetControlItem,
            ControlItem::ReceiverFrequency,
            &body,
        )?;
        self.send_request(&msg).await?;

        tracing::debug!(hz, channel, "Frequency change requested");
        Ok(())
    }

    /// Whether the control channel currently reports a live connection.
    pub fn is_connected(&self) -> bool {
        self.control.is_connected()
    }

    /// Whether IQ streaming has been started.
    pub fn iq_started(&self) -> bool {
        self.iq_started.load(Ordering::SeqCst)
    }

    /// Subscribe to client events.
    ///
    /// Every inbound control payload is republished as
    /// [`ClientEvent::ControlMessage`], whether or not it resolved a
    /// pending request.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }
}

impl Drop for NetSdrClient {
    fn drop(&mut self) {
        self.control_task.abort();
        self.stream_task.abort();
    }
}

// ---------------------------------------------------------------------------
// Control dispatch loop
// ---------------------------------------------------------------------------

/// Background task draining the control channel subscription.
///
/// Every payload is republished to event subscribers *and* resolves the
/// pending request slot if one is armed.
async fn control_dispatch_loop(
    mut rx: broadcast::Receiver<Vec<u8>>,
    pending: PendingSlot,
    event_tx: broadcast::Sender<ClientEvent>,
) {
    loop {
        match rx.recv().await {
            Ok(payload) => {
                tracing::trace!(bytes = payload.len(), "Control message received");
                let _ = event_tx.send(ClientEvent::ControlMessage(payload.clone()));

                if let Some(tx) = pending.lock().await.take() {
                    let _ = tx.send(payload);
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Control dispatch lagged; messages dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Stream dispatch loop
// ---------------------------------------------------------------------------

/// Background task decoding stream datagrams into the sample sink.
///
/// A corrupt or partial datagram is dropped with a trace log; nothing on
/// this path may take down the loop.
async fn stream_dispatch_loop(mut rx: broadcast::Receiver<Vec<u8>>, sink: Arc<dyn SampleSink>) {
    loop {
        match rx.recv().await {
            Ok(datagram) => {
                let frame = match codec::decode(&datagram) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::trace!(error = %e, bytes = datagram.len(), "Dropping undecodable datagram");
                        continue;
                    }
                };

                let decoded: Vec<i32> = match samples::decode_samples(IQ_SAMPLE_BITS, frame.body())
                {
                    Ok(iter) => iter.collect(),
                    Err(e) => {
                        tracing::trace!(error = %e, "Dropping datagram with undecodable samples");
                        continue;
                    }
                };

                if let Err(e) = sink.write_samples(&decoded).await {
                    tracing::warn!(error = %e, "Sample sink write failed");
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Stream dispatch lagged; datagrams dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use netsdr_test_harness::{MemorySink, MockControlChannel, MockStreamChannel};

    /// Build a client over fresh mocks, returning handles to all parts.
    fn mock_client() -> (
        Arc<NetSdrClient>,
        Arc<MockControlChannel>,
        Arc<MockStreamChannel>,
        Arc<MemorySink>,
    ) {
        let control = Arc::new(MockControlChannel::new());
        let stream = Arc::new(MockStreamChannel::new());
        let sink = Arc::new(MemorySink::new());
        let client = Arc::new(NetSdrClient::new(
            Arc::clone(&control) as Arc<dyn ControlChannel>,
            Arc::clone(&stream) as Arc<dyn StreamChannel>,
            Arc::clone(&sink) as Arc<dyn SampleSink>,
        ));
        (client, control, stream, sink)
    }

    /// Give the background dispatch tasks a chance to run.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn connect_sends_three_setup_frames() {
        let (client, control, _stream, _sink) = mock_client();

        client.connect().await.unwrap();

        assert!(client.is_connected());
        assert_eq!(control.connect_calls(), 1);
        assert_eq!(control.sent_frames().len(), 3);
    }

    #[tokio::test]
    async fn connect_twice_is_noop() {
        let (client, control, _stream, _sink) = mock_client();

        client.connect().await.unwrap();
        client.connect().await.unwrap();

        assert_eq!(control.connect_calls(), 1);
        assert_eq!(control.sent_frames().len(), 3);
    }

    #[tokio::test]
    async fn setup_frames_are_well_formed() {
        let (client, control, _stream, _sink) = mock_client();

        client.connect().await.unwrap();

        let expected_items = [
            ControlItem::IqOutputSampleRate,
            ControlItem::RfFilter,
            ControlItem::AdModes,
        ];
        let sent = control.sent_frames();
        for (frame, expected) in sent.iter().zip(expected_items) {
            let decoded = codec::decode(frame).unwrap();
            assert_eq!(decoded.kind, MessageKind::SetControlItem);
            assert_eq!(
                decoded.item_code(),
                Some(codec::ItemCode::Known(expected))
            );
        }

        // 100 000 sps as 5 little-endian bytes.
        assert_eq!(
            codec::decode(&sent[0]).unwrap().body(),
            &[0xA0, 0x86, 0x01, 0x00, 0x00]
        );
    }

    #[tokio::test]
    async fn connect_failure_sends_nothing() {
        let (client, control, _stream, _sink) = mock_client();
        control.fail_next_connect();

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(!client.is_connected());
        assert!(control.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn start_iq_flags_before_listening() {
        let (client, control, stream, _sink) = mock_client();
        client.connect().await.unwrap();

        // Record what the client's IQ flag was at the moment the stream
        // channel was told to start.
        let observed = Arc::new(AtomicBool::new(false));
        {
            let client = Arc::clone(&client);
            let observed = Arc::clone(&observed);
            stream.on_start(move || {
                observed.store(client.iq_started(), Ordering::SeqCst);
            });
        }

        client.start_iq().await.unwrap();

        assert!(client.iq_started());
        assert_eq!(stream.start_calls(), 1);
        assert!(
            observed.load(Ordering::SeqCst),
            "iq_started must be set before start_listening"
        );

        // The start frame is the 4th send: [IQ mode, start, 16-bit FIFO, channel].
        let sent = control.sent_frames();
        let frame = codec::decode(&sent[3]).unwrap();
        assert_eq!(
            frame.item_code(),
            Some(codec::ItemCode::Known(ControlItem::ReceiverState))
        );
        assert_eq!(frame.body(), &[0x80, 0x02, 0x01, 0x01]);
    }

    #[tokio::test]
    async fn stop_iq_clears_flag_before_stopping() {
        let (client, control, stream, _sink) = mock_client();
        client.connect().await.unwrap();
        client.start_iq().await.unwrap();

        let observed = Arc::new(AtomicBool::new(true));
        {
            let client = Arc::clone(&client);
            let observed = Arc::clone(&observed);
            stream.on_stop(move || {
                observed.store(client.iq_started(), Ordering::SeqCst);
            });
        }

        client.stop_iq().await.unwrap();

        assert!(!client.iq_started());
        assert_eq!(stream.stop_calls(), 1);
        assert!(
            !observed.load(Ordering::SeqCst),
            "iq_started must be cleared before stop_listening"
        );

        let sent = control.sent_frames();
        let frame = codec::decode(sent.last().unwrap()).unwrap();
        assert_eq!(frame.body(), &[0x00, 0x01, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn start_iq_without_connection_is_noop() {
        let (client, control, stream, _sink) = mock_client();

        client.start_iq().await.unwrap();

        assert!(!client.iq_started());
        assert!(control.sent_frames().is_empty());
        assert_eq!(stream.start_calls(), 0);
    }

    #[tokio::test]
    async fn change_frequency_encodes_channel_and_low_five_bytes() {
        let (client, control, _stream, _sink) = mock_client();
        client.connect().await.unwrap();

        client.change_frequency(100_000_000, 1).await.unwrap();

        let sent = control.sent_frames();
        let frame = codec::decode(sent.last().unwrap()).unwrap();
        assert_eq!(
            frame.item_code(),
            Some(codec::ItemCode::Known(ControlItem::ReceiverFrequency))
        );

        let mut expected = vec![0x01];
        expected.extend_from_slice(&100_000_000u64.to_le_bytes()[..5]);
        assert_eq!(frame.body(), expected.as_slice());
    }

    #[tokio::test]
    async fn change_frequency_without_connection_sends_nothing() {
        let (client, control, _stream, _sink) = mock_client();

        client.change_frequency(1_000_000, 1).await.unwrap();

        assert!(control.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn disconnect_resets_iq_flag() {
        let (client, control, _stream, _sink) = mock_client();
        client.connect().await.unwrap();
        client.start_iq().await.unwrap();
        assert!(client.iq_started());

        client.disconnect().await;

        assert!(!client.is_connected());
        assert!(!client.iq_started());
        assert_eq!(control.disconnect_calls(), 1);
    }

    #[tokio::test]
    async fn disconnect_without_connection_still_delegates() {
        let (client, control, _stream, _sink) = mock_client();

        client.disconnect().await;

        assert_eq!(control.disconnect_calls(), 1);
    }

    #[tokio::test]
    async fn inbound_messages_are_republished() {
        let (client, control, _stream, _sink) = mock_client();
        client.connect().await.unwrap();

        let mut events = client.subscribe();
        control.inject(vec![0x01, 0x02, 0x03, 0x04]);
        settle().await;

        let mut found = false;
        while let Ok(event) = events.try_recv() {
            if let ClientEvent::ControlMessage(bytes) = event {
                assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);
                found = true;
            }
        }
        assert!(found, "expected a ControlMessage event");
    }

    #[tokio::test]
    async fn unsolicited_message_does_not_disturb_state() {
        let (client, control, _stream, _sink) = mock_client();
        client.connect().await.unwrap();

        // No request pending; the message is republished and dropped.
        control.inject(vec![0xAA, 0xBB]);
        settle().await;

        assert!(client.is_connected());
        client.change_frequency(7_000_000, 1).await.unwrap();
        assert_eq!(control.sent_frames().len(), 4);
    }

    #[tokio::test]
    async fn stream_datagram_reaches_sink() {
        let (client, control, stream, sink) = mock_client();
        client.connect().await.unwrap();
        client.start_iq().await.unwrap();

        // One data frame with three 16-bit samples.
        let datagram = codec::encode_data(
            MessageKind::DataItem0,
            1,
            &[0x01, 0x00, 0x02, 0x00, 0x03, 0x00],
        )
        .unwrap();
        stream.inject_datagram(datagram);
        settle().await;

        assert_eq!(sink.samples(), vec![1, 2, 3]);
        let _ = control;
    }

    #[tokio::test]
    async fn corrupt_datagram_is_ignored() {
        let (client, _control, stream, sink) = mock_client();
        client.connect().await.unwrap();
        client.start_iq().await.unwrap();

        // Garbage, then a single truncated byte, then a valid frame: the
        // loop must survive and still decode the good one.
        stream.inject_datagram(vec![0xFF]);
        stream.inject_datagram(vec![]);
        let good = codec::encode_data(MessageKind::DataItem1, 2, &[0x05, 0x00]).unwrap();
        stream.inject_datagram(good);
        settle().await;

        assert_eq!(sink.samples(), vec![5]);
        assert!(client.iq_started());
    }

    #[tokio::test]
    async fn disconnect_abandons_pending_request() {
        let (client, control, _stream, _sink) = mock_client();
        client.connect().await.unwrap();

        // Stop auto-acknowledging so the next request stays pending.
        control.set_auto_respond(false);

        let request = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.change_frequency(14_250_000, 1).await })
        };
        settle().await;

        client.disconnect().await;

        let result = request.await.unwrap();
        assert!(matches!(result, Err(Error::ConnectionLost)));
    }

    #[tokio::test]
    async fn concurrent_requests_are_serialized() {
        let (client, control, _stream, _sink) = mock_client();
        client.connect().await.unwrap();

        let a = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.change_frequency(7_000_000, 1).await })
        };
        let b = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.change_frequency(14_000_000, 1).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // 3 setup frames + 2 frequency frames, all acknowledged.
        assert_eq!(control.sent_frames().len(), 5);
    }
}
