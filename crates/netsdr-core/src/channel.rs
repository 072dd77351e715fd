//! Channel traits for receiver communication.
//!
//! The NetSDR protocol runs over two independent transports: a TCP control
//! channel carrying command/acknowledgement frames, and a UDP data channel
//! streaming I/Q sample frames. [`ControlChannel`] and [`StreamChannel`]
//! abstract over those links so the client orchestrator can be driven
//! against real sockets or deterministic mocks from the test harness.
//!
//! Inbound payloads are delivered through a [`tokio::sync::broadcast`]
//! subscription rather than callbacks; each delivered `Vec<u8>` is expected
//! to correspond to one complete protocol frame (one TCP read or one UDP
//! datagram -- see the transport implementations for the caveats).

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;

/// The TCP control channel to a NetSDR receiver.
///
/// Implementations handle connection lifecycle and raw byte transfer; all
/// protocol framing and request/response correlation lives in the client.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Establish the connection and start the background receive loop.
    ///
    /// Connecting while already connected is a no-op.
    async fn connect(&self) -> Result<()>;

    /// Tear down the connection.
    ///
    /// Idempotent; disconnecting an unconnected channel does nothing.
    async fn disconnect(&self);

    /// Whether the channel currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// Send raw bytes to the receiver.
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) when no
    /// connection is established.
    async fn send(&self, data: &[u8]) -> Result<()>;

    /// Subscribe to inbound control payloads.
    ///
    /// Every subscriber gets an independent copy of every payload. Payloads
    /// delivered before subscribing are not replayed.
    fn subscribe(&self) -> broadcast::Receiver<Vec<u8>>;
}

/// The UDP data channel streaming I/Q frames from a NetSDR receiver.
#[async_trait]
pub trait StreamChannel: Send + Sync {
    /// Begin receiving datagrams.
    ///
    /// Starting an already-listening channel is a no-op.
    async fn start_listening(&self) -> Result<()>;

    /// Stop receiving datagrams. Idempotent.
    async fn stop_listening(&self);

    /// Subscribe to inbound datagrams, one `Vec<u8>` per datagram.
    fn subscribe(&self) -> broadcast::Receiver<Vec<u8>>;
}

/// A destination for decoded I/Q samples.
///
/// The client hands each decoded data frame's samples to the sink in
/// arrival order. Sink errors are logged by the client but never interrupt
/// the stream.
#[async_trait]
pub trait SampleSink: Send + Sync {
    /// Store or process one frame's worth of decoded samples.
    async fn write_samples(&self, samples: &[i32]) -> Result<()>;
}
