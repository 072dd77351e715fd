//! # netsdr -- Async NetSDR Receiver Client
//!
//! `netsdr` is an asynchronous Rust library for controlling NetSDR-family
//! software-defined receivers and capturing their IQ sample stream. The
//! receiver exposes a binary control protocol over TCP and streams data
//! frames over UDP; this crate covers both.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use netsdr::{NetSdrClient, FileSampleSink, TcpControlChannel, UdpStreamChannel};
//!
//! #[tokio::main]
//! async fn main() -> netsdr::Result<()> {
//!     let control = Arc::new(TcpControlChannel::new("192.168.1.100:50000"));
//!     let stream = Arc::new(UdpStreamChannel::new(60000));
//!     let sink = Arc::new(FileSampleSink::create("iq.bin").await?);
//!
//!     let client = NetSdrClient::new(control, stream, sink);
//!     client.connect().await?;
//!     client.change_frequency(14_250_000, 1).await?;
//!     client.start_iq().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                 | Purpose                                         |
//! |-----------------------|-------------------------------------------------|
//! | `netsdr-core`         | Channel traits, [`ClientEvent`], errors         |
//! | `netsdr-client`       | Wire codec, sample decoder, [`NetSdrClient`]    |
//! | `netsdr-transport`    | TCP control and UDP streaming implementations   |
//! | `netsdr-test-harness` | In-process mocks for deterministic tests        |
//! | **`netsdr`**          | This facade crate -- re-exports everything      |
//!
//! The client is generic over the channel traits, so application and test
//! code construct it identically; only the injected channels differ.

pub use netsdr_core::*;

pub use netsdr_client::{
    codec, decode_samples, samples, ControlItem, FileSampleSink, Frame, FrameContent, ItemCode,
    MessageKind, NetSdrClient, Samples,
};

pub use netsdr_transport::{TcpControlChannel, UdpStreamChannel};
