//! netsdr-client: NetSDR wire codec, sample decoder, and client
//! orchestrator.
//!
//! The [`codec`] and [`samples`] modules are pure byte-level code with no
//! I/O; [`client::NetSdrClient`] wires them to a pair of injected
//! channels and drives the receiver's control protocol.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use netsdr_client::NetSdrClient;
//! use netsdr_client::sink::FileSampleSink;
//! use netsdr_transport::{TcpControlChannel, UdpStreamChannel};
//!
//! let control = Arc::new(TcpControlChannel::new("192.168.1.100:50000"));
//! let stream = Arc::new(UdpStreamChannel::new(60000));
//! let sink = Arc::new(FileSampleSink::create("iq.bin").await?);
//!
//! let client = NetSdrClient::new(control, stream, sink);
//! client.connect().await?;
//! client.change_frequency(14_250_000, 1).await?;
//! client.start_iq().await?;
//! ```

pub mod client;
pub mod codec;
pub mod samples;
pub mod sink;

pub use client::NetSdrClient;
pub use codec::{ControlItem, Frame, FrameContent, ItemCode, MessageKind};
pub use samples::{decode_samples, Samples};
pub use sink::FileSampleSink;
