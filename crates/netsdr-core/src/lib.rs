//! netsdr-core: Core traits, types, and error definitions for the netsdr
//! client.
//!
//! This crate defines the transport-agnostic abstractions the rest of the
//! workspace builds on. Applications depend on these types without pulling
//! in the codec or any socket implementation.
//!
//! # Key types
//!
//! - [`ControlChannel`] / [`StreamChannel`] -- the two transport links
//! - [`SampleSink`] -- destination for decoded I/Q samples
//! - [`ClientEvent`] -- asynchronous state change notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod channel;
pub mod error;
pub mod events;

// Re-export key types at crate root for ergonomic `use netsdr_core::*`.
pub use channel::{ControlChannel, SampleSink, StreamChannel};
pub use error::{Error, Result};
pub use events::ClientEvent;
