//! netsdr-test-harness: Mock channels and sinks for netsdr tests.
//!
//! This crate provides in-process implementations of the
//! [`ControlChannel`](netsdr_core::ControlChannel),
//! [`StreamChannel`](netsdr_core::StreamChannel), and
//! [`SampleSink`](netsdr_core::SampleSink) traits so client behavior can
//! be tested deterministically without sockets or real hardware.

pub mod memory_sink;
pub mod mock_control;
pub mod mock_stream;

pub use memory_sink::MemorySink;
pub use mock_control::MockControlChannel;
pub use mock_stream::MockStreamChannel;
