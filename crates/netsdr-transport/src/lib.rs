//! netsdr-transport: Socket-backed channel implementations.
//!
//! [`TcpControlChannel`] carries the request/response control protocol;
//! [`UdpStreamChannel`] receives the IQ datagram stream. Both implement
//! the channel traits from `netsdr-core`, so they are interchangeable
//! with the mocks in `netsdr-test-harness`.

pub mod tcp;
pub mod udp;

pub use tcp::TcpControlChannel;
pub use udp::UdpStreamChannel;
