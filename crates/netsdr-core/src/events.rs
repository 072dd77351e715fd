//! Asynchronous client event types.
//!
//! Events are emitted by the client through a [`tokio::sync::broadcast`]
//! channel. UIs and loggers subscribe to observe connection lifecycle and
//! raw control-channel traffic without polling; delivery is best-effort,
//! so slow consumers may miss events under load.

/// An event emitted by the client when its state changes or a control
/// message arrives.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The control channel connected and the setup sequence completed.
    Connected,

    /// The client was disconnected (locally requested).
    Disconnected,

    /// A raw inbound control-channel payload.
    ///
    /// Emitted for *every* inbound message, whether or not it resolved a
    /// pending request.
    ControlMessage(Vec<u8>),
}
