//! Error types for the netsdr client.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Encode-time, decode-time, and
//! transport-level failures are all captured here.
//!
//! Decode-time variants deserve a note: a frame that is *structurally*
//! malformed ([`Error::FrameTooShort`], [`Error::FrameTruncated`]) is a hard
//! error, while a well-formed frame carrying an item code the client does
//! not recognize is **not** an error at all -- the codec returns it as an
//! `Ok` frame with an `Unknown` item code so callers can tell "drop these
//! bytes" apart from "framed correctly, semantically unusable".

/// The error type for all netsdr operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested frame cannot be represented on the wire.
    ///
    /// Control frames top out at 8191 bytes total; data frames at 8194
    /// (via the zero-length sentinel). Anything larger is unencodable.
    #[error("frame length {requested} exceeds maximum {max}")]
    LengthExceeded {
        /// The total frame length that was requested.
        requested: usize,
        /// The maximum the wire format can carry for this frame class.
        max: usize,
    },

    /// The supplied buffer is too short to contain a frame's mandatory
    /// fields (header, item code, or sequence number).
    #[error("frame too short: {len} bytes")]
    FrameTooShort {
        /// Length of the supplied buffer.
        len: usize,
    },

    /// The buffer ends before the frame's declared length, or the declared
    /// length cannot even hold the mandatory fields.
    #[error("frame truncated: declared {declared} bytes, {available} available")]
    FrameTruncated {
        /// Total frame length declared in the header.
        declared: usize,
        /// Bytes actually available in the buffer.
        available: usize,
    },

    /// The requested sample width is not a whole number of bytes in 8..=32.
    #[error("invalid sample width: {0} bits (must be a multiple of 8 in 8..=32)")]
    InvalidSampleWidth(u16),

    /// A transport-level error (TCP socket, UDP socket).
    #[error("transport error: {0}")]
    Transport(String),

    /// No connection to the receiver has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the receiver was lost unexpectedly, or a pending
    /// request was abandoned by a disconnect.
    #[error("connection lost")]
    ConnectionLost,

    /// Timed out while establishing a connection.
    #[error("timeout")]
    Timeout,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_length_exceeded() {
        let e = Error::LengthExceeded {
            requested: 9000,
            max: 8191,
        };
        assert_eq!(e.to_string(), "frame length 9000 exceeds maximum 8191");
    }

    #[test]
    fn error_display_frame_too_short() {
        let e = Error::FrameTooShort { len: 1 };
        assert_eq!(e.to_string(), "frame too short: 1 bytes");
    }

    #[test]
    fn error_display_frame_truncated() {
        let e = Error::FrameTruncated {
            declared: 100,
            available: 60,
        };
        assert_eq!(
            e.to_string(),
            "frame truncated: declared 100 bytes, 60 available"
        );
    }

    #[test]
    fn error_display_invalid_sample_width() {
        let e = Error::InvalidSampleWidth(40);
        assert!(e.to_string().contains("40 bits"));
    }

    #[test]
    fn error_display_not_connected() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn error_display_connection_lost() {
        assert_eq!(Error::ConnectionLost.to_string(), "connection lost");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
