//! Error types for the protocol layer.
//!
//! Each crate in Hologram defines its own error enum. A `ProtocolError`
//! always means the problem is in framing or (de)serialization, never in
//! authentication or credential issuance.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a checksummed payload into a message).
    ///
    /// Common causes: an unknown variant tag, missing fields, or a payload
    /// that names more than one variant.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload did not pass its CRC32 check.
    ///
    /// Raised before any decode is attempted, so a corrupted frame can
    /// never be silently decoded into the wrong message.
    #[error("message did not pass checksum (expected {expected:#010x}, got {actual:#010x})")]
    CorruptedMessage { expected: u32, actual: u32 },

    /// The frame header announced (or the encoder produced) a payload
    /// larger than [`MAX_MESSAGE_SIZE`](crate::MAX_MESSAGE_SIZE).
    #[error("message too large: requested {size} bytes but max is {max}")]
    MessageTooLarge { size: u64, max: u32 },

    /// The message is well-formed but not valid at this point of the
    /// conversation (e.g. credentials sent to the server).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Reading or writing the underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns `true` when the peer closed the stream.
    ///
    /// A clean EOF between frames is the normal end of a conversation and
    /// callers usually log it at debug level instead of reporting it.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
