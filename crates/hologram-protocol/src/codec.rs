//! Payload serialization for framed messages.
//!
//! The framing layer does not care HOW a [`Message`](crate::Message) is
//! serialized. It only needs something implementing [`Codec`] to produce
//! the payload bytes that get length-prefixed and checksummed.
//!
//! [`JsonCodec`] is the default. Any codec works as long as both ends of a
//! connection agree on it.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns a message into frame payload bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task the server spawns.
pub trait Codec: Send + Sync + 'static {
    /// Encodes `value` as a frame payload.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Decodes a frame payload.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` when the payload is not a valid
    /// encoding of `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// JSON payloads through `serde_json`.
///
/// Payloads stay human-readable, which makes captured traffic easy to
/// inspect. Challenges and signature blobs are small, so the size
/// overhead of JSON arrays is irrelevant next to the 1 MiB frame limit.
///
/// ## Example
///
/// ```rust
/// use hologram_protocol::{Codec, JsonCodec, Message, PingKind};
///
/// let bytes = JsonCodec.encode(&Message::Ping(PingKind::Request)).unwrap();
/// let decoded: Message = JsonCodec.decode(&bytes).unwrap();
/// assert_eq!(decoded, Message::Ping(PingKind::Request));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
