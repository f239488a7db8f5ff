//! Frame format: a fixed 16-byte header followed by the encoded payload.
//!
//! ```text
//! ┌──────────────────┬──────────────────┬──────────────────────────────┐
//! │ content_length   │ checksum         │ reserved                     │
//! │ u32 LE           │ u32 LE (CRC32)   │ u64 LE (zero on write)       │
//! └──────────────────┴──────────────────┴──────────────────────────────┘
//! followed by `content_length` payload bytes
//! ```
//!
//! The checksum is verified before the payload is handed to the codec, so
//! a corrupted frame is always reported as [`ProtocolError::CorruptedMessage`]
//! and never decoded.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Codec, Message, ProtocolError};

/// Upper bound on a single payload. A peer cannot make us allocate more
/// than this for one message.
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Size of the encoded [`FrameHeader`].
pub const HEADER_LEN: usize = 16;

/// The header written in front of every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of the payload that follows.
    pub content_length: u32,
    /// CRC32 (IEEE) of the payload.
    pub checksum: u32,
    /// Reserved for future protocol revisions. Written as zero, ignored
    /// on read.
    pub reserved: u64,
}

impl FrameHeader {
    /// Builds the header for `payload`.
    ///
    /// # Errors
    /// [`ProtocolError::MessageTooLarge`] if the payload exceeds
    /// [`MAX_MESSAGE_SIZE`].
    pub fn for_payload(payload: &[u8]) -> Result<Self, ProtocolError> {
        let content_length = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= MAX_MESSAGE_SIZE)
            .ok_or(ProtocolError::MessageTooLarge {
                size: payload.len() as u64,
                max: MAX_MESSAGE_SIZE,
            })?;

        Ok(Self {
            content_length,
            checksum: crc32fast::hash(payload),
            reserved: 0,
        })
    }

    /// Little-endian encoding of the header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.content_length.to_le_bytes());
        out[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        out[8..16].copy_from_slice(&self.reserved.to_le_bytes());
        out
    }

    /// Parses a header. Never fails: every 16-byte pattern is a header,
    /// limits are enforced by [`read_message`].
    pub fn from_bytes(raw: &[u8; HEADER_LEN]) -> Self {
        let mut len = [0u8; 4];
        let mut sum = [0u8; 4];
        let mut reserved = [0u8; 8];
        len.copy_from_slice(&raw[0..4]);
        sum.copy_from_slice(&raw[4..8]);
        reserved.copy_from_slice(&raw[8..16]);
        Self {
            content_length: u32::from_le_bytes(len),
            checksum: u32::from_le_bytes(sum),
            reserved: u64::from_le_bytes(reserved),
        }
    }
}

/// Encodes `msg` and writes header + payload to `writer`.
///
/// `write_all` keeps calling the underlying writer until every byte is
/// accepted, so streams that take a single byte per call still deliver
/// a complete frame.
pub async fn write_message<W, C>(
    writer: &mut W,
    codec: &C,
    msg: &Message,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin + ?Sized,
    C: Codec,
{
    let payload = codec.encode(msg)?;
    let header = FrameHeader::for_payload(&payload)?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&header.to_bytes());
    frame.extend_from_slice(&payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame from `reader` and decodes it.
///
/// # Errors
/// - [`ProtocolError::MessageTooLarge`] as soon as the header announces
///   more than [`MAX_MESSAGE_SIZE`]; the body is not read.
/// - [`ProtocolError::CorruptedMessage`] if the CRC32 does not match.
/// - [`ProtocolError::Io`] for stream failures, including EOF.
pub async fn read_message<R, C>(
    reader: &mut R,
    codec: &C,
) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin + ?Sized,
    C: Codec,
{
    let mut raw = [0u8; HEADER_LEN];
    reader.read_exact(&mut raw).await?;
    let header = FrameHeader::from_bytes(&raw);

    if header.content_length > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: u64::from(header.content_length),
            max: MAX_MESSAGE_SIZE,
        });
    }

    // read_exact loops over short reads, so a payload split across
    // several segments is reassembled here.
    let mut payload = vec![0u8; header.content_length as usize];
    reader.read_exact(&mut payload).await?;

    let actual = crc32fast::hash(&payload);
    if actual != header.checksum {
        return Err(ProtocolError::CorruptedMessage {
            expected: header.checksum,
            actual,
        });
    }

    codec.decode(&payload)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(all(test, feature = "json"))]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;
    use crate::{JsonCodec, PingKind, ServerRequest};

    /// A writer that accepts exactly one byte per call.
    #[derive(Default)]
    struct WimpyWriter {
        written: Vec<u8>,
        calls: usize,
    }

    impl AsyncWrite for WimpyWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if buf.is_empty() {
                return Poll::Ready(Ok(0));
            }
            self.calls += 1;
            self.written.push(buf[0]);
            Poll::Ready(Ok(1))
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn sample_request() -> Message {
        Message::ServerRequest(ServerRequest::ChallengeResponse {
            format: "ssh-ed25519".into(),
            signature: (0u8..64).collect(),
        })
    }

    async fn frame_of(msg: &Message) -> Vec<u8> {
        let mut buf = Vec::new();
        write_message(&mut buf, &JsonCodec, msg).await.expect("write");
        buf
    }

    #[test]
    fn test_header_bytes_are_little_endian() {
        let header = FrameHeader {
            content_length: 0x0102_0304,
            checksum: 0xAABB_CCDD,
            reserved: 0,
        };
        let raw = header.to_bytes();
        assert_eq!(&raw[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&raw[4..8], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(&raw[8..16], &[0u8; 8]);
        assert_eq!(FrameHeader::from_bytes(&raw), header);
    }

    #[tokio::test]
    async fn test_read_message_after_write_returns_same_message() {
        let msg = sample_request();
        let frame = frame_of(&msg).await;

        let mut reader: &[u8] = &frame;
        let decoded = read_message(&mut reader, &JsonCodec).await.expect("read");
        assert_eq!(decoded, msg);
        assert!(reader.is_empty(), "exactly one frame consumed");
    }

    #[tokio::test]
    async fn test_write_message_header_matches_payload() {
        let frame = frame_of(&Message::Ping(PingKind::Request)).await;
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&frame[..HEADER_LEN]);
        let header = FrameHeader::from_bytes(&raw);

        let payload = &frame[HEADER_LEN..];
        assert_eq!(header.content_length as usize, payload.len());
        assert_eq!(header.checksum, crc32fast::hash(payload));
        assert_eq!(header.reserved, 0);
    }

    #[tokio::test]
    async fn test_read_message_single_bit_flip_returns_corrupted() {
        let mut frame = frame_of(&sample_request()).await;
        frame[HEADER_LEN + 5] ^= 0x01;

        let mut reader: &[u8] = &frame;
        let result = read_message(&mut reader, &JsonCodec).await;
        assert!(
            matches!(result, Err(ProtocolError::CorruptedMessage { .. })),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_read_message_oversized_header_does_not_read_body() {
        let header = FrameHeader {
            content_length: MAX_MESSAGE_SIZE + 1,
            checksum: 0,
            reserved: 0,
        };
        let mut input = header.to_bytes().to_vec();
        input.extend_from_slice(&[7u8; 32]);

        let mut reader: &[u8] = &input;
        let result = read_message(&mut reader, &JsonCodec).await;
        assert!(matches!(
            result,
            Err(ProtocolError::MessageTooLarge { max: MAX_MESSAGE_SIZE, .. })
        ));
        assert_eq!(reader.len(), 32, "body bytes must be left untouched");
    }

    #[tokio::test]
    async fn test_write_message_oversized_payload_is_rejected() {
        let huge = Message::error("x".repeat(MAX_MESSAGE_SIZE as usize + 1));
        let mut buf = Vec::new();
        let result = write_message(&mut buf, &JsonCodec, &huge).await;
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_write_message_one_byte_writer_delivers_full_frame() {
        let msg = sample_request();
        let mut wimpy = WimpyWriter::default();
        write_message(&mut wimpy, &JsonCodec, &msg).await.expect("write");

        assert_eq!(wimpy.calls, wimpy.written.len());
        assert!(wimpy.calls > HEADER_LEN);

        let mut reader: &[u8] = &wimpy.written;
        let decoded = read_message(&mut reader, &JsonCodec).await.expect("read");
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn test_read_message_fragmented_stream_reassembles() {
        // A one-byte duplex forces both sides through many short
        // reads and writes.
        let (mut client, mut server) = tokio::io::duplex(1);
        let msg = sample_request();
        let sent = msg.clone();

        let writer = tokio::spawn(async move {
            write_message(&mut client, &JsonCodec, &sent).await
        });

        let decoded = read_message(&mut server, &JsonCodec).await.expect("read");
        writer.await.expect("join").expect("write");
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn test_read_message_truncated_payload_returns_io_eof() {
        let frame = frame_of(&sample_request()).await;
        let truncated = &frame[..frame.len() - 3];

        let mut reader: &[u8] = truncated;
        let err = read_message(&mut reader, &JsonCodec).await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_read_message_back_to_back_frames() {
        let mut stream = frame_of(&Message::Ping(PingKind::Request)).await;
        stream.extend(frame_of(&Message::Success).await);

        let mut reader: &[u8] = &stream;
        assert_eq!(
            read_message(&mut reader, &JsonCodec).await.unwrap(),
            Message::Ping(PingKind::Request)
        );
        assert_eq!(
            read_message(&mut reader, &JsonCodec).await.unwrap(),
            Message::Success
        );
    }
}
