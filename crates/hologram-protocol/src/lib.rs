//! Wire protocol for Hologram.
//!
//! This crate defines the "language" that the agent, the server and the
//! CLI speak:
//!
//! - **Types** ([`Message`], [`ServerRequest`], [`ServerResponse`]) -
//!   the tagged union that travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how a message is turned
//!   into a payload and back.
//! - **Framing** ([`write_message`], [`read_message`]): the 16-byte
//!   length + CRC32 header wrapped around every payload.
//! - **Errors** ([`ProtocolError`]): what can go wrong on the way.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Framing (header + payload) → Codec (Message)
//! ```
//!
//! Nothing in here knows what a message *means*. The server state
//! machine and the agent client give messages their semantics.

mod codec;
mod error;
mod types;
mod wire;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    CHALLENGE_LEN, Message, PingKind, ServerRequest, ServerResponse,
    WireCredentials,
};
pub use wire::{
    FrameHeader, HEADER_LEN, MAX_MESSAGE_SIZE, read_message, write_message,
};
