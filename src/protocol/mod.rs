//! STMP protocol core implementation
//!
//! This module provides the message envelope, the builder context and the
//! binary and text codecs.

mod binary;
mod chunks;
mod context;
mod error;
mod message;
mod text;
mod types;
pub mod utf8;

pub use binary::BinaryCodec;
pub use context::{Context, ContextOptions, ContextState};
pub use error::{Error, Result};
pub use message::{Attachment, Chunk, Message, MessageParams, PING_BINARY, PING_TEXT, Payload};
pub use text::{TextCodec, TextFrame};
pub use types::{
    ENCODING_MASK, ENCODING_OFFSET, Encoding, KIND_MASK, KIND_OFFSET, Kind, Profile,
    RESERVED_MASK, Status, StatusFamily, flag, unpack_flag,
};

/// Default payload size limit (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;
