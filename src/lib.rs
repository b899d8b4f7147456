//! STMP - compact message framing for request/response and notification traffic
//!
//! One envelope, four kinds of message (ping, request, notify, response) and
//! two wire profiles: a binary profile for byte-stream transports and a text
//! profile for text-only channels such as browser text sockets.
//!
//! # Quick Start
//!
//! ```rust
//! use stmp::{BinaryCodec, Context, Encoding, MessageParams};
//!
//! let mut codec = BinaryCodec::new();
//!
//! // Build a request; the id is assigned by the codec
//! let msg = codec.build(
//!     MessageParams::request(0x0102)
//!         .encoding(Encoding::Json)
//!         .payload(r#"{"name":"stmp"}"#),
//! );
//!
//! // Encode to bytes
//! let bytes = codec.serialize(&msg)?;
//!
//! // Feed the bytes back in, in as many chunks as the transport likes
//! let (head, tail) = bytes.split_at(3);
//! assert!(codec.parse(head.to_vec())?.is_empty());
//! let parsed = codec.parse(tail.to_vec())?;
//! assert_eq!(parsed.len(), 1);
//! assert_eq!(parsed[0].action(), 0x0102);
//! # Ok::<(), stmp::Error>(())
//! ```
//!
//! # Features
//!
//! - **Resumable parsing** - binary messages may be split across any chunk boundaries
//! - **Zero-copy payloads** - payload spans inside one chunk are shared, not copied
//! - **Text profile** - pipe-delimited headers for text-only transports
//! - **Opaque payloads** - the encoding is a tag; payloads are never decoded

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod protocol;

pub use protocol::{
    BinaryCodec, Chunk, Context, ContextOptions, Encoding, Error, Kind, MAX_PAYLOAD_SIZE, Message,
    MessageParams, Payload, Profile, Result, Status, TextCodec, TextFrame,
};

/// STMP protocol version
pub const VERSION: &str = "1.0.0";
