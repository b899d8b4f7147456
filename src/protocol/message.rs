//! STMP message envelope

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use super::{Encoding, Error, Kind, Result, Status, utf8};

/// Binary encoding of a Ping
pub const PING_BINARY: [u8; 1] = [0x00];

/// Text encoding of a Ping
pub const PING_TEXT: &str = "0";

/// Message payload
///
/// Text payloads can ride inline in a text header; binary payloads are sent
/// as a separate unit on the text profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Binary(Bytes),
}

impl Payload {
    /// Encoded size in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Text(text) => utf8::byte_length(text),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Check if the payload holds nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }

    /// Text view, if this is a text payload
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Payload as bytes, encoding text on the way
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(utf8::encode_to_vec(text, 0)),
            Self::Binary(bytes) => bytes.clone(),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(Bytes::copy_from_slice(bytes))
    }
}

/// Unit of input handed to the text codec by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// A text frame
    Text(String),
    /// A binary frame
    Binary(Bytes),
}

impl Chunk {
    /// Size of the chunk in its own representation
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Check if the chunk holds nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn into_payload(self) -> Payload {
        match self {
            Self::Text(text) => Payload::Text(text),
            Self::Binary(bytes) => Payload::Binary(bytes),
        }
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for Chunk {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

/// Caller-attached value carried next to a message, never serialized
pub type Attachment = Arc<dyn Any + Send + Sync>;

/// STMP message
///
/// Built through [`Context::build`](super::Context::build) or produced by a
/// codec's parser, so `payload_size == 0`, `encoding == None` and an absent
/// payload always go together.
#[derive(Clone, Default)]
pub struct Message {
    pub(crate) kind: Kind,
    pub(crate) encoding: Encoding,
    pub(crate) id: u16,
    pub(crate) action: u32,
    pub(crate) status: u8,
    pub(crate) payload_size: usize,
    pub(crate) payload: Option<Payload>,
    pub(crate) data: Option<Attachment>,
}

impl Message {
    /// Blank message of the given kind and encoding, as the parsers start one.
    pub(crate) fn blank(kind: Kind, encoding: Encoding) -> Self {
        Self {
            kind,
            encoding,
            ..Self::default()
        }
    }

    /// The Ping message
    #[must_use]
    pub fn ping() -> Self {
        Self::default()
    }

    /// Get kind
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Get payload encoding
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Get request id (0 for Ping and Notify)
    #[must_use]
    pub const fn id(&self) -> u16 {
        self.id
    }

    /// Get action (0 for Ping and Response)
    #[must_use]
    pub const fn action(&self) -> u32 {
        self.action
    }

    /// Get raw status code (0 outside Response)
    #[must_use]
    pub const fn status(&self) -> u8 {
        self.status
    }

    /// Get status as a well-known code, if it is one
    #[must_use]
    pub const fn known_status(&self) -> Option<Status> {
        Status::from_u8(self.status)
    }

    /// Get the explicit payload size
    ///
    /// Only the binary profile carries it; text-profile messages report 0.
    #[must_use]
    pub const fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Get payload
    #[must_use]
    pub const fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Take the payload out of the message
    #[must_use]
    pub fn into_payload(self) -> Option<Payload> {
        self.payload
    }

    /// Get caller-attached data
    #[must_use]
    pub fn data(&self) -> Option<&Attachment> {
        self.data.as_ref()
    }

    /// Attach caller data
    pub fn set_data(&mut self, data: Attachment) {
        self.data = Some(data);
    }

    /// Attach caller data, builder style
    #[must_use]
    pub fn with_data(mut self, data: Attachment) -> Self {
        self.data = Some(data);
        self
    }

    /// Check the envelope invariants before serializing
    pub(crate) fn validate(&self) -> Result<()> {
        match (&self.payload, self.encoding) {
            (None, Encoding::None) => {
                if self.payload_size != 0 {
                    return Err(Error::InvalidMessage {
                        reason: "payload size without payload",
                    });
                }
            }
            (None, _) => {
                return Err(Error::InvalidMessage {
                    reason: "encoding declared without payload",
                });
            }
            (Some(_), Encoding::None) => {
                return Err(Error::InvalidMessage {
                    reason: "payload without encoding",
                });
            }
            (Some(payload), _) => {
                if payload.is_empty() {
                    return Err(Error::InvalidMessage {
                        reason: "empty payload with encoding",
                    });
                }
            }
        }
        if self.kind == Kind::Ping && self.encoding != Encoding::None {
            return Err(Error::InvalidMessage {
                reason: "ping cannot carry a payload",
            });
        }
        Ok(())
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.encoding == other.encoding
            && self.id == other.id
            && self.action == other.action
            && self.status == other.status
            && self.payload_size == other.payload_size
            && self.payload == other.payload
    }
}

impl Eq for Message {}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .field("encoding", &self.encoding)
            .field("id", &self.id)
            .field("action", &self.action)
            .field("status", &self.status)
            .field("payload_size", &self.payload_size)
            .field("payload", &self.payload)
            .field("data", &self.data.is_some())
            .finish()
    }
}

/// Inputs to [`Context::build`](super::Context::build)
///
/// Unset fields take their defaults in this order: `id` (auto-assigned for
/// Request, 0 otherwise), then `payload_size` (from the payload), then
/// encoding and payload are cleared when the size comes out 0.
#[derive(Debug, Clone, Default)]
pub struct MessageParams {
    pub(crate) kind: Kind,
    pub(crate) encoding: Encoding,
    pub(crate) id: Option<u16>,
    pub(crate) action: u32,
    pub(crate) status: u8,
    pub(crate) payload: Option<Payload>,
    pub(crate) payload_size: Option<usize>,
}

impl MessageParams {
    /// Start parameters for a message of `kind`
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Request with the given action
    #[must_use]
    pub fn request(action: u32) -> Self {
        Self::new(Kind::Request).action(action)
    }

    /// Notify with the given action
    #[must_use]
    pub fn notify(action: u32) -> Self {
        Self::new(Kind::Notify).action(action)
    }

    /// Response echoing `id`
    #[must_use]
    pub fn response(id: u16, status: impl Into<u8>) -> Self {
        Self::new(Kind::Response).id(id).status(status)
    }

    /// Set payload encoding
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set id explicitly
    #[must_use]
    pub fn id(mut self, id: u16) -> Self {
        self.id = Some(id);
        self
    }

    /// Set action
    #[must_use]
    pub fn action(mut self, action: u32) -> Self {
        self.action = action;
        self
    }

    /// Set status
    #[must_use]
    pub fn status(mut self, status: impl Into<u8>) -> Self {
        self.status = status.into();
        self
    }

    /// Set payload
    #[must_use]
    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Override the computed payload size
    #[must_use]
    pub fn payload_size(mut self, size: usize) -> Self {
        self.payload_size = Some(size);
        self
    }
}
