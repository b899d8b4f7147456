//! Binary wire profile
//!
//! # Format
//!
//! ```text
//! flag = kind(2) | encoding(3) | reserved(3)
//!
//! Ping:     [flag = 0x00]
//! Request:  [flag] [id (2)] [action (4)] ([payload size (4)] [payload])
//! Notify:   [flag] [action (4)]          ([payload size (4)] [payload])
//! Response: [flag] [id (2)] [status (1)] ([payload size (4)] [payload])
//! ```
//!
//! The bracketed tail is present only when the encoding is not `None`.
//! Multi-byte integers are big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use super::chunks::ChunkQueue;
use super::context::{Context, ContextOptions, ContextState};
use super::types::{flag, unpack_flag};
use super::{Encoding, Error, Kind, Message, PING_BINARY, Payload, Result, utf8};

const ID_SIZE: usize = 2;
const ACTION_SIZE: usize = 4;
const STATUS_SIZE: usize = 1;
const PAYLOAD_SIZE_SIZE: usize = 4;

/// Point the parser has reached in the message being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    None,
    Header,
    Id,
    Action,
    Status,
    Ps,
    Payload,
    Error,
}

impl Stage {
    const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Header => "header",
            Self::Id => "id",
            Self::Action => "action",
            Self::Status => "status",
            Self::Ps => "payload size",
            Self::Payload => "payload",
            Self::Error => "error",
        }
    }
}

/// Incremental parser and serializer for the binary profile
///
/// One instance per stream direction. Once a parse fails the instance stays
/// failed until [`Context::reset`].
#[derive(Debug)]
pub struct BinaryCodec {
    context: ContextState,
    stage: Stage,
    parsing: Message,
    chunks: ChunkQueue,
    error: Option<Error>,
}

impl BinaryCodec {
    /// Create a codec with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    /// Create a codec with the given options
    #[must_use]
    pub fn with_options(options: ContextOptions) -> Self {
        Self {
            context: ContextState::new(options),
            stage: Stage::None,
            parsing: Message::default(),
            chunks: ChunkQueue::default(),
            error: None,
        }
    }

    /// Check if the parser has failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.stage == Stage::Error
    }

    /// The error the parser failed with
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Check if a message is partially parsed
    #[must_use]
    pub fn is_parsing(&self) -> bool {
        !matches!(self.stage, Stage::None | Stage::Error)
    }

    /// Bytes received but not yet turned into messages
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.chunks.remaining()
    }

    /// Feed a chunk and collect every message it completes
    ///
    /// An empty result means more input is needed. Messages split across
    /// chunk boundaries are resumed exactly where the previous call stopped.
    ///
    /// # Errors
    ///
    /// Any malformed input fails the codec permanently; later calls return
    /// the same error without consuming their chunk.
    pub fn parse(&mut self, chunk: impl Into<Bytes>) -> Result<Vec<Message>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Ok(Vec::new());
        }
        self.chunks.push(chunk);

        let mut output = Vec::new();
        while self.step(&mut output)? {}
        trace!(
            messages = output.len(),
            buffered = self.chunks.remaining(),
            chunks = self.chunks.len(),
            stage = self.stage.name(),
            "binary chunk parsed"
        );
        Ok(output)
    }

    /// Advance one stage; `false` when input ran out.
    fn step(&mut self, output: &mut Vec<Message>) -> Result<bool> {
        let kind = self.parsing.kind;
        match self.stage {
            Stage::None | Stage::Header => {
                let Some(mut span) = self.chunks.take(1) else {
                    return Ok(false);
                };
                self.stage = Stage::Header;
                let (kind, encoding) = match unpack_flag(span.get_u8()) {
                    Ok(parts) => parts,
                    Err(err) => return Err(self.abort(err)),
                };
                self.parsing = Message::blank(kind, encoding);
                self.stage = match kind {
                    Kind::Ping => return Ok(self.finish(output)),
                    Kind::Request | Kind::Response => Stage::Id,
                    Kind::Notify => Stage::Action,
                };
            }
            Stage::Id if kind.has_id() => {
                let Some(mut span) = self.chunks.take(ID_SIZE) else {
                    return Ok(false);
                };
                self.parsing.id = span.get_u16();
                self.stage = if kind == Kind::Request {
                    Stage::Action
                } else {
                    Stage::Status
                };
            }
            Stage::Action if kind.has_action() => {
                let Some(mut span) = self.chunks.take(ACTION_SIZE) else {
                    return Ok(false);
                };
                self.parsing.action = span.get_u32();
                return Ok(self.after_fields(output));
            }
            Stage::Status if kind.has_status() => {
                let Some(mut span) = self.chunks.take(STATUS_SIZE) else {
                    return Ok(false);
                };
                self.parsing.status = span.get_u8();
                return Ok(self.after_fields(output));
            }
            Stage::Ps if self.parsing.encoding.has_payload() => {
                let Some(mut span) = self.chunks.take(PAYLOAD_SIZE_SIZE) else {
                    return Ok(false);
                };
                let size = span.get_u32() as usize;
                if size == 0 {
                    return Err(self.abort(Error::ChunkInvalid));
                }
                let max = self.context.options().max_payload_size;
                if size > max {
                    return Err(self.abort(Error::PayloadTooLarge { size, max }));
                }
                self.parsing.payload_size = size;
                self.stage = Stage::Payload;
            }
            Stage::Payload if self.parsing.payload_size > 0 => {
                let Some(span) = self.chunks.take(self.parsing.payload_size) else {
                    return Ok(false);
                };
                self.parsing.payload = Some(Payload::Binary(span));
                return Ok(self.finish(output));
            }
            stage => {
                return Err(self.abort(Error::UnexpectedStage { stage: stage.name() }));
            }
        }
        Ok(true)
    }

    /// Fixed fields done: finish now or move on to the payload size.
    fn after_fields(&mut self, output: &mut Vec<Message>) -> bool {
        if self.parsing.encoding.has_payload() {
            self.stage = Stage::Ps;
            true
        } else {
            self.finish(output)
        }
    }

    /// Emit the message in progress and release the bytes it used.
    fn finish(&mut self, output: &mut Vec<Message>) -> bool {
        let message = std::mem::take(&mut self.parsing);
        trace!(
            kind = %message.kind,
            encoding = %message.encoding,
            id = message.id,
            payload_size = message.payload_size,
            "binary message parsed"
        );
        output.push(message);
        self.chunks.compact();
        self.stage = Stage::None;
        true
    }

    fn abort(&mut self, err: Error) -> Error {
        debug!(error = %err, stage = self.stage.name(), "binary parser failed");
        self.stage = Stage::Error;
        self.error = Some(err.clone());
        err
    }

    /// Serialize a message into one buffer
    ///
    /// # Errors
    ///
    /// Returns an error if the message breaks the envelope invariants or its
    /// payload exceeds the configured limit.
    pub fn serialize(&self, message: &Message) -> Result<Bytes> {
        let (mut frame, payload_size) = self.header(message, true)?;
        match message.payload() {
            Some(Payload::Binary(bytes)) => frame.put_slice(bytes),
            Some(Payload::Text(text)) => {
                let start = frame.len();
                frame.resize(start + payload_size, 0);
                utf8::encode(text, &mut frame, start)?;
            }
            None => {}
        }
        Ok(frame.freeze())
    }

    /// Serialize a message as a header buffer and a separate payload buffer
    ///
    /// The payload buffer is shared with the message when it is binary, so
    /// transports doing vectored writes avoid copying it.
    ///
    /// # Errors
    ///
    /// Same as [`BinaryCodec::serialize`].
    pub fn serialize_split(&self, message: &Message) -> Result<(Bytes, Option<Bytes>)> {
        let (frame, _) = self.header(message, false)?;
        Ok((frame.freeze(), message.payload().map(Payload::to_bytes)))
    }

    /// Write flag and fixed fields, reserving room for the payload when inline.
    fn header(&self, message: &Message, inline: bool) -> Result<(BytesMut, usize)> {
        message.validate()?;
        if message.kind == Kind::Ping {
            return Ok((BytesMut::from(&PING_BINARY[..]), 0));
        }

        let payload_size = message.payload().map_or(0, |p| self.payload_size(p));
        if message.payload_size != 0 && message.payload_size != payload_size {
            return Err(Error::InvalidMessage {
                reason: "payload size does not match payload",
            });
        }
        let max = self.context.options().max_payload_size.min(u32::MAX as usize);
        if payload_size > max {
            return Err(Error::PayloadTooLarge {
                size: payload_size,
                max,
            });
        }

        let mut header_size = 1 + match message.kind {
            Kind::Request => ID_SIZE + ACTION_SIZE,
            Kind::Notify => ACTION_SIZE,
            Kind::Response => ID_SIZE + STATUS_SIZE,
            Kind::Ping => 0,
        };
        if message.encoding != Encoding::None {
            header_size += PAYLOAD_SIZE_SIZE;
        }

        let capacity = if inline {
            header_size + payload_size
        } else {
            header_size
        };
        let mut frame = BytesMut::with_capacity(capacity);
        frame.put_u8(flag(message.kind, message.encoding));
        match message.kind {
            Kind::Request => {
                frame.put_u16(message.id);
                frame.put_u32(message.action);
            }
            Kind::Notify => frame.put_u32(message.action),
            Kind::Response => {
                frame.put_u16(message.id);
                frame.put_u8(message.status);
            }
            Kind::Ping => {}
        }
        if message.encoding != Encoding::None {
            frame.put_u32(payload_size as u32);
        }
        Ok((frame, payload_size))
    }
}

impl Default for BinaryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Context for BinaryCodec {
    fn state(&self) -> &ContextState {
        &self.context
    }

    fn state_mut(&mut self) -> &mut ContextState {
        &mut self.context
    }

    fn payload_size(&self, payload: &Payload) -> usize {
        payload.byte_len()
    }

    fn carries_payload_size(&self) -> bool {
        true
    }

    fn wire_payload(&self, payload: Payload) -> Payload {
        match payload {
            Payload::Text(_) => Payload::Binary(payload.to_bytes()),
            binary @ Payload::Binary(_) => binary,
        }
    }

    fn reset(&mut self) {
        self.stage = Stage::None;
        self.parsing = Message::default();
        self.chunks.clear();
        self.error = None;
    }
}
