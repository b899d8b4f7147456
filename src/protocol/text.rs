//! Text wire profile
//!
//! # Format
//!
//! ```text
//! Ping:     0
//! Request:  1|encoding|id|action[|payload]
//! Notify:   2|encoding|action[|payload]
//! Response: 3|encoding|id|status[|payload]
//! ```
//!
//! All numbers are decimal. A text payload rides inline as the rest of the
//! line, so it may itself contain `|`. A binary payload cannot, so the header
//! is sent without a payload field and the payload follows as the next chunk.

use bytes::Bytes;
use tracing::{debug, trace};

use super::context::{Context, ContextOptions, ContextState};
use super::{Chunk, Encoding, Error, Kind, Message, PING_TEXT, Payload, Result};

const SEPARATOR: char = '|';

/// Serialized text-profile message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextFrame {
    /// Complete message in one header line
    Line(String),
    /// Header line followed by a binary payload sent as its own unit
    Split {
        /// Header line without a payload field
        header: String,
        /// Payload bytes
        payload: Bytes,
    },
}

impl TextFrame {
    /// Header line
    #[must_use]
    pub fn header(&self) -> &str {
        match self {
            Self::Line(line) => line,
            Self::Split { header, .. } => header,
        }
    }

    /// Units in the order a transport should send them
    #[must_use]
    pub fn into_chunks(self) -> Vec<Chunk> {
        match self {
            Self::Line(line) => vec![Chunk::Text(line)],
            Self::Split { header, payload } => vec![Chunk::Text(header), Chunk::Binary(payload)],
        }
    }
}

/// Walks the `|`-separated fields of a header line.
struct Fields<'a> {
    header: &'a str,
    offset: usize,
    done: bool,
}

impl<'a> Fields<'a> {
    const fn new(header: &'a str) -> Self {
        Self {
            header,
            offset: 0,
            done: false,
        }
    }

    /// Next field, `None` past the end of the line.
    ///
    /// A separator always opens another field, so a trailing `|` yields one
    /// final empty field.
    fn next_field(&mut self) -> Option<&'a str> {
        let rest = self.rest()?;
        match rest.find(SEPARATOR) {
            Some(end) => {
                self.offset += end + 1;
                Some(&rest[..end])
            }
            None => {
                self.offset = self.header.len();
                self.done = true;
                Some(rest)
            }
        }
    }

    /// Everything not yet consumed, `None` once the last field is taken.
    fn rest(&self) -> Option<&'a str> {
        if self.done {
            None
        } else {
            Some(&self.header[self.offset..])
        }
    }

    fn required(&mut self) -> Result<&'a str> {
        self.next_field().ok_or(Error::ChunkInvalid)
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T> {
        let field = self.required()?;
        if !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::ChunkInvalid);
        }
        field.parse().map_err(|_| Error::ChunkInvalid)
    }

    fn digit(&mut self) -> Result<u8> {
        let field = self.required()?;
        match field.as_bytes() {
            [digit] if digit.is_ascii_digit() => Ok(digit - b'0'),
            [other] => Err(Error::IncorrectKind {
                tag: other.wrapping_sub(b'0'),
            }),
            _ => Err(Error::ChunkInvalid),
        }
    }
}

/// Outcome of reading a header line.
enum Header {
    Complete(Message),
    AwaitPayload(Message),
}

/// Incremental parser and serializer for the text profile
///
/// Parses one message per completed call; a split message takes two calls.
/// Once a parse fails the instance stays failed until [`Context::reset`].
#[derive(Debug)]
pub struct TextCodec {
    context: ContextState,
    parsing: Option<Message>,
    error: Option<Error>,
}

impl TextCodec {
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
            parsing: None,
            error: None,
        }
    }

    /// Check if the parser has failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The error the parser failed with
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Check if a header has been read and its payload is awaited
    #[must_use]
    pub fn is_parsing(&self) -> bool {
        self.parsing.is_some() && self.error.is_none()
    }

    /// Feed one chunk
    ///
    /// Returns `Ok(None)` after a header whose payload follows separately.
    ///
    /// # Errors
    ///
    /// Any malformed input fails the codec permanently; later calls return
    /// the same error.
    pub fn parse(&mut self, chunk: impl Into<Chunk>) -> Result<Option<Message>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Err(self.abort(Error::ChunkEmpty));
        }

        if let Some(mut message) = self.parsing.take() {
            let payload = chunk.into_payload();
            let max = self.context.options().max_payload_size;
            if payload.byte_len() > max {
                return Err(self.abort(Error::PayloadTooLarge {
                    size: payload.byte_len(),
                    max,
                }));
            }
            message.payload = Some(payload);
            trace!(kind = %message.kind, "text payload chunk parsed");
            return Ok(Some(message));
        }

        let Chunk::Text(line) = chunk else {
            return Err(self.abort(Error::ChunkMangled));
        };
        match self.read_header(&line) {
            Ok(Header::Complete(message)) => {
                trace!(kind = %message.kind, encoding = %message.encoding, "text message parsed");
                Ok(Some(message))
            }
            Ok(Header::AwaitPayload(message)) => {
                trace!(kind = %message.kind, encoding = %message.encoding, "awaiting text payload chunk");
                self.parsing = Some(message);
                Ok(None)
            }
            Err(err) => Err(self.abort(err)),
        }
    }

    fn read_header(&self, line: &str) -> Result<Header> {
        let mut fields = Fields::new(line);

        let tag = fields.digit()?;
        let kind = Kind::from_tag(tag).ok_or(Error::IncorrectKind { tag })?;
        if kind == Kind::Ping {
            if fields.rest().is_some() {
                return Err(Error::ChunkInvalid);
            }
            return Ok(Header::Complete(Message::ping()));
        }

        let tag = fields.digit().map_err(|err| match err {
            Error::IncorrectKind { tag } => Error::IncorrectEncoding { tag },
            other => other,
        })?;
        let encoding = Encoding::from_tag(tag).ok_or(Error::IncorrectEncoding { tag })?;
        let mut message = Message::blank(kind, encoding);
        if kind.has_id() {
            message.id = fields.number()?;
        }
        if kind.has_action() {
            message.action = fields.number()?;
        }
        if kind.has_status() {
            message.status = fields.number()?;
        }

        let rest = fields.rest();
        if !encoding.has_payload() {
            return match rest {
                Some(_) => Err(Error::ChunkInvalid),
                None => Ok(Header::Complete(message)),
            };
        }
        match rest {
            None => Ok(Header::AwaitPayload(message)),
            Some("") => Err(Error::ChunkInvalid),
            Some(payload) => {
                let payload = Payload::Text(payload.to_owned());
                let max = self.context.options().max_payload_size;
                if payload.byte_len() > max {
                    return Err(Error::PayloadTooLarge {
                        size: payload.byte_len(),
                        max,
                    });
                }
                message.payload = Some(payload);
                Ok(Header::Complete(message))
            }
        }
    }

    fn abort(&mut self, err: Error) -> Error {
        debug!(error = %err, "text parser failed");
        self.parsing = None;
        self.error = Some(err.clone());
        err
    }

    /// Serialize a message
    ///
    /// # Errors
    ///
    /// Returns an error if the message breaks the envelope invariants or its
    /// payload exceeds the configured limit.
    pub fn serialize(&self, message: &Message) -> Result<TextFrame> {
        message.validate()?;
        if message.kind == Kind::Ping {
            return Ok(TextFrame::Line(PING_TEXT.to_owned()));
        }
        if let Some(payload) = message.payload() {
            let max = self.context.options().max_payload_size;
            let size = self.payload_size(payload);
            if size > max {
                return Err(Error::PayloadTooLarge { size, max });
            }
        }

        let mut fields = vec![
            message.kind.tag().to_string(),
            message.encoding.tag().to_string(),
        ];
        match message.kind {
            Kind::Request => {
                fields.push(message.id.to_string());
                fields.push(message.action.to_string());
            }
            Kind::Notify => fields.push(message.action.to_string()),
            Kind::Response => {
                fields.push(message.id.to_string());
                fields.push(message.status.to_string());
            }
            Kind::Ping => {}
        }

        match message.payload() {
            Some(Payload::Binary(bytes)) => Ok(TextFrame::Split {
                header: fields.join("|"),
                payload: bytes.clone(),
            }),
            Some(Payload::Text(text)) => {
                fields.push(text.clone());
                Ok(TextFrame::Line(fields.join("|")))
            }
            None => Ok(TextFrame::Line(fields.join("|"))),
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Context for TextCodec {
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
        false
    }

    fn reset(&mut self) {
        self.parsing = None;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MessageParams, Status};

    const HELLO: &str = r#"["hello","world"]"#;

    fn line(frame: TextFrame) -> String {
        match frame {
            TextFrame::Line(line) => line,
            TextFrame::Split { .. } => panic!("expected a single line"),
        }
    }

    #[test]
    fn test_ping() {
        let mut codec = TextCodec::new();
        let ping = codec.build(MessageParams::default());
        assert_eq!(line(codec.serialize(&ping).unwrap()), "0");
        assert_eq!(codec.parse("0").unwrap(), Some(ping));
    }

    #[test]
    fn test_ping_with_extra_field() {
        let mut codec = TextCodec::new();
        assert_eq!(codec.parse("0|1"), Err(Error::ChunkInvalid));
    }

    #[test]
    fn test_scenarios() {
        let mut codec = TextCodec::new();
        let cases = [
            (MessageParams::request(0x1234_5678), "1|0|0|305419896"),
            (
                MessageParams::request(0x1234_5678)
                    .encoding(Encoding::Json)
                    .payload(HELLO),
                r#"1|2|1|305419896|["hello","world"]"#,
            ),
            (MessageParams::notify(0x1234_5678), "2|0|305419896"),
            (
                MessageParams::notify(0x1234_5678)
                    .encoding(Encoding::Json)
                    .payload(HELLO),
                r#"2|2|305419896|["hello","world"]"#,
            ),
            (
                MessageParams::response(0x1234, Status::BadGateway),
                "3|0|4660|50",
            ),
            (
                MessageParams::response(0x1234, Status::BadGateway)
                    .encoding(Encoding::Json)
                    .payload(HELLO),
                r#"3|2|4660|50|["hello","world"]"#,
            ),
        ];
        for (params, expected) in cases {
            let msg = codec.build(params);
            assert_eq!(msg.payload_size(), 0);
            assert_eq!(line(codec.serialize(&msg).unwrap()), expected);
            assert_eq!(codec.parse(expected).unwrap(), Some(msg));
            assert!(!codec.is_error());
        }
    }

    #[test]
    fn test_payload_may_contain_separator() {
        let mut codec = TextCodec::new();
        let msg = codec.build(MessageParams::notify(3).encoding(Encoding::Raw).payload("a|b||c"));
        let text = line(codec.serialize(&msg).unwrap());
        assert_eq!(text, "2|5|3|a|b||c");
        assert_eq!(codec.parse(text).unwrap(), Some(msg));
    }

    #[test]
    fn test_split_payload() {
        let mut codec = TextCodec::new();
        let payload = Bytes::from_static(&[0xFF, 0x00, 0x7C]);
        let msg = codec.build(
            MessageParams::response(9, Status::Ok)
                .encoding(Encoding::MessagePack)
                .payload(payload.clone()),
        );
        let frame = codec.serialize(&msg).unwrap();
        assert_eq!(frame.header(), "3|3|9|0");

        let mut chunks = frame.into_chunks().into_iter();
        assert_eq!(codec.parse(chunks.next().unwrap()).unwrap(), None);
        assert!(codec.is_parsing());
        assert_eq!(codec.parse(chunks.next().unwrap()).unwrap(), Some(msg));
        assert!(!codec.is_parsing());
    }

    #[test]
    fn test_split_payload_as_text_chunk() {
        let mut codec = TextCodec::new();
        assert_eq!(codec.parse("2|2|1").unwrap(), None);
        let msg = codec.parse("{\"a\":1}").unwrap().unwrap();
        assert_eq!(msg.action(), 1);
        assert_eq!(msg.payload().and_then(Payload::as_text), Some("{\"a\":1}"));
    }

    #[test]
    fn test_binary_header_is_mangled() {
        let mut codec = TextCodec::new();
        assert_eq!(codec.parse(vec![0x40u8, 0, 0]), Err(Error::ChunkMangled));
    }

    #[test]
    fn test_empty_chunk() {
        let mut codec = TextCodec::new();
        assert_eq!(codec.parse(""), Err(Error::ChunkEmpty));

        let mut codec = TextCodec::new();
        assert_eq!(codec.parse("2|5|1").unwrap(), None);
        assert_eq!(codec.parse(Bytes::new()), Err(Error::ChunkEmpty));
    }

    #[test]
    fn test_malformed_headers() {
        let cases = [
            ("4|0|1", Error::IncorrectKind { tag: 4 }),
            ("x", Error::IncorrectKind { tag: b'x'.wrapping_sub(b'0') }),
            ("1", Error::ChunkInvalid),
            ("1|0", Error::ChunkInvalid),
            ("1|0|7", Error::ChunkInvalid),
            ("1|0|7|abc", Error::ChunkInvalid),
            ("1|0|70000|1", Error::ChunkInvalid),
            ("2|0|1|payload", Error::ChunkInvalid),
            ("2|2|1|", Error::ChunkInvalid),
            ("0|", Error::ChunkInvalid),
            ("1|0|1|1|", Error::ChunkInvalid),
            ("3|0|1|200|", Error::ChunkInvalid),
            ("12|0|1|1", Error::ChunkInvalid),
            ("1|22|1|1", Error::ChunkInvalid),
            ("1|x|1|1", Error::IncorrectEncoding { tag: b'x'.wrapping_sub(b'0') }),
            ("2|9|1", Error::IncorrectEncoding { tag: 9 }),
            ("3|0|1|300", Error::ChunkInvalid),
            ("|0|1", Error::ChunkInvalid),
        ];
        for (header, expected) in cases {
            let mut codec = TextCodec::new();
            assert_eq!(codec.parse(header), Err(expected.clone()), "{header}");
            assert_eq!(codec.error(), Some(&expected));
        }
    }

    #[test]
    fn test_error_latches() {
        let mut codec = TextCodec::new();
        assert!(codec.parse("9").is_err());
        assert_eq!(codec.parse("0"), Err(Error::IncorrectKind { tag: 9 }));
        codec.reset();
        assert_eq!(codec.parse("0").unwrap(), Some(Message::ping()));
    }

    #[test]
    fn test_request_ids_increment() {
        let mut codec = TextCodec::new();
        let first = codec.build(MessageParams::request(1));
        let second = codec.build(MessageParams::request(1));
        let notify = codec.build(MessageParams::notify(1).id(77));
        assert_eq!((first.id(), second.id(), notify.id()), (0, 1, 0));
        codec.reset();
        assert_eq!(codec.build(MessageParams::request(1)).id(), 2);
    }

    #[test]
    fn test_serialize_over_limit() {
        let mut codec = TextCodec::with_options(ContextOptions::new().with_max_payload_size(2));
        let msg = codec.build(MessageParams::notify(1).encoding(Encoding::Json).payload("[1]"));
        assert!(matches!(
            codec.serialize(&msg),
            Err(Error::PayloadTooLarge { size: 3, max: 2 })
        ));
    }
}
