//! STMP error types

use thiserror::Error;

/// STMP codec errors
///
/// Every parse error is fatal to the codec instance that produced it: the
/// codec latches the error and returns a clone of it on each later call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A zero-length chunk was supplied
    #[error("chunk empty")]
    ChunkEmpty,

    /// A chunk arrived in the wrong representation for the current stage
    #[error("chunk mangled")]
    ChunkMangled,

    /// A required field is missing or a forbidden field is present
    #[error("chunk invalid")]
    ChunkInvalid,

    /// Kind tag does not map to any kind
    #[error("incorrect kind: {tag:#x}")]
    IncorrectKind {
        /// Offending tag
        tag: u8,
    },

    /// Encoding tag does not map to any encoding
    #[error("incorrect encoding: {tag:#x}")]
    IncorrectEncoding {
        /// Offending tag
        tag: u8,
    },

    /// Parser reached a stage that is inconsistent with the message in progress
    #[error("unexpected stage: {stage}")]
    UnexpectedStage {
        /// Name of the stage
        stage: &'static str,
    },

    /// Feature not supported by this codec
    #[error("not implemented: {feature}")]
    NotImplemented {
        /// Unsupported feature
        feature: &'static str,
    },

    /// Payload too large
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Message cannot be serialized
    #[error("invalid message: {reason}")]
    InvalidMessage {
        /// What is wrong with it
        reason: &'static str,
    },

    /// Byte sequence is not valid UTF-8
    #[error("malformed UTF-8 at byte {offset}")]
    MalformedUtf8 {
        /// Offset of the offending lead byte
        offset: usize,
    },

    /// Buffer too small
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
