//! STMP kinds, encodings, status codes and flag-byte layout

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Bit offset of the kind field inside the flag byte
pub const KIND_OFFSET: u8 = 6;
/// Bit offset of the encoding field inside the flag byte
pub const ENCODING_OFFSET: u8 = 3;
/// Mask selecting the kind bits of the flag byte
pub const KIND_MASK: u8 = 0b1100_0000;
/// Mask selecting the encoding bits of the flag byte
pub const ENCODING_MASK: u8 = 0b0011_1000;
/// Mask selecting the reserved bits of the flag byte
pub const RESERVED_MASK: u8 = 0b0000_0111;

/// Message role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Kind {
    /// Fire-and-forget keep-alive
    #[default]
    Ping = 0b0000_0000,
    /// Correlated request
    Request = 0b0100_0000,
    /// One-way notification
    Notify = 0b1000_0000,
    /// Correlated response
    Response = 0b1100_0000,
}

impl Kind {
    /// Decode from the kind bits of a flag byte (other bits are ignored)
    #[must_use]
    pub const fn from_flag(flag: u8) -> Self {
        match flag & KIND_MASK {
            0b0000_0000 => Self::Ping,
            0b0100_0000 => Self::Request,
            0b1000_0000 => Self::Notify,
            _ => Self::Response,
        }
    }

    /// Decode from the small decimal tag used by the text profile
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Ping),
            1 => Some(Self::Request),
            2 => Some(Self::Notify),
            3 => Some(Self::Response),
            _ => None,
        }
    }

    /// Flag-byte bits
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Small decimal tag (flag bits shifted down)
    #[must_use]
    pub const fn tag(self) -> u8 {
        self.as_u8() >> KIND_OFFSET
    }

    /// Whether messages of this kind carry an id
    #[must_use]
    pub const fn has_id(self) -> bool {
        matches!(self, Self::Request | Self::Response)
    }

    /// Whether messages of this kind carry an action
    #[must_use]
    pub const fn has_action(self) -> bool {
        matches!(self, Self::Request | Self::Notify)
    }

    /// Whether messages of this kind carry a status
    #[must_use]
    pub const fn has_status(self) -> bool {
        matches!(self, Self::Response)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ping => "Ping",
            Self::Request => "Request",
            Self::Notify => "Notify",
            Self::Response => "Response",
        };
        write!(f, "{name}")
    }
}

/// Payload format tag
///
/// The codecs never look inside the payload; this only labels it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Encoding {
    /// No payload
    #[default]
    None = 0b00_0000,
    /// Protocol Buffers
    Protobuf = 0b00_1000,
    /// JSON
    Json = 0b01_0000,
    /// `MessagePack`
    MessagePack = 0b01_1000,
    /// BSON
    Bson = 0b10_0000,
    /// Application-defined bytes
    Raw = 0b10_1000,
}

impl Encoding {
    /// Decode from the encoding bits of a flag byte
    pub const fn from_flag(flag: u8) -> Result<Self> {
        let tag = (flag & ENCODING_MASK) >> ENCODING_OFFSET;
        match Self::from_tag(tag) {
            Some(encoding) => Ok(encoding),
            None => Err(Error::IncorrectEncoding { tag }),
        }
    }

    /// Decode from the small decimal tag used by the text profile
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::Protobuf),
            2 => Some(Self::Json),
            3 => Some(Self::MessagePack),
            4 => Some(Self::Bson),
            5 => Some(Self::Raw),
            _ => None,
        }
    }

    /// Flag-byte bits
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Small decimal tag (flag bits shifted down)
    #[must_use]
    pub const fn tag(self) -> u8 {
        self.as_u8() >> ENCODING_OFFSET
    }

    /// Whether a payload accompanies this encoding
    #[must_use]
    pub const fn has_payload(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Protobuf => "Protobuf",
            Self::Json => "Json",
            Self::MessagePack => "MessagePack",
            Self::Bson => "Bson",
            Self::Raw => "Raw",
        };
        write!(f, "{name}")
    }
}

/// Pack kind and encoding into a flag byte
#[must_use]
pub const fn flag(kind: Kind, encoding: Encoding) -> u8 {
    kind.as_u8() | encoding.as_u8()
}

/// Split a flag byte into kind and encoding
///
/// The only valid flag with kind bits `00` is the Ping byte `0x00`; anything
/// else below `0x40` is taken to be stray text (ASCII digits land there).
pub fn unpack_flag(flag: u8) -> Result<(Kind, Encoding)> {
    if flag != 0 && flag < Kind::Request.as_u8() {
        return Err(Error::ChunkMangled);
    }
    if flag & RESERVED_MASK != 0 {
        return Err(Error::ChunkMangled);
    }
    Ok((Kind::from_flag(flag), Encoding::from_flag(flag)?))
}

/// Well-known response status codes
///
/// Grouped like HTTP families: `0x0_` success, `0x1_` redirect,
/// `0x2_` client error, `0x3_` server error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Status {
    #[default]
    Ok = 0x00,

    MovedPermanently = 0x10,
    Found = 0x11,
    NotModified = 0x12,

    BadRequest = 0x20,
    Unauthorized = 0x21,
    PaymentRequired = 0x22,
    Forbidden = 0x23,
    NotFound = 0x24,
    RequestTimeout = 0x25,
    RequestEntityTooLarge = 0x26,
    TooManyRequests = 0x27,

    InternalServerError = 0x30,
    NotImplemented = 0x31,
    BadGateway = 0x32,
    ServiceUnavailable = 0x33,
    GatewayTimeout = 0x34,
    VersionNotSupported = 0x35,
}

/// Status code family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFamily {
    /// `0x00..=0x0F`
    Success,
    /// `0x10..=0x1F`
    Redirect,
    /// `0x20..=0x2F`
    ClientError,
    /// `0x30..=0x3F`
    ServerError,
    /// Anything else
    Unknown,
}

impl StatusFamily {
    /// Classify a raw status code
    #[must_use]
    pub const fn of(code: u8) -> Self {
        match code >> 4 {
            0 => Self::Success,
            1 => Self::Redirect,
            2 => Self::ClientError,
            3 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

impl Status {
    /// Convert from byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Ok),
            0x10 => Some(Self::MovedPermanently),
            0x11 => Some(Self::Found),
            0x12 => Some(Self::NotModified),
            0x20 => Some(Self::BadRequest),
            0x21 => Some(Self::Unauthorized),
            0x22 => Some(Self::PaymentRequired),
            0x23 => Some(Self::Forbidden),
            0x24 => Some(Self::NotFound),
            0x25 => Some(Self::RequestTimeout),
            0x26 => Some(Self::RequestEntityTooLarge),
            0x27 => Some(Self::TooManyRequests),
            0x30 => Some(Self::InternalServerError),
            0x31 => Some(Self::NotImplemented),
            0x32 => Some(Self::BadGateway),
            0x33 => Some(Self::ServiceUnavailable),
            0x34 => Some(Self::GatewayTimeout),
            0x35 => Some(Self::VersionNotSupported),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Family this code belongs to
    #[must_use]
    pub const fn family(self) -> StatusFamily {
        StatusFamily::of(self.as_u8())
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status.as_u8()
    }
}

/// Wire profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Fixed-width big-endian framing
    Binary,
    /// Pipe-delimited ASCII framing
    Text,
}

impl Profile {
    /// Guess the profile of a stream from its first byte
    #[must_use]
    pub const fn detect(first: u8) -> Option<Self> {
        match first {
            b'0'..=b'3' => Some(Self::Text),
            0x00 | 0x40..=0xFF => Some(Self::Binary),
            _ => None,
        }
    }
}
