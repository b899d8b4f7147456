//! Message construction shared by both wire profiles

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Encoding, Kind, MAX_PAYLOAD_SIZE, Message, MessageParams, Payload};

/// Codec configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContextOptions {
    /// Largest payload a codec will serialize or accept from the wire
    pub max_payload_size: usize,
}

impl ContextOptions {
    /// Default options
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }

    /// Set the payload size limit
    #[must_use]
    pub const fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = max;
        self
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-codec state behind [`Context`]: options and the request id counter.
#[derive(Debug, Clone, Default)]
pub struct ContextState {
    options: ContextOptions,
    next_id: u16,
}

impl ContextState {
    /// Fresh state with the counter at 0
    #[must_use]
    pub const fn new(options: ContextOptions) -> Self {
        Self {
            options,
            next_id: 0,
        }
    }

    /// Configured options
    #[must_use]
    pub const fn options(&self) -> &ContextOptions {
        &self.options
    }

    fn take_id(&mut self) -> u16 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

/// Builds messages with profile-appropriate defaults
///
/// Implemented by each wire profile's codec, which supplies the payload
/// sizing rule and its own parser reset.
pub trait Context {
    /// Shared state
    fn state(&self) -> &ContextState;

    /// Shared state, mutably
    fn state_mut(&mut self) -> &mut ContextState;

    /// Encoded size of `payload` on this profile
    fn payload_size(&self, payload: &Payload) -> usize;

    /// Whether this profile writes the payload size on the wire
    fn carries_payload_size(&self) -> bool;

    /// Drop all parsing state; the id counter is kept
    fn reset(&mut self);

    /// Payload as this profile's parser will hand it back
    ///
    /// Applied by [`build`](Context::build) so that a built message compares
    /// equal to its parsed copy.
    fn wire_payload(&self, payload: Payload) -> Payload {
        payload
    }

    /// Configured options
    fn options(&self) -> &ContextOptions {
        self.state().options()
    }

    /// Next request id, wrapping at 16 bits
    fn next_id(&mut self) -> u16 {
        self.state_mut().take_id()
    }

    /// Build a message, resolving defaults
    fn build(&mut self, params: MessageParams) -> Message {
        let MessageParams {
            kind,
            encoding,
            id,
            action,
            status,
            payload,
            payload_size,
        } = params;

        let id = match id {
            _ if !kind.has_id() => 0,
            Some(id) => id,
            None if kind == Kind::Request => self.next_id(),
            None => 0,
        };
        let payload_size =
            payload_size.unwrap_or_else(|| payload.as_ref().map_or(0, |p| self.payload_size(p)));
        let empty = payload_size == 0
            || payload.is_none()
            || encoding == Encoding::None
            || kind == Kind::Ping;

        Message {
            kind,
            encoding: if empty { Encoding::None } else { encoding },
            id,
            action: if kind.has_action() { action } else { 0 },
            status: if kind.has_status() { status } else { 0 },
            payload_size: if self.carries_payload_size() && !empty {
                payload_size
            } else {
                0
            },
            payload: if empty {
                None
            } else {
                payload.map(|p| self.wire_payload(p))
            },
            ..Message::default()
        }
    }
}
