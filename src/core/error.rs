//! Error types for catalog loading and packet decoding.

use std::time::Duration;

/// Errors surfaced by the catalog load barrier.
///
/// Cloneable so a single load result can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataLoadError {
    /// `block_till_load` was called before `start_async_load`.
    #[error("catalog load was never started")]
    NotStarted,

    /// The catalog resource could not be read.
    #[error("failed to read catalog from {source_name}: {reason}")]
    Read { source_name: String, reason: String },

    /// The catalog resource is not valid JSON.
    #[error("failed to parse catalog: {0}")]
    Parse(String),

    /// The catalog's top-level value is not an object keyed by room.
    #[error("catalog root must be an object keyed by room signature")]
    NotAnObject,

    /// The load did not finish within the configured bound.
    #[error("catalog load did not finish within {0:?}")]
    TimedOut(Duration),

    /// The loader thread panicked.
    #[error("catalog loader panicked: {0}")]
    Panicked(String),
}

/// Errors raised while decoding an observed inbound packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketDecodeError {
    /// The frame ended in the middle of a field.
    #[error("packet truncated while reading {0}")]
    Truncated(&'static str),

    /// A VarInt ran past its maximum encoded length.
    #[error("varint longer than 5 bytes")]
    VarIntTooLong,
}
