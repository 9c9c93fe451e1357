use thiserror::Error;

/// Errors produced while turning a framebuffer into an OPC packet.
///
/// These indicate a mismatch between the layout and the framebuffer handed to
/// the client, not a transient condition; retrying the same frame fails again.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// A registered LED points past the end of the pixel buffer.
    #[error("LED {index} maps to offset {offset} but the pixel buffer holds {len} pixels")]
    OffsetOutOfBounds {
        index: usize,
        offset: usize,
        len: usize,
    },

    /// The payload would not fit the 16-bit OPC length field.
    #[error("{count} LEDs exceed the OPC payload limit of {max} LEDs")]
    TooManyLeds { count: usize, max: usize },
}

/// Errors raised while building a client or loading its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("framebuffer dimensions must be non-zero (got {width}x{height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid server address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to parse layout: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
