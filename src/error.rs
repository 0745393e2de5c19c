//! Error types for encoding and rendering.

use thiserror::Error;

use crate::qrcode::{DataTooLong, QrSegmentMode};

/// Result type alias for qrstamp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the encoder, the renderer and the helpers around them.
///
/// Every operation is deterministic, so retrying with the same input never helps.
#[derive(Error, Debug)]
pub enum Error {
    /// The data does not fit in any allowed version at the requested level.
    #[error(transparent)]
    DataTooLong(#[from] DataTooLong),

    /// A styling value is out of range (zero scale, zero border width, oversized radius...).
    #[error("Invalid style parameter: {0}")]
    InvalidStyleParameter(String),

    /// A character cannot be represented in the requested segment mode.
    #[error("Character {ch:?} cannot be encoded in {mode:?} mode")]
    UnsupportedCharacter { ch: char, mode: QrSegmentMode },

    /// The minimum version is greater than the maximum version.
    #[error("Invalid version range: {min} > {max}")]
    InvalidVersionRange { min: u8, max: u8 },

    /// An ECI assignment value of 1,000,000 or more.
    #[error("ECI assignment value out of range: {0}")]
    EciOutOfRange(u32),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn style(msg: impl Into<String>) -> Self {
        Error::InvalidStyleParameter(msg.into())
    }
}
