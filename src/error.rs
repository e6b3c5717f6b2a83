use thiserror::Error;

/// Errors returned by the palette extraction entry points.
#[derive(Debug, Error)]
pub enum PaletteError {
    /// The pixel buffer does not describe a usable image.
    #[error("invalid pixel buffer: {reason}")]
    InvalidInput { reason: String },

    #[error("unknown quality `{0}` (expected lowest, low, high or highest)")]
    UnknownQuality(String),

    #[error("unable to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

impl PaletteError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        PaletteError::InvalidInput { reason: reason.into() }
    }
}
