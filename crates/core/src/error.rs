// crates/core/src/error.rs
use thiserror::Error;

/// Errors raised while decoding, enhancing or encoding an image.
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("Image payload is empty")]
    EmptyInput,

    #[error("Unrecognized image format")]
    UnknownFormat,

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image as {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("Image has zero width or height")]
    ZeroDimension,

    #[error("Enhancement failed: {0}")]
    Pipeline(String),
}

impl EnhanceError {
    /// True when the error stems from the caller's bytes rather than the filter.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::UnknownFormat | Self::Decode(_) | Self::ZeroDimension
        )
    }
}
