//! Image decoding backed by the `image` crate.

use tracing::trace;

use crate::domain::errors::DecodeError;
use crate::domain::ports::ImageDecoder;

/// Decodes PNG, JPEG and WebP payloads.
#[derive(Debug, Clone, Default)]
pub struct ImageCrateDecoder {
    max_dimension: Option<u32>,
}

impl ImageCrateDecoder {
    /// Creates a decoder without a size guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_dimension: None,
        }
    }

    /// Rejects images whose width or height exceeds `max`.
    #[must_use]
    pub const fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = Some(max);
        self
    }
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<image::DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError("empty payload".to_string()));
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| DecodeError(format!("Failed to decode image: {e}")))?;

        if let Some(max) = self.max_dimension
            && (img.width() > max || img.height() > max)
        {
            return Err(DecodeError(format!(
                "image is {}x{}, larger than the {max}px limit",
                img.width(),
                img.height()
            )));
        }

        trace!(width = img.width(), height = img.height(), "Decoded image");
        Ok(img)
    }
}
