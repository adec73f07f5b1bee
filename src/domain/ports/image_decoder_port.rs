//! Port definition for turning payloads into images.

use crate::domain::errors::DecodeError;

/// Port for decoding raw bytes into a displayable image.
///
/// Decoding is CPU-bound; callers run it on a blocking worker.
#[cfg_attr(test, mockall::automock)]
pub trait ImageDecoder: Send + Sync {
    /// Decodes `bytes` into an image.
    fn decode(&self, bytes: &[u8]) -> Result<image::DynamicImage, DecodeError>;
}
