//! Batch resolution DTOs.

use crate::domain::entities::SharedImage;
use crate::domain::errors::FetchError;

/// Where a resolved image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Already in the memory cache when requested.
    MemoryCache,
    /// Fetched (or joined an in-flight fetch).
    Fetched,
}

impl std::fmt::Display for ImageOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory"),
            Self::Fetched => write!(f, "network"),
        }
    }
}

/// Outcome of resolving one locator.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    /// Locator as given.
    pub locator: String,
    /// Round in which it was resolved, starting at 1.
    pub round: usize,
    /// Origin, when the locator was valid.
    pub origin: Option<ImageOrigin>,
    /// Resolved image or terminal error.
    pub result: Result<SharedImage, FetchError>,
}

impl ResolveOutcome {
    /// Returns true if the locator resolved to an image.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns a one-line report.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.result {
            Ok(image) => format!(
                "ok  {} {}x{} ({})",
                self.locator,
                image.width(),
                image.height(),
                self.origin.unwrap_or(ImageOrigin::Fetched)
            ),
            Err(e) => format!("err {} {e}", self.locator),
        }
    }
}
