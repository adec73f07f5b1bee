//! Presentation layer with image view adapters.

/// Reusable widgets.
pub mod widgets;

pub use widgets::{AsyncImage, RemoteImageView, Rendered};
