//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, Delivery, LoadingState, Locator, SharedImage};
pub use errors::{FetchError, TransportError};
pub use ports::{ImageDecoder, ImageFetcher, ResourceCache, UiExecutor};
