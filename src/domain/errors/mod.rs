//! Domain error types.

mod fetch_error;
mod setup_error;

pub use fetch_error::{DecodeError, FetchError, TransportError};
pub use setup_error::SetupError;
