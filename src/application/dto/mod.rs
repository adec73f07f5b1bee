//! Data transfer objects.

mod resolve_dto;

pub use resolve_dto::{ImageOrigin, ResolveOutcome};
