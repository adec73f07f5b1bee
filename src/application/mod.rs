//! Application layer with the fetch coordinator, use cases and DTOs.

/// Data transfer objects.
pub mod dto;
/// Coordinating services.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use dto::{ImageOrigin, ResolveOutcome};
pub use services::{FetchCoordinator, FetchCoordinatorBuilder};
pub use use_cases::ResolveBatchUseCase;
