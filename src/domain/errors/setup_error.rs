//! Coordinator construction error types.

use thiserror::Error;

/// Errors raised while wiring up a fetch coordinator.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SetupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("no tokio runtime available; build inside a runtime or pass a handle")]
    NoRuntime,

    #[error("failed to start worker runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("shared coordinator unavailable: {0}")]
    Shared(String),
}
