//! Use case implementations.

mod resolve_batch_use_case;

pub use resolve_batch_use_case::ResolveBatchUseCase;
