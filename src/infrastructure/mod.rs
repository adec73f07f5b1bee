//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// UI-context executors.
pub mod dispatch;
/// Image handling (caching, fetching, decoding).
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigLoader, LoadedConfig, LogLevel};
pub use dispatch::{ImmediateExecutor, UiEventLoop, UiQueue};
pub use self::image::{
    CacheStats, FetcherConfig, ImageCrateDecoder, MemoryImageCache, NetworkFetcher,
};
