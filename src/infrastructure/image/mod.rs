//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with LRU eviction
//! - Payload fetching for network, file and inline locators
//! - Decoding through the `image` crate

pub mod decoder;
pub mod fetcher;
pub mod memory_cache;

pub use decoder::ImageCrateDecoder;
pub use fetcher::{FetcherConfig, NetworkFetcher, decode_data_url};
pub use memory_cache::{CacheStats, DEFAULT_CACHE_SIZE, MemoryImageCache};
