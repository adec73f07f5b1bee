mod image_decoder_port;
mod image_fetcher_port;
mod resource_cache_port;
mod ui_executor_port;

pub use image_decoder_port::ImageDecoder;
pub use image_fetcher_port::ImageFetcher;
pub use resource_cache_port::ResourceCache;
pub use ui_executor_port::{UiExecutor, UiJob};
