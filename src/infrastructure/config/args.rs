use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pixfetch",
    version,
    about = "Fetch, decode and cache images from remote or local locators",
    long_about = None
)]
pub struct CliArgs {
    /// Locators to resolve (http, https, file or data URLs).
    #[arg(required = true, value_name = "LOCATOR")]
    pub locators: Vec<String>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", env = "PIXFETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", env = "PIXFETCH_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, env = "PIXFETCH_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Memory cache capacity.
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum concurrent downloads.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Largest accepted image width or height.
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Number of resolve rounds; later rounds are served from memory.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,
}
