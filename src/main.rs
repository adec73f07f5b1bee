use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pixfetch::application::{FetchCoordinator, ResolveBatchUseCase};
use pixfetch::infrastructure::{
    AppConfig, CliArgs, ConfigLoader, ImageCrateDecoder, ImmediateExecutor, LoadedConfig,
    MemoryImageCache, NetworkFetcher,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<(AppConfig, LoadedConfig)> {
    let loaded = ConfigLoader::locate(args.config.as_deref())?.load()?;
    let mut config = loaded.config.clone();
    config.merge_with_args(args);
    Ok((config, loaded))
}

fn build_coordinator(config: &AppConfig) -> Result<(FetchCoordinator, Arc<MemoryImageCache>)> {
    let cache = Arc::new(MemoryImageCache::new(config.cache.capacity));
    let fetcher = Arc::new(NetworkFetcher::new(config.fetcher_config())?);
    let decoder = match config.decode.max_dimension {
        Some(max) => ImageCrateDecoder::new().with_max_dimension(max),
        None => ImageCrateDecoder::new(),
    };

    let coordinator = FetchCoordinator::builder()
        .cache(cache.clone())
        .fetcher(fetcher)
        .decoder(Arc::new(decoder))
        .executor(Arc::new(ImmediateExecutor))
        .build()?;

    Ok((coordinator, cache))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let (config, loaded) = load_config(&args)?;
    init_logging(&config)?;

    info!(version = pixfetch::VERSION, "Starting pixfetch");
    loaded.report();
    if loaded.is_fallback() {
        eprintln!(
            "warning: {} is malformed, using default settings",
            loaded.path.display()
        );
    }

    let (coordinator, cache) = build_coordinator(&config)?;
    let rounds = usize::try_from(args.repeat)?;

    let outcomes = ResolveBatchUseCase::new(coordinator)
        .execute(&args.locators, rounds)
        .await;

    for outcome in &outcomes {
        println!("{}", outcome.summary());
    }
    println!("{}", cache.stats());

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        bail!("{failed} of {} resolutions failed", outcomes.len());
    }

    Ok(())
}
