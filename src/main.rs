use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use coverart::domain::CoverState;
use coverart::infrastructure::image::codec;
use coverart::infrastructure::{
    CliArgs, CoverArtConfig, CoverArtLoader, PixbufCache, Placeholders, StorageManager,
};

fn init_logging(config: &CoverArtConfig) -> Result<()> {
    let default_level = LevelFilter::from_level(config.log_level.to_tracing_level());
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

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
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<CoverArtConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    init_logging(&config)?;

    info!(version = coverart::VERSION, "Starting coverart");

    let cache = Arc::new(PixbufCache::new(config.disk_store()));
    let (event_tx, _event_rx) = mpsc::unbounded_channel();
    let loader = CoverArtLoader::with_http(&config.loader_config(), cache.clone(), event_tx)?;

    let state = match &args.url {
        Some(url) => loader.load(args.kind, &args.id, url).await,
        None => loader.load_cached(args.kind, &args.id).await,
    };
    info!(stats = %cache.stats(), "Cover resolved");

    let placeholders = Placeholders::new(config.image_size);
    let bitmap = placeholders.resolve(&state);

    if let Some(output) = &args.output {
        std::fs::write(output, codec::encode_png(bitmap)?)?;
        info!(path = %output.display(), "Wrote cover");
    }

    match state {
        CoverState::Ready(cover) => {
            println!("{} {}: {}x{}", args.kind, args.id, cover.width(), cover.height());
            Ok(())
        }
        CoverState::Loading | CoverState::Error => {
            warn!(kind = %args.kind, id = %args.id, "Cover unavailable");
            bail!("cover {} {} is unavailable", args.kind, args.id)
        }
    }
}
