//! Command line arguments.

use super::app_config::LogLevel;
use crate::domain::entities::CoverKind;
use clap::Parser;
use std::path::PathBuf;

/// Arguments of the `coverart` binary; set values override `config.toml`.
#[derive(Debug, Parser)]
#[command(
    name = "coverart",
    version,
    about = "Fetch, cache and scale playlist and album cover art",
    long_about = None
)]
pub struct CliArgs {
    /// Kind of cover (playlist or album).
    #[arg(short, long)]
    pub kind: CoverKind,

    /// Catalog id of the playlist or album.
    #[arg(short, long)]
    pub id: String,

    /// Remote URL of the cover image.
    #[arg(short, long)]
    pub url: Option<String>,

    /// Where to write the scaled cover as PNG.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Side of the square cover in pixels.
    #[arg(short, long)]
    pub size: Option<u32>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Cover cache directory.
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}
