use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::env;
use tracing_subscriber::EnvFilter;
use village_signs::core::web_photo::WebPhotoService;
use village_signs::services::gazetteer::OverpassClient;
use village_signs::{BuildConfig, SiteBuilder};

#[derive(Parser, Debug)]
#[command(
    name = "village-signs",
    version,
    about = "Match geotagged photos of village signs to settlements and build the site data"
)]
struct Cli {
    /// Re-fetch the settlement list instead of using the cached copy
    #[arg(long)]
    refresh_settlements: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let root = env::current_dir().context("Failed to determine the project directory")?;
    let config = BuildConfig::load(&root)
        .with_context(|| format!("Failed to load configuration from {}", root.display()))?;

    let fetcher = OverpassClient::new(&config.overpass_url, &config.area, config.fetch_timeout())
        .context("Failed to create HTTP client")?;
    let writer = WebPhotoService::new(config.max_photo_px, config.jpeg_quality);

    let summary = SiteBuilder::new(&config, fetcher, writer)
        .build(cli.refresh_settlements, Local::now().date_naive())
        .context("Build failed")?;

    println!(
        "\nDone: {} visited / {} total ({:.1}%)",
        summary.visited,
        summary.total,
        summary.percent_visited()
    );
    println!("  {}", summary.data_path.display());
    println!("  {}", summary.csv_path.display());
    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
