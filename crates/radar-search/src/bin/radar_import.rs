//! Import a GeoJSON export of public toilets into the database.
//!
//! Usage: `radar-import <file.geojson> [--city NAME] [--country CODE]`
//!
//! Database settings come from the environment (see `DatabaseConfig`).
//! Environment variables:
//!   LOG_FORMAT  - "json" or "text" (default: "text")
//!   RUST_LOG    - standard env filter (default: "radar_search=info,radar_db=info")

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radar_db::{Database, DatabaseConfig};
use radar_search::{CountryCode, ImportDefaults, ToiletService};

#[derive(Parser, Debug)]
#[command(name = "radar-import")]
#[command(version, about = "Import a GeoJSON FeatureCollection of toilets")]
struct Cli {
    /// GeoJSON file to import
    path: PathBuf,

    /// City applied to features that carry none
    #[arg(long)]
    city: Option<String>,

    /// Country code (CH, FR, DE, IT, AT) applied to features that carry none
    #[arg(long)]
    country: Option<CountryCode>,
}

impl Cli {
    fn defaults(&self) -> ImportDefaults {
        ImportDefaults {
            city: self.city.clone(),
            country_code: self.country,
        }
    }
}

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "radar_search=info,radar_db=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing();

    let input = tokio::fs::read_to_string(&cli.path)
        .await
        .with_context(|| format!("Failed to read {}", cli.path.display()))?;

    let config = DatabaseConfig::from_env()?;
    let db = Database::from_config(&config).await?;
    db.migrate().await?;

    let service = ToiletService::new(db.toilets.clone());
    let report = service.import_geojson(&input, &cli.defaults()).await?;

    info!(
        path = %cli.path.display(),
        inserted = report.inserted,
        skipped = report.skipped,
        total = service.count().await?,
        "Import finished"
    );

    db.close().await;
    Ok(())
}
