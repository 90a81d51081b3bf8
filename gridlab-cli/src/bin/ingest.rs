//! Fetch the day-ahead price, load forecast and wind/solar forecast for the
//! configured region and write the hourly training table.
//!
//! Takes no arguments. Settings come from `gridlab.toml` when present, the
//! API key from `ENTSOE_API_KEY` (environment or `.env`).

use anyhow::Result;
use clap::Parser;
use gridlab_core::data::EntsoeClient;
use gridlab_runner::{run_ingest, Credentials, PipelineConfig};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "ingest",
    version,
    about = "GridLab ingest: build the hourly day-ahead price training table"
)]
struct Cli {}

fn main() -> Result<()> {
    Cli::parse();
    gridlab_cli::init_tracing();

    let config = PipelineConfig::load()?;
    let credentials = Credentials::from_env()?;
    let client = EntsoeClient::new(credentials.api_key(), config.http_timeout)?;
    info!(
        region = %config.region,
        start = %config.start,
        end = %config.end,
        output = %config.table_path().display(),
        "starting ingest"
    );

    match run_ingest(&client, &config) {
        Some(summary) => {
            let (rows, cols) = summary.shape();
            println!(
                "Wrote {} with shape ({rows}, {cols})",
                summary.path.display()
            );
            if summary.dropped > 0 {
                println!("Dropped {} rows with missing price_da", summary.dropped);
            }
            for p in &summary.partial {
                println!(
                    "Partial coverage: {} in {} hours ({}s samples)",
                    p.column, p.hours, p.resolution_secs
                );
            }
            println!("BLAKE3: {}", summary.digest);
        }
        None => println!("Ingestion failed; no table written (see log for details)"),
    }

    Ok(())
}
