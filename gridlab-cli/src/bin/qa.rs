//! Run structural checks over the persisted training table and render the
//! price and renewables plots next to it.
//!
//! Takes no arguments. The table location follows `gridlab.toml` when
//! present, otherwise `data/training_data.csv`.

use anyhow::Result;
use clap::Parser;
use gridlab_runner::{run_qa, PipelineConfig};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "qa",
    version,
    about = "GridLab qa: check the training table and plot its signals"
)]
struct Cli {}

fn main() -> Result<()> {
    Cli::parse();
    gridlab_cli::init_tracing();

    let config = PipelineConfig::load()?;
    let table = config.table_path();
    info!(table = %table.display(), "starting qa");

    match run_qa(&table) {
        Some(report) => println!("{report}"),
        None if !table.exists() => {
            println!("Missing input: {} not found, run ingest first", table.display())
        }
        None => println!("QA failed for {} (see log for details)", table.display()),
    }

    Ok(())
}
