//! Write a synthetic transformer test table to disk.
//!
//! The format follows the output extension: `.csv`, `.xlsx` or `.parquet`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use transformer_dashboard::config::DashboardConfig;
use transformer_dashboard::data::{export, generator};

#[derive(Parser, Debug)]
#[command(about = "Generate a sample transformer test dataset")]
struct Args {
    /// Output file; the extension picks the format
    #[arg(default_value = "sample_data.csv")]
    output: PathBuf,

    /// TOML config supplying defaults and thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    records: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Last day of the generated window (YYYY-MM-DD), defaults to today
    #[arg(long)]
    anchor: Option<NaiveDate>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = DashboardConfig::load(args.config.as_deref())?;
    let records = args.records.unwrap_or(config.data.records);
    let seed = args.seed.unwrap_or(config.data.seed);
    let anchor = args.anchor.unwrap_or_else(|| config.data.anchor());

    let table = generator::generate(records, seed, anchor, config.thresholds)?;

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let bytes = match ext.as_str() {
        "csv" => export::to_csv_bytes(&table)?,
        "xlsx" => export::to_xlsx_bytes(&table, &config.export.sheet_name)?,
        "parquet" | "pq" => export::to_parquet_bytes(&table)?,
        other => bail!("Unsupported output extension: .{other}"),
    };
    std::fs::write(&args.output, bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "Wrote {} test records (seed {seed}, window ending {anchor}) to {}",
        table.len(),
        args.output.display()
    );
    Ok(())
}
