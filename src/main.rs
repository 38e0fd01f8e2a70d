mod app;
mod color;
mod ui;

use std::path::PathBuf;

use anyhow::anyhow;
use app::DashboardApp;
use clap::Parser;
use eframe::egui;
use transformer_dashboard::config::DashboardConfig;

/// Transformer test analytics dashboard.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML config file (falls back to $TRANSFORMER_DASHBOARD_CONFIG, then ./dashboard.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Open this file instead of generating sample data
    #[arg(long)]
    data: Option<PathBuf>,

    /// Number of synthetic records
    #[arg(long)]
    records: Option<usize>,

    /// Seed of the synthetic data
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(records) = cli.records {
        config.data.records = records;
    }
    if let Some(seed) = cli.seed {
        config.data.seed = seed;
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Transformer Test Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(config, cli.data)))),
    )
    .map_err(|e| anyhow!("running dashboard window: {e}"))
}
