mod app;
mod dataset;
mod engine;
mod util;

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};

use engine::ViewSettings;
use engine::chunks::LayoutMode;
use engine::config::EngineConfig;
use engine::ranking::RankingMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SortArg {
    Total,
    Count,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    Grid,
    Bar,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file with `nodes` and `transactions`.
    #[arg(long, default_value = "dataset.json")]
    dataset: PathBuf,

    /// Engine settings as JSON; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    load_radius: Option<u32>,

    #[arg(long)]
    unload_radius: Option<u32>,

    #[arg(long, value_enum, default_value_t = SortArg::Total)]
    sort: SortArg,

    #[arg(long, value_enum, default_value_t = LayoutArg::Grid)]
    layout: LayoutArg,
}

impl Args {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };

        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(load_radius) = self.load_radius {
            config.load_radius = load_radius;
        }
        if let Some(unload_radius) = self.unload_radius {
            config.unload_radius = unload_radius;
        }

        config.validate().context("rejected engine configuration")?;
        Ok(config)
    }

    fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            ranking: match self.sort {
                SortArg::Total => RankingMode::ByTotalValue,
                SortArg::Count => RankingMode::ByTransactionCount,
            },
            layout: match self.layout {
                LayoutArg::Grid => LayoutMode::Grid,
                LayoutArg::Bar => LayoutMode::Bar,
            },
            ..ViewSettings::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tx_lattice=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = args.engine_config()?;
    let settings = args.view_settings();
    tracing::info!(
        dataset = %args.dataset.display(),
        chunk_size = config.chunk_size,
        load_radius = config.load_radius,
        unload_radius = config.unload_radius,
        "starting viewer"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "tx-lattice",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::TxLatticeApp::new(
                cc,
                args.dataset.clone(),
                config.clone(),
                settings,
            )))
        }),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}
