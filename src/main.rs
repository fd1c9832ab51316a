use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;

use hypso_overlap::config::{CatalogMode, RunConfig};
use hypso_overlap::pipeline;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hypso-overlap")]
#[command(version, about = "Find elevation bands shared by carbonate, felsic and mafic stream points")]
struct Cli {
    /// Directory holding one point table per site and rock category
    input_dir: PathBuf,

    /// Directory the GroupNN.csv files are written to
    output_dir: PathBuf,

    /// How tables are paired with sites and rock categories
    #[arg(short, long, value_enum, default_value_t = Mode::Tagged)]
    mode: Mode,

    /// CSV manifest with `file,site,category` columns (implies --mode manifest)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Bound the bands to [0, DOMAIN_MAX) instead of sizing them to the data
    #[arg(long)]
    domain_max: Option<f64>,

    /// Also write GroupNN_hypsometry.csv band tables
    #[arg(long)]
    hypsometry: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Site and category from each file name, e.g. site01_carbonate.csv
    Tagged,
    /// Explicit manifest file
    Manifest,
    /// Sorted position: carbonate, felsic, mafic, carbonate, ...
    Ordinal,
}

impl From<Mode> for CatalogMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Tagged => CatalogMode::Tagged,
            Mode::Manifest => CatalogMode::Manifest,
            Mode::Ordinal => CatalogMode::Ordinal,
        }
    }
}

impl Cli {
    fn into_config(self) -> RunConfig {
        let mode = if self.manifest.is_some() {
            CatalogMode::Manifest
        } else {
            self.mode.into()
        };
        RunConfig {
            input_dir: self.input_dir,
            output_dir: self.output_dir,
            mode,
            manifest: self.manifest,
            domain_max: self.domain_max,
            write_hypsometry: self.hypsometry,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let start = Instant::now();
    let config = cli.into_config();
    info!("Reading tables from {}", config.input_dir.display());

    let reports = pipeline::run(&config, |report| println!("{}", report.diagnostic()))?;

    let written = reports.iter().filter(|r| r.group().is_some()).count();
    info!(
        "{written} of {} sites written to {}",
        reports.len(),
        config.output_dir.display()
    );
    println!("Elapsed: {:.2?}", start.elapsed());
    Ok(())
}
