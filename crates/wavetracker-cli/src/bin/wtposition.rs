//! wtposition - Estimate fish positions along curated traces
//!
//! Usage: wtposition <log> (--grid-folder <dir> | --rows <r> --cols <c>)

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use wavetracker_cli::logfile::load_store;
use wavetracker_cli::output::print_json;
use wavetracker_core::position::track;
use wavetracker_core::{GridGeometry, SignatureUnit, TrackPoint, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "wtposition")]
#[command(about = "Estimate positions of traced fish on the electrode grid", long_about = None)]
struct Args {
    /// Detection log (.wtrk or .json)
    log: PathBuf,

    /// Recording folder holding grid.toml
    #[arg(long, conflicts_with_all = ["rows", "cols"])]
    grid_folder: Option<PathBuf>,

    /// Electrode rows
    #[arg(long, requires = "cols")]
    rows: Option<usize>,

    /// Electrode columns
    #[arg(long, requires = "rows")]
    cols: Option<usize>,

    /// Distance between rows (m)
    #[arg(long, default_value_t = 0.5)]
    row_spacing: f64,

    /// Distance between columns (m)
    #[arg(long, default_value_t = 0.5)]
    col_spacing: f64,

    /// Only this identity (default: all traces)
    #[arg(long)]
    id: Option<u32>,

    /// Unit of the stored signatures (default: inferred per detection)
    #[arg(long, value_enum)]
    unit: Option<UnitArg>,

    /// Strongest electrodes per estimate
    #[arg(short)]
    n: Option<usize>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UnitArg {
    Linear,
    Decibel,
}

impl From<UnitArg> for SignatureUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Linear => SignatureUnit::Linear,
            UnitArg::Decibel => SignatureUnit::Decibel,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: no logs (clean JSON output for parsing)
    // Verbose: show Info level logs
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    run_position(&args)
}

fn run_position(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    let n = args.n.unwrap_or(config.position.n_electrodes);

    let grid = match (&args.grid_folder, args.rows, args.cols) {
        (Some(folder), _, _) => GridGeometry::load(folder)?,
        (None, Some(rows), Some(cols)) => {
            let grid = GridGeometry::new(rows, cols, args.row_spacing, args.col_spacing);
            grid.validate()?;
            grid
        }
        _ => anyhow::bail!("Grid geometry needs --grid-folder or --rows and --cols"),
    };

    let (store, _) = load_store(&args.log)?;
    if store.num_channels() != grid.num_electrodes() {
        anyhow::bail!(
            "Log has {} channels but the grid has {} electrodes",
            store.num_channels(),
            grid.num_electrodes()
        );
    }

    let unit: Option<SignatureUnit> = args.unit.map(Into::into);
    if unit.is_none() {
        log::info!("No signature unit given, inferring it per detection");
    }

    let idents: Vec<u32> = match args.id {
        Some(id) => {
            if !store.contains_identity(id) {
                anyhow::bail!("Identity {} not found in {}", id, args.log.display());
            }
            vec![id]
        }
        None => store.traces().iter().map(|t| t.ident).collect(),
    };

    let mut points: Vec<TrackPoint> = Vec::new();
    for ident in idents {
        let trace = track(&store, ident, unit, &grid, n)
            .with_context(|| format!("Failed to locate identity {}", ident))?;
        log::info!("Identity {}: {} positions", ident, trace.len());
        points.extend(trace);
    }

    print_json(&points);
    Ok(())
}
