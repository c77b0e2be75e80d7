//! wtcurate - Review and correct identity traces of a detection log
//!
//! Usage: wtcurate <log> <command> [args]
//!
//! Every editing command rewrites the log in place unless `--output` is given.
//! Commands that select nothing leave the log untouched.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use wavetracker_cli::curate::{self, Outcome};
use wavetracker_cli::logfile::{load_store, save_store};
use wavetracker_cli::output::{print_json, print_trace_listing};

#[derive(Parser, Debug)]
#[command(name = "wtcurate")]
#[command(about = "Curate identity traces of a detection log", long_about = None)]
struct Args {
    /// Detection log (.wtrk or .json)
    log: PathBuf,

    #[command(subcommand)]
    command: Command,

    /// Write the edited log here instead of overwriting the input
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Do not compress a binary output log
    #[arg(long, global = true)]
    no_compress: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all traces
    List,

    /// Replace all identities with the labels of an automatic sorter
    Assign {
        /// JSON array with one label (or null) per detection
        labels: PathBuf,
    },

    /// Split a trace: detections before the split point get a new identity
    Cut {
        /// Identity to split
        id: u32,

        /// Detection index where the retained part starts
        #[arg(long, conflicts_with = "time", required_unless_present = "time")]
        index: Option<usize>,

        /// Split at the first detection at or after this time (s)
        #[arg(long)]
        time: Option<f64>,
    },

    /// Merge identity B into A; A loses its detections where both overlap
    Connect { a: u32, b: u32 },

    /// Unassign all detections of one identity
    Delete { id: u32 },

    /// Merge several identities into the first one
    GroupConnect {
        /// Identities, target first
        #[arg(long, value_delimiter = ',', conflicts_with = "t0")]
        ids: Vec<u32>,

        #[command(flatten)]
        rect: OptionalRect,
    },

    /// Unassign every detection inside a time x frequency rectangle
    GroupDelete {
        #[command(flatten)]
        rect: Rect,
    },
}

/// Time x frequency selection rectangle
#[derive(ClapArgs, Debug)]
struct Rect {
    #[arg(long, allow_negative_numbers = true)]
    t0: f64,
    #[arg(long, allow_negative_numbers = true)]
    t1: f64,
    #[arg(long)]
    f0: f64,
    #[arg(long)]
    f1: f64,
}

#[derive(ClapArgs, Debug)]
struct OptionalRect {
    #[arg(long, requires_all = ["t1", "f0", "f1"])]
    t0: Option<f64>,
    #[arg(long)]
    t1: Option<f64>,
    #[arg(long)]
    f0: Option<f64>,
    #[arg(long)]
    f1: Option<f64>,
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

    run_curate(args)
}

fn run_curate(args: Args) -> Result<()> {
    let (mut store, meta) = load_store(&args.log)?;

    let outcome = match args.command {
        Command::List => {
            let unassigned = store.ident_v().iter().filter(|id| id.is_none()).count();
            print_trace_listing(&store.traces(), unassigned);
            return Ok(());
        }
        Command::Assign { labels } => {
            let content = std::fs::read_to_string(&labels)
                .with_context(|| format!("Failed to read labels: {}", labels.display()))?;
            let labels: Vec<Option<u32>> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse labels: {}", labels.display()))?;
            store.assign_identities(labels)?;
            Outcome::changed(json!({
                "operation": "assign",
                "traces": store.traces().len(),
            }))
        }
        Command::Cut { id, index, time } => {
            let split = match (index, time) {
                (Some(index), _) => index,
                (None, Some(t)) => store
                    .split_point_at(id, t)
                    .with_context(|| format!("Identity {} has no detection at or after {}s", id, t))?,
                (None, None) => anyhow::bail!("cut needs --index or --time"),
            };
            let head = store.cut(id, split)?;
            Outcome::changed(json!({
                "operation": "cut",
                "identity": id,
                "split_index": split,
                "new_identity": head,
            }))
        }
        Command::Connect { a, b } => {
            let dropped = store.connect(a, b)?;
            Outcome::changed(json!({
                "operation": "connect",
                "target": a,
                "merged": b,
                "overlaps_dropped": dropped,
            }))
        }
        Command::Delete { id } => curate::delete(&mut store, id),
        Command::GroupConnect { ids, rect } => {
            let ids = if ids.is_empty() {
                let (Some(t0), Some(t1), Some(f0), Some(f1)) = (rect.t0, rect.t1, rect.f0, rect.f1) else {
                    anyhow::bail!("group-connect needs --ids or a full rectangle (--t0 --t1 --f0 --f1)");
                };
                curate::identities_in_rect(&store, (t0, t1), (f0, f1))
            } else {
                ids
            };
            curate::group_connect(&mut store, &ids)?
        }
        Command::GroupDelete { rect } => {
            curate::group_delete_rect(&mut store, (rect.t0, rect.t1), (rect.f0, rect.f1))?
        }
    };

    if !outcome.changed {
        log::info!("Nothing selected, {} left unchanged", args.log.display());
        print_json(&json!({
            "status": "success",
            "log_file": args.log.display().to_string(),
            "result": outcome.report,
        }));
        return Ok(());
    }

    store.check_invariants()?;
    let output = args.output.as_ref().unwrap_or(&args.log);
    save_store(output, &store, meta, !args.no_compress)?;

    print_json(&json!({
        "status": "success",
        "log_file": output.display().to_string(),
        "result": outcome.report,
    }));
    Ok(())
}
