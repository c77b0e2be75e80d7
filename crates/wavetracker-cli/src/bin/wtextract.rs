//! wtextract - EOD frequency extraction from grid recordings
//!
//! Usage: wtextract <recording> <output_dir>
//!
//! `<recording>` is a WAV file, a raw `f32` file, or a recording folder holding
//! `traces-grid1.raw` and a `grid.toml`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use wavetracker_cli::logfile::{save_store, BINARY_EXTENSION};
use wavetracker_cli::output::print_json;
use wavetracker_core::recording::{open_recording, recording_datetime, GridGeometry, RawRecording, SampleSource};
use wavetracker_core::{TraceStore, TrackerConfig, WindowedExtractor};
use wavetracker_log::LogMeta;

/// Raw recording inside a recording folder
const GRID_RAW_FILE: &str = "traces-grid1.raw";

/// Samplerate of grid amplifiers when none is given
const DEFAULT_GRID_SAMPLERATE: f64 = 20000.0;

#[derive(Parser, Debug)]
#[command(name = "wtextract")]
#[command(about = "Extract EOD frequency detections from a grid recording", long_about = None)]
struct Args {
    /// Recording file or folder
    recording: PathBuf,

    /// Output directory for the detection log and raster
    output_dir: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Channel count of a raw recording
    #[arg(long)]
    channels: Option<usize>,

    /// Samplerate of a raw recording (Hz)
    #[arg(long)]
    samplerate: Option<f64>,

    /// Write the detection log as JSON instead of binary
    #[arg(long)]
    json: bool,

    /// Do not compress the binary detection log
    #[arg(long)]
    no_compress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
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

    run_extract(&args)
}

fn run_extract(args: &Args) -> Result<()> {
    if !args.recording.exists() {
        anyhow::bail!("Recording not found: {}", args.recording.display());
    }
    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("Failed to create output directory: {}", args.output_dir.display())
    })?;

    let config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    config.validate()?;

    let source = open_source(args)?;
    let folder = if args.recording.is_dir() {
        Some(args.recording.as_path())
    } else {
        args.recording.parent()
    };
    let datetime = folder.and_then(recording_datetime);
    if let Some(dt) = datetime {
        log::info!("Recording started {}", dt);
    }
    log::info!(
        "Processing {}: {} channels, {:.1}s @ {}Hz",
        args.recording.display(),
        source.channels(),
        source.duration(),
        source.samplerate()
    );

    let start = std::time::Instant::now();
    let mut store = TraceStore::new(source.channels());
    let mut extractor = WindowedExtractor::with_fft(config.clone())?;

    let mut reported = 0;
    let outcome = extractor.run(source.as_ref(), &mut store, |fraction| {
        let decile = (fraction * 10.0) as usize;
        if decile > reported {
            reported = decile;
            log::info!("{:.0}% processed", fraction * 100.0);
        }
    });

    let stem = output_stem(&args.recording);
    let log_path = if args.json {
        args.output_dir.join(format!("{}.json", stem))
    } else {
        args.output_dir.join(format!("{}.{}", stem, BINARY_EXTENSION))
    };

    // Committed windows are saved even when the run was aborted
    let meta = LogMeta {
        start_time: config.spectrogram.start_time,
        end_time: store.times().last().copied().unwrap_or(config.spectrogram.start_time),
    };
    save_store(&log_path, &store, meta, !args.no_compress)?;
    let summary = outcome.with_context(|| {
        format!("Extraction aborted; partial log written to {}", log_path.display())
    })?;

    let raster_path = args.output_dir.join(format!("{}_raster.json", stem));
    if let Some(raster) = extractor.raster() {
        std::fs::write(&raster_path, serde_json::to_string(raster)?)
            .with_context(|| format!("Failed to write raster: {}", raster_path.display()))?;
    }

    let mut result = serde_json::json!({
        "status": "success",
        "recording": args.recording.display().to_string(),
        "log_file": log_path.display().to_string(),
        "raster_file": raster_path.display().to_string(),
        "summary": summary,
        "processing_time_seconds": start.elapsed().as_secs_f64(),
    });

    if config.spectrogram.single_channel {
        let channel_path = args.output_dir.join(format!("{}_channels.json", stem));
        std::fs::write(&channel_path, serde_json::to_string(extractor.channel_log())?)
            .with_context(|| format!("Failed to write channel log: {}", channel_path.display()))?;
        result["channel_file"] = channel_path.display().to_string().into();
    }
    if let Some(dt) = datetime {
        result["recording_start"] = dt.to_string().into();
    }

    print_json(&result);
    Ok(())
}

/// Open the recording given on the command line
fn open_source(args: &Args) -> Result<Box<dyn SampleSource>> {
    if !args.recording.is_dir() {
        return open_recording(&args.recording, args.channels, args.samplerate);
    }

    let grid = GridGeometry::load(&args.recording)?;
    let channels = args.channels.unwrap_or(grid.num_electrodes());
    let samplerate = args.samplerate.unwrap_or(DEFAULT_GRID_SAMPLERATE);
    let raw = args.recording.join(GRID_RAW_FILE);
    Ok(Box::new(RawRecording::open(&raw, channels, samplerate)?))
}

/// Base name of the output files
fn output_stem(recording: &Path) -> String {
    let name = if recording.is_dir() {
        recording.file_name()
    } else {
        recording.file_stem()
    };
    name.and_then(|n| n.to_str())
        .unwrap_or("recording")
        .to_string()
}
