//! Loading and saving detection logs in either encoding
//!
//! Files ending in `.json` use the JSON encoding, everything else the binary
//! `WTRK` format.

use anyhow::{Context, Result};
use std::path::Path;
use wavetracker_core::TraceStore;
use wavetracker_log::{LogJsonFile, LogMeta, LogReader, LogWriter};

/// File extension of binary detection logs
pub const BINARY_EXTENSION: &str = "wtrk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEncoding {
    Binary,
    Json,
}

impl LogEncoding {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => LogEncoding::Json,
            _ => LogEncoding::Binary,
        }
    }
}

/// Read a detection log into a trace store
pub fn load_store(path: &Path) -> Result<(TraceStore, LogMeta)> {
    let log = match LogEncoding::from_path(path) {
        LogEncoding::Json => LogJsonFile::load(path)
            .with_context(|| format!("Failed to read JSON detection log: {}", path.display()))?
            .into_log_file()?,
        LogEncoding::Binary => LogReader::read(path)?,
    };

    let store = TraceStore::from_log_file(&log)
        .with_context(|| format!("Inconsistent detection log: {}", path.display()))?;
    log::info!(
        "Loaded {}: {} detections, {} time bins, {} traces",
        path.display(),
        store.len(),
        store.times().len(),
        store.traces().len()
    );
    Ok((store, log.meta))
}

/// Write a trace store, choosing the encoding from the file name
pub fn save_store(path: &Path, store: &TraceStore, meta: LogMeta, compress: bool) -> Result<()> {
    let log = store.to_log_file(meta)?;
    match LogEncoding::from_path(path) {
        LogEncoding::Json => LogJsonFile::try_from(&log)?
            .save(path)
            .with_context(|| format!("Failed to write JSON detection log: {}", path.display()))?,
        LogEncoding::Binary => LogWriter::new().with_compression(compress).write(path, &log)?,
    }
    log::info!("Wrote {} ({} detections)", path.display(), store.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> TraceStore {
        TraceStore::from_parts(
            vec![0.0, 0.5, 1.0],
            vec![600.0, 601.0, 800.0],
            vec![0, 1, 1],
            vec![Some(0), Some(0), None],
            vec![vec![-40.0, -42.0]; 3],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_encoding_from_path() {
        assert_eq!(LogEncoding::from_path(Path::new("a/b.json")), LogEncoding::Json);
        assert_eq!(LogEncoding::from_path(Path::new("a/b.wtrk")), LogEncoding::Binary);
    }

    #[test]
    fn test_save_and_load_both_encodings() {
        let meta = LogMeta {
            start_time: 0.0,
            end_time: 1.5,
        };
        let store = sample_store();

        for name in ["wavetracker_cli_log.json", "wavetracker_cli_log.wtrk"] {
            let path = std::env::temp_dir().join(name);
            save_store(&path, &store, meta, true).unwrap();
            let (loaded, loaded_meta) = load_store(&path).unwrap();

            assert_eq!(loaded.ident_v(), store.ident_v());
            assert_eq!(loaded.fund_v(), store.fund_v());
            assert_eq!(loaded_meta, meta);
            std::fs::remove_file(&path).ok();
        }
    }

    #[test]
    fn test_freed_label_not_reminted_after_reload() {
        let meta = LogMeta {
            start_time: 0.0,
            end_time: 4.0,
        };
        let store = TraceStore::from_parts(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![600.0; 4],
            vec![0, 1, 2, 3],
            vec![Some(5); 4],
            vec![vec![-40.0]; 4],
            1,
        )
        .unwrap();

        for name in ["wavetracker_cli_labels.json", "wavetracker_cli_labels.wtrk"] {
            let path = std::env::temp_dir().join(name);
            save_store(&path, &store, meta, true).unwrap();

            // Every edit is a separate load, change, save cycle
            let (mut edited, _) = load_store(&path).unwrap();
            assert_eq!(edited.cut(5, 1).unwrap(), 6);
            save_store(&path, &edited, meta, true).unwrap();

            let (mut edited, _) = load_store(&path).unwrap();
            assert_eq!(edited.delete(6), 1);
            save_store(&path, &edited, meta, true).unwrap();

            let (mut edited, _) = load_store(&path).unwrap();
            assert_eq!(edited.max_label(), Some(6));
            assert_eq!(edited.cut(5, 3).unwrap(), 7);
            std::fs::remove_file(&path).ok();
        }
    }
}
