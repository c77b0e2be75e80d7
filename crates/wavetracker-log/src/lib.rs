//! Wavetracker detection log file formats

pub mod format;
pub mod json_format;
pub mod reader;
pub mod writer;

pub use format::{ident_from_f64, ident_to_f64, LogFile, LogFormatError, LogHeader, LogMeta, MAGIC, VERSION};
pub use json_format::LogJsonFile;
pub use reader::LogReader;
pub use writer::LogWriter;
