//! Wavetracker Core - EOD trace extraction and curation
//!
//! Extracts electric-fish fundamental frequencies from multi-channel grid
//! recordings, keeps them in an identity-tagged trace store with curation
//! operations, and estimates fish positions from electrode signatures.

pub mod config;
pub mod error;
pub mod extractor;
pub mod position;
pub mod raster;
pub mod recording;
pub mod spectral;
pub mod store;

pub use config::TrackerConfig;
pub use error::{CurationError, ExtractionError, InvariantError, PositionError, SpectralError};
pub use extractor::{ChannelLog, ExtractionSummary, WindowedExtractor};
pub use position::{estimate_position, track, Position, SignatureUnit, TrackPoint};
pub use raster::RasterDisplayBuffer;
pub use recording::{open_recording, GridGeometry, InMemoryRecording, SampleSource};
pub use spectral::{FftFrontEnd, Spectrogram, SpectralFrontEnd, Thresholds};
pub use store::{TraceStore, TraceSummary};
