//! Multi-channel sample sources
//!
//! The extractor reads channel slices through [`SampleSource`], so the same
//! pipeline runs on in-memory buffers, memory-mapped `.raw` grid recordings
//! and WAV files.

mod grid;
mod raw;
mod wav;

pub use grid::{recording_datetime, GridGeometry, GRID_FILE};
pub use raw::RawRecording;
pub use wav::load_wav;

use std::path::Path;

/// Sample-index by channel addressable recording
pub trait SampleSource: Sync {
    /// Samples per second
    fn samplerate(&self) -> f64;

    /// Number of channels (electrodes)
    fn channels(&self) -> usize;

    /// Samples per channel
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples `start..end` of one channel; the range is clamped to the recording
    fn read_channel(&self, channel: usize, start: usize, end: usize) -> Vec<f64>;

    fn duration(&self) -> f64 {
        self.len() as f64 / self.samplerate()
    }
}

/// Recording held in memory, one vector per channel
#[derive(Debug, Clone)]
pub struct InMemoryRecording {
    samplerate: f64,
    data: Vec<Vec<f64>>,
}

impl InMemoryRecording {
    pub fn new(samplerate: f64, data: Vec<Vec<f64>>) -> anyhow::Result<Self> {
        if samplerate <= 0.0 {
            anyhow::bail!("samplerate must be > 0");
        }
        if data.is_empty() {
            anyhow::bail!("recording needs at least one channel");
        }
        let len = data[0].len();
        if let Some(ch) = data.iter().position(|c| c.len() != len) {
            anyhow::bail!(
                "channel {} has {} samples, channel 0 has {}",
                ch,
                data[ch].len(),
                len
            );
        }
        Ok(Self { samplerate, data })
    }

    /// Split interleaved frames into channels
    pub fn from_interleaved(samplerate: f64, channels: usize, samples: &[f64]) -> anyhow::Result<Self> {
        if channels == 0 {
            anyhow::bail!("channel count must be > 0");
        }
        if samples.len() % channels != 0 {
            anyhow::bail!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                channels
            );
        }
        let data = (0..channels)
            .map(|ch| samples.iter().skip(ch).step_by(channels).copied().collect())
            .collect();
        Self::new(samplerate, data)
    }
}

impl SampleSource for InMemoryRecording {
    fn samplerate(&self) -> f64 {
        self.samplerate
    }

    fn channels(&self) -> usize {
        self.data.len()
    }

    fn len(&self) -> usize {
        self.data[0].len()
    }

    fn read_channel(&self, channel: usize, start: usize, end: usize) -> Vec<f64> {
        let data = &self.data[channel];
        let end = end.min(data.len());
        let start = start.min(end);
        data[start..end].to_vec()
    }
}

/// Open a recording by extension: `.wav` via hound, anything else as raw `f32`
///
/// Raw files carry no header, so `channels` and `samplerate` must be given.
pub fn open_recording(
    path: &Path,
    channels: Option<usize>,
    samplerate: Option<f64>,
) -> anyhow::Result<Box<dyn SampleSource>> {
    let is_wav = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("wav") | Some("wave")
    );
    if is_wav {
        return Ok(Box::new(load_wav(path)?));
    }

    let (Some(channels), Some(samplerate)) = (channels, samplerate) else {
        anyhow::bail!(
            "raw recording {} needs --channels and --samplerate",
            path.display()
        );
    };
    Ok(Box::new(RawRecording::open(path, channels, samplerate)?))
}
