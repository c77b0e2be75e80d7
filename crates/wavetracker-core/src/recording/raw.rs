//! Memory-mapped raw grid recordings (interleaved little-endian `f32`)

use super::SampleSource;
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

const SAMPLE_SIZE: usize = 4;

/// Raw recording read through a memory map
pub struct RawRecording {
    mmap: Mmap,
    channels: usize,
    samplerate: f64,
    len: usize,
}

impl RawRecording {
    pub fn open(path: &Path, channels: usize, samplerate: f64) -> Result<Self> {
        if channels == 0 {
            anyhow::bail!("channel count must be > 0");
        }
        if samplerate <= 0.0 {
            anyhow::bail!("samplerate must be > 0");
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open raw recording: {}", path.display()))?;
        // SAFETY: the file is opened read-only and only read through the map
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to map raw recording: {}", path.display()))?;

        let frame_size = channels * SAMPLE_SIZE;
        if mmap.len() % frame_size != 0 {
            anyhow::bail!(
                "{} is {} bytes, not a whole number of {}-channel frames",
                path.display(),
                mmap.len(),
                channels
            );
        }
        let len = mmap.len() / frame_size;

        log::debug!(
            "Mapped {}: {} channels, {} samples ({:.1}s)",
            path.display(),
            channels,
            len,
            len as f64 / samplerate
        );

        Ok(Self {
            mmap,
            channels,
            samplerate,
            len,
        })
    }
}

impl SampleSource for RawRecording {
    fn samplerate(&self) -> f64 {
        self.samplerate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn len(&self) -> usize {
        self.len
    }

    fn read_channel(&self, channel: usize, start: usize, end: usize) -> Vec<f64> {
        let end = end.min(self.len);
        let start = start.min(end);
        (start..end)
            .map(|frame| {
                let offset = (frame * self.channels + channel) * SAMPLE_SIZE;
                let mut bytes = [0u8; SAMPLE_SIZE];
                bytes.copy_from_slice(&self.mmap[offset..offset + SAMPLE_SIZE]);
                f32::from_le_bytes(bytes) as f64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_interleaved_channels() {
        let path = std::env::temp_dir().join("wavetracker_raw_test.raw");
        {
            let mut file = File::create(&path).unwrap();
            for frame in 0..5 {
                for ch in 0..3 {
                    let v = (frame * 10 + ch) as f32;
                    file.write_all(&v.to_le_bytes()).unwrap();
                }
            }
        }

        let rec = RawRecording::open(&path, 3, 100.0).unwrap();
        assert_eq!(rec.len(), 5);
        assert_eq!(rec.read_channel(1, 0, 5), vec![1.0, 11.0, 21.0, 31.0, 41.0]);
        assert_eq!(rec.read_channel(2, 3, 99), vec![32.0, 42.0]);

        // 5 frames of 3 channels do not divide into 4 channels
        assert!(RawRecording::open(&path, 4, 100.0).is_err());

        std::fs::remove_file(&path).ok();
    }
}
