//! WAV loading via hound

use super::InMemoryRecording;
use anyhow::{Context, Result};
use std::path::Path;

/// Decode a (multi-channel) WAV file into an in-memory recording
///
/// Integer samples are scaled to [-1, 1).
pub fn load_wav(path: &Path) -> Result<InMemoryRecording> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    InMemoryRecording::from_interleaved(spec.sample_rate as f64, spec.channels as usize, &samples)
        .with_context(|| format!("Malformed WAV file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::SampleSource;

    #[test]
    fn test_load_stereo_wav() {
        let path = std::env::temp_dir().join("wavetracker_wav_test.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        {
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(16384i16).unwrap();
                writer.write_sample(-16384i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let rec = load_wav(&path).unwrap();
        assert_eq!(rec.channels(), 2);
        assert_eq!(rec.len(), 100);
        assert_eq!(rec.samplerate(), 8000.0);
        assert_eq!(rec.read_channel(0, 0, 1), vec![0.5]);
        assert_eq!(rec.read_channel(1, 0, 1), vec![-0.5]);

        std::fs::remove_file(&path).ok();
    }
}
