//! FFT power spectrogram (Hann window, one-sided PSD)

use super::{fft_size, harmonics, HarmonicGroups, Spectrogram, SpectralFrontEnd, Thresholds};
use crate::config::HarmonicGroupConfig;
use crate::error::SpectralError;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// Built-in front end: rustfft spectrogram plus the harmonic-group search
#[derive(Debug, Clone, Copy, Default)]
pub struct FftFrontEnd;

impl FftFrontEnd {
    pub fn new() -> Self {
        Self
    }
}

impl SpectralFrontEnd for FftFrontEnd {
    fn spectrogram(
        &self,
        samples: &[f64],
        samplerate: f64,
        freq_resolution: f64,
        overlap_frac: f64,
    ) -> Result<Spectrogram, SpectralError> {
        if samples.is_empty() {
            return Err(SpectralError::EmptyInput);
        }
        if samplerate <= 0.0 || freq_resolution <= 0.0 {
            return Err(SpectralError::InvalidParameter(format!(
                "samplerate {} and freq_resolution {} must be > 0",
                samplerate, freq_resolution
            )));
        }
        if !(0.0..1.0).contains(&overlap_frac) {
            return Err(SpectralError::InvalidParameter(format!(
                "overlap_frac {} not in [0, 1)",
                overlap_frac
            )));
        }

        let nfft = fft_size(samplerate, freq_resolution);
        let hop = self.frame_stride(samplerate, freq_resolution, overlap_frac);

        // Short blocks are zero-padded into a single frame
        let num_frames = if samples.len() <= nfft {
            1
        } else {
            1 + (samples.len() - nfft) / hop
        };
        let num_bins = nfft / 2 + 1;

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nfft);
        let window = create_hann_window(nfft);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (samplerate * window_power);

        let mut power = vec![Vec::with_capacity(num_frames); num_bins];
        let mut frame = vec![Complex::new(0.0, 0.0); nfft];

        for frame_idx in 0..num_frames {
            let start = frame_idx * hop;
            let end = (start + nfft).min(samples.len());

            for (i, slot) in frame.iter_mut().enumerate() {
                let s = if start + i < end { samples[start + i] } else { 0.0 };
                *slot = Complex::new(s * window[i], 0.0);
            }

            fft.process(&mut frame);

            for (bin, row) in power.iter_mut().enumerate() {
                let mut p = frame[bin].norm_sqr() * scale;
                // Fold negative frequencies, except DC and Nyquist
                if bin != 0 && bin != nfft / 2 {
                    p *= 2.0;
                }
                row.push(p);
            }
        }

        let freqs = (0..num_bins)
            .map(|k| k as f64 * samplerate / nfft as f64)
            .collect();
        let times = (0..num_frames)
            .map(|i| (i * hop) as f64 / samplerate + nfft as f64 / (2.0 * samplerate))
            .collect();

        Ok(Spectrogram {
            power,
            freqs,
            times,
        })
    }

    fn harmonic_groups(
        &self,
        freqs: &[f64],
        power: &[f64],
        thresholds: Thresholds,
        config: &HarmonicGroupConfig,
    ) -> Result<HarmonicGroups, SpectralError> {
        harmonics::harmonic_groups(freqs, power, thresholds, config)
    }
}

/// Create Hann window
fn create_hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| {
            let x = i as f64 / (size - 1) as f64;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::nearest_bin;

    fn sine(freq: f64, samplerate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / samplerate).sin())
            .collect()
    }

    #[test]
    fn test_hann_window() {
        let window = create_hann_window(512);
        assert_eq!(window.len(), 512);
        assert!((window[0] - 0.0).abs() < 0.001);
        assert!((window[256] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_spectrogram_axes() {
        let samplerate = 1000.0;
        let samples = sine(100.0, samplerate, 4000);
        let spec = FftFrontEnd::new()
            .spectrogram(&samples, samplerate, 1.0, 0.5)
            .unwrap();

        // nfft = 1024, hop = 512
        assert_eq!(spec.num_bins(), 513);
        assert_eq!(spec.num_frames(), 1 + (4000 - 1024) / 512);
        assert!((spec.times[1] - spec.times[0] - 0.512).abs() < 1e-12);
        assert!((spec.times[0] - 0.512).abs() < 1e-12);
    }

    #[test]
    fn test_sine_peak_bin() {
        let samplerate = 2000.0;
        let samples = sine(250.0, samplerate, 8192);
        let spec = FftFrontEnd::new()
            .spectrogram(&samples, samplerate, 2.0, 0.0)
            .unwrap();

        let column = spec.pooled(0, 1);
        let peak = column
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, nearest_bin(&spec.freqs, 250.0));
    }

    #[test]
    fn test_short_block_is_padded() {
        let spec = FftFrontEnd::new()
            .spectrogram(&[0.5; 10], 1000.0, 1.0, 0.9)
            .unwrap();
        assert_eq!(spec.num_frames(), 1);
    }

    #[test]
    fn test_empty_input() {
        let result = FftFrontEnd::new().spectrogram(&[], 1000.0, 1.0, 0.5);
        assert!(matches!(result, Err(SpectralError::EmptyInput)));
    }
}
