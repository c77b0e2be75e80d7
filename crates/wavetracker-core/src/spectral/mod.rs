//! Spectral front end
//!
//! The extraction pipeline only talks to the [`SpectralFrontEnd`] trait: one
//! call turns a block of samples into a power spectrogram, another turns one
//! power spectrum into harmonic groups. [`FftFrontEnd`] is the built-in
//! implementation.

mod fft;
mod harmonics;

pub use fft::FftFrontEnd;
pub use harmonics::{harmonic_groups, threshold_estimate};

use crate::config::HarmonicGroupConfig;
use crate::error::SpectralError;
use serde::{Deserialize, Serialize};

/// Smallest power fed into the decibel conversion
pub const MIN_POWER: f64 = 1e-20;

/// Power spectrogram of one channel
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Power values [frequency_bin][time_frame]
    pub power: Vec<Vec<f64>>,
    /// Frequency of each bin (Hz), ascending
    pub freqs: Vec<f64>,
    /// Time of each frame relative to the first sample (s)
    pub times: Vec<f64>,
}

impl Spectrogram {
    pub fn num_bins(&self) -> usize {
        self.freqs.len()
    }

    pub fn num_frames(&self) -> usize {
        self.times.len()
    }

    /// Mean power over `count` frames starting at `start`, per frequency bin
    pub fn pooled(&self, start: usize, count: usize) -> Vec<f64> {
        let end = (start + count).min(self.num_frames());
        let n = (end - start).max(1) as f64;
        self.power
            .iter()
            .map(|row| row[start..end].iter().sum::<f64>() / n)
            .collect()
    }

    /// Mean power of one bin over `count` frames starting at `start`
    pub fn pooled_bin(&self, bin: usize, start: usize, count: usize) -> f64 {
        let end = (start + count).min(self.num_frames());
        let n = (end - start).max(1) as f64;
        self.power[bin][start..end].iter().sum::<f64>() / n
    }

    /// Element-wise sum of several spectrograms sharing the same axes
    pub fn sum<'a, I>(spectra: I) -> Option<Spectrogram>
    where
        I: IntoIterator<Item = &'a Spectrogram>,
    {
        let mut iter = spectra.into_iter();
        let mut total = iter.next()?.clone();
        for spec in iter {
            for (acc_row, row) in total.power.iter_mut().zip(&spec.power) {
                for (acc, p) in acc_row.iter_mut().zip(row) {
                    *acc += p;
                }
            }
        }
        Some(total)
    }
}

/// Low/high peak thresholds of the harmonic-group search (dB)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

impl Thresholds {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Both thresholds are usable; otherwise they get calibrated
    pub fn is_set(&self) -> bool {
        self.low > 0.0 && self.high > 0.0
    }
}

/// One harmonic series: `(frequency, power_db)` per harmonic, fundamental first
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicGroup {
    pub harmonics: Vec<(f64, f64)>,
}

impl HarmonicGroup {
    pub fn fundamental(&self) -> f64 {
        self.harmonics.first().map(|&(f, _)| f).unwrap_or(0.0)
    }
}

/// Result of one harmonic-group search
#[derive(Debug, Clone, Default)]
pub struct HarmonicGroups {
    pub groups: Vec<HarmonicGroup>,
    /// Thresholds that were applied (calibrated ones if the input was unset)
    pub thresholds: Thresholds,
}

/// Spectral estimation and harmonic grouping used by the extractor
pub trait SpectralFrontEnd: Send + Sync {
    /// Power spectrogram of one channel's samples
    fn spectrogram(
        &self,
        samples: &[f64],
        samplerate: f64,
        freq_resolution: f64,
        overlap_frac: f64,
    ) -> Result<Spectrogram, SpectralError>;

    /// Harmonic groups in one power spectrum
    fn harmonic_groups(
        &self,
        freqs: &[f64],
        power: &[f64],
        thresholds: Thresholds,
        config: &HarmonicGroupConfig,
    ) -> Result<HarmonicGroups, SpectralError>;

    /// Samples between two consecutive spectrogram frames
    fn frame_stride(&self, samplerate: f64, freq_resolution: f64, overlap_frac: f64) -> usize {
        let nfft = fft_size(samplerate, freq_resolution);
        ((1.0 - overlap_frac) * nfft as f64).max(1.0) as usize
    }
}

/// Fundamental frequency of every group
pub fn fundamental_freqs(groups: &[HarmonicGroup]) -> Vec<f64> {
    groups.iter().map(HarmonicGroup::fundamental).collect()
}

/// Power to decibel (reference power 1)
pub fn decibel(power: f64) -> f64 {
    10.0 * power.max(MIN_POWER).log10()
}

/// Smallest power of two that is >= `x`
pub fn next_power_of_two(x: f64) -> usize {
    if x <= 1.0 {
        return 1;
    }
    (x.ceil() as usize).next_power_of_two()
}

/// FFT length for a frequency resolution; never below two samples
pub fn fft_size(samplerate: f64, freq_resolution: f64) -> usize {
    next_power_of_two(samplerate / freq_resolution).max(2)
}

/// Index of the bin closest to `freq` on an ascending axis
pub fn nearest_bin(freqs: &[f64], freq: f64) -> usize {
    match freqs.binary_search_by(|f| f.total_cmp(&freq)) {
        Ok(i) => i,
        Err(0) => 0,
        Err(i) if i >= freqs.len() => freqs.len() - 1,
        Err(i) => {
            if (freqs[i] - freq).abs() < (freq - freqs[i - 1]).abs() {
                i
            } else {
                i - 1
            }
        }
    }
}
