//! Configuration parameters for EOD extraction and tracking
//!
//! A config file only needs the sections it changes; everything else keeps
//! its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub spectrogram: SpectrogramConfig,
    #[serde(default)]
    pub harmonic_groups: HarmonicGroupConfig,
    #[serde(default)]
    pub raster: RasterConfig,
    #[serde(default)]
    pub position: PositionConfig,
}

/// Windowing and spectral estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Analysis start (seconds)
    pub start_time: f64,
    /// Analysis end (seconds); negative means end of recording
    pub end_time: f64,
    /// Window length (seconds)
    pub snippet_size: f64,
    /// Frequency resolution (Hz)
    pub freq_resolution: f64,
    /// Overlap fraction of consecutive FFT frames
    pub overlap_frac: f64,
    /// FFT frames pooled into one power estimate
    pub nffts_per_psd: usize,
    /// Analyse the summed (whole-array) spectrum
    pub multi_channel: bool,
    /// Analyse every channel on its own
    pub single_channel: bool,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: -1.0,
            snippet_size: 15.0,
            freq_resolution: 0.5,
            overlap_frac: 0.95,
            nffts_per_psd: 1,
            multi_channel: true,
            single_channel: false,
        }
    }
}

/// Harmonic-group extraction options
///
/// Threshold pairs at or below zero are calibrated from the first window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonicGroupConfig {
    /// Per-channel low threshold (dB)
    pub low_threshold: f64,
    /// Per-channel high threshold (dB)
    pub high_threshold: f64,
    /// Whole-array low threshold (dB)
    pub low_threshold_g: f64,
    /// Whole-array high threshold (dB)
    pub high_threshold_g: f64,
    /// Noise standard deviations for the calibrated low threshold
    pub low_thresh_factor: f64,
    /// Noise standard deviations for the calibrated high threshold
    pub high_thresh_factor: f64,
    /// Harmonic frequency tolerance in multiples of the frequency resolution
    pub freq_tol_fac: f64,
    /// Mains hum frequency (Hz)
    pub mains_freq: f64,
    /// Tolerance around mains harmonics (Hz)
    pub mains_freq_tol: f64,
    /// Lowest accepted fundamental (Hz)
    pub min_freq: f64,
    /// Highest accepted fundamental (Hz)
    pub max_freq: f64,
    /// Largest divisor tried when a peak may be a higher harmonic
    pub max_divisor: usize,
    /// Harmonics a group needs to be accepted
    pub min_group_size: usize,
    /// Power ratio a sub-harmonic group may lose against the undivided one
    pub max_rel_power_weight: f64,
    /// Largest allowed excess (dB) of a harmonic over the fundamental; 0 disables
    pub max_rel_power: f64,
}

impl Default for HarmonicGroupConfig {
    fn default() -> Self {
        Self {
            low_threshold: 0.0,
            high_threshold: 0.0,
            low_threshold_g: 0.0,
            high_threshold_g: 0.0,
            low_thresh_factor: 6.0,
            high_thresh_factor: 10.0,
            freq_tol_fac: 1.0,
            mains_freq: 60.0,
            mains_freq_tol: 1.0,
            min_freq: 0.0,
            max_freq: 2000.0,
            max_divisor: 4,
            min_group_size: 4,
            max_rel_power_weight: 2.0,
            max_rel_power: 0.0,
        }
    }
}

/// Display raster resolution and extent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub time_cells: usize,
    pub freq_cells: usize,
    pub min_freq: f64,
    pub max_freq: f64,
}

impl Default for RasterConfig {
    fn default() -> Self {
        // 20 x 12 inch figure at 80 dpi, two cells per pixel
        Self {
            time_cells: 3200,
            freq_cells: 1920,
            min_freq: 0.0,
            max_freq: 2000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Strongest electrodes used per position estimate
    pub n_electrodes: usize,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self { n_electrodes: 6 }
    }
}

impl TrackerConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: TrackerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        let spec = &self.spectrogram;
        if spec.start_time < 0.0 {
            anyhow::bail!("start_time must be >= 0");
        }
        if spec.end_time >= 0.0 && spec.end_time <= spec.start_time {
            anyhow::bail!("end_time must be > start_time (or negative for end of recording)");
        }
        if spec.snippet_size <= 0.0 {
            anyhow::bail!("snippet_size must be > 0");
        }
        if spec.freq_resolution <= 0.0 {
            anyhow::bail!("freq_resolution must be > 0");
        }
        if !(0.0..1.0).contains(&spec.overlap_frac) {
            anyhow::bail!("overlap_frac must be in [0, 1)");
        }
        if spec.nffts_per_psd == 0 {
            anyhow::bail!("nffts_per_psd must be > 0");
        }
        if !spec.multi_channel && !spec.single_channel {
            anyhow::bail!("at least one of multi_channel and single_channel must be enabled");
        }

        let hg = &self.harmonic_groups;
        if hg.min_freq >= hg.max_freq {
            anyhow::bail!("harmonic_groups.min_freq must be < max_freq");
        }
        if hg.max_divisor == 0 {
            anyhow::bail!("max_divisor must be > 0");
        }
        if hg.min_group_size == 0 {
            anyhow::bail!("min_group_size must be > 0");
        }
        if hg.freq_tol_fac <= 0.0 {
            anyhow::bail!("freq_tol_fac must be > 0");
        }
        if hg.max_rel_power_weight < 1.0 {
            anyhow::bail!("max_rel_power_weight must be >= 1");
        }

        let raster = &self.raster;
        if raster.time_cells == 0 || raster.freq_cells == 0 {
            anyhow::bail!("raster cell counts must be > 0");
        }
        if raster.min_freq >= raster.max_freq {
            anyhow::bail!("raster.min_freq must be < max_freq");
        }

        if self.position.n_electrodes == 0 {
            anyhow::bail!("n_electrodes must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.spectrogram.nffts_per_psd, 1);
        assert_eq!(config.position.n_electrodes, 6);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [spectrogram]
            start_time = 60.0
            end_time = 120.0
            single_channel = true

            [harmonic_groups]
            mains_freq = 50.0
        "#;

        let config: TrackerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.spectrogram.start_time, 60.0);
        assert!(config.spectrogram.single_channel);
        assert!(config.spectrogram.multi_channel);
        assert_eq!(config.spectrogram.freq_resolution, 0.5);
        assert_eq!(config.harmonic_groups.mains_freq, 50.0);
        assert_eq!(config.harmonic_groups.min_group_size, 4);
        assert_eq!(config.raster.max_freq, 2000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_overlap() {
        let mut config = TrackerConfig::default();
        config.spectrogram.overlap_frac = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut config = TrackerConfig::default();
        config.spectrogram.start_time = 30.0;
        config.spectrogram.end_time = 10.0;
        assert!(config.validate().is_err());
    }
}
