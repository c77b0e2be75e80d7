//! Harmonic-group search on a single power spectrum
//!
//! Peaks are detected on the decibel spectrum by prominence. Every strong
//! peak seeds a search for a harmonic series; if the peak may itself be a
//! higher harmonic, the sub-harmonics `f/2 .. f/max_divisor` are tried as
//! fundamentals as well and the lowest one carrying a complete group wins.

use super::{decibel, HarmonicGroup, HarmonicGroups, Thresholds};
use crate::config::HarmonicGroupConfig;
use crate::error::SpectralError;

/// A local maximum of the decibel spectrum
#[derive(Debug, Clone, Copy)]
struct Peak {
    freq: f64,
    power_db: f64,
    prominence: f64,
}

/// Extract harmonic groups from one power spectrum
pub fn harmonic_groups(
    freqs: &[f64],
    power: &[f64],
    thresholds: Thresholds,
    config: &HarmonicGroupConfig,
) -> Result<HarmonicGroups, SpectralError> {
    if freqs.len() != power.len() {
        return Err(SpectralError::ShapeMismatch {
            expected: freqs.len(),
            found: power.len(),
        });
    }

    let log_psd: Vec<f64> = power.iter().map(|&p| decibel(p)).collect();
    let thresholds = if thresholds.is_set() {
        thresholds
    } else {
        threshold_estimate(&log_psd, config.low_thresh_factor, config.high_thresh_factor)
    };

    if freqs.len() < 3 {
        return Ok(HarmonicGroups {
            groups: Vec::new(),
            thresholds,
        });
    }

    let df = freqs[1] - freqs[0];
    let freq_tol = config.freq_tol_fac * df;

    let mut peaks = detect_peaks(freqs, &log_psd, thresholds.low);
    peaks.retain(|p| !is_mains(p.freq, config));

    // Strongest candidates first
    let mut candidates: Vec<usize> = (0..peaks.len())
        .filter(|&i| peaks[i].prominence >= thresholds.high)
        .collect();
    candidates.sort_by(|&a, &b| peaks[b].power_db.total_cmp(&peaks[a].power_db));

    let mut used = vec![false; peaks.len()];
    let mut groups = Vec::new();

    for cand in candidates {
        if used[cand] {
            continue;
        }

        let mut best: Option<Vec<usize>> = None;
        for divisor in 1..=config.max_divisor {
            let f0 = peaks[cand].freq / divisor as f64;
            if f0 < df {
                break;
            }
            let Some(members) = build_group(&peaks, &used, f0, freq_tol, config) else {
                continue;
            };
            best = match best {
                None => Some(members),
                Some(current) => {
                    let lower = group_power(&peaks, &members);
                    if lower * config.max_rel_power_weight >= group_power(&peaks, &current) {
                        Some(members)
                    } else {
                        Some(current)
                    }
                }
            };
        }

        let Some(members) = best else {
            continue;
        };

        let fundamental = peaks[members[0]];
        if fundamental.freq < config.min_freq || fundamental.freq > config.max_freq {
            continue;
        }
        if config.max_rel_power > 0.0
            && members
                .iter()
                .any(|&m| peaks[m].power_db - fundamental.power_db > config.max_rel_power)
        {
            continue;
        }

        for &m in &members {
            used[m] = true;
        }
        groups.push(HarmonicGroup {
            harmonics: members
                .iter()
                .map(|&m| (peaks[m].freq, peaks[m].power_db))
                .collect(),
        });
    }

    groups.sort_by(|a, b| a.fundamental().total_cmp(&b.fundamental()));

    Ok(HarmonicGroups { groups, thresholds })
}

/// Robust noise-based thresholds: median and MAD of the decibel spectrum
pub fn threshold_estimate(log_psd: &[f64], low_factor: f64, high_factor: f64) -> Thresholds {
    if log_psd.is_empty() {
        return Thresholds::default();
    }
    let center = median(log_psd.to_vec());
    let mad = median(log_psd.iter().map(|x| (x - center).abs()).collect());
    let std = (1.4826 * mad).max(1e-3);
    Thresholds::new(low_factor * std, high_factor * std)
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// Local maxima whose prominence reaches `min_prominence`
fn detect_peaks(freqs: &[f64], log_psd: &[f64], min_prominence: f64) -> Vec<Peak> {
    let n = log_psd.len();
    let mut peaks = Vec::new();

    // The DC bin is never a peak
    for i in 1..n.saturating_sub(1) {
        let v = log_psd[i];
        if !(v > log_psd[i - 1] && v >= log_psd[i + 1]) {
            continue;
        }

        let mut left_min = v;
        for j in (1..i).rev() {
            if log_psd[j] > v {
                break;
            }
            left_min = left_min.min(log_psd[j]);
        }
        let mut right_min = v;
        for j in i + 1..n {
            if log_psd[j] > v {
                break;
            }
            right_min = right_min.min(log_psd[j]);
        }

        let prominence = v - left_min.max(right_min);
        if prominence >= min_prominence {
            peaks.push(Peak {
                freq: freqs[i],
                power_db: v,
                prominence,
            });
        }
    }

    peaks
}

fn is_mains(freq: f64, config: &HarmonicGroupConfig) -> bool {
    if config.mains_freq <= 0.0 {
        return false;
    }
    let harmonic = (freq / config.mains_freq).round();
    harmonic >= 1.0 && (freq - harmonic * config.mains_freq).abs() < config.mains_freq_tol
}

/// Collect the harmonic series of `f0` from unused peaks
///
/// The fundamental must be present and at least `min_group_size` of the
/// first `2 * min_group_size` harmonics must be found. Returns peak indices,
/// fundamental first.
fn build_group(
    peaks: &[Peak],
    used: &[bool],
    f0: f64,
    freq_tol: f64,
    config: &HarmonicGroupConfig,
) -> Option<Vec<usize>> {
    let mut members: Vec<(usize, usize)> = Vec::new();
    let mut fzero = f0;

    for h in 1..=2 * config.min_group_size {
        let target = h as f64 * fzero;
        let found = peaks
            .iter()
            .enumerate()
            .filter(|&(i, p)| !used[i] && (p.freq - target).abs() <= freq_tol)
            .min_by(|a, b| (a.1.freq - target).abs().total_cmp(&(b.1.freq - target).abs()))
            .map(|(i, _)| i);

        match found {
            Some(i) => {
                members.push((i, h));
                // Refine the fundamental from everything found so far
                fzero = members
                    .iter()
                    .map(|&(m, k)| peaks[m].freq / k as f64)
                    .sum::<f64>()
                    / members.len() as f64;
            }
            None if h == 1 => return None,
            None => {}
        }
    }

    (members.len() >= config.min_group_size).then(|| members.into_iter().map(|(m, _)| m).collect())
}

fn group_power(peaks: &[Peak], members: &[usize]) -> f64 {
    members
        .iter()
        .map(|&m| 10f64.powf(peaks[m].power_db / 10.0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat noise floor with narrow peaks at the given (freq, power) pairs
    fn spectrum(df: f64, max_freq: f64, lines: &[(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
        let n = (max_freq / df) as usize + 1;
        let freqs: Vec<f64> = (0..n).map(|i| i as f64 * df).collect();
        let mut power = vec![1e-8; n];
        for &(f, p) in lines {
            let bin = (f / df).round() as usize;
            power[bin] = p;
        }
        (freqs, power)
    }

    fn fish_lines(f0: f64, n: usize, base: f64) -> Vec<(f64, f64)> {
        (1..=n)
            .map(|h| (h as f64 * f0, base / h as f64))
            .collect()
    }

    #[test]
    fn test_single_fish() {
        let (freqs, power) = spectrum(0.5, 5000.0, &fish_lines(613.0, 6, 1e-3));
        let config = HarmonicGroupConfig::default();

        let result = harmonic_groups(&freqs, &power, Thresholds::new(5.0, 10.0), &config).unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].fundamental(), 613.0);
        assert_eq!(result.groups[0].harmonics.len(), 6);
    }

    #[test]
    fn test_two_fish_sorted_by_frequency() {
        let mut lines = fish_lines(733.0, 5, 1e-3);
        lines.extend(fish_lines(611.0, 5, 1e-4));
        let (freqs, power) = spectrum(0.5, 5000.0, &lines);
        let config = HarmonicGroupConfig::default();

        let result = harmonic_groups(&freqs, &power, Thresholds::new(5.0, 10.0), &config).unwrap();
        let fundamentals = crate::spectral::fundamental_freqs(&result.groups);
        assert_eq!(fundamentals, vec![611.0, 733.0]);
    }

    #[test]
    fn test_subharmonic_fundamental() {
        // Second harmonic dominates; its own series (626, 1252, 1878, 2504)
        // is complete, but the full series of 313 Hz carries more power
        let mut lines: Vec<(f64, f64)> = (1..=8).map(|h| (h as f64 * 313.0, 1e-3)).collect();
        lines[1].1 = 1e-2;
        let (freqs, power) = spectrum(0.5, 5000.0, &lines);
        let config = HarmonicGroupConfig::default();

        let result = harmonic_groups(&freqs, &power, Thresholds::new(5.0, 10.0), &config).unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].fundamental(), 313.0);
        assert_eq!(result.groups[0].harmonics.len(), 8);
    }

    #[test]
    fn test_mains_hum_ignored() {
        let lines: Vec<(f64, f64)> = (1..=8).map(|h| (h as f64 * 60.0, 1e-2)).collect();
        let (freqs, power) = spectrum(0.5, 2000.0, &lines);
        let config = HarmonicGroupConfig::default();

        let result = harmonic_groups(&freqs, &power, Thresholds::new(5.0, 10.0), &config).unwrap();
        assert!(result.groups.is_empty());
    }

    #[test]
    fn test_thresholds_calibrated_when_unset() {
        let (freqs, power) = spectrum(0.5, 5000.0, &fish_lines(600.0, 6, 1e-3));
        let config = HarmonicGroupConfig::default();

        let result = harmonic_groups(&freqs, &power, Thresholds::default(), &config).unwrap();
        assert!(result.thresholds.is_set());
        assert!(result.thresholds.high > result.thresholds.low);
    }

    #[test]
    fn test_shape_mismatch() {
        let config = HarmonicGroupConfig::default();
        let result = harmonic_groups(&[0.0, 1.0], &[1.0], Thresholds::new(1.0, 2.0), &config);
        assert!(matches!(result, Err(SpectralError::ShapeMismatch { .. })));
    }
}
