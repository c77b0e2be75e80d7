//! Fixed-size max-pooled spectrogram raster
//!
//! Arbitrarily long recordings are folded window by window into a grid of
//! `freq_cells x time_cells`; each cell keeps the largest power of every
//! native spectrogram sample that falls into it.

use crate::config::RasterConfig;
use crate::spectral::{decibel, Spectrogram};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterDisplayBuffer {
    time_range: (f64, f64),
    freq_range: (f64, f64),
    time_cells: usize,
    freq_cells: usize,
    /// Row-major power, `[freq_cell][time_cell]`
    cells: Vec<f64>,
    /// Grid already matched to the native resolution
    fitted: bool,
}

impl RasterDisplayBuffer {
    /// Empty raster over `[start_time, end_time) x [min_freq, max_freq)`
    pub fn new(config: &RasterConfig, start_time: f64, end_time: f64) -> Self {
        let time_cells = config.time_cells.max(1);
        let freq_cells = config.freq_cells.max(1);
        Self {
            time_range: (start_time, end_time),
            freq_range: (config.min_freq, config.max_freq),
            time_cells,
            freq_cells,
            cells: vec![0.0; time_cells * freq_cells],
            fitted: false,
        }
    }

    pub fn time_cells(&self) -> usize {
        self.time_cells
    }

    pub fn freq_cells(&self) -> usize {
        self.freq_cells
    }

    pub fn time_range(&self) -> (f64, f64) {
        self.time_range
    }

    pub fn freq_range(&self) -> (f64, f64) {
        self.freq_range
    }

    /// Raw cell values, row-major by frequency
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn get(&self, freq_cell: usize, time_cell: usize) -> f64 {
        self.cells[freq_cell * self.time_cells + time_cell]
    }

    pub fn time_cell_size(&self) -> f64 {
        (self.time_range.1 - self.time_range.0) / self.time_cells as f64
    }

    pub fn freq_cell_size(&self) -> f64 {
        (self.freq_range.1 - self.freq_range.0) / self.freq_cells as f64
    }

    /// Cell values in dB
    pub fn decibel(&self) -> Vec<f64> {
        self.cells.iter().map(|&p| decibel(p)).collect()
    }

    /// Fold one window's spectrogram into the raster
    ///
    /// `time_offset` is added to the spectrogram's relative frame times.
    pub fn fold(&mut self, spec: &Spectrogram, time_offset: f64) {
        if !self.fitted {
            self.fit_to_native(spec);
        }

        let (t0, t1) = self.time_range;
        let (f0, f1) = self.freq_range;
        let time_size = self.time_cell_size();
        let freq_size = self.freq_cell_size();
        if time_size <= 0.0 || freq_size <= 0.0 {
            return;
        }

        let rows: Vec<(usize, usize)> = spec
            .freqs
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f >= f0 && f < f1)
            .map(|(bin, &f)| (bin, cell_index(f - f0, freq_size, self.freq_cells)))
            .collect();

        for (frame, &t) in spec.times.iter().enumerate() {
            let t = t + time_offset;
            if t < t0 || t >= t1 {
                continue;
            }
            let col = cell_index(t - t0, time_size, self.time_cells);
            for &(bin, row) in &rows {
                let cell = &mut self.cells[row * self.time_cells + col];
                *cell = cell.max(spec.power[bin][frame]);
            }
        }
    }

    /// Drop to native resolution where it is coarser than the target grid
    fn fit_to_native(&mut self, spec: &Spectrogram) {
        let mut time_cells = self.time_cells;
        let mut freq_cells = self.freq_cells;

        if spec.times.len() >= 2 {
            let dt = spec.times[1] - spec.times[0];
            let span = self.time_range.1 - self.time_range.0;
            if dt > span / time_cells as f64 {
                time_cells = ((span / dt).floor() as usize).max(1);
            }
        }
        if spec.freqs.len() >= 2 {
            let df = spec.freqs[1] - spec.freqs[0];
            let span = self.freq_range.1 - self.freq_range.0;
            if df > span / freq_cells as f64 {
                freq_cells = ((span / df).floor() as usize).max(1);
            }
        }

        if (time_cells, freq_cells) != (self.time_cells, self.freq_cells) {
            log::debug!(
                "Raster rebuilt at native resolution: {}x{} -> {}x{} cells",
                self.freq_cells,
                self.time_cells,
                freq_cells,
                time_cells
            );
            self.time_cells = time_cells;
            self.freq_cells = freq_cells;
            self.cells = vec![0.0; time_cells * freq_cells];
        }
        self.fitted = true;
    }
}

fn cell_index(offset: f64, size: f64, cells: usize) -> usize {
    ((offset / size) as usize).min(cells - 1)
}
