//! Windowed EOD extraction
//!
//! A recording is processed in windows of `snippet_size` seconds. For every
//! window all channels go through the spectral front end in parallel on a
//! persistent worker pool; the channel spectra are summed for the whole-array
//! analysis. Every estimate (a mean over `nffts_per_psd` frames) is searched
//! for harmonic groups, and each fundamental becomes one detection with the
//! per-channel decibel power at its frequency bin as signature.
//!
//! A window is staged completely before it is committed to the trace store,
//! so an aborted run keeps exactly the windows processed before the failure.

use crate::config::TrackerConfig;
use crate::error::{ExtractionError, SpectralError};
use crate::raster::RasterDisplayBuffer;
use crate::recording::SampleSource;
use crate::spectral::{decibel, fundamental_freqs, nearest_bin, FftFrontEnd, Spectrogram, SpectralFrontEnd, Thresholds};
use crate::store::{Detection, TraceStore, WindowDetections};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Fundamentals of the per-channel analysis, not identity tracked
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelLog {
    /// Time of every estimate (s)
    pub times: Vec<f64>,
    /// Fundamentals `[channel][time_bin]`
    pub fundamentals: Vec<Vec<Vec<f64>>>,
}

impl ChannelLog {
    fn new(channels: usize) -> Self {
        Self {
            times: Vec::new(),
            fundamentals: vec![Vec::new(); channels],
        }
    }
}

/// Outcome of one extraction run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub windows: usize,
    pub time_bins: usize,
    pub detections: usize,
    /// Analysed range (s)
    pub processed_from: f64,
    pub processed_to: f64,
    /// Whole-array thresholds in effect at the end of the run
    pub thresholds: Thresholds,
    /// Per-channel thresholds in effect at the end of the run
    pub channel_thresholds: Thresholds,
}

/// Sample range of one run
struct Span {
    start_idx: usize,
    end_idx: usize,
    window_len: usize,
}

/// Drives a [`SpectralFrontEnd`] over a recording
pub struct WindowedExtractor<F: SpectralFrontEnd = FftFrontEnd> {
    front_end: F,
    config: TrackerConfig,
    pool: rayon::ThreadPool,
    thresholds: Thresholds,
    channel_thresholds: Thresholds,
    raster: Option<RasterDisplayBuffer>,
    channel_rasters: Vec<RasterDisplayBuffer>,
    channel_log: ChannelLog,
}

impl WindowedExtractor<FftFrontEnd> {
    /// Extractor with the built-in FFT front end
    pub fn with_fft(config: TrackerConfig) -> Result<Self, ExtractionError> {
        Self::new(FftFrontEnd::new(), config)
    }
}

impl<F: SpectralFrontEnd> WindowedExtractor<F> {
    /// Build the extractor and its worker pool (half the available cores)
    pub fn new(front_end: F, config: TrackerConfig) -> Result<Self, ExtractionError> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get() / 2)
            .unwrap_or(1)
            .max(1);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        log::debug!("Extraction worker pool: {} threads", threads);

        let hg = &config.harmonic_groups;
        let thresholds = Thresholds::new(hg.low_threshold_g, hg.high_threshold_g);
        let channel_thresholds = Thresholds::new(hg.low_threshold, hg.high_threshold);

        Ok(Self {
            front_end,
            config,
            pool,
            thresholds,
            channel_thresholds,
            raster: None,
            channel_rasters: Vec::new(),
            channel_log: ChannelLog::default(),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Whole-array thresholds (calibrated once the first window is through)
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn channel_thresholds(&self) -> Thresholds {
        self.channel_thresholds
    }

    /// Raster of the summed spectrum
    pub fn raster(&self) -> Option<&RasterDisplayBuffer> {
        self.raster.as_ref()
    }

    /// Per-channel rasters; empty unless per-channel analysis is on
    pub fn channel_rasters(&self) -> &[RasterDisplayBuffer] {
        &self.channel_rasters
    }

    pub fn channel_log(&self) -> &ChannelLog {
        &self.channel_log
    }

    /// Process the configured time range of `source` into `store`
    ///
    /// `progress` receives the processed fraction after every window.
    pub fn run<P>(
        &mut self,
        source: &dyn SampleSource,
        store: &mut TraceStore,
        mut progress: P,
    ) -> Result<ExtractionSummary, ExtractionError>
    where
        P: FnMut(f64),
    {
        let channels = source.channels();
        if channels == 0 || channels != store.num_channels() {
            return Err(ExtractionError::ChannelMismatch {
                expected: store.num_channels(),
                found: channels,
            });
        }

        let samplerate = source.samplerate();
        let spec_cfg = self.config.spectrogram.clone();
        let Some(span) = self.span(source) else {
            log::info!("Nothing to analyse: start of range is at or past its end");
            return Ok(self.summary(0, 0, 0, spec_cfg.start_time, spec_cfg.start_time));
        };

        let end_time = if spec_cfg.end_time < 0.0 {
            source.duration()
        } else {
            spec_cfg.end_time
        };
        self.init_outputs(channels, spec_cfg.start_time, end_time);

        let stride = self
            .front_end
            .frame_stride(samplerate, spec_cfg.freq_resolution, spec_cfg.overlap_frac);
        let pooled = spec_cfg.nffts_per_psd.max(1);
        let processed_from = span.start_idx as f64 / samplerate;

        log::info!(
            "Extracting {:.1}s - {:.1}s from {} channels ({:.1}s windows)",
            processed_from,
            span.end_idx as f64 / samplerate,
            channels,
            span.window_len as f64 / samplerate
        );

        let mut start_idx = span.start_idx;
        let (mut windows, mut time_bins, mut detections) = (0, 0, 0);

        loop {
            let last_run = start_idx >= span.end_idx.saturating_sub(span.window_len);
            let spectral_err = |err: SpectralError| ExtractionError::Spectral {
                processed_from,
                processed_to: start_idx as f64 / samplerate,
                source: err,
            };

            let spectra = self
                .channel_spectra(source, start_idx, span.window_len)
                .map_err(spectral_err)?;
            let offset = start_idx as f64 / samplerate;
            let staged = self.analyse_window(&spectra, offset, pooled).map_err(spectral_err)?;

            let estimates = staged.window.times.len();
            time_bins += estimates;
            detections += staged.window.detections.len();
            self.commit(staged, &spectra, store, offset)?;
            windows += 1;

            start_idx += estimates * stride;
            let fraction = ((start_idx - span.start_idx) as f64
                / (span.end_idx - span.start_idx) as f64)
                .min(1.0);
            log::debug!(
                "Window {} done at {:.1}s ({:.1}%)",
                windows,
                start_idx as f64 / samplerate,
                fraction * 100.0
            );
            progress(fraction);

            if start_idx >= span.end_idx || last_run {
                break;
            }
        }

        let processed_to = start_idx.min(span.end_idx) as f64 / samplerate;
        log::info!(
            "Extracted {} detections in {} time bins from {} windows",
            detections,
            time_bins,
            windows
        );
        Ok(self.summary(windows, time_bins, detections, processed_from, processed_to))
    }

    /// Sample range of the configured time range; `None` when it is empty
    fn span(&self, source: &dyn SampleSource) -> Option<Span> {
        let cfg = &self.config.spectrogram;
        let samplerate = source.samplerate();
        let last = source.len().checked_sub(1)?;

        let start_idx = (cfg.start_time * samplerate) as usize;
        let end_idx = if cfg.end_time < 0.0 {
            last
        } else {
            ((cfg.end_time * samplerate) as usize).min(last)
        };
        if start_idx >= end_idx {
            return None;
        }

        let window_len = ((cfg.snippet_size * samplerate) as usize).max(1);
        Some(Span {
            start_idx,
            end_idx,
            window_len,
        })
    }

    fn init_outputs(&mut self, channels: usize, start_time: f64, end_time: f64) {
        if self.raster.is_none() {
            self.raster = Some(RasterDisplayBuffer::new(&self.config.raster, start_time, end_time));
        }
        if self.config.spectrogram.single_channel && self.channel_rasters.len() != channels {
            self.channel_rasters = (0..channels)
                .map(|_| RasterDisplayBuffer::new(&self.config.raster, start_time, end_time))
                .collect();
        }
        if self.channel_log.fundamentals.len() != channels {
            self.channel_log = ChannelLog::new(channels);
        }
    }

    /// One spectrogram per channel, computed on the worker pool
    fn channel_spectra(
        &self,
        source: &dyn SampleSource,
        start_idx: usize,
        window_len: usize,
    ) -> Result<Vec<Spectrogram>, SpectralError> {
        let cfg = &self.config.spectrogram;
        let front_end = &self.front_end;
        let samplerate = source.samplerate();

        self.pool.install(|| {
            (0..source.channels())
                .into_par_iter()
                .map(|ch| {
                    let samples = source.read_channel(ch, start_idx, start_idx + window_len);
                    front_end.spectrogram(&samples, samplerate, cfg.freq_resolution, cfg.overlap_frac)
                })
                .collect()
        })
    }

    /// Harmonic-group search over every estimate of one window
    fn analyse_window(
        &self,
        spectra: &[Spectrogram],
        offset: f64,
        pooled: usize,
    ) -> Result<StagedWindow, SpectralError> {
        let combined = if spectra.len() == 1 {
            spectra[0].clone()
        } else {
            Spectrogram::sum(spectra).ok_or(SpectralError::EmptyInput)?
        };
        if combined.num_frames() == 0 {
            return Err(SpectralError::EmptyInput);
        }
        let estimates = combined.num_frames().saturating_sub(pooled) + 1;
        let hg_cfg = &self.config.harmonic_groups;
        let spec_cfg = &self.config.spectrogram;

        let mut staged = StagedWindow {
            window: WindowDetections {
                times: (0..estimates).map(|i| combined.times[i] + offset).collect(),
                detections: Vec::new(),
            },
            combined_thresholds: None,
            channel_fundamentals: Vec::new(),
            channel_thresholds: None,
        };

        if spec_cfg.multi_channel {
            let mut thresholds = self.thresholds;
            for i in 0..estimates {
                let power = combined.pooled(i, pooled);
                let result = self
                    .front_end
                    .harmonic_groups(&combined.freqs, &power, thresholds, hg_cfg)?;
                // The first estimate calibrates; the rest of the window reuses it
                if !thresholds.is_set() {
                    thresholds = result.thresholds;
                    staged.combined_thresholds = Some(result.thresholds);
                }

                for freq in fundamental_freqs(&result.groups) {
                    let bin = nearest_bin(&combined.freqs, freq);
                    let signature = spectra
                        .iter()
                        .map(|s| decibel(s.pooled_bin(bin, i, pooled)))
                        .collect();
                    staged.window.detections.push(Detection {
                        time_bin: i,
                        freq,
                        signature,
                    });
                }
            }
        }

        if spec_cfg.single_channel {
            let mut thresholds = self.channel_thresholds;
            for spec in spectra {
                let mut per_bin = Vec::with_capacity(estimates);
                for i in 0..estimates {
                    let power = spec.pooled(i, pooled);
                    let result = self
                        .front_end
                        .harmonic_groups(&spec.freqs, &power, thresholds, hg_cfg)?;
                    // Calibrated once, then shared by every later estimate and channel
                    if !thresholds.is_set() {
                        thresholds = result.thresholds;
                        staged.channel_thresholds = Some(result.thresholds);
                    }
                    per_bin.push(fundamental_freqs(&result.groups));
                }
                staged.channel_fundamentals.push(per_bin);
            }
        }

        Ok(staged)
    }

    /// Publish a staged window to the store, the rasters and the channel log
    fn commit(
        &mut self,
        staged: StagedWindow,
        spectra: &[Spectrogram],
        store: &mut TraceStore,
        offset: f64,
    ) -> Result<(), ExtractionError> {
        let times = staged.window.times.clone();
        store.append_window(staged.window)?;

        if !self.thresholds.is_set() {
            if let Some(t) = staged.combined_thresholds {
                log::info!("Whole-array thresholds calibrated: low {:.2} dB, high {:.2} dB", t.low, t.high);
                self.thresholds = t;
            }
        }
        if !self.channel_thresholds.is_set() {
            if let Some(t) = staged.channel_thresholds {
                log::info!("Per-channel thresholds calibrated: low {:.2} dB, high {:.2} dB", t.low, t.high);
                self.channel_thresholds = t;
            }
        }

        if let Some(raster) = self.raster.as_mut() {
            match Spectrogram::sum(spectra) {
                Some(combined) => raster.fold(&combined, offset),
                None => log::warn!("Window without spectra, raster not updated"),
            }
        }
        for (raster, spec) in self.channel_rasters.iter_mut().zip(spectra) {
            raster.fold(spec, offset);
        }

        if !staged.channel_fundamentals.is_empty() {
            self.channel_log.times.extend(times);
            for (log, per_bin) in self
                .channel_log
                .fundamentals
                .iter_mut()
                .zip(staged.channel_fundamentals)
            {
                log.extend(per_bin);
            }
        }
        Ok(())
    }

    fn summary(
        &self,
        windows: usize,
        time_bins: usize,
        detections: usize,
        processed_from: f64,
        processed_to: f64,
    ) -> ExtractionSummary {
        ExtractionSummary {
            windows,
            time_bins,
            detections,
            processed_from,
            processed_to,
            thresholds: self.thresholds,
            channel_thresholds: self.channel_thresholds,
        }
    }
}

/// Everything one window contributes, before it is committed
struct StagedWindow {
    window: WindowDetections,
    combined_thresholds: Option<Thresholds>,
    /// `[channel][estimate]` fundamentals of the per-channel analysis
    channel_fundamentals: Vec<Vec<Vec<f64>>>,
    channel_thresholds: Option<Thresholds>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarmonicGroupConfig;
    use crate::recording::InMemoryRecording;
    use crate::spectral::{HarmonicGroup, HarmonicGroups};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const HOP: usize = 100;

    /// One frame per 100 samples, eleven 1 Hz bins; bin 5 carries the
    /// squared sample value, everything else is noise
    struct MockFrontEnd {
        calls: AtomicUsize,
        fail_from_call: Option<usize>,
        /// Thresholds handed to every harmonic-group search, in call order
        seen: Mutex<Vec<Thresholds>>,
    }

    impl MockFrontEnd {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_from_call: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing_from(call: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_from_call: Some(call),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl SpectralFrontEnd for MockFrontEnd {
        fn spectrogram(
            &self,
            samples: &[f64],
            samplerate: f64,
            _freq_resolution: f64,
            _overlap_frac: f64,
        ) -> Result<Spectrogram, SpectralError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_from_call.map_or(false, |n| call >= n) {
                return Err(SpectralError::Backend("mock failure".to_string()));
            }

            let frames = (samples.len() / HOP).max(1);
            let level = samples.first().copied().unwrap_or(0.0).powi(2);
            let power = (0..11)
                .map(|bin| vec![if bin == 5 { level } else { 1e-6 }; frames])
                .collect();
            Ok(Spectrogram {
                power,
                freqs: (0..11).map(|f| f as f64).collect(),
                times: (0..frames).map(|i| (i * HOP) as f64 / samplerate).collect(),
            })
        }

        fn harmonic_groups(
            &self,
            freqs: &[f64],
            power: &[f64],
            thresholds: Thresholds,
            _config: &HarmonicGroupConfig,
        ) -> Result<HarmonicGroups, SpectralError> {
            self.seen.lock().unwrap().push(thresholds);
            let groups = freqs
                .iter()
                .zip(power)
                .filter(|&(_, &p)| p > 1.5)
                .map(|(&f, &p)| HarmonicGroup {
                    harmonics: vec![(f, decibel(p))],
                })
                .collect();
            let thresholds = if thresholds.is_set() {
                thresholds
            } else {
                Thresholds::new(1.0, 2.0)
            };
            Ok(HarmonicGroups { groups, thresholds })
        }

        fn frame_stride(&self, _samplerate: f64, _freq_resolution: f64, _overlap_frac: f64) -> usize {
            HOP
        }
    }

    /// Two channels at 1 kHz, 5 s; channel 0 at level 1, channel 1 at level 2
    fn recording() -> InMemoryRecording {
        InMemoryRecording::new(1000.0, vec![vec![1.0; 5000], vec![2.0; 5000]]).unwrap()
    }

    /// Consecutive estimate times of the store are exactly one hop apart
    fn assert_regular_steps(store: &TraceStore, step: f64) {
        for pair in store.times().windows(2) {
            assert!(
                ((pair[1] - pair[0]) - step).abs() < 1e-9,
                "irregular step {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    fn config() -> TrackerConfig {
        let mut config = TrackerConfig::default();
        config.spectrogram.snippet_size = 1.0;
        config
    }

    #[test]
    fn test_windows_cover_recording() {
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config()).unwrap();
        let mut store = TraceStore::new(2);
        let mut reports = Vec::new();

        let summary = extractor
            .run(&recording(), &mut store, |p| reports.push(p))
            .unwrap();

        assert_eq!(summary.windows, 5);
        assert_eq!(summary.time_bins, 50);
        assert_eq!(store.times().len(), 50);
        assert_eq!(store.len(), 50);
        assert!(store.check_invariants().is_ok());
        assert!((store.times()[10] - 1.0).abs() < 1e-12);
        assert!(store.fund_v().iter().all(|&f| f == 5.0));
        assert_eq!(reports.len(), 5);
        assert_eq!(reports.last().copied(), Some(1.0));
    }

    #[test]
    fn test_signatures_and_calibration() {
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config()).unwrap();
        let mut store = TraceStore::new(2);
        let summary = extractor.run(&recording(), &mut store, |_| {}).unwrap();

        let signature = &store.sign_v()[0];
        assert_eq!(signature[0], 0.0);
        assert!((signature[1] - 10.0 * 4f64.log10()).abs() < 1e-12);
        assert_eq!(summary.thresholds, Thresholds::new(1.0, 2.0));
        assert_eq!(extractor.thresholds(), Thresholds::new(1.0, 2.0));
    }

    #[test]
    fn test_per_channel_analysis() {
        let mut config = config();
        config.spectrogram.single_channel = true;
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config).unwrap();
        let mut store = TraceStore::new(2);
        extractor.run(&recording(), &mut store, |_| {}).unwrap();

        let log = extractor.channel_log();
        assert_eq!(log.times.len(), 50);
        assert!(log.fundamentals[0].iter().all(|f| f.is_empty()));
        assert!(log.fundamentals[1].iter().all(|f| f == &vec![5.0]));
        assert_eq!(extractor.channel_rasters().len(), 2);
        assert_eq!(extractor.channel_thresholds(), Thresholds::new(1.0, 2.0));
    }

    #[test]
    fn test_failure_keeps_committed_windows() {
        // Two spectrogram calls per window: the second window fails
        let mut extractor = WindowedExtractor::new(MockFrontEnd::failing_from(2), config()).unwrap();
        let mut store = TraceStore::new(2);

        let err = extractor.run(&recording(), &mut store, |_| {}).unwrap_err();
        match err {
            ExtractionError::Spectral {
                processed_from,
                processed_to,
                ..
            } => {
                assert_eq!(processed_from, 0.0);
                assert_eq!(processed_to, 1.0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.times().len(), 10);
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_empty_range_is_noop() {
        let mut config = config();
        config.spectrogram.start_time = 10.0;
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config).unwrap();
        let mut store = TraceStore::new(2);

        let summary = extractor.run(&recording(), &mut store, |_| {}).unwrap();
        assert_eq!(summary.windows, 0);
        assert!(store.is_empty());
        assert!(extractor.raster().is_none());
    }

    #[test]
    fn test_channel_mismatch() {
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config()).unwrap();
        let mut store = TraceStore::new(3);
        let err = extractor.run(&recording(), &mut store, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ChannelMismatch {
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_raster_bounded() {
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config()).unwrap();
        let mut store = TraceStore::new(2);
        extractor.run(&recording(), &mut store, |_| {}).unwrap();

        let raster = extractor.raster().unwrap();
        assert!(raster.time_cells() <= 3200);
        assert_eq!(raster.cells().len(), raster.time_cells() * raster.freq_cells());
        assert!(raster.cells().iter().any(|&c| c == 5.0));
    }

    #[test]
    fn test_pooled_estimates_hand_off_without_gaps() {
        let mut config = config();
        config.spectrogram.nffts_per_psd = 3;
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config).unwrap();
        let mut store = TraceStore::new(2);

        let summary = extractor.run(&recording(), &mut store, |_| {}).unwrap();

        // Ten frames per window give eight estimates; the next window starts
        // at the first frame not yet used as an estimate start
        assert_eq!(store.times()[7], 0.7);
        assert!((store.times()[8] - 0.8).abs() < 1e-12);
        assert_regular_steps(&store, 0.1);
        assert_eq!(summary.time_bins, store.times().len());
        assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_partial_last_window() {
        // 4.55 s: the last window only holds 550 samples
        let source = InMemoryRecording::new(1000.0, vec![vec![1.0; 4550], vec![2.0; 4550]]).unwrap();
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config()).unwrap();
        let mut store = TraceStore::new(2);

        let summary = extractor.run(&source, &mut store, |_| {}).unwrap();
        assert_eq!(summary.windows, 5);
        assert_eq!(summary.time_bins, 45);
        assert!((summary.processed_to - 4.5).abs() < 1e-12);
        assert_regular_steps(&store, 0.1);
    }

    #[test]
    fn test_pooled_partial_last_window() {
        let mut config = config();
        config.spectrogram.nffts_per_psd = 3;
        let source = InMemoryRecording::new(1000.0, vec![vec![1.0; 4550], vec![2.0; 4550]]).unwrap();
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config).unwrap();
        let mut store = TraceStore::new(2);

        let summary = extractor.run(&source, &mut store, |_| {}).unwrap();

        // Windows start at 0, 0.8, 1.6, 2.4, 3.2 and 4.0 s; the last one is
        // 550 samples long and yields three estimates
        assert_eq!(summary.windows, 6);
        assert_eq!(summary.time_bins, 43);
        assert!((store.times().last().copied().unwrap() - 4.2).abs() < 1e-12);
        assert_regular_steps(&store, 0.1);
    }

    #[test]
    fn test_first_window_uses_calibrated_thresholds() {
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config()).unwrap();
        let mut store = TraceStore::new(2);
        extractor.run(&recording(), &mut store, |_| {}).unwrap();

        let seen = extractor.front_end.seen.lock().unwrap();
        assert_eq!(seen.len(), 50);
        assert!(!seen[0].is_set());
        assert!(seen[1..].iter().all(|&t| t == Thresholds::new(1.0, 2.0)));
    }

    #[test]
    fn test_channels_share_calibrated_thresholds() {
        let mut config = config();
        config.spectrogram.multi_channel = false;
        config.spectrogram.single_channel = true;
        let mut extractor = WindowedExtractor::new(MockFrontEnd::new(), config).unwrap();
        let mut store = TraceStore::new(2);
        extractor.run(&recording(), &mut store, |_| {}).unwrap();

        let seen = extractor.front_end.seen.lock().unwrap();
        assert_eq!(seen.len(), 100);
        assert_eq!(seen.iter().filter(|t| !t.is_set()).count(), 1);
    }
}
