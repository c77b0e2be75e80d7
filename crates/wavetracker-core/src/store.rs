//! Identity-tagged detection log and trace curation
//!
//! The store keeps one entry per detection in parallel arrays (`fund_v`,
//! `idx_v`, `ident_v`, `sign_v`) plus the time axis `times`. Extraction only
//! appends; curation only rewrites identity labels. Every curation operation
//! first collects its label changes from `&self` and then applies them, so a
//! rejected request leaves the store untouched.

use crate::error::{CurationError, InvariantError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use wavetracker_log::{ident_from_f64, ident_to_f64, LogFile, LogFormatError, LogMeta};


/// One detection produced by a window, before it is committed
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Time bin relative to the window's own time axis
    pub time_bin: usize,
    /// Fundamental frequency (Hz)
    pub freq: f64,
    /// Power per electrode (dB)
    pub signature: Vec<f64>,
}

/// Staged output of one extraction window
#[derive(Debug, Clone, Default)]
pub struct WindowDetections {
    /// Absolute time of every estimate in the window (s)
    pub times: Vec<f64>,
    pub detections: Vec<Detection>,
}

/// Listing entry for one trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub ident: u32,
    pub detections: usize,
    pub first_time: f64,
    pub last_time: f64,
    pub mean_freq: f64,
}

/// Detection log plus identity labels
#[derive(Debug, Clone, Default)]
pub struct TraceStore {
    times: Vec<f64>,
    fund_v: Vec<f64>,
    idx_v: Vec<usize>,
    ident_v: Vec<Option<u32>>,
    sign_v: Vec<Vec<f64>>,
    num_channels: usize,
    /// Highest label ever seen; fresh labels start above it
    max_label: Option<u32>,
}

impl TraceStore {
    pub fn new(num_channels: usize) -> Self {
        Self {
            num_channels,
            ..Default::default()
        }
    }

    /// Build a store from existing arrays, checking every invariant
    pub fn from_parts(
        times: Vec<f64>,
        fund_v: Vec<f64>,
        idx_v: Vec<usize>,
        ident_v: Vec<Option<u32>>,
        sign_v: Vec<Vec<f64>>,
        num_channels: usize,
    ) -> Result<Self, InvariantError> {
        let max_label = ident_v.iter().flatten().copied().max();
        let store = Self {
            times,
            fund_v,
            idx_v,
            ident_v,
            sign_v,
            num_channels,
            max_label,
        };
        store.check_invariants()?;
        Ok(store)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn fund_v(&self) -> &[f64] {
        &self.fund_v
    }

    pub fn idx_v(&self) -> &[usize] {
        &self.idx_v
    }

    pub fn ident_v(&self) -> &[Option<u32>] {
        &self.ident_v
    }

    pub fn sign_v(&self) -> &[Vec<f64>] {
        &self.sign_v
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of detections
    pub fn len(&self) -> usize {
        self.fund_v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fund_v.is_empty()
    }

    /// Time of detection `k`
    pub fn time_of(&self, k: usize) -> f64 {
        self.times[self.idx_v[k]]
    }

    /// Commit one window: its time bins and all of its detections
    ///
    /// The window is checked as a whole first; on error nothing is appended.
    pub fn append_window(&mut self, window: WindowDetections) -> Result<(), InvariantError> {
        let offset = self.times.len();

        let mut last = self.times.last().copied();
        for (i, &t) in window.times.iter().enumerate() {
            if last.map_or(false, |prev| t <= prev) {
                return Err(InvariantError::TimesNotIncreasing { index: offset + i });
            }
            last = Some(t);
        }
        for (i, det) in window.detections.iter().enumerate() {
            if det.time_bin >= window.times.len() {
                return Err(InvariantError::TimeIndexOutOfRange {
                    index: self.len() + i,
                    idx: offset + det.time_bin,
                    num_times: offset + window.times.len(),
                });
            }
            if det.signature.len() != self.num_channels {
                return Err(InvariantError::ChannelMismatch {
                    index: self.len() + i,
                    expected: self.num_channels,
                    found: det.signature.len(),
                });
            }
        }

        let mut detections = window.detections;
        detections.sort_by_key(|d| d.time_bin);

        self.times.extend(window.times);
        for det in detections {
            self.fund_v.push(det.freq);
            self.idx_v.push(offset + det.time_bin);
            self.ident_v.push(None);
            self.sign_v.push(det.signature);
        }
        Ok(())
    }

    /// Replace all labels with the output of an automatic sorter
    pub fn assign_identities(&mut self, labels: Vec<Option<u32>>) -> Result<(), InvariantError> {
        if labels.len() != self.len() {
            return Err(InvariantError::LengthMismatch {
                field: "ident_v",
                expected: self.len(),
                found: labels.len(),
            });
        }
        check_overlaps(&self.idx_v, &labels)?;

        let max = labels.iter().flatten().copied().max();
        self.max_label = self.max_label.max(max);
        self.ident_v = labels;
        Ok(())
    }

    /// Structural check of all arrays
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let n = self.fund_v.len();
        for (field, found) in [
            ("idx_v", self.idx_v.len()),
            ("ident_v", self.ident_v.len()),
            ("sign_v", self.sign_v.len()),
        ] {
            if found != n {
                return Err(InvariantError::LengthMismatch {
                    field,
                    expected: n,
                    found,
                });
            }
        }

        if let Some(i) = self.times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(InvariantError::TimesNotIncreasing { index: i + 1 });
        }

        for (index, &idx) in self.idx_v.iter().enumerate() {
            if idx >= self.times.len() {
                return Err(InvariantError::TimeIndexOutOfRange {
                    index,
                    idx,
                    num_times: self.times.len(),
                });
            }
        }

        for (index, sign) in self.sign_v.iter().enumerate() {
            if sign.len() != self.num_channels {
                return Err(InvariantError::ChannelMismatch {
                    index,
                    expected: self.num_channels,
                    found: sign.len(),
                });
            }
        }

        check_overlaps(&self.idx_v, &self.ident_v)
    }

    /// Assigned detections inside a time x frequency rectangle
    ///
    /// Bounds are half-open and may be given in either order.
    pub fn select_rect(&self, time_range: (f64, f64), freq_range: (f64, f64)) -> Vec<usize> {
        let (t0, t1) = ordered(time_range);
        let (f0, f1) = ordered(freq_range);
        (0..self.len())
            .filter(|&k| {
                let t = self.time_of(k);
                let f = self.fund_v[k];
                self.ident_v[k].is_some() && f >= f0 && f < f1 && t >= t0 && t < t1
            })
            .collect()
    }

    /// Second rectangle selection, disjoint from `exclude`
    pub fn select_rect_excluding(
        &self,
        time_range: (f64, f64),
        freq_range: (f64, f64),
        exclude: &[usize],
    ) -> Vec<usize> {
        let exclude: HashSet<usize> = exclude.iter().copied().collect();
        self.select_rect(time_range, freq_range)
            .into_iter()
            .filter(|k| !exclude.contains(k))
            .collect()
    }

    /// Sorted unique labels of a selection
    pub fn identities_in(&self, selection: &[usize]) -> Vec<u32> {
        let mut ids: Vec<u32> = selection
            .iter()
            .filter_map(|&k| self.ident_v.get(k).copied().flatten())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Detection indices of one trace, in time order
    pub fn trace_indices(&self, ident: u32) -> Vec<usize> {
        (0..self.len())
            .filter(|&k| self.ident_v[k] == Some(ident))
            .collect()
    }

    pub fn contains_identity(&self, ident: u32) -> bool {
        self.ident_v.contains(&Some(ident))
    }

    /// First detection of `ident` at or after time `t`
    pub fn split_point_at(&self, ident: u32, t: f64) -> Option<usize> {
        self.trace_indices(ident)
            .into_iter()
            .find(|&k| self.time_of(k) >= t)
    }

    /// Label `cut` would mint next
    pub fn next_identity(&self) -> Result<u32, CurationError> {
        match self.max_label {
            None => Ok(0),
            Some(m) => m.checked_add(1).ok_or(CurationError::LabelsExhausted),
        }
    }

    /// Highest label ever used, including labels no detection carries anymore
    pub fn max_label(&self) -> Option<u32> {
        self.max_label
    }

    /// Keep labels up to `mark` from being minted again
    ///
    /// Used when a log remembers labels that were freed before it was saved.
    pub fn reserve_labels(&mut self, mark: Option<u32>) {
        self.max_label = self.max_label.max(mark);
    }

    /// Per-trace listing, ordered by label
    pub fn traces(&self) -> Vec<TraceSummary> {
        let mut acc: BTreeMap<u32, (usize, f64, f64, f64)> = BTreeMap::new();
        for k in 0..self.len() {
            let Some(ident) = self.ident_v[k] else {
                continue;
            };
            let t = self.time_of(k);
            let entry = acc.entry(ident).or_insert((0, t, t, 0.0));
            entry.0 += 1;
            entry.1 = entry.1.min(t);
            entry.2 = entry.2.max(t);
            entry.3 += self.fund_v[k];
        }

        acc.into_iter()
            .map(|(ident, (count, first, last, freq_sum))| TraceSummary {
                ident,
                detections: count,
                first_time: first,
                last_time: last,
                mean_freq: freq_sum / count as f64,
            })
            .collect()
    }

    /// Split a trace in two
    ///
    /// Detections of `ident` in time bins before the bin of `split_idx` move
    /// to a fresh label, which is returned; `split_idx` and everything after
    /// it keep `ident`.
    pub fn cut(&mut self, ident: u32, split_idx: usize) -> Result<u32, CurationError> {
        self.check_index(split_idx)?;
        if !self.contains_identity(ident) {
            return Err(CurationError::UnknownIdentity(ident));
        }
        if self.ident_v[split_idx] != Some(ident) {
            return Err(CurationError::SplitNotInTrace {
                ident,
                index: split_idx,
            });
        }

        let split_bin = self.idx_v[split_idx];
        let before: Vec<usize> = self
            .trace_indices(ident)
            .into_iter()
            .filter(|&k| self.idx_v[k] < split_bin)
            .collect();
        if before.is_empty() {
            return Err(CurationError::NothingBeforeSplit {
                ident,
                index: split_idx,
            });
        }

        let fresh = self.next_identity()?;
        let changes: Vec<(usize, Option<u32>)> = before.into_iter().map(|k| (k, Some(fresh))).collect();
        self.apply(changes);
        self.max_label = Some(fresh);

        log::debug!("Cut identity {} at detection {}: head is now {}", ident, split_idx, fresh);
        Ok(fresh)
    }

    /// Merge `b` into `a`
    ///
    /// Where both traces have a detection in the same time bin, the one of
    /// `a` is unassigned. Returns the number of detections dropped that way.
    pub fn connect(&mut self, a: u32, b: u32) -> Result<usize, CurationError> {
        if a == b {
            return Err(CurationError::SameIdentity(a));
        }
        for ident in [a, b] {
            if !self.contains_identity(ident) {
                return Err(CurationError::UnknownIdentity(ident));
            }
        }

        let mut target = self.trace_indices(a);
        let mut changes = Vec::new();
        let dropped = self.merge_into(&mut target, a, b, &mut changes);
        self.apply(changes);

        log::debug!("Connected identity {} into {} ({} overlaps dropped)", b, a, dropped);
        Ok(dropped)
    }

    /// Unassign every detection of `ident`; returns how many were affected
    pub fn delete(&mut self, ident: u32) -> usize {
        let members = self.trace_indices(ident);
        if members.is_empty() {
            log::warn!("Identity {} has no detections, nothing deleted", ident);
            return 0;
        }
        let count = members.len();
        self.apply(members.into_iter().map(|k| (k, None)).collect());
        count
    }

    /// Merge several traces into the first one
    ///
    /// Every other identity is resolved against the target as it stands
    /// after the previous merges, exactly like [`TraceStore::connect`].
    pub fn group_connect(&mut self, ids: &[u32]) -> Result<u32, CurationError> {
        let mut unique: Vec<u32> = Vec::with_capacity(ids.len());
        for &id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.len() < 2 {
            return Err(CurationError::TooFewIdentities {
                needed: 2,
                found: unique.len(),
            });
        }
        if let Some(&missing) = unique.iter().find(|&&id| !self.contains_identity(id)) {
            return Err(CurationError::UnknownIdentity(missing));
        }

        let target = unique[0];
        let mut members = self.trace_indices(target);
        let mut changes = Vec::new();
        let mut dropped = 0;
        for &other in &unique[1..] {
            dropped += self.merge_into(&mut members, target, other, &mut changes);
        }
        self.apply(changes);

        log::debug!(
            "Group-connected {} identities into {} ({} overlaps dropped)",
            unique.len(),
            target,
            dropped
        );
        Ok(target)
    }

    /// Unassign an arbitrary selection of detections
    ///
    /// An empty selection is inert and reports zero affected detections.
    pub fn group_delete(&mut self, selection: &[usize]) -> Result<usize, CurationError> {
        if selection.is_empty() {
            log::warn!("Empty selection, nothing deleted");
            return Ok(0);
        }
        for &k in selection {
            self.check_index(k)?;
        }

        let changes: Vec<(usize, Option<u32>)> = selection
            .iter()
            .filter(|&&k| self.ident_v[k].is_some())
            .map(|&k| (k, None))
            .collect();
        let count = changes.len();
        if count == 0 {
            log::warn!("Selection holds no assigned detections, nothing deleted");
        }
        self.apply(changes);
        Ok(count)
    }

    /// Export to the persisted log layout
    pub fn to_log_file(&self, meta: LogMeta) -> Result<LogFile, LogFormatError> {
        let mut log = LogFile::new(
            meta,
            self.num_channels,
            self.times.clone(),
            self.fund_v.clone(),
            self.idx_v.iter().map(|&i| i as u64).collect(),
            self.ident_v.iter().map(|&id| ident_to_f64(id)).collect(),
            self.sign_v.clone(),
        )?;
        log.header.set_max_label(self.max_label);
        Ok(log)
    }

    /// Rebuild a store from a persisted log
    ///
    /// Labels freed before the log was saved stay reserved.
    pub fn from_log_file(log: &LogFile) -> Result<Self, InvariantError> {
        let ident_v = log
            .ident_v
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                ident_from_f64(value).map_err(|_| InvariantError::InvalidIdentity { index, value })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut store = Self::from_parts(
            log.times.clone(),
            log.fund_v.clone(),
            log.idx_v.iter().map(|&i| i as usize).collect(),
            ident_v,
            log.sign_v.clone(),
            log.header.num_channels as usize,
        )?;
        store.reserve_labels(log.header.max_label());
        Ok(store)
    }

    /// Stage the merge of `other` into `target`
    ///
    /// `members` holds the current detections of `target` (with earlier staged
    /// changes applied) and is updated in place.
    fn merge_into(
        &self,
        members: &mut Vec<usize>,
        target: u32,
        other: u32,
        changes: &mut Vec<(usize, Option<u32>)>,
    ) -> usize {
        let incoming = self.trace_indices(other);
        let bins: HashSet<usize> = incoming.iter().map(|&k| self.idx_v[k]).collect();

        let before = members.len();
        members.retain(|&k| {
            let overlap = bins.contains(&self.idx_v[k]);
            if overlap {
                changes.push((k, None));
            }
            !overlap
        });
        let dropped = before - members.len();

        changes.extend(incoming.iter().map(|&k| (k, Some(target))));
        members.extend(incoming);
        dropped
    }

    fn apply(&mut self, changes: Vec<(usize, Option<u32>)>) {
        for (k, label) in changes {
            self.ident_v[k] = label;
        }
    }

    fn check_index(&self, index: usize) -> Result<(), CurationError> {
        if index >= self.len() {
            return Err(CurationError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }
}

fn ordered((a, b): (f64, f64)) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// At most one detection per (label, time bin)
fn check_overlaps(idx_v: &[usize], ident_v: &[Option<u32>]) -> Result<(), InvariantError> {
    let mut seen = HashSet::new();
    for (&idx, ident) in idx_v.iter().zip(ident_v) {
        if let Some(ident) = *ident {
            if !seen.insert((ident, idx)) {
                return Err(InvariantError::OverlappingTrace { ident, idx });
            }
        }
    }
    Ok(())
}
