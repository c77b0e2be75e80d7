//! Fish position from per-electrode power signatures
//!
//! A detection's position is the power-weighted centroid of the `n`
//! strongest electrodes of a rectangular grid.

use crate::error::PositionError;
use crate::recording::GridGeometry;
use crate::store::TraceStore;
use serde::{Deserialize, Serialize};

/// Unit of a stored signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureUnit {
    Linear,
    Decibel,
}

impl SignatureUnit {
    /// Normalised signatures peak at exactly 1; anything else is taken as dB
    pub fn infer(signature: &[f64]) -> Self {
        let max = signature.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max == 1.0 {
            SignatureUnit::Linear
        } else {
            SignatureUnit::Decibel
        }
    }

    /// Signature as distance-proportional magnitude
    pub fn to_linear(self, signature: &[f64]) -> Vec<f64> {
        match self {
            SignatureUnit::Linear => signature.to_vec(),
            SignatureUnit::Decibel => signature
                .iter()
                .map(|&s| (0.1 * 10f64.powf(s)).sqrt())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One position along a trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Detection index in the store
    pub index: usize,
    pub ident: u32,
    pub time: f64,
    pub freq: f64,
    pub x: f64,
    pub y: f64,
}

/// Electrode coordinates, row-major: electrode `i` at `(col * col_spacing, row * row_spacing)`
pub fn electrode_positions(grid: &GridGeometry) -> Vec<Position> {
    (0..grid.num_electrodes())
        .map(|i| Position {
            x: (i % grid.cols) as f64 * grid.col_spacing,
            y: (i / grid.cols) as f64 * grid.row_spacing,
        })
        .collect()
}

/// Power-weighted centroid of the `n` strongest electrodes
pub fn estimate_position(
    signature: &[f64],
    unit: SignatureUnit,
    grid: &GridGeometry,
    n: usize,
) -> Result<Position, PositionError> {
    let electrodes = electrode_positions(grid);
    if signature.len() != electrodes.len() {
        return Err(PositionError::SignatureLength {
            expected: electrodes.len(),
            found: signature.len(),
        });
    }
    if n == 0 {
        return Err(PositionError::NoElectrodes);
    }

    let power = unit.to_linear(signature);
    let mut order: Vec<usize> = (0..power.len()).collect();
    order.sort_by(|&a, &b| power[b].total_cmp(&power[a]));
    order.truncate(n);

    let total: f64 = order.iter().map(|&i| power[i]).sum();
    if total <= 0.0 {
        return Err(PositionError::ZeroPower);
    }

    let x = order.iter().map(|&i| electrodes[i].x * power[i]).sum::<f64>() / total;
    let y = order.iter().map(|&i| electrodes[i].y * power[i]).sum::<f64>() / total;
    Ok(Position { x, y })
}

/// Positions of every detection of one trace, in time order
///
/// Without a declared `unit` each signature's unit is inferred on its own.
pub fn track(
    store: &TraceStore,
    ident: u32,
    unit: Option<SignatureUnit>,
    grid: &GridGeometry,
    n: usize,
) -> Result<Vec<TrackPoint>, PositionError> {
    store
        .trace_indices(ident)
        .into_iter()
        .map(|k| {
            let signature = &store.sign_v()[k];
            let unit = unit.unwrap_or_else(|| SignatureUnit::infer(signature));
            let pos = estimate_position(signature, unit, grid, n)?;
            Ok(TrackPoint {
                index: k,
                ident,
                time: store.time_of(k),
                freq: store.fund_v()[k],
                x: pos.x,
                y: pos.y,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_two_strongest_of_four() {
        let grid = GridGeometry::new(2, 2, 1.0, 1.0);
        let pos = estimate_position(&[0.5, 0.5, 0.0, 0.0], SignatureUnit::Decibel, &grid, 2).unwrap();
        assert_relative_eq!(pos.x, 0.5);
        assert_relative_eq!(pos.y, 0.0);
    }

    #[test]
    fn test_electrode_layout() {
        let grid = GridGeometry::new(2, 3, 2.0, 0.5);
        let electrodes = electrode_positions(&grid);
        assert_eq!(electrodes.len(), 6);
        assert_eq!(electrodes[2], Position { x: 1.0, y: 0.0 });
        assert_eq!(electrodes[4], Position { x: 0.5, y: 2.0 });
    }

    #[test]
    fn test_linear_weights() {
        let grid = GridGeometry::new(1, 3, 1.0, 1.0);
        let pos = estimate_position(&[1.0, 0.0, 0.5], SignatureUnit::Linear, &grid, 3).unwrap();
        assert_relative_eq!(pos.x, 1.0 / 1.5, epsilon = 1e-12);
        assert_relative_eq!(pos.y, 0.0);
    }

    #[test]
    fn test_unit_inference() {
        assert_eq!(SignatureUnit::infer(&[0.2, 1.0, 0.4]), SignatureUnit::Linear);
        assert_eq!(SignatureUnit::infer(&[-40.0, -35.0]), SignatureUnit::Decibel);
    }

    #[test]
    fn test_rejects_mismatched_signature() {
        let grid = GridGeometry::new(2, 2, 1.0, 1.0);
        assert_eq!(
            estimate_position(&[0.0; 3], SignatureUnit::Decibel, &grid, 2),
            Err(PositionError::SignatureLength { expected: 4, found: 3 })
        );
        assert_eq!(
            estimate_position(&[0.0; 4], SignatureUnit::Linear, &grid, 2),
            Err(PositionError::ZeroPower)
        );
    }

    #[test]
    fn test_track_follows_trace() {
        let store = TraceStore::from_parts(
            vec![0.0, 1.0],
            vec![600.0, 700.0, 601.0],
            vec![0, 0, 1],
            vec![Some(1), Some(2), Some(1)],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]],
            2,
        )
        .unwrap();
        let grid = GridGeometry::new(1, 2, 1.0, 1.0);

        let points = track(&store, 1, Some(SignatureUnit::Linear), &grid, 1).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].time, points[0].x), (0.0, 0.0));
        assert_eq!((points[1].time, points[1].x), (1.0, 1.0));
        assert_eq!(points[1].freq, 601.0);
    }

    #[test]
    fn test_track_infers_unit_per_signature() {
        // A normalised signature followed by a decibel one
        let store = TraceStore::from_parts(
            vec![0.0, 1.0],
            vec![600.0, 601.0],
            vec![0, 1],
            vec![Some(1), Some(1)],
            vec![vec![1.0, 0.5], vec![-1.0, 0.0]],
            2,
        )
        .unwrap();
        let grid = GridGeometry::new(1, 2, 1.0, 1.0);

        let points = track(&store, 1, None, &grid, 1).unwrap();
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[1].x, 1.0);

        // Declaring the first unit for the whole trace breaks the second one
        assert_eq!(
            track(&store, 1, Some(SignatureUnit::Linear), &grid, 1),
            Err(PositionError::ZeroPower)
        );
    }
}
