//! Selection-driven curation commands
//!
//! A command that selects nothing leaves the log alone and reports zero
//! affected detections instead of failing.

use serde_json::{json, Value};
use wavetracker_core::{CurationError, TraceStore};

/// Result of one curation command
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// JSON report for stdout
    pub report: Value,
    /// Whether the store was modified and needs to be written back
    pub changed: bool,
}

impl Outcome {
    pub fn changed(report: Value) -> Self {
        Self {
            report,
            changed: true,
        }
    }

    pub fn inert(report: Value) -> Self {
        Self {
            report,
            changed: false,
        }
    }
}

/// Unassign everything inside a time x frequency rectangle
pub fn group_delete_rect(
    store: &mut TraceStore,
    time_range: (f64, f64),
    freq_range: (f64, f64),
) -> Result<Outcome, CurationError> {
    let selection = store.select_rect(time_range, freq_range);
    let count = store.group_delete(&selection)?;
    let report = json!({
        "operation": "group-delete",
        "detections_unassigned": count,
    });
    Ok(if count == 0 {
        Outcome::inert(report)
    } else {
        Outcome::changed(report)
    })
}

/// Identities inside a rectangle, smallest label first (it becomes the target)
pub fn identities_in_rect(store: &TraceStore, time_range: (f64, f64), freq_range: (f64, f64)) -> Vec<u32> {
    let selection = store.select_rect(time_range, freq_range);
    store.identities_in(&selection)
}

/// Merge identities into the first one; fewer than two is inert
pub fn group_connect(store: &mut TraceStore, ids: &[u32]) -> Result<Outcome, CurationError> {
    match store.group_connect(ids) {
        Ok(target) => Ok(Outcome::changed(json!({
            "operation": "group-connect",
            "target": target,
            "merged": ids,
        }))),
        Err(CurationError::TooFewIdentities { found, .. }) => {
            log::warn!("Only {} identity selected, nothing connected", found);
            Ok(Outcome::inert(json!({
                "operation": "group-connect",
                "target": null,
                "merged": [],
            })))
        }
        Err(err) => Err(err),
    }
}

/// Unassign one identity; an unknown label is inert
pub fn delete(store: &mut TraceStore, ident: u32) -> Outcome {
    let count = store.delete(ident);
    let report = json!({
        "operation": "delete",
        "identity": ident,
        "detections_unassigned": count,
    });
    if count == 0 {
        Outcome::inert(report)
    } else {
        Outcome::changed(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> TraceStore {
        TraceStore::from_parts(
            vec![0.0, 1.0, 2.0],
            vec![600.0, 601.0, 800.0, 602.0],
            vec![0, 1, 1, 2],
            vec![Some(0), Some(0), Some(1), None],
            vec![vec![-40.0]; 4],
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_rectangle_is_inert() {
        let mut store = sample_store();
        let before = store.ident_v().to_vec();

        let outcome = group_delete_rect(&mut store, (10.0, 20.0), (0.0, 1000.0)).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.report["detections_unassigned"], 0);
        assert_eq!(store.ident_v(), before.as_slice());
    }

    #[test]
    fn test_rectangle_delete() {
        let mut store = sample_store();
        let outcome = group_delete_rect(&mut store, (0.0, 1.5), (0.0, 700.0)).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.report["detections_unassigned"], 2);
        assert_eq!(store.ident_v(), &[None, None, Some(1), None]);
    }

    #[test]
    fn test_single_identity_connect_is_inert() {
        let mut store = sample_store();
        let ids = identities_in_rect(&store, (0.0, 1.5), (0.0, 700.0));
        assert_eq!(ids, vec![0]);

        let outcome = group_connect(&mut store, &ids).unwrap();
        assert!(!outcome.changed);
        assert!(outcome.report["target"].is_null());
        assert_eq!(store.ident_v()[2], Some(1));
    }

    #[test]
    fn test_connect_rectangle_targets_smallest_label() {
        let mut store = sample_store();
        let ids = identities_in_rect(&store, (0.0, 3.0), (0.0, 1000.0));
        assert_eq!(ids, vec![0, 1]);

        let outcome = group_connect(&mut store, &ids).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.report["target"], 0);
        // Label 0 loses its detection in the bin it shared with 1
        assert_eq!(store.ident_v(), &[Some(0), None, Some(0), None]);
    }

    #[test]
    fn test_unknown_identity_still_errors() {
        let mut store = sample_store();
        assert_eq!(
            group_connect(&mut store, &[0, 9]),
            Err(CurationError::UnknownIdentity(9))
        );
    }

    #[test]
    fn test_delete_unknown_is_inert() {
        let mut store = sample_store();
        assert!(!delete(&mut store, 42).changed);
        assert!(delete(&mut store, 1).changed);
    }
}
