//! Error types of the extraction pipeline and the trace store

use thiserror::Error;

/// Failure inside a spectral front end
#[derive(Debug, Error)]
pub enum SpectralError {
    #[error("no samples to analyse")]
    EmptyInput,

    #[error("invalid spectral parameter: {0}")]
    InvalidParameter(String),

    #[error("power vector has {found} bins, frequency axis has {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("spectral front end failed: {0}")]
    Backend(String),
}

/// Extraction run aborted; everything before `processed_to` is committed
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("spectral analysis failed in window starting at {processed_to:.3}s (processed {processed_from:.3}s - {processed_to:.3}s)")]
    Spectral {
        processed_from: f64,
        processed_to: f64,
        #[source]
        source: SpectralError,
    },

    #[error("recording has {found} channels, trace store expects {expected}")]
    ChannelMismatch { expected: usize, found: usize },

    #[error("window rejected by the trace store: {0}")]
    Store(#[from] InvariantError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// A curation request that cannot be applied; the store is left untouched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurationError {
    #[error("identity {0} has no detections")]
    UnknownIdentity(u32),

    #[error("cannot connect identity {0} with itself")]
    SameIdentity(u32),

    #[error("detection {index} does not belong to identity {ident}")]
    SplitNotInTrace { ident: u32, index: usize },

    #[error("detection {index} is the first of identity {ident}; nothing to cut off")]
    NothingBeforeSplit { ident: u32, index: usize },

    #[error("group operation needs at least {needed} identities, got {found}")]
    TooFewIdentities { needed: usize, found: usize },

    #[error("every identity label up to {} is in use", u32::MAX)]
    LabelsExhausted,

    #[error("detection index {index} out of range ({len} detections)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Broken structural invariant of the detection arrays
#[derive(Debug, Error, PartialEq)]
pub enum InvariantError {
    #[error("array length mismatch: {field} has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("detection {index} points to time bin {idx}, but only {num_times} exist")]
    TimeIndexOutOfRange {
        index: usize,
        idx: usize,
        num_times: usize,
    },

    #[error("time axis not increasing at bin {index}")]
    TimesNotIncreasing { index: usize },

    #[error("signature {index} has {found} channels, expected {expected}")]
    ChannelMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("identity {ident} has more than one detection in time bin {idx}")]
    OverlappingTrace { ident: u32, idx: usize },

    #[error("detection {index} has invalid identity value {value}")]
    InvalidIdentity { index: usize, value: f64 },
}

/// Position estimate not computable for a signature
#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("signature has {found} values, grid has {expected} electrodes")]
    SignatureLength { expected: usize, found: usize },

    #[error("at least one electrode must be used")]
    NoElectrodes,

    #[error("selected electrodes carry no power")]
    ZeroPower,
}
