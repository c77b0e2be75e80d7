//! Shared helpers of the wavetracker binaries

pub mod curate;
pub mod logfile;
pub mod output;
