//! JSON format for detection logs
//!
//! Human-readable sibling of the binary format. JSON has no NaN, so
//! unassigned identities are written as `null`.

use crate::format::{ident_from_f64, ident_to_f64, LogFile, LogFormatError, LogMeta};
use serde::{Deserialize, Serialize};

/// Complete JSON detection log structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogJsonFile {
    pub version: String,
    pub meta: LogJsonMeta,
    pub times: Vec<f64>,
    pub fund_v: Vec<f64>,
    pub idx_v: Vec<u64>,
    pub ident_v: Vec<Option<u32>>,
    pub sign_v: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogJsonMeta {
    pub start_time: f64,
    pub end_time: f64,
    pub num_channels: usize,
    /// Highest identity label ever used; absent in older files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_label: Option<u32>,
}

impl LogJsonFile {
    /// Save to JSON file
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json_str = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json_str)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        let log: LogJsonFile = serde_json::from_str(&json_str)?;
        Ok(log)
    }

    /// Convert into the binary representation, validating it on the way
    pub fn into_log_file(self) -> Result<LogFile, LogFormatError> {
        let mut log = LogFile::new(
            LogMeta {
                start_time: self.meta.start_time,
                end_time: self.meta.end_time,
            },
            self.meta.num_channels,
            self.times,
            self.fund_v,
            self.idx_v,
            self.ident_v.into_iter().map(ident_to_f64).collect(),
            self.sign_v,
        )?;
        log.header.set_max_label(self.meta.max_label);
        Ok(log)
    }
}

impl TryFrom<&LogFile> for LogJsonFile {
    type Error = LogFormatError;

    fn try_from(log: &LogFile) -> Result<Self, Self::Error> {
        let ident_v = log
            .ident_v
            .iter()
            .map(|&v| ident_from_f64(v))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: "1.0".to_string(),
            meta: LogJsonMeta {
                start_time: log.meta.start_time,
                end_time: log.meta.end_time,
                num_channels: log.header.num_channels as usize,
                max_label: log.header.max_label(),
            },
            times: log.times.clone(),
            fund_v: log.fund_v.clone(),
            idx_v: log.idx_v.clone(),
            ident_v,
            sign_v: log.sign_v.clone(),
        })
    }
}
