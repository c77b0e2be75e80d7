//! Detection log file structures
//!
//! A log holds the co-indexed detection arrays (`fund_v`, `idx_v`, `ident_v`,
//! `sign_v`), the shared time axis and the analysed time range. Unassigned
//! identities are stored as NaN.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic bytes for detection log files: "WTRK"
pub const MAGIC: [u8; 4] = [0x57, 0x54, 0x52, 0x4B];

/// Current format version
pub const VERSION: u16 = 1;

/// Size of the fixed binary header in bytes
pub const HEADER_SIZE: usize = 56;

/// Errors raised while assembling or decoding a detection log
#[derive(Debug, Error)]
pub enum LogFormatError {
    #[error("array length mismatch: {field} has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("signature {index} has {found} channels, expected {expected}")]
    ChannelMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("detection {index} points to time bin {idx}, but only {num_times} exist")]
    TimeIndexOutOfRange {
        index: usize,
        idx: u64,
        num_times: usize,
    },

    #[error("invalid identity value {0}")]
    InvalidIdentity(f64),

    #[error("invalid detection log: magic bytes mismatch")]
    BadMagic,

    #[error("unsupported detection log version {0}")]
    UnsupportedVersion(u16),

    #[error("payload checksum mismatch: header says {expected:#010x}, payload has {found:#010x}")]
    ChecksumMismatch { expected: u32, found: u32 },
}

/// File header (56 bytes fixed size)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogHeader {
    /// Magic bytes: "WTRK"
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Flags (bit 0: compressed, bit 1: `label_mark` is set)
    pub flags: u16,
    /// Number of detections
    pub num_detections: u64,
    /// Number of time bins
    pub num_times: u64,
    /// Number of recording channels (signature length)
    pub num_channels: u32,
    /// Highest identity label ever used, freed ones included
    pub label_mark: u32,
    /// Size of payload (uncompressed)
    pub payload_size: u64,
    /// Compressed payload size (0 if uncompressed)
    pub payload_size_compressed: u64,
    /// CRC-32 of the uncompressed payload
    pub checksum: u32,
    /// Reserved
    pub reserved2: u32,
}

impl LogHeader {
    pub fn new(num_detections: u64, num_times: u64, num_channels: u32) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            num_detections,
            num_times,
            num_channels,
            label_mark: 0,
            payload_size: 0,
            payload_size_compressed: 0,
            checksum: 0,
            reserved2: 0,
        }
    }

    pub fn is_compressed(&self) -> bool {
        (self.flags & 0x1) != 0
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        if compressed {
            self.flags |= 0x1;
        } else {
            self.flags &= !0x1;
        }
    }

    /// Highest label ever used, if recorded
    pub fn max_label(&self) -> Option<u32> {
        ((self.flags & 0x2) != 0).then_some(self.label_mark)
    }

    pub fn set_max_label(&mut self, label: Option<u32>) {
        match label {
            Some(label) => {
                self.flags |= 0x2;
                self.label_mark = label;
            }
            None => {
                self.flags &= !0x2;
                self.label_mark = 0;
            }
        }
    }
}

/// Analysed time range of the recording, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogMeta {
    pub start_time: f64,
    pub end_time: f64,
}

/// Complete detection log
#[derive(Debug, Clone)]
pub struct LogFile {
    pub header: LogHeader,
    pub meta: LogMeta,
    pub times: Vec<f64>,
    pub fund_v: Vec<f64>,
    pub idx_v: Vec<u64>,
    /// Identity per detection, NaN when unassigned
    pub ident_v: Vec<f64>,
    pub sign_v: Vec<Vec<f64>>,
}

impl LogFile {
    /// Assemble a log, checking that all arrays are co-indexed.
    pub fn new(
        meta: LogMeta,
        num_channels: usize,
        times: Vec<f64>,
        fund_v: Vec<f64>,
        idx_v: Vec<u64>,
        ident_v: Vec<f64>,
        sign_v: Vec<Vec<f64>>,
    ) -> Result<Self, LogFormatError> {
        let header = LogHeader::new(
            fund_v.len() as u64,
            times.len() as u64,
            num_channels as u32,
        );
        let file = Self {
            header,
            meta,
            times,
            fund_v,
            idx_v,
            ident_v,
            sign_v,
        };
        file.validate()?;
        Ok(file)
    }

    /// Check array lengths, signature widths, time indices and identity values.
    pub fn validate(&self) -> Result<(), LogFormatError> {
        let n = self.fund_v.len();
        let expected = self.header.num_detections as usize;
        for (field, found) in [
            ("fund_v", n),
            ("idx_v", self.idx_v.len()),
            ("ident_v", self.ident_v.len()),
            ("sign_v", self.sign_v.len()),
        ] {
            if found != expected {
                return Err(LogFormatError::LengthMismatch {
                    field,
                    expected,
                    found,
                });
            }
        }
        if self.times.len() != self.header.num_times as usize {
            return Err(LogFormatError::LengthMismatch {
                field: "times",
                expected: self.header.num_times as usize,
                found: self.times.len(),
            });
        }

        let channels = self.header.num_channels as usize;
        for (index, sign) in self.sign_v.iter().enumerate() {
            if sign.len() != channels {
                return Err(LogFormatError::ChannelMismatch {
                    index,
                    expected: channels,
                    found: sign.len(),
                });
            }
        }
        for (index, &idx) in self.idx_v.iter().enumerate() {
            if idx as usize >= self.times.len() {
                return Err(LogFormatError::TimeIndexOutOfRange {
                    index,
                    idx,
                    num_times: self.times.len(),
                });
            }
        }
        for &ident in &self.ident_v {
            ident_from_f64(ident)?;
        }
        Ok(())
    }
}

/// Encode an identity for storage; `None` becomes NaN.
pub fn ident_to_f64(ident: Option<u32>) -> f64 {
    match ident {
        Some(id) => id as f64,
        None => f64::NAN,
    }
}

/// Decode a stored identity. NaN is unassigned; anything that is not a
/// non-negative integer in `u32` range is rejected.
pub fn ident_from_f64(value: f64) -> Result<Option<u32>, LogFormatError> {
    if value.is_nan() {
        return Ok(None);
    }
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(LogFormatError::InvalidIdentity(value));
    }
    Ok(Some(value as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> Result<LogFile, LogFormatError> {
        LogFile::new(
            LogMeta {
                start_time: 0.0,
                end_time: 2.0,
            },
            2,
            vec![0.0, 1.0],
            vec![600.0, 610.0],
            vec![0, 1],
            vec![3.0, f64::NAN],
            vec![vec![-60.0, -70.0], vec![-65.0, -62.0]],
        )
    }

    #[test]
    fn test_identity_sentinel() {
        assert!(ident_to_f64(None).is_nan());
        assert_eq!(ident_from_f64(f64::NAN).unwrap(), None);
        assert_eq!(ident_from_f64(7.0).unwrap(), Some(7));
        assert!(ident_from_f64(1.5).is_err());
        assert!(ident_from_f64(-1.0).is_err());
    }

    #[test]
    fn test_valid_file() {
        let file = sample_file().unwrap();
        assert_eq!(file.header.num_detections, 2);
        assert_eq!(file.header.num_channels, 2);
        assert!(!file.header.is_compressed());
        assert_eq!(file.header.max_label(), None);
    }

    #[test]
    fn test_label_mark_flag() {
        let mut header = LogHeader::new(0, 0, 1);
        header.set_compressed(true);
        header.set_max_label(Some(0));
        assert_eq!(header.max_label(), Some(0));
        assert!(header.is_compressed());

        header.set_max_label(None);
        assert_eq!(header.max_label(), None);
        assert!(header.is_compressed());
    }

    #[test]
    fn test_rejects_dangling_time_index() {
        let result = LogFile::new(
            LogMeta {
                start_time: 0.0,
                end_time: 1.0,
            },
            1,
            vec![0.0],
            vec![600.0],
            vec![4],
            vec![0.0],
            vec![vec![-60.0]],
        );
        assert!(matches!(
            result,
            Err(LogFormatError::TimeIndexOutOfRange { idx: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_short_signature() {
        let result = LogFile::new(
            LogMeta {
                start_time: 0.0,
                end_time: 1.0,
            },
            3,
            vec![0.0],
            vec![600.0],
            vec![0],
            vec![0.0],
            vec![vec![-60.0]],
        );
        assert!(matches!(
            result,
            Err(LogFormatError::ChannelMismatch { expected: 3, found: 1, .. })
        ));
    }
}
