//! Binary detection log reader

use crate::format::{LogFile, LogFormatError, LogHeader, LogMeta, MAGIC, VERSION};
use crate::writer::CRC32;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub struct LogReader;

impl LogReader {
    /// Read a detection log file
    pub fn read(path: &Path) -> Result<LogFile> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open detection log: {}", path.display()))?;

        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
            .with_context(|| format!("Failed to decode detection log: {}", path.display()))
    }

    /// Decode a detection log from any byte source
    pub fn read_from<R: Read>(reader: &mut R) -> Result<LogFile> {
        let header = Self::read_header(reader)?;

        if header.magic != MAGIC {
            return Err(LogFormatError::BadMagic.into());
        }
        if header.version != VERSION {
            return Err(LogFormatError::UnsupportedVersion(header.version).into());
        }

        let payload = if header.is_compressed() {
            let mut compressed = vec![0u8; header.payload_size_compressed as usize];
            reader.read_exact(&mut compressed)?;
            zstd::decode_all(&compressed[..]).context("Failed to decompress payload")?
        } else {
            let mut raw = vec![0u8; header.payload_size as usize];
            reader.read_exact(&mut raw)?;
            raw
        };

        let found = CRC32.checksum(&payload);
        if found != header.checksum {
            return Err(LogFormatError::ChecksumMismatch {
                expected: header.checksum,
                found,
            }
            .into());
        }

        let log = Self::decode_payload(header, &payload)?;
        log.validate()?;
        Ok(log)
    }

    fn read_header<R: Read>(reader: &mut R) -> Result<LogHeader> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        let version = Self::read_u16(reader)?;
        let flags = Self::read_u16(reader)?;
        let num_detections = Self::read_u64(reader)?;
        let num_times = Self::read_u64(reader)?;
        let num_channels = Self::read_u32(reader)?;
        let label_mark = Self::read_u32(reader)?;
        let payload_size = Self::read_u64(reader)?;
        let payload_size_compressed = Self::read_u64(reader)?;
        let checksum = Self::read_u32(reader)?;
        let reserved2 = Self::read_u32(reader)?;

        Ok(LogHeader {
            magic,
            version,
            flags,
            num_detections,
            num_times,
            num_channels,
            label_mark,
            payload_size,
            payload_size_compressed,
            checksum,
            reserved2,
        })
    }

    fn decode_payload(header: LogHeader, payload: &[u8]) -> Result<LogFile> {
        let n = header.num_detections as usize;
        let num_times = header.num_times as usize;
        let channels = header.num_channels as usize;

        let expected = 8 * (2 + num_times + n * (3 + channels));
        if payload.len() != expected {
            anyhow::bail!(
                "Payload size {} does not match header counts (expected {})",
                payload.len(),
                expected
            );
        }

        let mut words = payload
            .chunks_exact(8)
            .map(|c| <[u8; 8]>::try_from(c).map_err(anyhow::Error::from));
        let mut next = move || -> Result<[u8; 8]> {
            words
                .next()
                .unwrap_or_else(|| Err(anyhow::anyhow!("Unexpected end of payload")))
        };

        let meta = LogMeta {
            start_time: f64::from_le_bytes(next()?),
            end_time: f64::from_le_bytes(next()?),
        };
        let times = (0..num_times)
            .map(|_| next().map(f64::from_le_bytes))
            .collect::<Result<Vec<_>>>()?;
        let fund_v = (0..n)
            .map(|_| next().map(f64::from_le_bytes))
            .collect::<Result<Vec<_>>>()?;
        let idx_v = (0..n)
            .map(|_| next().map(u64::from_le_bytes))
            .collect::<Result<Vec<_>>>()?;
        let ident_v = (0..n)
            .map(|_| next().map(f64::from_le_bytes))
            .collect::<Result<Vec<_>>>()?;
        let sign_v = (0..n)
            .map(|_| {
                (0..channels)
                    .map(|_| next().map(f64::from_le_bytes))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LogFile {
            header,
            meta,
            times,
            fund_v,
            idx_v,
            ident_v,
            sign_v,
        })
    }

    fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}
