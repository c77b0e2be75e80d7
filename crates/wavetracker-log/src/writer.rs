//! Binary detection log writer

use crate::format::{LogFile, LogHeader};
use anyhow::{Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub(crate) const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const ZSTD_LEVEL: i32 = 3;

pub struct LogWriter {
    compress: bool,
}

impl LogWriter {
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// Compress the payload with zstd
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Write a detection log file
    pub fn write(&self, path: &Path, log: &LogFile) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create detection log: {}", path.display()))?;

        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, log)?;
        writer.flush()?;

        Ok(())
    }

    /// Encode a detection log into any byte sink
    pub fn write_to<W: Write>(&self, writer: &mut W, log: &LogFile) -> Result<()> {
        log.validate()?;

        let payload = Self::encode_payload(log);

        let mut header = log.header.clone();
        header.payload_size = payload.len() as u64;
        header.checksum = CRC32.checksum(&payload);
        header.set_compressed(self.compress);

        let body = if self.compress {
            let compressed = zstd::encode_all(&payload[..], ZSTD_LEVEL)
                .context("Failed to compress detection log payload")?;
            header.payload_size_compressed = compressed.len() as u64;
            compressed
        } else {
            header.payload_size_compressed = 0;
            payload
        };

        Self::write_header(writer, &header)?;
        writer.write_all(&body)?;

        Ok(())
    }

    fn write_header<W: Write>(writer: &mut W, header: &LogHeader) -> Result<()> {
        // Little-endian, fixed layout
        writer.write_all(&header.magic)?;
        writer.write_all(&header.version.to_le_bytes())?;
        writer.write_all(&header.flags.to_le_bytes())?;
        writer.write_all(&header.num_detections.to_le_bytes())?;
        writer.write_all(&header.num_times.to_le_bytes())?;
        writer.write_all(&header.num_channels.to_le_bytes())?;
        writer.write_all(&header.label_mark.to_le_bytes())?;
        writer.write_all(&header.payload_size.to_le_bytes())?;
        writer.write_all(&header.payload_size_compressed.to_le_bytes())?;
        writer.write_all(&header.checksum.to_le_bytes())?;
        writer.write_all(&header.reserved2.to_le_bytes())?;

        Ok(())
    }

    fn encode_payload(log: &LogFile) -> Vec<u8> {
        let channels = log.header.num_channels as usize;
        let n = log.fund_v.len();
        let mut buf = Vec::with_capacity(16 + 8 * (log.times.len() + n * (3 + channels)));

        buf.extend_from_slice(&log.meta.start_time.to_le_bytes());
        buf.extend_from_slice(&log.meta.end_time.to_le_bytes());
        for t in &log.times {
            buf.extend_from_slice(&t.to_le_bytes());
        }
        for f in &log.fund_v {
            buf.extend_from_slice(&f.to_le_bytes());
        }
        for idx in &log.idx_v {
            buf.extend_from_slice(&idx.to_le_bytes());
        }
        for ident in &log.ident_v {
            buf.extend_from_slice(&ident.to_le_bytes());
        }
        // Signatures row-major: detection × channel
        for sign in &log.sign_v {
            for p in sign {
                buf.extend_from_slice(&p.to_le_bytes());
            }
        }

        buf
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::new()
    }
}
