//! .tgps binary snapshot format for learned patterns.

use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;

use crate::patterns::{InMemoryPatternStore, PatternRecord, PatternStore};
use crate::types::{GradingError, GradingResult};

/// Magic bytes: "TGPS"
const TGPS_MAGIC: u32 = 0x54475053;

/// Current format version.
const FORMAT_VERSION: u16 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 64;

/// A loaded snapshot: the records plus header timestamps.
#[derive(Debug, Clone)]
pub struct PatternSnapshot {
    pub records: Vec<PatternRecord>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl PatternSnapshot {
    pub fn new() -> Self {
        let now = unix_now();
        Self {
            records: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Capture the current contents of a store. Records are sorted by their
    /// identity description so identical stores produce identical files.
    pub fn from_store<S: PatternStore>(store: &S, created_at: u64) -> GradingResult<Self> {
        let mut records = store.records()?;
        records.sort_by_cached_key(|r| r.identity.describe());
        Ok(Self {
            records,
            created_at,
            updated_at: unix_now(),
        })
    }

    pub fn into_store(self) -> InMemoryPatternStore {
        InMemoryPatternStore::from_records(self.records)
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

impl Default for PatternSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer for .tgps files.
pub struct TgpsWriter;

/// Reader for .tgps files.
pub struct TgpsReader;

impl TgpsWriter {
    /// Write a snapshot to a file, creating parent directories.
    pub fn write_to_file(snapshot: &PatternSnapshot, path: &Path) -> GradingResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::File::create(path)?;
        Self::write_to(snapshot, &mut file)
    }

    /// Write a snapshot to any writer.
    pub fn write_to<W: Write>(snapshot: &PatternSnapshot, writer: &mut W) -> GradingResult<()> {
        let payload = serde_json::to_vec(&snapshot.records)
            .map_err(|e| GradingError::Storage(format!("Serialization failed: {e}")))?;

        let mut header = [0u8; HEADER_SIZE];
        write_u32(&mut header[0..4], TGPS_MAGIC);
        write_u16(&mut header[4..6], FORMAT_VERSION);
        write_u16(&mut header[6..8], 0); // flags
        write_u64(&mut header[8..16], snapshot.records.len() as u64);
        write_u64(&mut header[16..24], snapshot.created_at);
        write_u64(&mut header[24..32], snapshot.updated_at);
        write_u64(&mut header[32..40], payload.len() as u64);

        writer.write_all(&header)?;
        writer.write_all(&payload)?;

        Ok(())
    }
}

impl TgpsReader {
    /// Read a snapshot from a file.
    pub fn read_from_file(path: &Path) -> GradingResult<PatternSnapshot> {
        let mut file = std::fs::File::open(path)?;
        Self::read_from(&mut file)
    }

    /// Read a snapshot from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> GradingResult<PatternSnapshot> {
        let mut header = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header)
            .map_err(|e| GradingError::Storage(format!("Truncated header: {e}")))?;

        let magic = read_u32(&header[0..4]);
        if magic != TGPS_MAGIC {
            return Err(GradingError::Storage(format!(
                "Invalid magic: expected 0x{TGPS_MAGIC:08X}, got 0x{magic:08X}"
            )));
        }

        let version = read_u16(&header[4..6]);
        if version != FORMAT_VERSION {
            return Err(GradingError::Storage(format!(
                "Unsupported version: {version}"
            )));
        }

        let record_count = read_u64(&header[8..16]);
        let created_at = read_u64(&header[16..24]);
        let updated_at = read_u64(&header[24..32]);
        let payload_len = read_u64(&header[32..40]);

        // Grows with the bytes actually present, not with what the header claims.
        let mut payload = Vec::new();
        reader
            .take(payload_len)
            .read_to_end(&mut payload)
            .map_err(|e| GradingError::Storage(format!("Failed to read payload: {e}")))?;
        if (payload.len() as u64) < payload_len {
            return Err(GradingError::Storage(format!(
                "Truncated payload: header says {payload_len} bytes, file has {}",
                payload.len()
            )));
        }

        let records: Vec<PatternRecord> = serde_json::from_slice(&payload)
            .map_err(|e| GradingError::Storage(format!("Deserialization failed: {e}")))?;

        if records.len() as u64 != record_count {
            return Err(GradingError::Storage(format!(
                "Record count mismatch: header says {record_count}, payload has {}",
                records.len()
            )));
        }

        Ok(PatternSnapshot {
            records,
            created_at,
            updated_at,
        })
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

// Little-endian byte helpers
fn write_u16(buf: &mut [u8], val: u16) {
    buf[..2].copy_from_slice(&val.to_le_bytes());
}
fn write_u32(buf: &mut [u8], val: u32) {
    buf[..4].copy_from_slice(&val.to_le_bytes());
}
fn write_u64(buf: &mut [u8], val: u64) {
    buf[..8].copy_from_slice(&val.to_le_bytes());
}
fn read_u16(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}
fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}
fn read_u64(buf: &[u8]) -> u64 {
    u64::from_le_bytes([buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7]])
}
