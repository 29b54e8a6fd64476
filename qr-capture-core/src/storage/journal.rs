use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::error::{DecodeError, SinkError};
use crate::models::scan_result::ScanResult;

/// One journal line: the outcome of a single scan cycle.
///
/// Payloads are stored as SHA-256 digests only, so the journal can be kept
/// on the device without retaining scanned content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub recorded_at: String,
    pub result: ScanResult,
    pub payload_digests: Vec<String>,
    pub failures: Vec<String>,
}

impl ScanRecord {
    pub fn new(result: ScanResult, payloads: &[Vec<u8>], failures: &[(usize, DecodeError)]) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
            result,
            payload_digests: payloads.iter().map(|p| sha256_hex(p)).collect(),
            failures: failures
                .iter()
                .map(|(index, reason)| format!("{}: {}", index, reason))
                .collect(),
        }
    }
}

/// Append-only JSON-lines journal of scan records.
pub struct ScanJournal {
    path: PathBuf,
    file: File,
    records_written: u64,
}

impl ScanJournal {
    /// Open (creating if needed) the journal at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| SinkError::Storage(format!("failed to create directory: {}", e)))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SinkError::Storage(format!("failed to open journal {}: {}", path.display(), e)))?;

        Ok(Self {
            path,
            file,
            records_written: 0,
        })
    }

    pub fn append(&mut self, record: &ScanRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| SinkError::Storage(format!("failed to serialize record: {}", e)))?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .map_err(|e| SinkError::Storage(format!("failed to write record: {}", e)))?;
        self.records_written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

/// Read every record from a journal file. Blank lines are skipped.
pub fn read_all(path: &Path) -> Result<Vec<ScanRecord>, SinkError> {
    let file = File::open(path)
        .map_err(|e| SinkError::Storage(format!("failed to open journal {}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| SinkError::Storage(format!("failed to read journal: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| SinkError::Storage(format!("line {}: failed to parse record: {}", number + 1, e)))?;
        records.push(record);
    }
    Ok(records)
}

fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{:02x}", b)).collect()
}
