//! Audit logging for device operations
//!
//! Provides an append-only trail of every operation issued to the device:
//! - One JSON object per line, in issue order
//! - Failed operations are recorded with their error kind and reason
//! - Each append is synced before it returns
//! - The only rewrite is [`AuditLog::reset`], which truncates and leaves a
//!   `log_reset` marker as the new first entry

mod entry;

pub use entry::{AuditEntry, Event, Operation, Outcome, Target};

use crate::error::{EepromError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct AuditLog {
    path: PathBuf,
    next_seq: u64,
}

impl AuditLog {
    /// Open the log at `path`, continuing the sequence of any existing entries
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let next_seq = if path.exists() {
            let file = File::open(&path).map_err(EepromError::storage(&path))?;
            let mut count = 0u64;
            for line in BufReader::new(file).lines() {
                let line = line.map_err(EepromError::storage(&path))?;
                if !line.trim().is_empty() {
                    count += 1;
                }
            }
            count
        } else {
            0
        };

        debug!("Opened audit log {:?} at seq {}", path, next_seq);
        Ok(AuditLog { path, next_seq })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries currently in the log
    pub fn len(&self) -> u64 {
        self.next_seq
    }

    pub fn is_empty(&self) -> bool {
        self.next_seq == 0
    }

    /// Stamp and append one entry
    ///
    /// # Errors
    ///
    /// `LogWrite` if the entry could not be made durable.
    pub fn append(&mut self, event: Event) -> Result<AuditEntry> {
        let entry = AuditEntry::stamp(self.next_seq, event);
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(EepromError::log_write(&self.path))?;
        file.write_all(line.as_bytes())
            .map_err(EepromError::log_write(&self.path))?;
        file.sync_data()
            .map_err(EepromError::log_write(&self.path))?;

        self.next_seq += 1;
        Ok(entry)
    }

    /// Truncate the log, then record a `log_reset` marker as entry 0
    pub fn reset(&mut self) -> Result<AuditEntry> {
        File::create(&self.path).map_err(EepromError::log_write(&self.path))?;
        self.next_seq = 0;
        self.append(Event::success(Operation::LogReset, Target::Device))
    }

    /// Read back every entry in order
    ///
    /// A line that does not parse is reported as `Corrupted` with its
    /// 1-based line number.
    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(EepromError::storage(&self.path))?;
        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(EepromError::storage(&self.path))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line).map_err(|err| EepromError::Corrupted {
                path: self.path.clone(),
                reason: format!("line {}: {}", index + 1, err),
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}
