//! Audit entry types

use crate::error::EepromError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation kinds recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Device creation or load
    Initialize,
    Read,
    ReadRange,
    ReadString,
    ReadRecord,
    Write,
    WriteRange,
    WriteString,
    WriteRecord,
    Delete,
    DeleteRange,
    DeleteAll,
    Checksum,
    Dump,
    FullReset,
    PowerCycle,
    /// First entry of a freshly truncated log
    LogReset,
    SetDefault,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::Read => "read",
            Operation::ReadRange => "read_range",
            Operation::ReadString => "read_string",
            Operation::ReadRecord => "read_record",
            Operation::Write => "write",
            Operation::WriteRange => "write_range",
            Operation::WriteString => "write_string",
            Operation::WriteRecord => "write_record",
            Operation::Delete => "delete",
            Operation::DeleteRange => "delete_range",
            Operation::DeleteAll => "delete_all",
            Operation::Checksum => "checksum",
            Operation::Dump => "dump",
            Operation::FullReset => "full_reset",
            Operation::PowerCycle => "power_cycle",
            Operation::LogReset => "log_reset",
            Operation::SetDefault => "set_default",
        }
    }

    /// True for operations that may change cells or counters
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Operation::Write
                | Operation::WriteRange
                | Operation::WriteString
                | Operation::WriteRecord
                | Operation::Delete
                | Operation::DeleteRange
                | Operation::DeleteAll
                | Operation::FullReset
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an operation was aimed at
///
/// Requested coordinates are kept even when they were out of range, so
/// failed operations are still fully described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// No address (power cycle, log reset, configuration)
    Device,
    Address { address: usize },
    Range { start: usize, len: usize },
    /// Every cell
    All,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Device => f.write_str("device"),
            Target::Address { address } => write!(f, "@{}", address),
            Target::Range { start, len } => write!(f, "@{}+{}", start, len),
            Target::All => f.write_str("all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { kind: String, reason: String },
}

impl Outcome {
    pub fn failure(err: &EepromError) -> Self {
        Outcome::Failure {
            kind: err.kind().to_string(),
            reason: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// An operation waiting to be appended; the log assigns sequence and time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub operation: Operation,
    pub target: Target,
    pub outcome: Outcome,
    pub detail: Option<String>,
}

impl Event {
    pub fn success(operation: Operation, target: Target) -> Self {
        Event {
            operation,
            target,
            outcome: Outcome::Success,
            detail: None,
        }
    }

    pub fn failure(operation: Operation, target: Target, err: &EepromError) -> Self {
        Event {
            operation,
            target,
            outcome: Outcome::failure(err),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }
}

/// One immutable line of the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, from 0 after the last reset
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub target: Target,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    pub(crate) fn stamp(seq: u64, event: Event) -> Self {
        AuditEntry {
            seq,
            timestamp: Utc::now(),
            operation: event.operation,
            target: event.target,
            outcome: event.outcome,
            detail: event.detail,
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] #{} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.seq,
            self.operation,
            self.target
        )?;
        match &self.outcome {
            Outcome::Success => f.write_str(" ok")?,
            Outcome::Failure { kind, reason } => write!(f, " FAILED {}: {}", kind, reason)?,
        }
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}
