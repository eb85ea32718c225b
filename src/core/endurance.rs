//! Write-endurance tracking
//!
//! One little-endian `u32` counter per cell, persisted in address order.
//! Counters only grow. A cell whose counter has reached `max_cycles` is
//! [`WearState::Worn`] for good: it still reads, it never writes again.

use crate::error::{EepromError, Result};
use crate::io::BackingFile;
use crate::validation::AddressRange;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

const COUNTER_WIDTH: usize = std::mem::size_of::<u32>();

/// Per-cell endurance state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WearState {
    /// Writes permitted; `remaining` more before the cell wears out
    Fresh { remaining: u32 },
    /// Counter reached the ceiling (terminal)
    Worn,
}

/// Aggregate wear figures across the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WearSummary {
    pub worn_cells: usize,
    pub max_counter: u32,
    pub total_writes: u64,
}

#[derive(Debug)]
pub struct EnduranceTracker {
    file: BackingFile,
    counters: Vec<u32>,
    max_cycles: u32,
}

impl EnduranceTracker {
    /// Create a zeroed counter file for `size` cells
    pub fn create<P: AsRef<Path>>(path: P, size: usize, max_cycles: u32) -> Result<Self> {
        let file = BackingFile::new(path, (size * COUNTER_WIDTH) as u64);
        let counters = vec![0u32; size];
        file.create(&encode(&counters))?;
        debug!("Created endurance file {:?} (max {} cycles)", file.path(), max_cycles);
        Ok(EnduranceTracker {
            file,
            counters,
            max_cycles,
        })
    }

    /// Load an existing counter file
    ///
    /// # Errors
    ///
    /// `Corrupted` if the file is not `4 * size` bytes or a counter exceeds `max_cycles`.
    pub fn load<P: AsRef<Path>>(path: P, size: usize, max_cycles: u32) -> Result<Self> {
        let file = BackingFile::new(path, (size * COUNTER_WIDTH) as u64);
        let counters = decode_checked(&file, max_cycles)?;
        Ok(EnduranceTracker {
            file,
            counters,
            max_cycles,
        })
    }

    pub fn reload(&mut self) -> Result<()> {
        self.counters = decode_checked(&self.file, self.max_cycles)?;
        Ok(())
    }

    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    pub fn size(&self) -> usize {
        self.counters.len()
    }

    pub fn counter_at(&self, address: usize) -> Result<u32> {
        let range = AddressRange::single(address, self.size())?;
        Ok(self.counters[range.start()])
    }

    pub fn can_write(&self, address: usize) -> Result<bool> {
        Ok(self.counter_at(address)? < self.max_cycles)
    }

    pub fn wear_state(&self, address: usize) -> Result<WearState> {
        let count = self.counter_at(address)?;
        Ok(if count < self.max_cycles {
            WearState::Fresh {
                remaining: self.max_cycles - count,
            }
        } else {
            WearState::Worn
        })
    }

    /// Addresses in `range` that cannot absorb another write
    pub fn worn_in(&self, range: AddressRange) -> Vec<usize> {
        range
            .addresses()
            .filter(|&a| self.counters[a] >= self.max_cycles)
            .collect()
    }

    /// Increment one counter
    ///
    /// Calling this on a worn cell is a caller bug: the controller checks
    /// `can_write` first. It still fails cleanly with `EnduranceExhausted`.
    pub fn record_write(&mut self, address: usize) -> Result<u32> {
        let range = AddressRange::single(address, self.size())?;
        self.record_range(range)?;
        Ok(self.counters[address])
    }

    /// Increment every counter in `range`, all or nothing
    pub fn record_range(&mut self, range: AddressRange) -> Result<()> {
        let worn = self.worn_in(range);
        if !worn.is_empty() {
            warn!("record_range over worn cells {:?}", worn);
            return Err(EepromError::EnduranceExhausted { addresses: worn });
        }

        let updated: Vec<u32> = self.counters[range.as_range()]
            .iter()
            .map(|c| c + 1)
            .collect();
        self.persist(range.start(), &updated)?;
        self.counters[range.as_range()].copy_from_slice(&updated);
        Ok(())
    }

    /// Increment the counters of scattered addresses, all or nothing
    ///
    /// The span between the lowest and highest address is rewritten in one
    /// transfer.
    pub fn record_each(&mut self, addresses: &[usize]) -> Result<()> {
        let (first, last) = match (addresses.iter().min(), addresses.iter().max()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Ok(()),
        };
        let span = AddressRange::new(first, last - first + 1, self.size())?;

        let worn: Vec<usize> = addresses
            .iter()
            .copied()
            .filter(|&a| self.counters[a] >= self.max_cycles)
            .collect();
        if !worn.is_empty() {
            return Err(EepromError::EnduranceExhausted { addresses: worn });
        }

        let mut updated = self.counters[span.as_range()].to_vec();
        for &a in addresses {
            updated[a - first] += 1;
        }
        self.persist(first, &updated)?;
        self.counters[span.as_range()].copy_from_slice(&updated);
        Ok(())
    }

    pub fn summary(&self) -> WearSummary {
        WearSummary {
            worn_cells: self
                .counters
                .iter()
                .filter(|&&c| c >= self.max_cycles)
                .count(),
            max_counter: self.counters.iter().copied().max().unwrap_or(0),
            total_writes: self.counters.iter().map(|&c| c as u64).sum(),
        }
    }

    pub fn counters(&self) -> &[u32] {
        &self.counters
    }

    fn persist(&self, start: usize, counters: &[u32]) -> Result<()> {
        self.file
            .write_at((start * COUNTER_WIDTH) as u64, &encode(counters))
    }
}

fn encode(counters: &[u32]) -> Vec<u8> {
    counters.iter().flat_map(|c| c.to_le_bytes()).collect()
}

fn decode_checked(file: &BackingFile, max_cycles: u32) -> Result<Vec<u32>> {
    let bytes = file.read_all()?;
    let counters: Vec<u32> = bytes
        .chunks_exact(COUNTER_WIDTH)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    if let Some((address, &count)) = counters
        .iter()
        .enumerate()
        .find(|&(_, &c)| c > max_cycles)
    {
        return Err(EepromError::Corrupted {
            path: file.path().to_path_buf(),
            reason: format!(
                "counter {} at address {} exceeds max cycles {}",
                count, address, max_cycles
            ),
        });
    }
    Ok(counters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tracker(dir: &TempDir, size: usize, max: u32) -> EnduranceTracker {
        EnduranceTracker::create(dir.path().join("write_cycles.bin"), size, max).unwrap()
    }

    #[test]
    fn test_counts_up_to_ceiling() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir, 16, 2);

        assert_eq!(t.record_write(5).unwrap(), 1);
        assert_eq!(t.wear_state(5).unwrap(), WearState::Fresh { remaining: 1 });
        assert_eq!(t.record_write(5).unwrap(), 2);
        assert!(!t.can_write(5).unwrap());
        assert_eq!(t.wear_state(5).unwrap(), WearState::Worn);

        let err = t.record_write(5).unwrap_err();
        assert!(matches!(err, EepromError::EnduranceExhausted { ref addresses } if addresses == &[5]));
        assert_eq!(t.counter_at(5).unwrap(), 2);
    }

    #[test]
    fn test_range_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir, 8, 1);
        t.record_write(3).unwrap();

        let range = AddressRange::new(2, 3, 8).unwrap();
        assert!(t.record_range(range).is_err());
        assert_eq!(t.counter_at(2).unwrap(), 0);
        assert_eq!(t.counter_at(4).unwrap(), 0);
    }

    #[test]
    fn test_record_each_sparse() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir, 8, 5);

        t.record_each(&[1, 4, 6]).unwrap();
        assert_eq!(t.counters(), &[0, 1, 0, 0, 1, 0, 1, 0]);
        t.record_each(&[]).unwrap();
    }

    #[test]
    fn test_counters_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("write_cycles.bin");
        {
            let mut t = EnduranceTracker::create(&path, 4, 3).unwrap();
            t.record_write(0).unwrap();
            t.record_write(0).unwrap();
            t.record_write(3).unwrap();
        }

        let t = EnduranceTracker::load(&path, 4, 3).unwrap();
        assert_eq!(t.counters(), &[2, 0, 0, 1]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);
    }

    #[test]
    fn test_load_rejects_counter_above_max() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("write_cycles.bin");
        let mut raw = vec![0u8; 8];
        raw[4..8].copy_from_slice(&7u32.to_le_bytes());
        std::fs::write(&path, raw).unwrap();

        let err = EnduranceTracker::load(&path, 2, 5).unwrap_err();
        assert!(matches!(err, EepromError::Corrupted { .. }));
    }

    #[test]
    fn test_summary() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir, 4, 2);
        t.record_write(1).unwrap();
        t.record_write(1).unwrap();
        t.record_write(2).unwrap();

        let s = t.summary();
        assert_eq!(s.worn_cells, 1);
        assert_eq!(s.max_counter, 2);
        assert_eq!(s.total_writes, 3);
    }
}
