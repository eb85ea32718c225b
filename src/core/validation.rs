//! Address validation for device operations
//!
//! Every operation's target is resolved into an [`AddressRange`] before any
//! component is touched. Ranges are never clamped: anything that does not lie
//! entirely inside `[0, size - 1]` is rejected with `OutOfRange`.

use crate::error::{EepromError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A validated, non-empty, contiguous span of cell addresses
///
/// # Examples
///
/// ```
/// use eeprom_sim::core::validation::AddressRange;
///
/// let range = AddressRange::new(10, 4, 16).unwrap();
/// assert_eq!(range.start(), 10);
/// assert_eq!(range.last(), 13);
///
/// assert!(AddressRange::new(14, 4, 16).is_err()); // runs past the end
/// assert!(AddressRange::new(0, 0, 16).is_err()); // empty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    start: usize,
    len: usize,
}

impl AddressRange {
    /// Validate `len` cells starting at `start` against a device of `size` cells
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the range is empty or `start + len - 1 > size - 1`.
    pub fn new(start: usize, len: usize, size: usize) -> Result<Self> {
        let out_of_range = || EepromError::OutOfRange { start, len, size };

        if len == 0 {
            return Err(out_of_range());
        }

        let end = start.checked_add(len).ok_or_else(out_of_range)?;
        if end > size {
            return Err(out_of_range());
        }

        Ok(AddressRange { start, len })
    }

    /// Validate a single address
    pub fn single(address: usize, size: usize) -> Result<Self> {
        Self::new(address, 1, size)
    }

    /// The whole address space of a device
    pub fn whole(size: usize) -> Result<Self> {
        Self::new(0, size, size)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Constructed ranges are never empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last address covered (inclusive)
    pub fn last(&self) -> usize {
        self.start + self.len - 1
    }

    /// Half-open index range, for slicing
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    pub fn addresses(&self) -> Range<usize> {
        self.as_range()
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len == 1 {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.last())
        }
    }
}
