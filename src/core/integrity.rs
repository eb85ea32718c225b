//! Checksums over cell ranges
//!
//! Pure functions of the byte contents. The integrity module never compares
//! or alerts; callers keep the expected value and compare it themselves.
//!
//! Schemes:
//! - `sum8`: sum of all bytes modulo 256 (the device's native scheme)
//! - `xor8`: XOR of all bytes
//! - `fletcher16`: Fletcher-16, modulo 255 running sums
//! - `crc32`: IEEE CRC-32

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumScheme {
    #[default]
    Sum8,
    Xor8,
    Fletcher16,
    Crc32,
}

impl ChecksumScheme {
    pub fn name(&self) -> &'static str {
        match self {
            ChecksumScheme::Sum8 => "sum8",
            ChecksumScheme::Xor8 => "xor8",
            ChecksumScheme::Fletcher16 => "fletcher16",
            ChecksumScheme::Crc32 => "crc32",
        }
    }

    /// Hex digits needed to print a value of this scheme
    fn width(&self) -> usize {
        match self {
            ChecksumScheme::Sum8 | ChecksumScheme::Xor8 => 2,
            ChecksumScheme::Fletcher16 => 4,
            ChecksumScheme::Crc32 => 8,
        }
    }

    /// Parse a scheme name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum8" | "sum" => Some(ChecksumScheme::Sum8),
            "xor8" | "xor" => Some(ChecksumScheme::Xor8),
            "fletcher16" | "fletcher" => Some(ChecksumScheme::Fletcher16),
            "crc32" | "crc" => Some(ChecksumScheme::Crc32),
            _ => None,
        }
    }
}

impl fmt::Display for ChecksumScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A computed checksum, tagged with the scheme that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    pub scheme: ChecksumScheme,
    pub value: u32,
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:0width$X} ({})",
            self.value,
            self.scheme,
            width = self.scheme.width()
        )
    }
}

/// Compute a checksum of `bytes` with `scheme`
///
/// # Examples
///
/// ```
/// use eeprom_sim::core::integrity::{checksum, ChecksumScheme};
///
/// let sum = checksum(ChecksumScheme::Sum8, b"HELLO");
/// assert_eq!(sum.value, (72 + 69 + 76 + 76 + 79) % 256);
/// ```
pub fn checksum(scheme: ChecksumScheme, bytes: &[u8]) -> Checksum {
    let value = match scheme {
        ChecksumScheme::Sum8 => bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) as u32,
        ChecksumScheme::Xor8 => bytes.iter().fold(0u8, |acc, &b| acc ^ b) as u32,
        ChecksumScheme::Fletcher16 => fletcher16(bytes) as u32,
        ChecksumScheme::Crc32 => crc32fast::hash(bytes),
    };
    Checksum { scheme, value }
}

fn fletcher16(bytes: &[u8]) -> u16 {
    let mut sum1: u16 = 0;
    let mut sum2: u16 = 0;
    for &b in bytes {
        sum1 = (sum1 + b as u16) % 255;
        sum2 = (sum2 + sum1) % 255;
    }
    (sum2 << 8) | sum1
}
