//! # eeprom-sim - File-Backed EEPROM Simulation
//!
//! `eeprom-sim` models a byte-addressable, electrically-erasable memory device
//! whose state lives in ordinary files:
//!
//! - **Fixed address space** with strict bounds checking (no clamping)
//! - **Write endurance**: every cell wears out after `max_cycles` writes
//! - **Checksums** over arbitrary ranges (sum8, xor8, fletcher16, crc32)
//! - **Audit trail**: one timestamped entry per operation, failures included
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eeprom_sim::{Device, Result};
//!
//! # fn main() -> Result<()> {
//! // Creates ./my-eeprom/ on first use, loads it afterwards
//! let mut dev = Device::open("my-eeprom")?;
//!
//! dev.write(10, 0x42)?;
//! dev.write_string(100, "HELLO")?;
//!
//! assert_eq!(dev.read(10)?, 0x42);
//! assert_eq!(dev.read_string(100)?, "HELLO");
//!
//! let sum = dev.checksum(100, 5)?;
//! println!("checksum of HELLO: {}", sum);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust,no_run
//! use eeprom_sim::{EepromBuilder, Result};
//!
//! # fn main() -> Result<()> {
//! let mut dev = EepromBuilder::new()
//!     .dir("/data/sensor-eeprom")
//!     .size(256)
//!     .max_cycles(100)
//!     .default_payload("BOOT")
//!     .build()?;
//!
//! dev.power_cycle()?;
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core resolve
#[allow(unused_imports)]
pub(crate) use crate::core::{
    audit, cells, config, device, dump, endurance, error, integrity, io, record, validation,
};

pub use crate::core::{
    audit::{AuditEntry, Operation, Outcome, Target},
    config::DeviceConfig,
    device::{Device, ResetReport, SharedDevice},
    dump::{DetectedString, HexDump},
    endurance::{WearState, WearSummary},
    error::{EepromError, Result},
    integrity::{Checksum, ChecksumScheme},
    record::SensorReading,
    validation::AddressRange,
};

use std::path::{Path, PathBuf};
use tracing::info;

/// Builder for customizing device creation
///
/// Settings only apply to a fresh device. When the directory already holds a
/// device, its persisted geometry wins.
///
/// # Examples
///
/// ```rust,no_run
/// use eeprom_sim::EepromBuilder;
///
/// let dev = EepromBuilder::new()
///     .dir("bench-eeprom")
///     .size(16)
///     .max_cycles(2)
///     .build()?;
/// # Ok::<(), eeprom_sim::EepromError>(())
/// ```
pub struct EepromBuilder {
    dir: Option<PathBuf>,
    config_file: Option<PathBuf>,
    size: Option<usize>,
    max_cycles: Option<u32>,
    default_payload: Option<String>,
    fill_byte: Option<u8>,
    erase_byte: Option<u8>,
    checksum: Option<ChecksumScheme>,
}

impl EepromBuilder {
    /// Create a new EepromBuilder with default settings
    pub fn new() -> Self {
        EepromBuilder {
            dir: None,
            config_file: None,
            size: None,
            max_cycles: None,
            default_payload: None,
            fill_byte: None,
            erase_byte: None,
            checksum: None,
        }
    }

    /// Directory for the backing files (defaults to the current directory)
    pub fn dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Start from a TOML configuration file; explicit setters override it
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn default_payload<S: Into<String>>(mut self, payload: S) -> Self {
        self.default_payload = Some(payload.into());
        self
    }

    pub fn fill_byte(mut self, fill: u8) -> Self {
        self.fill_byte = Some(fill);
        self
    }

    pub fn erase_byte(mut self, erase: u8) -> Self {
        self.erase_byte = Some(erase);
        self
    }

    pub fn checksum(mut self, scheme: ChecksumScheme) -> Self {
        self.checksum = Some(scheme);
        self
    }

    /// Resolve the requested configuration without touching the device
    ///
    /// Validation happens in [`Device::initialize`], and only for a fresh
    /// device.
    pub fn to_config(&self) -> Result<DeviceConfig> {
        let mut config = match &self.config_file {
            Some(path) => DeviceConfig::from_toml_file(path)?,
            None => DeviceConfig::default(),
        };

        if let Some(dir) = &self.dir {
            config.dir = dir.clone();
        }
        if let Some(size) = self.size {
            config.size = size;
        }
        if let Some(max_cycles) = self.max_cycles {
            config.max_cycles = max_cycles;
        }
        if let Some(payload) = &self.default_payload {
            config.default_payload = payload.clone();
        }
        if let Some(fill) = self.fill_byte {
            config.fill_byte = fill;
        }
        if let Some(erase) = self.erase_byte {
            config.erase_byte = erase;
        }
        if let Some(scheme) = self.checksum {
            config.checksum = scheme;
        }

        Ok(config)
    }

    /// Build the Device instance
    pub fn build(self) -> Result<Device> {
        let config = self.to_config()?;
        info!(
            "Building device in {:?} ({} cells, max {} cycles)",
            config.dir, config.size, config.max_cycles
        );
        Device::initialize(config)
    }
}

impl Default for EepromBuilder {
    fn default() -> Self {
        Self::new()
    }
}
