//! Device configuration
//!
//! A [`DeviceConfig`] describes the geometry of a simulated device (cell count,
//! endurance ceiling, fill/erase patterns, default payload, checksum scheme)
//! and where its backing files live. The geometry half is persisted to
//! `device.toml` on first initialization and is authoritative on reopen.

use crate::error::{EepromError, Result};
use crate::integrity::ChecksumScheme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Default number of cells (1 KB device)
pub const DEFAULT_SIZE: usize = 1024;

/// Default write-cycle ceiling per cell
pub const DEFAULT_MAX_CYCLES: u32 = 1000;

/// Default text stored at address 0 on initialization and reset
pub const DEFAULT_PAYLOAD: &str = "Mission Complete";

/// Fill pattern for cells not covered by the default payload
pub const DEFAULT_FILL_BYTE: u8 = 0xFF;

/// Sentinel written by delete operations
pub const DEFAULT_ERASE_BYTE: u8 = 0x00;

/// Terminator appended to strings
pub const STRING_SEPARATOR: u8 = 0x00;

/// Largest supported device (1 MiB)
pub const MAX_SIZE: usize = 1 << 20;

pub const CELLS_FILE: &str = "eeprom.bin";
pub const CYCLES_FILE: &str = "write_cycles.bin";
pub const LOG_FILE: &str = "eeprom_log.jsonl";
pub const META_FILE: &str = "device.toml";

/// Configuration for a simulated EEPROM device
///
/// # Examples
///
/// ```
/// use eeprom_sim::core::config::DeviceConfig;
///
/// let config = DeviceConfig::new("/tmp/my-eeprom")
///     .size(16)
///     .max_cycles(2)
///     .default_payload("HELLO");
///
/// assert!(config.check().is_ok());
/// assert_eq!(config.size, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeviceConfig {
    /// Directory holding the backing files (not persisted)
    #[serde(skip)]
    pub dir: PathBuf,

    /// Number of byte cells
    #[validate(range(min = 1, max = 1048576))]
    pub size: usize,

    /// Writes a single cell accepts before it becomes read-only
    #[validate(range(min = 1))]
    pub max_cycles: u32,

    /// Text written at address 0 on initialization and `full_reset(true)`
    pub default_payload: String,

    pub fill_byte: u8,

    pub erase_byte: u8,

    pub checksum: ChecksumScheme,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            dir: PathBuf::from("."),
            size: DEFAULT_SIZE,
            max_cycles: DEFAULT_MAX_CYCLES,
            default_payload: DEFAULT_PAYLOAD.to_string(),
            fill_byte: DEFAULT_FILL_BYTE,
            erase_byte: DEFAULT_ERASE_BYTE,
            checksum: ChecksumScheme::default(),
        }
    }
}

impl DeviceConfig {
    /// Default configuration rooted at `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        DeviceConfig {
            dir: dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load geometry from a TOML file; `dir` is set separately
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(EepromError::storage(path))?;
        let config: DeviceConfig = toml::from_str(&text)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn default_payload<S: Into<String>>(mut self, payload: S) -> Self {
        self.default_payload = payload.into();
        self
    }

    pub fn fill_byte(mut self, fill: u8) -> Self {
        self.fill_byte = fill;
        self
    }

    pub fn erase_byte(mut self, erase: u8) -> Self {
        self.erase_byte = erase;
        self
    }

    pub fn checksum(mut self, scheme: ChecksumScheme) -> Self {
        self.checksum = scheme;
        self
    }

    /// Run field validation plus the payload-fits-device check
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| EepromError::InvalidConfig(e.to_string()))?;
        check_payload(&self.default_payload, self.size)
            .map_err(|e| EepromError::InvalidConfig(e.to_string()))
    }

    /// True if `other` describes the same device layout
    pub fn same_geometry(&self, other: &DeviceConfig) -> bool {
        self.size == other.size
            && self.max_cycles == other.max_cycles
            && self.fill_byte == other.fill_byte
            && self.erase_byte == other.erase_byte
            && self.checksum == other.checksum
    }

    pub fn cells_path(&self) -> PathBuf {
        self.dir.join(CELLS_FILE)
    }

    pub fn cycles_path(&self) -> PathBuf {
        self.dir.join(CYCLES_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }
}

/// A payload must be NUL-free and leave room for its separator
pub(crate) fn check_payload(payload: &str, size: usize) -> Result<()> {
    if payload.as_bytes().contains(&STRING_SEPARATOR) {
        return Err(EepromError::InvalidPayload(
            "payload cannot contain the 0x00 separator".to_string(),
        ));
    }
    if payload.len() > size {
        return Err(EepromError::InvalidPayload(format!(
            "payload of {} bytes does not fit a {}-cell device",
            payload.len(),
            size
        )));
    }
    Ok(())
}
