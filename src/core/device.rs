//! Device controller
//!
//! [`Device`] is the single entry point for every operation. It owns the cell
//! store, the endurance tracker and the audit log, and runs each request as
//! validate, mutate, persist, log. Every request produces exactly one audit
//! entry, whether it succeeded or not.

use crate::audit::{AuditEntry, AuditLog, Event, Operation, Target};
use crate::cells::{default_image, CellStore};
use crate::config::{check_payload, DeviceConfig, STRING_SEPARATOR};
use crate::dump::HexDump;
use crate::endurance::{EnduranceTracker, WearState, WearSummary};
use crate::error::{EepromError, Result};
use crate::integrity::{self, Checksum, ChecksumScheme};
use crate::io;
use crate::record::{self, LENGTH_PREFIX};
use crate::validation::AddressRange;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A device behind the mutual-exclusion boundary required by concurrent callers
pub type SharedDevice = Arc<Mutex<Device>>;

/// Result of a completed `full_reset`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    /// Cells rewritten
    pub reset: usize,
    /// Whether the default payload was restored (otherwise the erase byte)
    pub preserved_default: bool,
}

/// Simulated EEPROM device
///
/// # Examples
///
/// ```rust,no_run
/// use eeprom_sim::core::{config::DeviceConfig, device::Device};
///
/// # fn main() -> eeprom_sim::Result<()> {
/// let mut dev = Device::initialize(DeviceConfig::new("my-eeprom").size(256))?;
///
/// dev.write_string(100, "hello")?;
/// assert_eq!(dev.read_string(100)?, "hello");
///
/// let sum = dev.checksum(100, 5)?;
/// println!("checksum {}", sum);
/// # Ok(())
/// # }
/// ```
pub struct Device {
    config: DeviceConfig,
    cells: CellStore,
    endurance: EnduranceTracker,
    log: AuditLog,
}

impl Device {
    /// Create a device in `config.dir`, or load the one already there
    ///
    /// A fresh device gets the default payload at address 0 (followed by a
    /// separator when it fits) and `fill_byte` everywhere else, with all
    /// counters at zero. An existing device is loaded exactly as it was left;
    /// its persisted geometry overrides `config`, which is then not validated.
    /// A rejected configuration is still recorded as a failed `initialize`.
    pub fn initialize(config: DeviceConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir).map_err(EepromError::storage(&config.dir))?;

        let mut log = AuditLog::open(config.log_path())?;

        match bootstrap(&config) {
            Ok((config, cells, endurance, detail)) => {
                log.append(
                    Event::success(Operation::Initialize, Target::All).with_detail(Some(detail)),
                )?;
                Ok(Device {
                    config,
                    cells,
                    endurance,
                    log,
                })
            }
            Err(err) => {
                error!("Device initialization failed in {:?}: {}", config.dir, err);
                if let Err(log_err) = log.append(Event::failure(Operation::Initialize, Target::All, &err)) {
                    return Err(log_err.with_unaudited(err));
                }
                Err(err)
            }
        }
    }

    /// Open the device in `dir` with default configuration for a fresh one
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::initialize(DeviceConfig::new(dir))
    }

    pub fn into_shared(self) -> SharedDevice {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn size(&self) -> usize {
        self.cells.size()
    }

    pub fn max_cycles(&self) -> u32 {
        self.endurance.max_cycles()
    }

    pub fn default_payload(&self) -> &str {
        &self.config.default_payload
    }

    // ---- reads ----

    pub fn read(&mut self, address: usize) -> Result<u8> {
        self.audited(Operation::Read, Target::Address { address }, |d| {
            let value = d.cells.read(address)?;
            Ok((value, Some(format!("value=0x{:02X}", value))))
        })
    }

    pub fn read_range(&mut self, start: usize, len: usize) -> Result<Vec<u8>> {
        self.audited(Operation::ReadRange, Target::Range { start, len }, |d| {
            let bytes = d.cells.read_range(start, len)?.to_vec();
            Ok((bytes, None))
        })
    }

    /// Read from `address` up to the next 0x00 separator or the end of the device
    pub fn read_string(&mut self, address: usize) -> Result<String> {
        self.audited(Operation::ReadString, Target::Address { address }, |d| {
            let raw = d.cells.read_until_separator(address)?;
            let text = String::from_utf8_lossy(raw).into_owned();
            let detail = format!("'{}'", text);
            Ok((text, Some(detail)))
        })
    }

    /// Decode a record written by [`Device::write_record`]
    pub fn read_record<T: DeserializeOwned>(&mut self, address: usize) -> Result<T> {
        self.audited(Operation::ReadRecord, Target::Address { address }, |d| {
            let len = record::body_len(d.cells.read_range(address, LENGTH_PREFIX)?)?;
            let value = if len == 0 {
                record::decode(&[])?
            } else {
                record::decode(d.cells.read_range(address + LENGTH_PREFIX, len)?)?
            };
            Ok((value, Some(format!("{} byte body", len))))
        })
    }

    pub fn checksum(&mut self, start: usize, len: usize) -> Result<Checksum> {
        let scheme = self.config.checksum;
        self.checksum_with(scheme, start, len)
    }

    pub fn checksum_with(
        &mut self,
        scheme: ChecksumScheme,
        start: usize,
        len: usize,
    ) -> Result<Checksum> {
        self.audited(Operation::Checksum, Target::Range { start, len }, |d| {
            let sum = integrity::checksum(scheme, d.cells.read_range(start, len)?);
            Ok((sum, Some(format!("value={}", sum))))
        })
    }

    pub fn dump(&mut self, start: usize, len: usize) -> Result<HexDump> {
        self.audited(Operation::Dump, Target::Range { start, len }, |d| {
            let bytes = d.cells.read_range(start, len)?.to_vec();
            Ok((HexDump::new(start, bytes), None))
        })
    }

    // ---- writes ----

    pub fn write(&mut self, address: usize, value: u8) -> Result<()> {
        self.audited(Operation::Write, Target::Address { address }, |d| {
            d.commit(address, &[value])?;
            Ok(((), Some(format!("value=0x{:02X}", value))))
        })
    }

    /// Write a block, all or nothing
    pub fn write_range(&mut self, start: usize, bytes: &[u8]) -> Result<()> {
        let target = Target::Range {
            start,
            len: bytes.len(),
        };
        self.audited(Operation::WriteRange, target, |d| {
            d.commit(start, bytes)?;
            Ok(((), Some(format!("{} bytes", bytes.len()))))
        })
    }

    /// Write `text` followed by a 0x00 separator
    pub fn write_string(&mut self, address: usize, text: &str) -> Result<()> {
        let target = Target::Range {
            start: address,
            len: text.len() + 1,
        };
        self.audited(Operation::WriteString, target, |d| {
            if text.as_bytes().contains(&STRING_SEPARATOR) {
                return Err(EepromError::InvalidPayload(
                    "string cannot contain the 0x00 separator".to_string(),
                ));
            }
            let mut bytes = Vec::with_capacity(text.len() + 1);
            bytes.extend_from_slice(text.as_bytes());
            bytes.push(STRING_SEPARATOR);
            d.commit(address, &bytes)?;
            Ok(((), Some(format!("'{}'", text))))
        })
    }

    /// Store a serializable value as a length-prefixed record
    pub fn write_record<T: Serialize>(&mut self, address: usize, value: &T) -> Result<usize> {
        let encoded = record::encode(value);
        let target = match &encoded {
            Ok(bytes) => Target::Range {
                start: address,
                len: bytes.len(),
            },
            Err(_) => Target::Address { address },
        };
        self.audited(Operation::WriteRecord, target, |d| {
            let bytes = encoded?;
            d.commit(address, &bytes)?;
            Ok((bytes.len(), Some(format!("{} bytes", bytes.len()))))
        })
    }

    // ---- deletes ----

    /// Overwrite one cell with the erase byte (consumes a write cycle)
    pub fn delete(&mut self, address: usize) -> Result<()> {
        let erase = self.config.erase_byte;
        self.audited(Operation::Delete, Target::Address { address }, |d| {
            d.commit(address, &[erase])?;
            Ok(((), None))
        })
    }

    pub fn delete_range(&mut self, start: usize, len: usize) -> Result<()> {
        let erase = self.config.erase_byte;
        self.audited(Operation::DeleteRange, Target::Range { start, len }, |d| {
            let range = AddressRange::new(start, len, d.size())?;
            d.commit(range.start(), &vec![erase; range.len()])?;
            Ok(((), Some(format!("{} bytes", len))))
        })
    }

    /// Erase every cell; one aggregate audit entry
    pub fn delete_all(&mut self) -> Result<usize> {
        let erase = self.config.erase_byte;
        self.audited(Operation::DeleteAll, Target::All, |d| {
            let size = d.size();
            d.commit(0, &vec![erase; size])?;
            Ok((size, Some(format!("erased {} cells", size))))
        })
    }

    /// Restore every cell to the default image (or to the erase byte)
    ///
    /// Best effort: worn cells are skipped and keep their contents while the
    /// rest are rewritten. Each rewritten cell consumes a write cycle. If any
    /// cell was skipped the call fails with `EnduranceExhausted` naming them.
    pub fn full_reset(&mut self, preserve_default: bool) -> Result<ResetReport> {
        self.audited(Operation::FullReset, Target::All, |d| {
            let size = d.size();
            let image = if preserve_default {
                default_image(size, d.config.default_payload.as_bytes(), d.config.fill_byte)
            } else {
                vec![d.config.erase_byte; size]
            };

            let skipped = d.endurance.worn_in(AddressRange::whole(size)?);
            let writable: Vec<usize> = (0..size)
                .filter(|a| skipped.binary_search(a).is_err())
                .collect();

            if !writable.is_empty() {
                let mut next = d.cells.as_bytes().to_vec();
                for &a in &writable {
                    next[a] = image[a];
                }
                d.endurance.record_each(&writable)?;
                d.cells.write_range(0, &next)?;
            }

            if !skipped.is_empty() {
                warn!(
                    "Full reset rewrote {} cells, skipped {} worn cells",
                    writable.len(),
                    skipped.len()
                );
                return Err(EepromError::EnduranceExhausted { addresses: skipped });
            }

            info!("Full reset of {} cells (preserve_default={})", size, preserve_default);
            let report = ResetReport {
                reset: writable.len(),
                preserved_default: preserve_default,
            };
            let detail = if preserve_default {
                format!("restored default payload '{}'", d.config.default_payload)
            } else {
                "restored erase byte".to_string()
            };
            Ok((report, Some(detail)))
        })
    }

    // ---- device events ----

    /// Log a restart marker and reload the mirrors from disk; no data changes
    pub fn power_cycle(&mut self) -> Result<()> {
        self.audited(Operation::PowerCycle, Target::Device, |d| {
            d.cells.reload()?;
            d.endurance.reload()?;
            let summary = d.endurance.summary();
            info!("Power cycle: {} worn cells", summary.worn_cells);
            Ok(((), Some(format!("{} worn cells", summary.worn_cells))))
        })
    }

    /// Truncate the audit log; the new log starts with a `log_reset` entry
    pub fn reset_log(&mut self) -> Result<()> {
        self.log.reset()?;
        info!("Audit log reset at {:?}", self.log.path());
        Ok(())
    }

    /// Change the payload restored by later `full_reset(true)` calls
    pub fn set_default_payload(&mut self, text: &str) -> Result<()> {
        self.audited(Operation::SetDefault, Target::Device, |d| {
            check_payload(text, d.size())?;
            let mut next = d.config.clone();
            next.default_payload = text.to_string();
            io::write_synced(next.meta_path(), next.to_toml()?.as_bytes())?;
            d.config = next;
            info!("Default payload changed to '{}'", text);
            Ok(((), Some(format!("'{}'", text))))
        })
    }

    // ---- inspection (not audited) ----

    pub fn counter_at(&self, address: usize) -> Result<u32> {
        self.endurance.counter_at(address)
    }

    pub fn can_write(&self, address: usize) -> Result<bool> {
        self.endurance.can_write(address)
    }

    pub fn wear_state(&self, address: usize) -> Result<WearState> {
        self.endurance.wear_state(address)
    }

    pub fn wear_summary(&self) -> WearSummary {
        self.endurance.summary()
    }

    /// Every audit entry, in issue order
    pub fn audit_entries(&self) -> Result<Vec<AuditEntry>> {
        self.log.entries()
    }

    pub fn audit_len(&self) -> u64 {
        self.log.len()
    }

    // ---- internals ----

    /// Validate and apply a block write: bounds, then endurance for every
    /// target cell, then counters, then cells
    fn commit(&mut self, start: usize, bytes: &[u8]) -> Result<()> {
        let range = AddressRange::new(start, bytes.len(), self.size())?;

        let worn = self.endurance.worn_in(range);
        if !worn.is_empty() {
            warn!("Write to {} rejected: worn cells {:?}", range, worn);
            return Err(EepromError::EnduranceExhausted { addresses: worn });
        }

        self.endurance.record_range(range)?;
        self.cells.write_range(range.start(), bytes)?;
        debug!("Wrote {} bytes at {}", bytes.len(), range);
        Ok(())
    }

    /// Run `op` and append exactly one audit entry for it
    ///
    /// A failed append turns the whole call into `LogWrite`, even when `op`
    /// itself succeeded. When `op` failed too, its error rides along as
    /// `unaudited`.
    fn audited<T, F>(&mut self, operation: Operation, target: Target, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<(T, Option<String>)>,
    {
        let result = op(self);

        let event = match &result {
            Ok((_, detail)) => Event::success(operation, target).with_detail(detail.clone()),
            Err(err) => {
                debug!("{} {} failed: {}", operation, target, err);
                Event::failure(operation, target, err)
            }
        };

        match (self.log.append(event), result) {
            (Ok(_), result) => result.map(|(value, _)| value),
            (Err(log_err), Ok(_)) => {
                if operation.is_mutating() {
                    error!(
                        "{} {} applied but could not be audited: {}",
                        operation, target, log_err
                    );
                } else {
                    error!("{} {} could not be audited: {}", operation, target, log_err);
                }
                Err(log_err)
            }
            (Err(log_err), Err(err)) => {
                error!(
                    "{} {} failed ({}) and could not be audited: {}",
                    operation, target, err, log_err
                );
                Err(log_err.with_unaudited(err))
            }
        }
    }
}

/// Load the persisted device or create a fresh one
fn bootstrap(
    requested: &DeviceConfig,
) -> Result<(DeviceConfig, CellStore, EnduranceTracker, String)> {
    let meta = requested.meta_path();

    if meta.exists() {
        let config = DeviceConfig::from_toml_file(&meta)?.dir(&requested.dir);
        config.check()?;
        if !config.same_geometry(requested) {
            warn!(
                "Ignoring requested geometry for {:?}; persisted device uses size={} max_cycles={}",
                requested.dir, config.size, config.max_cycles
            );
        }

        let cells = CellStore::load(config.cells_path(), config.size)?;
        let endurance =
            EnduranceTracker::load(config.cycles_path(), config.size, config.max_cycles)?;
        info!(
            "Loaded device {:?} ({} cells, max {} cycles)",
            config.dir, config.size, config.max_cycles
        );
        let detail = format!("loaded {} cells", config.size);
        return Ok((config, cells, endurance, detail));
    }

    for path in [requested.cells_path(), requested.cycles_path()] {
        if path.exists() {
            return Err(EepromError::Corrupted {
                path: meta,
                reason: format!("metadata missing but {:?} exists", path),
            });
        }
    }

    requested.check()?;
    let config = requested.clone();
    let cells = CellStore::initialize(
        config.cells_path(),
        config.size,
        config.default_payload.as_bytes(),
        config.fill_byte,
    )?;
    let endurance = EnduranceTracker::create(config.cycles_path(), config.size, config.max_cycles)?;
    // Metadata last: its presence marks a completed initialization
    io::write_synced(&meta, config.to_toml()?.as_bytes())?;

    info!(
        "Initialized device {:?} ({} cells) with default payload '{}'",
        config.dir, config.size, config.default_payload
    );
    let detail = format!(
        "initialized fresh with default payload '{}'",
        config.default_payload
    );
    Ok((config, cells, endurance, detail))
}
