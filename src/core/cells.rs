//! Cell store: the device's byte array
//!
//! Holds an in-memory mirror of the backing file. Every mutation is written
//! through to disk and synced before the mirror changes, so an acknowledged
//! write is never only in volatile memory. Endurance is not checked here.

use crate::config::STRING_SEPARATOR;
use crate::error::Result;
use crate::io::BackingFile;
use crate::validation::AddressRange;
use std::path::Path;
use tracing::debug;

pub struct CellStore {
    file: BackingFile,
    cells: Vec<u8>,
}

impl CellStore {
    /// Create a fresh store at `path` holding `image`
    pub fn create<P: AsRef<Path>>(path: P, image: Vec<u8>) -> Result<Self> {
        let file = BackingFile::new(path, image.len() as u64);
        file.create(&image)?;
        debug!("Created cell store {:?} ({} cells)", file.path(), image.len());
        Ok(CellStore { file, cells: image })
    }

    /// Load an existing store, which must be exactly `size` bytes
    pub fn load<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let file = BackingFile::new(path, size as u64);
        let cells = file.read_all()?;
        debug!("Loaded cell store {:?} ({} cells)", file.path(), size);
        Ok(CellStore { file, cells })
    }

    /// Load the store if its file exists, otherwise create it from the default image
    pub fn initialize<P: AsRef<Path>>(
        path: P,
        size: usize,
        default_payload: &[u8],
        fill_byte: u8,
    ) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path, size)
        } else {
            Self::create(path, default_image(size, default_payload, fill_byte))
        }
    }

    /// Re-read the backing file, replacing the mirror
    pub fn reload(&mut self) -> Result<()> {
        self.cells = self.file.read_all()?;
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    pub fn read(&self, address: usize) -> Result<u8> {
        let range = AddressRange::single(address, self.size())?;
        Ok(self.cells[range.start()])
    }

    pub fn read_range(&self, start: usize, len: usize) -> Result<&[u8]> {
        let range = AddressRange::new(start, len, self.size())?;
        Ok(&self.cells[range.as_range()])
    }

    /// Bytes from `start` up to (not including) the next separator or the end
    pub fn read_until_separator(&self, start: usize) -> Result<&[u8]> {
        let range = AddressRange::single(start, self.size())?;
        let tail = &self.cells[range.start()..];
        let end = tail
            .iter()
            .position(|&b| b == STRING_SEPARATOR)
            .unwrap_or(tail.len());
        Ok(&tail[..end])
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<()> {
        self.write_range(address, &[value])
    }

    pub fn write_range(&mut self, start: usize, bytes: &[u8]) -> Result<()> {
        let range = AddressRange::new(start, bytes.len(), self.size())?;
        self.file.write_at(range.start() as u64, bytes)?;
        self.cells[range.as_range()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Default contents: payload, a separator if there is room, then fill bytes
///
/// Payloads longer than the device are truncated.
pub fn default_image(size: usize, payload: &[u8], fill_byte: u8) -> Vec<u8> {
    let mut image = vec![fill_byte; size];
    let n = payload.len().min(size);
    image[..n].copy_from_slice(&payload[..n]);
    if n < size {
        image[n] = STRING_SEPARATOR;
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EepromError;
    use tempfile::TempDir;

    #[test]
    fn test_default_image() {
        let image = default_image(8, b"HI", 0xFF);
        assert_eq!(image, vec![b'H', b'I', 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

        // Exactly fills: no room for separator
        assert_eq!(default_image(2, b"HI", 0xFF), b"HI".to_vec());

        // Truncated
        assert_eq!(default_image(3, b"HELLO", 0xFF), b"HEL".to_vec());
    }

    #[test]
    fn test_initialize_then_reload_is_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut store = CellStore::initialize(&path, 16, b"HELLO", 0xFF).unwrap();
        store.write(10, 0x42).unwrap();
        drop(store);

        let store = CellStore::initialize(&path, 16, b"IGNORED", 0x00).unwrap();
        assert_eq!(store.read_range(0, 5).unwrap(), b"HELLO");
        assert_eq!(store.read(10).unwrap(), 0x42);
        assert_eq!(store.read(11).unwrap(), 0xFF);
    }

    #[test]
    fn test_writes_are_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");
        let mut store = CellStore::create(&path, vec![0; 8]).unwrap();

        store.write_range(2, &[7, 8, 9]).unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, vec![0, 0, 7, 8, 9, 0, 0, 0]);
    }

    #[test]
    fn test_bounds() {
        let dir = TempDir::new().unwrap();
        let mut store = CellStore::create(dir.path().join("e.bin"), vec![0; 8]).unwrap();

        assert!(matches!(store.read(8), Err(EepromError::OutOfRange { .. })));
        assert!(store.read_range(6, 3).is_err());
        assert!(store.write_range(7, &[1, 2]).is_err());
        // Rejected write leaves contents alone
        assert_eq!(store.as_bytes(), &[0u8; 8]);
    }

    #[test]
    fn test_read_until_separator() {
        let dir = TempDir::new().unwrap();
        let store = CellStore::create(
            dir.path().join("e.bin"),
            vec![b'a', b'b', 0, b'c', b'd'],
        )
        .unwrap();

        assert_eq!(store.read_until_separator(0).unwrap(), b"ab");
        assert_eq!(store.read_until_separator(2).unwrap(), b"");
        assert_eq!(store.read_until_separator(3).unwrap(), b"cd");
    }

    #[test]
    fn test_reload_detects_truncation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("e.bin");
        let mut store = CellStore::create(&path, vec![0; 8]).unwrap();

        std::fs::write(&path, [0u8; 4]).unwrap();
        assert!(matches!(store.reload(), Err(EepromError::Corrupted { .. })));
    }
}
