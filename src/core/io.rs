//! Disk I/O for the device's backing files
//!
//! Every call opens its file, performs the transfer, syncs, and drops the
//! handle before returning. No handle outlives a single operation.

use crate::error::{EepromError, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A fixed-length raw binary file
#[derive(Debug, Clone)]
pub struct BackingFile {
    path: PathBuf,
    len: u64,
}

impl BackingFile {
    pub fn new<P: AsRef<Path>>(path: P, len: u64) -> Self {
        BackingFile {
            path: path.as_ref().to_path_buf(),
            len,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create (or truncate) the file with exactly `contents`
    pub fn create(&self, contents: &[u8]) -> Result<()> {
        if contents.len() as u64 != self.len {
            return Err(self.corrupted(format!(
                "refusing to write {} bytes into a {}-byte file",
                contents.len(),
                self.len
            )));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(EepromError::storage(&self.path))?;

        file.write_all(contents)
            .map_err(EepromError::storage(&self.path))?;
        file.sync_all().map_err(EepromError::storage(&self.path))?;
        Ok(())
    }

    /// Read the whole file, verifying its length
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path).map_err(EepromError::storage(&self.path))?;

        let actual = file
            .metadata()
            .map_err(EepromError::storage(&self.path))?
            .len();
        if actual != self.len {
            return Err(self.corrupted(format!(
                "expected {} bytes, found {}",
                self.len, actual
            )));
        }

        let mut buffer = Vec::with_capacity(self.len as usize);
        file.read_to_end(&mut buffer)
            .map_err(EepromError::storage(&self.path))?;
        Ok(buffer)
    }

    /// Overwrite `data.len()` bytes at `offset` and sync before returning
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.len {
            return Err(self.corrupted(format!(
                "write of {} bytes at offset {} exceeds file length {}",
                data.len(),
                offset,
                self.len
            )));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(EepromError::storage(&self.path))?;

        file.seek(SeekFrom::Start(offset))
            .map_err(EepromError::storage(&self.path))?;
        file.write_all(data)
            .map_err(EepromError::storage(&self.path))?;
        file.sync_data().map_err(EepromError::storage(&self.path))?;
        Ok(())
    }

    fn corrupted(&self, reason: String) -> EepromError {
        EepromError::Corrupted {
            path: self.path.clone(),
            reason,
        }
    }
}

/// Replace a small variable-length file (metadata) and sync it
pub fn write_synced<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path).map_err(EepromError::storage(path))?;
    file.write_all(contents).map_err(EepromError::storage(path))?;
    file.sync_all().map_err(EepromError::storage(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_read_all() {
        let dir = TempDir::new().unwrap();
        let file = BackingFile::new(dir.path().join("cells.bin"), 8);

        file.create(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(file.read_all().unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_write_at_offset() {
        let dir = TempDir::new().unwrap();
        let file = BackingFile::new(dir.path().join("cells.bin"), 8);
        file.create(&[0; 8]).unwrap();

        file.write_at(5, &[0xAA, 0xBB]).unwrap();
        assert_eq!(file.read_all().unwrap(), vec![0, 0, 0, 0, 0, 0xAA, 0xBB, 0]);

        assert!(matches!(
            file.write_at(7, &[1, 2]),
            Err(EepromError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_length_mismatch_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cells.bin");
        std::fs::write(&path, [0u8; 5]).unwrap();

        let file = BackingFile::new(&path, 8);
        assert!(matches!(file.read_all(), Err(EepromError::Corrupted { .. })));
    }

    #[test]
    fn test_missing_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let file = BackingFile::new(dir.path().join("absent.bin"), 8);
        assert!(matches!(file.read_all(), Err(EepromError::StorageIo { .. })));
    }
}
