//! Backing-file corruption detection tests
//!
//! Damaged or inconsistent files must surface as `Corrupted` on open, never as
//! a silently resized or zero-filled device.

use eeprom_sim::{Device, EepromBuilder, EepromError};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::TempDir;

fn make_device(dir: &Path) {
    let mut dev = EepromBuilder::new()
        .dir(dir)
        .size(16)
        .max_cycles(3)
        .build()
        .unwrap();
    dev.write(0, 1).unwrap();
}

/// Helper: Truncate file to specific size
fn truncate_file(path: &Path, size: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(size).unwrap();
}

fn assert_corrupted(dir: &Path) {
    match Device::open(dir) {
        Err(EepromError::Corrupted { .. }) => {}
        Err(other) => panic!("expected Corrupted, got {}", other),
        Ok(_) => panic!("damaged device opened cleanly"),
    }
}

#[test]
fn test_truncated_cell_file() {
    let dir = TempDir::new().unwrap();
    make_device(dir.path());

    truncate_file(&dir.path().join("eeprom.bin"), 8);
    assert_corrupted(dir.path());
}

#[test]
fn test_extended_counter_file() {
    let dir = TempDir::new().unwrap();
    make_device(dir.path());

    truncate_file(&dir.path().join("write_cycles.bin"), 16 * 4 + 3);
    assert_corrupted(dir.path());
}

#[test]
fn test_counter_above_ceiling() {
    let dir = TempDir::new().unwrap();
    make_device(dir.path());

    let mut file = OpenOptions::new()
        .write(true)
        .open(dir.path().join("write_cycles.bin"))
        .unwrap();
    file.seek(SeekFrom::Start(4 * 7)).unwrap();
    file.write_all(&99u32.to_le_bytes()).unwrap();
    file.flush().unwrap();
    drop(file);

    assert_corrupted(dir.path());
}

#[test]
fn test_missing_counter_file() {
    let dir = TempDir::new().unwrap();
    make_device(dir.path());

    std::fs::remove_file(dir.path().join("write_cycles.bin")).unwrap();
    assert!(Device::open(dir.path()).is_err());
}

#[test]
fn test_unreadable_metadata() {
    let dir = TempDir::new().unwrap();
    make_device(dir.path());

    std::fs::write(dir.path().join("device.toml"), "size = \"sixteen\"").unwrap();
    assert!(matches!(
        Device::open(dir.path()),
        Err(EepromError::ConfigParse(_))
    ));
}

#[test]
fn test_failed_open_is_logged() {
    let dir = TempDir::new().unwrap();
    make_device(dir.path());
    truncate_file(&dir.path().join("eeprom.bin"), 4);
    assert_corrupted(dir.path());

    let raw = std::fs::read_to_string(dir.path().join("eeprom_log.jsonl")).unwrap();
    let last: serde_json::Value = serde_json::from_str(raw.lines().last().unwrap()).unwrap();
    assert_eq!(last["operation"], "initialize");
    assert_eq!(last["outcome"]["status"], "failure");
    assert_eq!(last["outcome"]["kind"], "corrupted");
}
