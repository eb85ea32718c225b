//! End-to-end device scenarios across reopen and power cycles

use eeprom_sim::{Device, DeviceConfig, EepromBuilder, EepromError, WearState};
use tempfile::TempDir;

fn hello_device(dir: &TempDir, size: usize, max_cycles: u32) -> Device {
    EepromBuilder::new()
        .dir(dir.path())
        .size(size)
        .max_cycles(max_cycles)
        .default_payload("HELLO")
        .build()
        .unwrap()
}

#[test]
fn test_fresh_device_layout() {
    let dir = TempDir::new().unwrap();
    let mut dev = hello_device(&dir, 16, 2);

    let all = dev.read_range(0, 16).unwrap();
    assert_eq!(&all[..5], b"HELLO");
    assert_eq!(all[5], 0x00);
    assert!(all[6..].iter().all(|&b| b == 0xFF));

    for file in ["eeprom.bin", "write_cycles.bin", "eeprom_log.jsonl", "device.toml"] {
        assert!(dir.path().join(file).exists(), "{} missing", file);
    }
    assert_eq!(std::fs::metadata(dir.path().join("eeprom.bin")).unwrap().len(), 16);
    assert_eq!(
        std::fs::metadata(dir.path().join("write_cycles.bin")).unwrap().len(),
        64
    );
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut dev = hello_device(&dir, 64, 10);
        dev.write(10, 0x42).unwrap();
        dev.write_string(20, "persist me").unwrap();
        dev.write(10, 0x43).unwrap();
    }

    let mut dev = Device::open(dir.path()).unwrap();
    assert_eq!(dev.size(), 64);
    assert_eq!(dev.read(10).unwrap(), 0x43);
    assert_eq!(dev.read_string(20).unwrap(), "persist me");
    assert_eq!(dev.counter_at(10).unwrap(), 2);
    assert_eq!(dev.counter_at(20).unwrap(), 1);
    // Separator after the string is a written cell too
    assert_eq!(dev.counter_at(30).unwrap(), 1);
    assert_eq!(dev.counter_at(31).unwrap(), 0);
}

#[test]
fn test_worn_cell_stays_worn_after_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut dev = hello_device(&dir, 16, 2);
        dev.write(5, 1).unwrap();
        dev.write(5, 2).unwrap();
    }

    let mut dev = Device::open(dir.path()).unwrap();
    assert_eq!(dev.wear_state(5).unwrap(), WearState::Worn);
    assert!(!dev.can_write(5).unwrap());

    let err = dev.write(5, 3).unwrap_err();
    assert!(matches!(err, EepromError::EnduranceExhausted { ref addresses } if addresses == &[5]));
    assert_eq!(dev.read(5).unwrap(), 2);

    // Neighbours unaffected
    dev.write(4, 9).unwrap();
    assert_eq!(
        dev.wear_state(4).unwrap(),
        WearState::Fresh { remaining: 1 }
    );
}

#[test]
fn test_delete_all_then_reset_restores_default() {
    let dir = TempDir::new().unwrap();
    let mut dev = hello_device(&dir, 32, 5);

    assert_eq!(dev.delete_all().unwrap(), 32);
    assert_eq!(dev.read_range(0, 32).unwrap(), vec![0x00; 32]);
    assert_eq!(dev.read_string(0).unwrap(), "");

    let report = dev.full_reset(true).unwrap();
    assert_eq!(report.reset, 32);
    assert!(report.preserved_default);
    assert_eq!(dev.read_string(0).unwrap(), "HELLO");
    assert_eq!(dev.read(31).unwrap(), 0xFF);

    // delete_all + reset = two cycles per cell; counters never reset
    assert_eq!(dev.wear_summary().max_counter, 2);
    assert_eq!(dev.wear_summary().total_writes, 64);
}

#[test]
fn test_delete_all_refused_when_any_cell_worn() {
    let dir = TempDir::new().unwrap();
    let mut dev = hello_device(&dir, 8, 1);
    dev.write(3, 0x33).unwrap();

    let err = dev.delete_all().unwrap_err();
    assert!(matches!(err, EepromError::EnduranceExhausted { .. }));
    assert_eq!(dev.read_range(0, 5).unwrap(), vec![b'H', b'E', b'L', 0x33, b'O']);
    assert_eq!(dev.counter_at(0).unwrap(), 0);
}

#[test]
fn test_power_cycle_preserves_everything() {
    let dir = TempDir::new().unwrap();
    let mut dev = hello_device(&dir, 16, 4);
    dev.write_range(8, &[1, 2, 3]).unwrap();

    let before = dev.read_range(0, 16).unwrap();
    let wear = dev.wear_summary();

    dev.power_cycle().unwrap();

    assert_eq!(dev.read_range(0, 16).unwrap(), before);
    assert_eq!(dev.wear_summary(), wear);
}

#[test]
fn test_power_cycle_picks_up_external_changes() {
    let dir = TempDir::new().unwrap();
    let mut dev = hello_device(&dir, 8, 4);

    // Another process rewrote the cell file while the device was "off"
    std::fs::write(dir.path().join("eeprom.bin"), [7u8; 8]).unwrap();
    dev.power_cycle().unwrap();
    assert_eq!(dev.read(0).unwrap(), 7);
}

#[test]
fn test_out_of_range_is_never_clamped() {
    let dir = TempDir::new().unwrap();
    let mut dev = hello_device(&dir, 16, 4);

    assert!(matches!(dev.read(16), Err(EepromError::OutOfRange { .. })));
    assert!(matches!(dev.read_range(10, 7), Err(EepromError::OutOfRange { .. })));
    assert!(matches!(dev.read_range(0, 0), Err(EepromError::OutOfRange { .. })));
    assert!(matches!(dev.write_range(15, &[1, 2]), Err(EepromError::OutOfRange { .. })));
    assert!(matches!(dev.delete_range(usize::MAX, 2), Err(EepromError::OutOfRange { .. })));
    assert!(matches!(dev.checksum(0, 17), Err(EepromError::OutOfRange { .. })));

    // Nothing was written by any of the rejected calls
    assert_eq!(dev.wear_summary().total_writes, 0);
}

#[test]
fn test_checksum_of_hello() {
    let dir = TempDir::new().unwrap();
    let mut dev = hello_device(&dir, 16, 4);

    // 'H'+'E'+'L'+'L'+'O' = 372, mod 256 = 116
    let sum = dev.checksum(0, 5).unwrap();
    assert_eq!(sum.value, 116);

    // Pure: same input, same value, no wear
    assert_eq!(dev.checksum(0, 5).unwrap(), sum);
    assert_eq!(dev.wear_summary().total_writes, 0);
}

#[test]
fn test_custom_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("custom.toml");
    std::fs::write(
        &config_path,
        "size = 32\nmax_cycles = 3\ndefault_payload = \"BOOT\"\nfill_byte = 0\nchecksum = \"xor8\"\n",
    )
    .unwrap();

    let device_dir = dir.path().join("dev");
    let mut dev = EepromBuilder::new()
        .config_file(&config_path)
        .dir(&device_dir)
        .build()
        .unwrap();

    assert_eq!(dev.size(), 32);
    assert_eq!(dev.max_cycles(), 3);
    assert_eq!(dev.read_string(0).unwrap(), "BOOT");
    assert_eq!(dev.read(31).unwrap(), 0x00);
    // 'B' ^ 'O' ^ 'O' ^ 'T' = 'B' ^ 'T'
    assert_eq!(dev.checksum(0, 4).unwrap().value, (b'B' ^ b'T') as u32);

    let persisted = DeviceConfig::from_toml_file(device_dir.join("device.toml")).unwrap();
    assert_eq!(persisted.size, 32);
    assert_eq!(persisted.default_payload, "BOOT");
}
