#![no_main]
use eeprom_sim::{EepromBuilder, EepromError};
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};

const SIZE: usize = 64;

#[derive(Debug, Arbitrary)]
enum DeviceOp {
    Read(u8),
    ReadRange(u8, u8),
    ReadString(u8),
    Write(u8, u8),
    WriteRange(u8, Vec<u8>),
    WriteString(u8, String),
    Delete(u8),
    DeleteRange(u8, u8),
    DeleteAll,
    Checksum(u8, u8),
    FullReset(bool),
    PowerCycle,
}

// Random operation sequences: never panic, never break the wear ceiling
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let ops: Vec<DeviceOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let dir = match tempfile::TempDir::new() {
        Ok(d) => d,
        Err(_) => return,
    };
    let mut dev = match EepromBuilder::new().dir(dir.path()).size(SIZE).max_cycles(3).build() {
        Ok(d) => d,
        Err(_) => return,
    };

    for op in ops.iter().take(64) {
        let result = match op {
            DeviceOp::Read(a) => dev.read(*a as usize).map(|_| ()),
            DeviceOp::ReadRange(a, n) => dev.read_range(*a as usize, *n as usize).map(|_| ()),
            DeviceOp::ReadString(a) => dev.read_string(*a as usize).map(|_| ()),
            DeviceOp::Write(a, v) => dev.write(*a as usize, *v),
            DeviceOp::WriteRange(a, bytes) => dev.write_range(*a as usize, bytes),
            DeviceOp::WriteString(a, text) => dev.write_string(*a as usize, text),
            DeviceOp::Delete(a) => dev.delete(*a as usize),
            DeviceOp::DeleteRange(a, n) => dev.delete_range(*a as usize, *n as usize),
            DeviceOp::DeleteAll => dev.delete_all().map(|_| ()),
            DeviceOp::Checksum(a, n) => dev.checksum(*a as usize, *n as usize).map(|_| ()),
            DeviceOp::FullReset(keep) => dev.full_reset(*keep).map(|_| ()),
            DeviceOp::PowerCycle => dev.power_cycle(),
        };

        match result {
            Ok(())
            | Err(EepromError::OutOfRange { .. })
            | Err(EepromError::EnduranceExhausted { .. })
            | Err(EepromError::InvalidPayload(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert!(dev.wear_summary().max_counter <= 3);
});
