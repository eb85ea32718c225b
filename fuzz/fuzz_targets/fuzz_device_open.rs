#![no_main]
use eeprom_sim::Device;
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes as backing files: open must fail cleanly or succeed, never panic
fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let dir = match tempfile::TempDir::new() {
        Ok(d) => d,
        Err(_) => return,
    };

    let split = data.len() / 5;
    let (cells, counters) = data.split_at(split);
    let meta = format!("size = {}\nmax_cycles = {}\n", cells.len(), data[0] as u32 + 1);

    if std::fs::write(dir.path().join("device.toml"), meta).is_err()
        || std::fs::write(dir.path().join("eeprom.bin"), cells).is_err()
        || std::fs::write(dir.path().join("write_cycles.bin"), counters).is_err()
    {
        return;
    }

    if let Ok(mut dev) = Device::open(dir.path()) {
        let _ = dev.read_range(0, dev.size());
        let _ = dev.power_cycle();
    }
});
