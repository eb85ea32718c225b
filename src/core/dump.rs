//! Hex/ASCII rendering of a cell region

use serde::Serialize;
use std::fmt;

const ROW_WIDTH: usize = 16;

/// A snapshot of `bytes` taken at address `start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HexDump {
    pub start: usize,
    pub bytes: Vec<u8>,
}

/// A run of printable ASCII found in a dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedString {
    pub address: usize,
    pub text: String,
}

impl HexDump {
    pub fn new(start: usize, bytes: Vec<u8>) -> Self {
        HexDump { start, bytes }
    }

    /// Maximal runs of printable ASCII (0x20..=0x7E), in address order
    pub fn strings(&self) -> Vec<DetectedString> {
        let mut found = Vec::new();
        let mut run_start = None;

        for (offset, &b) in self.bytes.iter().enumerate() {
            match (is_printable(b), run_start) {
                (true, None) => run_start = Some(offset),
                (false, Some(s)) => {
                    found.push(self.detected(s, offset));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = run_start {
            found.push(self.detected(s, self.bytes.len()));
        }
        found
    }

    fn detected(&self, from: usize, to: usize) -> DetectedString {
        DetectedString {
            address: self.start + from,
            text: self.bytes[from..to].iter().map(|&b| b as char).collect(),
        }
    }
}

fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

impl fmt::Display for HexDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.bytes.chunks(ROW_WIDTH).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| if is_printable(b) { b as char } else { '.' })
                .collect();
            writeln!(
                f,
                "{:04X}: {:<width$}  {}",
                self.start + row * ROW_WIDTH,
                hex.join(" "),
                ascii,
                width = ROW_WIDTH * 3 - 1
            )?;
        }
        Ok(())
    }
}
