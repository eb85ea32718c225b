//! Typed records stored in cells
//!
//! A record is a little-endian `u16` body length followed by the body in
//! bincode's fixed-width little-endian encoding. Plain structs of integers and
//! floats therefore land in cells with the same layout a packed C struct
//! would have.

use crate::error::{EepromError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bytes taken by the length prefix
pub const LENGTH_PREFIX: usize = 2;

/// Common sensor sample: `{ u16 id; f32 temperature; f32 humidity; }`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: u16,
    pub temperature: f32,
    pub humidity: f32,
}

/// Encode a value as prefix + body
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let body = bincode::serialize(value)?;
    let len = u16::try_from(body.len()).map_err(|_| {
        EepromError::InvalidPayload(format!("record of {} bytes is too large", body.len()))
    })?;

    let mut bytes = Vec::with_capacity(LENGTH_PREFIX + body.len());
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Body length announced by a prefix
pub fn body_len(prefix: &[u8]) -> Result<usize> {
    match prefix {
        [lo, hi, ..] => Ok(u16::from_le_bytes([*lo, *hi]) as usize),
        _ => Err(EepromError::InvalidPayload(
            "record prefix must be 2 bytes".to_string(),
        )),
    }
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(body)?)
}
