// src/known_bytes.rs
//! Known-bytes block that fixes the byte order of a file's values
//!
//! Immediately after the sensor list every file carries 16 bytes:
//!
//! | Offset | Size | Content            |
//! |--------|------|--------------------|
//! | 0      | 1    | `s`                |
//! | 1      | 1    | `a`                |
//! | 2      | 2    | int16 `0x1234`     |
//! | 4      | 4    | float32 `123.456`  |
//! | 8      | 8    | float64 `123456789.12345` |

use crate::error::{DbdError, Result};
use crate::framing::FramingReader;
use crate::utils;

pub const KNOWN_BYTES_LEN: usize = 16;

const KNOWN_INT16: i16 = 0x1234;
const KNOWN_FLOAT32: f64 = 123.456;
const KNOWN_FLOAT64: f64 = 123_456_789.123_45;
const TOLERANCE: f64 = 1e-3;

/// Result of the endianness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownBytes {
    /// Multi-byte values are stored big-endian
    pub flip_bytes: bool,
}

impl KnownBytes {
    /// Consume and validate the known-bytes block
    pub fn read(reader: &mut FramingReader) -> Result<Self> {
        let mut block = [0u8; KNOWN_BYTES_LEN];
        let n = reader.read_into(&mut block)?;
        if n < KNOWN_BYTES_LEN {
            return Err(DbdError::InvalidMagicBytes(format!(
                "expected {} bytes, found {}",
                KNOWN_BYTES_LEN, n
            )));
        }
        Self::parse(&block)
    }

    /// Validate a 16-byte block
    pub fn parse(block: &[u8]) -> Result<Self> {
        if block.len() < KNOWN_BYTES_LEN {
            return Err(DbdError::InvalidMagicBytes(format!("block is {} bytes", block.len())));
        }
        if block[0] != b's' || block[1] != b'a' {
            return Err(DbdError::InvalidMagicBytes(format!(
                "expected tag \"sa\", found {:02x} {:02x}",
                block[0], block[1]
            )));
        }

        let flip_bytes = if utils::read_i16(&block[2..4], false) == KNOWN_INT16 {
            false
        } else if utils::read_i16(&block[2..4], true) == KNOWN_INT16 {
            true
        } else {
            return Err(DbdError::InvalidMagicBytes(format!(
                "int16 is {:#06x}",
                utils::read_i16(&block[2..4], false)
            )));
        };

        let f = utils::read_f32(&block[4..8], flip_bytes) as f64;
        if !((f - KNOWN_FLOAT32).abs() <= TOLERANCE) {
            return Err(DbdError::InvalidMagicBytes(format!("float32 is {}", f)));
        }

        let d = utils::read_f64(&block[8..16], flip_bytes);
        if !((d - KNOWN_FLOAT64).abs() <= TOLERANCE) {
            return Err(DbdError::InvalidMagicBytes(format!("float64 is {}", d)));
        }

        Ok(KnownBytes { flip_bytes })
    }

    /// Encode the block a producer with the given byte order would write
    pub fn encode(flip_bytes: bool) -> [u8; KNOWN_BYTES_LEN] {
        let mut block = [0u8; KNOWN_BYTES_LEN];
        block[0] = b's';
        block[1] = b'a';
        if flip_bytes {
            block[2..4].copy_from_slice(&KNOWN_INT16.to_be_bytes());
            block[4..8].copy_from_slice(&(KNOWN_FLOAT32 as f32).to_be_bytes());
            block[8..16].copy_from_slice(&KNOWN_FLOAT64.to_be_bytes());
        } else {
            block[2..4].copy_from_slice(&KNOWN_INT16.to_le_bytes());
            block[4..8].copy_from_slice(&(KNOWN_FLOAT32 as f32).to_le_bytes());
            block[8..16].copy_from_slice(&KNOWN_FLOAT64.to_le_bytes());
        }
        block
    }
}
