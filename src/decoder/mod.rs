// src/decoder/mod.rs
//! Data-record decoding
//!
//! The data section is a sequence of tagged records terminated by `X`:
//!
//! ```text
//! 'd' | code bits: ceil(n_sensors / 4) bytes | new values, in sensor order
//! ```
//!
//! Each sensor owns two bits of the code block, most significant first:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | no data in this record |
//! | 1    | repeat the sensor's last value |
//! | 2    | a new value follows in the value stream |
//! | 3    | unused |
//!
//! [`RecordDecoder`] walks these records against a [`DecodePlan`] that maps
//! each file sensor to an output column, and appends admitted rows to a
//! [`DecodedBatch`].

mod batch;
mod plan;
mod record;

pub use batch::DecodedBatch;
pub use plan::{DecodePlan, PlanSlot};
pub use record::{DecodeContext, RecordDecoder};

use crate::error::DbdError;

pub const CODE_ABSENT: u8 = 0;
pub const CODE_REPEAT: u8 = 1;
pub const CODE_NEW: u8 = 2;

/// The 2-bit code of sensor `index` in a record's code block
#[inline]
pub fn sensor_code(bits: &[u8], index: usize) -> u8 {
    (bits[index >> 2] >> (6 - ((index & 3) << 1))) & 0x03
}

/// Outcome of one step of the record loop
#[derive(Debug)]
pub enum DecodeOutcome {
    /// A record was decoded; `admitted` tells whether it produced a row
    RowDecoded { admitted: bool },
    /// End tag, end of stream, or a truncated code block
    CleanEnd,
    /// Corrupt data stopped decoding; rows already produced are kept
    CorruptStop(DbdError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_code_layout() {
        let bits = [0b1001_0011, 0b0100_0000];
        let codes: Vec<u8> = (0..5).map(|i| sensor_code(&bits, i)).collect();
        assert_eq!(codes, vec![2, 1, 0, 3, 1]);
    }
}
