// src/decoder/record.rs
use crate::decoder::{sensor_code, DecodeOutcome, DecodePlan, DecodedBatch, CODE_NEW, CODE_REPEAT};
use crate::error::{DbdError, Result};
use crate::framing::FramingReader;
use crate::types::ColumnValue;
use smallvec::SmallVec;

const TAG_DATA: u8 = b'd';
const TAG_END: u8 = b'X';

/// Last value seen for every output column of one file
///
/// Starts at the fill values, so a repeat code before any new value
/// yields a sentinel.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    last_seen: Vec<ColumnValue>,
}

impl DecodeContext {
    pub fn new(plan: &DecodePlan) -> Self {
        DecodeContext {
            last_seen: plan.columns().iter().map(|c| c.sensor_type.fill_value()).collect(),
        }
    }

    pub fn last_seen(&self, column: usize) -> Option<ColumnValue> {
        self.last_seen.get(column).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectTag,
    ExpectHeaderBits,
    ExpectValues,
    Done,
}

/// Walks the data section of one file
pub struct RecordDecoder<'a> {
    reader: &'a mut FramingReader,
    plan: &'a DecodePlan,
    flip_bytes: bool,
    repair: bool,
    state: State,
    records: usize,
    bits: SmallVec<[u8; 64]>,
    values: Vec<u8>,
    row: Vec<ColumnValue>,
    diagnostics: Vec<DbdError>,
}

impl<'a> RecordDecoder<'a> {
    /// Create a decoder for a reader positioned just after the known bytes
    ///
    /// # Arguments
    ///
    /// * `reader` - Stream positioned at the first record tag
    /// * `plan` - Sensor-to-column mapping for this file
    /// * `flip_bytes` - Values are stored big-endian
    /// * `repair` - Resynchronize on the next `d` after corrupt data
    pub fn new(reader: &'a mut FramingReader, plan: &'a DecodePlan, flip_bytes: bool, repair: bool) -> Self {
        let row = plan.columns().iter().map(|c| c.sensor_type.fill_value()).collect();
        RecordDecoder {
            reader,
            plan,
            flip_bytes,
            repair,
            state: State::ExpectTag,
            records: 0,
            bits: SmallVec::new(),
            values: Vec::new(),
            row,
            diagnostics: Vec::new(),
        }
    }

    /// Number of `d` records entered so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Row produced by the last [`DecodeOutcome::RowDecoded`]
    pub fn row(&self) -> &[ColumnValue] {
        &self.row
    }

    pub fn diagnostics(&self) -> &[DbdError] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<DbdError> {
        self.diagnostics
    }

    /// Advance to the next record
    ///
    /// I/O and framing failures are returned as `Err`; everything the
    /// record stream itself can do wrong is reported through the outcome.
    pub fn next_record(&mut self, ctx: &mut DecodeContext) -> Result<DecodeOutcome> {
        loop {
            match self.state {
                State::Done => return Ok(DecodeOutcome::CleanEnd),
                State::ExpectTag => {
                    let tag = match self.reader.read_byte()? {
                        None | Some(TAG_END) => {
                            self.state = State::Done;
                            return Ok(DecodeOutcome::CleanEnd);
                        }
                        Some(tag) => tag,
                    };
                    if tag == TAG_DATA {
                        self.state = State::ExpectHeaderBits;
                    } else if self.repair || self.records == 0 {
                        if !self.resync()? {
                            self.state = State::Done;
                            return Ok(DecodeOutcome::CleanEnd);
                        }
                        self.state = State::ExpectHeaderBits;
                    } else {
                        self.state = State::Done;
                        return Ok(DecodeOutcome::CorruptStop(DbdError::UnexpectedTag {
                            tag,
                            record: self.records,
                        }));
                    }
                }
                State::ExpectHeaderBits => {
                    let n = self.plan.header_bytes();
                    self.bits.clear();
                    self.bits.resize(n, 0);
                    if self.reader.read_into(&mut self.bits)? < n {
                        log::debug!("Code block of record {} cut short", self.records);
                        self.diagnostics.push(DbdError::TruncatedRecord { record: self.records });
                        self.state = State::Done;
                        return Ok(DecodeOutcome::CleanEnd);
                    }
                    self.state = State::ExpectValues;
                }
                State::ExpectValues => {
                    let record = self.records;
                    self.records += 1;

                    let needed = self.value_bytes();
                    self.values.resize(needed, 0);
                    if self.reader.read_into(&mut self.values)? < needed {
                        let err = DbdError::TruncatedRecord { record };
                        if self.repair {
                            log::debug!("{}; resynchronizing", err);
                            self.diagnostics.push(err);
                            self.state = State::ExpectTag;
                            continue;
                        }
                        self.state = State::Done;
                        return Ok(DecodeOutcome::CorruptStop(err));
                    }

                    let admitted = self.materialize(ctx);
                    self.state = State::ExpectTag;
                    return Ok(DecodeOutcome::RowDecoded { admitted });
                }
            }
        }
    }

    /// Decode every remaining record into `batch`
    ///
    /// With `skip_first`, the first admitted row is dropped. Returns the
    /// number of rows appended.
    pub fn decode_into(&mut self, ctx: &mut DecodeContext, batch: &mut DecodedBatch, skip_first: bool) -> Result<usize> {
        let mut skip = skip_first;
        let mut appended = 0;

        loop {
            match self.next_record(ctx)? {
                DecodeOutcome::RowDecoded { admitted: false } => {}
                DecodeOutcome::RowDecoded { admitted: true } => {
                    if skip {
                        skip = false;
                        continue;
                    }
                    batch.push_row(&self.row)?;
                    appended += 1;
                }
                DecodeOutcome::CleanEnd => break,
                DecodeOutcome::CorruptStop(err) => {
                    log::debug!("Decoding stopped: {}", err);
                    self.diagnostics.push(err);
                    break;
                }
            }
        }
        Ok(appended)
    }

    /// Scan forward to the next `d` tag; false at end of stream
    fn resync(&mut self) -> Result<bool> {
        let mut skipped = 1usize;
        while let Some(byte) = self.reader.read_byte()? {
            if byte == TAG_DATA {
                log::debug!("Skipped {} bytes before record {}", skipped, self.records);
                return Ok(true);
            }
            skipped += 1;
        }
        Ok(false)
    }

    fn value_bytes(&self) -> usize {
        self.plan
            .slots()
            .iter()
            .enumerate()
            .filter(|(i, _)| sensor_code(&self.bits, *i) == CODE_NEW)
            .map(|(_, slot)| slot.sensor_type.width())
            .sum()
    }

    fn materialize(&mut self, ctx: &mut DecodeContext) -> bool {
        for (cell, spec) in self.row.iter_mut().zip(self.plan.columns()) {
            *cell = spec.sensor_type.fill_value();
        }

        let mut admitted = false;
        let mut offset = 0;
        for (i, slot) in self.plan.slots().iter().enumerate() {
            match sensor_code(&self.bits, i) {
                CODE_REPEAT => {
                    admitted |= slot.is_criterion;
                    if let Some(out) = slot.output {
                        self.row[out] = ctx.last_seen[out];
                    }
                }
                CODE_NEW => {
                    let width = slot.sensor_type.width();
                    let value = slot.sensor_type.decode(&self.values[offset..offset + width], self.flip_bytes);
                    offset += width;
                    admitted |= slot.is_criterion;
                    if let Some(out) = slot.output {
                        self.row[out] = value;
                        ctx.last_seen[out] = value;
                    }
                }
                _ => {}
            }
        }
        admitted
    }
}
