// src/types.rs
use crate::error::{DbdError, Result};
use crate::utils;

/// Fill value written for absent int8 cells
pub const FILL_INT8: i8 = -127;

/// Fill value written for absent int16 cells
pub const FILL_INT16: i16 = -32768;

/// Logical type of a sensor, derived from its declared byte width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    I8,
    I16,
    F32,
    F64,
}

impl SensorType {
    /// Map a declared byte width (1, 2, 4 or 8) to its logical type
    pub fn from_width(width: usize) -> Option<Self> {
        match width {
            1 => Some(SensorType::I8),
            2 => Some(SensorType::I16),
            4 => Some(SensorType::F32),
            8 => Some(SensorType::F64),
            _ => None,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            SensorType::I8 => 1,
            SensorType::I16 => 2,
            SensorType::F32 => 4,
            SensorType::F64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorType::I8 => "int8",
            SensorType::I16 => "int16",
            SensorType::F32 => "float32",
            SensorType::F64 => "float64",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SensorType::F32 | SensorType::F64)
    }

    /// Sentinel stored for cells with no data
    pub fn fill_value(&self) -> ColumnValue {
        match self {
            SensorType::I8 => ColumnValue::I8(FILL_INT8),
            SensorType::I16 => ColumnValue::I16(FILL_INT16),
            SensorType::F32 => ColumnValue::F32(f32::NAN),
            SensorType::F64 => ColumnValue::F64(f64::NAN),
        }
    }

    /// Decode one value of this type from exactly `width()` bytes.
    ///
    /// `flip_bytes` selects big-endian interpretation. Infinite floats are
    /// stored as NaN.
    pub fn decode(&self, bytes: &[u8], flip_bytes: bool) -> ColumnValue {
        match self {
            SensorType::I8 => ColumnValue::I8(bytes[0] as i8),
            SensorType::I16 => ColumnValue::I16(utils::read_i16(bytes, flip_bytes)),
            SensorType::F32 => {
                let v = utils::read_f32(bytes, flip_bytes);
                ColumnValue::F32(if v.is_infinite() { f32::NAN } else { v })
            }
            SensorType::F64 => {
                let v = utils::read_f64(bytes, flip_bytes);
                ColumnValue::F64(if v.is_infinite() { f64::NAN } else { v })
            }
        }
    }
}

/// A single decoded cell
#[derive(Debug, Clone, Copy)]
pub enum ColumnValue {
    I8(i8),
    I16(i16),
    F32(f32),
    F64(f64),
}

// Floats compare by bit pattern so that NaN fills are equal to each other.
impl PartialEq for ColumnValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColumnValue::I8(a), ColumnValue::I8(b)) => a == b,
            (ColumnValue::I16(a), ColumnValue::I16(b)) => a == b,
            (ColumnValue::F32(a), ColumnValue::F32(b)) => a.to_bits() == b.to_bits(),
            (ColumnValue::F64(a), ColumnValue::F64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl ColumnValue {
    pub fn sensor_type(&self) -> SensorType {
        match self {
            ColumnValue::I8(_) => SensorType::I8,
            ColumnValue::I16(_) => SensorType::I16,
            ColumnValue::F32(_) => SensorType::F32,
            ColumnValue::F64(_) => SensorType::F64,
        }
    }

    /// True when this value is the sentinel for its type
    pub fn is_fill(&self) -> bool {
        match self {
            ColumnValue::I8(v) => *v == FILL_INT8,
            ColumnValue::I16(v) => *v == FILL_INT16,
            ColumnValue::F32(v) => v.is_nan(),
            ColumnValue::F64(v) => v.is_nan(),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            ColumnValue::I8(v) => *v as f64,
            ColumnValue::I16(v) => *v as f64,
            ColumnValue::F32(v) => *v as f64,
            ColumnValue::F64(v) => *v,
        }
    }
}

/// Name, units and element type of one output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub units: String,
    pub sensor_type: SensorType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, units: impl Into<String>, sensor_type: SensorType) -> Self {
        ColumnSpec {
            name: name.into(),
            units: units.into(),
            sensor_type,
        }
    }
}

/// Natively typed storage for one output column
#[derive(Debug, Clone)]
pub enum Column {
    I8(Vec<i8>),
    I16(Vec<i16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Column::I8(a), Column::I8(b)) => a == b,
            (Column::I16(a), Column::I16(b)) => a == b,
            (Column::F32(a), Column::F32(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Column::F64(a), Column::F64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        }
    }
}

impl Column {
    pub fn with_capacity(sensor_type: SensorType, capacity: usize) -> Self {
        match sensor_type {
            SensorType::I8 => Column::I8(Vec::with_capacity(capacity)),
            SensorType::I16 => Column::I16(Vec::with_capacity(capacity)),
            SensorType::F32 => Column::F32(Vec::with_capacity(capacity)),
            SensorType::F64 => Column::F64(Vec::with_capacity(capacity)),
        }
    }

    /// A column of `len` sentinel values
    pub fn filled(sensor_type: SensorType, len: usize) -> Self {
        match sensor_type {
            SensorType::I8 => Column::I8(vec![FILL_INT8; len]),
            SensorType::I16 => Column::I16(vec![FILL_INT16; len]),
            SensorType::F32 => Column::F32(vec![f32::NAN; len]),
            SensorType::F64 => Column::F64(vec![f64::NAN; len]),
        }
    }

    pub fn sensor_type(&self) -> SensorType {
        match self {
            Column::I8(_) => SensorType::I8,
            Column::I16(_) => SensorType::I16,
            Column::F32(_) => SensorType::F32,
            Column::F64(_) => SensorType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::I8(v) => v.len(),
            Column::I16(v) => v.len(),
            Column::F32(v) => v.len(),
            Column::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        match self {
            Column::I8(v) => v.capacity(),
            Column::I16(v) => v.capacity(),
            Column::F32(v) => v.capacity(),
            Column::F64(v) => v.capacity(),
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        match self {
            Column::I8(v) => v.reserve(additional),
            Column::I16(v) => v.reserve(additional),
            Column::F32(v) => v.reserve(additional),
            Column::F64(v) => v.reserve(additional),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Column::I8(v) => v.clear(),
            Column::I16(v) => v.clear(),
            Column::F32(v) => v.clear(),
            Column::F64(v) => v.clear(),
        }
    }

    /// Append one value; the value type must match the column type
    pub fn push(&mut self, value: ColumnValue) -> Result<()> {
        match (self, value) {
            (Column::I8(v), ColumnValue::I8(x)) => v.push(x),
            (Column::I16(v), ColumnValue::I16(x)) => v.push(x),
            (Column::F32(v), ColumnValue::F32(x)) => v.push(x),
            (Column::F64(v), ColumnValue::F64(x)) => v.push(x),
            (col, value) => {
                return Err(DbdError::TypeMismatch {
                    expected: col.sensor_type().name().to_string(),
                    found: value.sensor_type().name().to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<ColumnValue> {
        match self {
            Column::I8(v) => v.get(index).map(|x| ColumnValue::I8(*x)),
            Column::I16(v) => v.get(index).map(|x| ColumnValue::I16(*x)),
            Column::F32(v) => v.get(index).map(|x| ColumnValue::F32(*x)),
            Column::F64(v) => v.get(index).map(|x| ColumnValue::F64(*x)),
        }
    }

    /// Append `other[start..]` to this column
    pub fn extend_from(&mut self, other: &Column, start: usize) -> Result<()> {
        match (self, other) {
            (Column::I8(a), Column::I8(b)) => a.extend_from_slice(b.get(start..).unwrap_or(&[])),
            (Column::I16(a), Column::I16(b)) => a.extend_from_slice(b.get(start..).unwrap_or(&[])),
            (Column::F32(a), Column::F32(b)) => a.extend_from_slice(b.get(start..).unwrap_or(&[])),
            (Column::F64(a), Column::F64(b)) => a.extend_from_slice(b.get(start..).unwrap_or(&[])),
            (a, b) => {
                return Err(DbdError::TypeMismatch {
                    expected: a.sensor_type().name().to_string(),
                    found: b.sensor_type().name().to_string(),
                })
            }
        }
        Ok(())
    }

    /// Append `count` sentinel values
    pub fn extend_fill(&mut self, count: usize) {
        match self {
            Column::I8(v) => v.resize(v.len() + count, FILL_INT8),
            Column::I16(v) => v.resize(v.len() + count, FILL_INT16),
            Column::F32(v) => v.resize(v.len() + count, f32::NAN),
            Column::F64(v) => v.resize(v.len() + count, f64::NAN),
        }
    }

    /// Indices of rows holding the sentinel value
    pub fn fill_positions(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.get(i).map_or(false, |v| v.is_fill()))
            .collect()
    }

    /// Widen every value to f64 (sentinels are kept as their numeric value)
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Column::I8(v) => v.iter().map(|x| *x as f64).collect(),
            Column::I16(v) => v.iter().map(|x| *x as f64).collect(),
            Column::F32(v) => v.iter().map(|x| *x as f64).collect(),
            Column::F64(v) => v.clone(),
        }
    }
}
