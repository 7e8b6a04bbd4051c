// src/netcdf/mod.rs
//! Minimal netCDF classic (64-bit offset) container
//!
//! Only what the converter needs is supported: one unlimited dimension,
//! record variables along it, text or integer attributes. All values are
//! stored big-endian.
//!
//! ```text
//! header  := 'C' 'D' 'F' 0x02  numrecs  dim_list  gatt_list  var_list
//! var     := name  ndims  dimids  vatt_list  nc_type  vsize  begin(u64)
//! record  := for each variable: one value, zero-padded to 4 bytes
//! ```

mod reader;
mod writer;

pub use reader::{NcReader, NcVariable};
pub use writer::NcWriter;

use crate::error::{DbdError, Result};
use crate::types::SensorType;
use crate::utils::padded_len;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub const MAGIC: [u8; 4] = [b'C', b'D', b'F', 0x02];

/// Name of the unlimited record dimension
pub const RECORD_DIMENSION: &str = "i";

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;

/// External data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NcType {
    Byte = 1,
    Char = 2,
    Short = 3,
    Int = 4,
    Float = 5,
    Double = 6,
}

impl NcType {
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            1 => Ok(NcType::Byte),
            2 => Ok(NcType::Char),
            3 => Ok(NcType::Short),
            4 => Ok(NcType::Int),
            5 => Ok(NcType::Float),
            6 => Ok(NcType::Double),
            other => Err(DbdError::InvalidContainer(format!("unknown nc_type {}", other))),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            NcType::Byte | NcType::Char => 1,
            NcType::Short => 2,
            NcType::Int | NcType::Float => 4,
            NcType::Double => 8,
        }
    }

    pub fn for_sensor(sensor_type: SensorType) -> Self {
        match sensor_type {
            SensorType::I8 => NcType::Byte,
            SensorType::I16 => NcType::Short,
            SensorType::F32 => NcType::Float,
            SensorType::F64 => NcType::Double,
        }
    }

    pub fn sensor_type(&self) -> Option<SensorType> {
        match self {
            NcType::Byte => Some(SensorType::I8),
            NcType::Short => Some(SensorType::I16),
            NcType::Float => Some(SensorType::F32),
            NcType::Double => Some(SensorType::F64),
            NcType::Char | NcType::Int => None,
        }
    }
}

/// Attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum NcAttribute {
    Text(String),
    Bytes(Vec<i8>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
}

impl NcAttribute {
    pub fn nc_type(&self) -> NcType {
        match self {
            NcAttribute::Text(_) => NcType::Char,
            NcAttribute::Bytes(_) => NcType::Byte,
            NcAttribute::Shorts(_) => NcType::Short,
            NcAttribute::Ints(_) => NcType::Int,
            NcAttribute::Floats(_) => NcType::Float,
            NcAttribute::Doubles(_) => NcType::Double,
        }
    }

    fn len(&self) -> usize {
        match self {
            NcAttribute::Text(s) => s.len(),
            NcAttribute::Bytes(v) => v.len(),
            NcAttribute::Shorts(v) => v.len(),
            NcAttribute::Ints(v) => v.len(),
            NcAttribute::Floats(v) => v.len(),
            NcAttribute::Doubles(v) => v.len(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NcAttribute::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            NcAttribute::Ints(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Size of the encoded attribute, type and count included
    fn encoded_len(name: &str, value: &NcAttribute) -> usize {
        name_len(name) + 8 + padded_len(value.len() * value.nc_type().size())
    }
}

fn name_len(name: &str) -> usize {
    4 + padded_len(name.len())
}

fn write_padding<W: Write>(writer: &mut W, len: usize) -> Result<()> {
    let pad = padded_len(len) - len;
    writer.write_all(&[0u8; 4][..pad])?;
    Ok(())
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> Result<()> {
    writer.write_u32::<BigEndian>(name.len() as u32)?;
    writer.write_all(name.as_bytes())?;
    write_padding(writer, name.len())
}

fn read_name<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u32::<BigEndian>()? as usize;
    let mut bytes = vec![0u8; padded_len(len)];
    reader.read_exact(&mut bytes)?;
    bytes.truncate(len);
    String::from_utf8(bytes).map_err(|_| DbdError::InvalidContainer("name is not UTF-8".into()))
}

fn write_attributes<W: Write>(writer: &mut W, attributes: &[(String, NcAttribute)]) -> Result<()> {
    if attributes.is_empty() {
        writer.write_u64::<BigEndian>(0)?;
        return Ok(());
    }
    writer.write_u32::<BigEndian>(NC_ATTRIBUTE)?;
    writer.write_u32::<BigEndian>(attributes.len() as u32)?;
    for (name, value) in attributes {
        write_name(writer, name)?;
        writer.write_u32::<BigEndian>(value.nc_type() as u32)?;
        writer.write_u32::<BigEndian>(value.len() as u32)?;
        match value {
            NcAttribute::Text(s) => writer.write_all(s.as_bytes())?,
            NcAttribute::Bytes(v) => v.iter().try_for_each(|x| writer.write_i8(*x))?,
            NcAttribute::Shorts(v) => v.iter().try_for_each(|x| writer.write_i16::<BigEndian>(*x))?,
            NcAttribute::Ints(v) => v.iter().try_for_each(|x| writer.write_i32::<BigEndian>(*x))?,
            NcAttribute::Floats(v) => v.iter().try_for_each(|x| writer.write_f32::<BigEndian>(*x))?,
            NcAttribute::Doubles(v) => v.iter().try_for_each(|x| writer.write_f64::<BigEndian>(*x))?,
        }
        write_padding(writer, value.len() * value.nc_type().size())?;
    }
    Ok(())
}

fn attributes_len(attributes: &[(String, NcAttribute)]) -> usize {
    8 + attributes
        .iter()
        .map(|(name, value)| NcAttribute::encoded_len(name, value))
        .sum::<usize>()
}

fn read_attributes<R: Read>(reader: &mut R) -> Result<Vec<(String, NcAttribute)>> {
    let tag = reader.read_u32::<BigEndian>()?;
    let count = reader.read_u32::<BigEndian>()? as usize;
    if tag == 0 && count == 0 {
        return Ok(Vec::new());
    }
    if tag != NC_ATTRIBUTE {
        return Err(DbdError::InvalidContainer(format!("expected attribute list, found tag {}", tag)));
    }

    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_name(reader)?;
        let nc_type = NcType::from_u32(reader.read_u32::<BigEndian>()?)?;
        let n = reader.read_u32::<BigEndian>()? as usize;
        let value = match nc_type {
            NcType::Char => {
                let mut bytes = vec![0u8; n];
                reader.read_exact(&mut bytes)?;
                NcAttribute::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            NcType::Byte => NcAttribute::Bytes((0..n).map(|_| reader.read_i8()).collect::<std::io::Result<_>>()?),
            NcType::Short => {
                NcAttribute::Shorts((0..n).map(|_| reader.read_i16::<BigEndian>()).collect::<std::io::Result<_>>()?)
            }
            NcType::Int => {
                NcAttribute::Ints((0..n).map(|_| reader.read_i32::<BigEndian>()).collect::<std::io::Result<_>>()?)
            }
            NcType::Float => {
                NcAttribute::Floats((0..n).map(|_| reader.read_f32::<BigEndian>()).collect::<std::io::Result<_>>()?)
            }
            NcType::Double => {
                NcAttribute::Doubles((0..n).map(|_| reader.read_f64::<BigEndian>()).collect::<std::io::Result<_>>()?)
            }
        };
        let used = n * nc_type.size();
        let mut pad = [0u8; 4];
        reader.read_exact(&mut pad[..padded_len(used) - used])?;
        attributes.push((name, value));
    }
    Ok(attributes)
}
