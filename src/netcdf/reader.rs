// src/netcdf/reader.rs
use super::{read_attributes, read_name, NcAttribute, NcType, NC_DIMENSION, NC_VARIABLE};
use crate::error::{DbdError, Result};
use crate::types::{Column, SensorType};
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// A variable declared in the header
#[derive(Debug, Clone, PartialEq)]
pub struct NcVariable {
    pub name: String,
    pub nc_type: NcType,
    pub dimensions: Vec<usize>,
    pub attributes: Vec<(String, NcAttribute)>,
    pub vsize: u64,
    pub begin: u64,
}

impl NcVariable {
    pub fn attribute(&self, name: &str) -> Option<&NcAttribute> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn units(&self) -> Option<&str> {
        self.attribute("units").and_then(NcAttribute::as_text)
    }
}

/// Reader for netCDF classic files holding 1-D record variables
pub struct NcReader {
    file: BufReader<File>,
    numrecs: u64,
    dimensions: Vec<(String, u64)>,
    record_dimension: Option<usize>,
    attributes: Vec<(String, NcAttribute)>,
    variables: Vec<NcVariable>,
    recsize: u64,
}

impl NcReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = BufReader::new(File::open(path.as_ref())?);

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        let wide_offsets = match magic {
            [b'C', b'D', b'F', 0x01] => false,
            [b'C', b'D', b'F', 0x02] => true,
            _ => return Err(DbdError::InvalidContainer(format!("bad magic {:02x?}", magic))),
        };

        let numrecs = file.read_u32::<BigEndian>()?;
        if numrecs == u32::MAX {
            return Err(DbdError::InvalidContainer("streaming record count is not supported".into()));
        }

        let dimensions = read_dimensions(&mut file)?;
        let record_dimension = dimensions.iter().position(|(_, len)| *len == 0);
        let attributes = read_attributes(&mut file)?;
        let variables = read_variables(&mut file, wide_offsets)?;

        let mut reader = NcReader {
            file,
            numrecs: numrecs as u64,
            dimensions,
            record_dimension,
            attributes,
            variables,
            recsize: 0,
        };
        reader.recsize = reader.compute_recsize();
        Ok(reader)
    }

    fn is_record(&self, var: &NcVariable) -> bool {
        self.record_dimension.is_some() && var.dimensions.first().copied() == self.record_dimension
    }

    fn compute_recsize(&self) -> u64 {
        let records: Vec<&NcVariable> = self.variables.iter().filter(|v| self.is_record(v)).collect();
        match records.as_slice() {
            [only] => {
                let inner: u64 = only.dimensions[1..]
                    .iter()
                    .map(|&d| self.dimensions.get(d).map_or(0, |(_, len)| *len))
                    .product();
                inner * only.nc_type.size() as u64
            }
            many => many.iter().map(|v| v.vsize).sum(),
        }
    }

    pub fn num_records(&self) -> u64 {
        self.numrecs
    }

    pub fn dimensions(&self) -> &[(String, u64)] {
        &self.dimensions
    }

    pub fn attributes(&self) -> &[(String, NcAttribute)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&NcAttribute> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn variables(&self) -> &[NcVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&NcVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    /// Read every record of a 1-D record variable
    pub fn read_column(&mut self, name: &str) -> Result<Column> {
        let var = self
            .variable(name)
            .cloned()
            .ok_or_else(|| DbdError::UnknownVariable(name.to_string()))?;
        if !self.is_record(&var) || var.dimensions.len() != 1 {
            return Err(DbdError::InvalidContainer(format!("{} is not a 1-D record variable", name)));
        }
        let sensor_type = var.nc_type.sensor_type().ok_or_else(|| DbdError::TypeMismatch {
            expected: "byte, short, float or double".into(),
            found: format!("{:?}", var.nc_type),
        })?;

        let (begin, recsize, numrecs) = (var.begin, self.recsize, self.numrecs);
        let f = &mut self.file;
        let column = match sensor_type {
            SensorType::I8 => Column::I8(read_records(f, begin, recsize, numrecs, |r| r.read_i8())?),
            SensorType::I16 => Column::I16(read_records(f, begin, recsize, numrecs, |r| r.read_i16::<BigEndian>())?),
            SensorType::F32 => Column::F32(read_records(f, begin, recsize, numrecs, |r| r.read_f32::<BigEndian>())?),
            SensorType::F64 => Column::F64(read_records(f, begin, recsize, numrecs, |r| r.read_f64::<BigEndian>())?),
        };
        Ok(column)
    }
}

fn read_records<T, F>(file: &mut BufReader<File>, begin: u64, recsize: u64, numrecs: u64, mut read: F) -> Result<Vec<T>>
where
    F: FnMut(&mut BufReader<File>) -> io::Result<T>,
{
    let mut values = Vec::with_capacity(numrecs as usize);
    for record in 0..numrecs {
        file.seek(SeekFrom::Start(begin + record * recsize))?;
        values.push(read(file)?);
    }
    Ok(values)
}

fn read_dimensions<R: Read>(reader: &mut R) -> Result<Vec<(String, u64)>> {
    let tag = reader.read_u32::<BigEndian>()?;
    let count = reader.read_u32::<BigEndian>()? as usize;
    if tag == 0 && count == 0 {
        return Ok(Vec::new());
    }
    if tag != NC_DIMENSION {
        return Err(DbdError::InvalidContainer(format!("expected dimension list, found tag {}", tag)));
    }
    (0..count)
        .map(|_| -> Result<(String, u64)> {
            let name = read_name(reader)?;
            let len = reader.read_u32::<BigEndian>()? as u64;
            Ok((name, len))
        })
        .collect()
}

fn read_variables<R: Read>(reader: &mut R, wide_offsets: bool) -> Result<Vec<NcVariable>> {
    let tag = reader.read_u32::<BigEndian>()?;
    let count = reader.read_u32::<BigEndian>()? as usize;
    if tag == 0 && count == 0 {
        return Ok(Vec::new());
    }
    if tag != NC_VARIABLE {
        return Err(DbdError::InvalidContainer(format!("expected variable list, found tag {}", tag)));
    }

    let mut variables = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_name(reader)?;
        let ndims = reader.read_u32::<BigEndian>()? as usize;
        let dimensions = (0..ndims)
            .map(|_| reader.read_u32::<BigEndian>().map(|d| d as usize))
            .collect::<io::Result<Vec<_>>>()?;
        let attributes = read_attributes(reader)?;
        let nc_type = NcType::from_u32(reader.read_u32::<BigEndian>()?)?;
        let vsize = reader.read_u32::<BigEndian>()? as u64;
        let begin = if wide_offsets {
            reader.read_u64::<BigEndian>()?
        } else {
            reader.read_u32::<BigEndian>()? as u64
        };
        variables.push(NcVariable {
            name,
            nc_type,
            dimensions,
            attributes,
            vsize,
            begin,
        });
    }
    Ok(variables)
}
