// src/netcdf/writer.rs
use super::{
    attributes_len, name_len, write_attributes, write_name, NcAttribute, NcType, MAGIC, NC_DIMENSION, NC_VARIABLE,
    RECORD_DIMENSION,
};
use crate::error::{DbdError, Result};
use crate::types::{Column, ColumnSpec};
use crate::utils::padded_len;
use byteorder::{BigEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Streaming writer for record variables along one unlimited dimension
///
/// Variables and attributes are declared first; the header is written
/// once variables are defined and rewritten in place (same size) when
/// attribute values or the record count change.
///
/// # Example
///
/// ```no_run
/// use dbd_rs::netcdf::{NcAttribute, NcWriter};
/// use dbd_rs::types::{Column, ColumnSpec, SensorType};
///
/// let mut writer = NcWriter::create("out.nc").unwrap();
/// writer.set_attribute("n_files", NcAttribute::Ints(vec![0])).unwrap();
/// writer.define_variables(&[ColumnSpec::new("m_depth", "m", SensorType::F32)]).unwrap();
/// writer.append_records(0, &[Column::F32(vec![1.5, 2.5])]).unwrap();
/// writer.set_attribute("n_files", NcAttribute::Ints(vec![1])).unwrap();
/// writer.close().unwrap();
/// ```
pub struct NcWriter {
    file: BufWriter<File>,
    columns: Vec<ColumnSpec>,
    attributes: Vec<(String, NcAttribute)>,
    layout: Option<RecordLayout>,
    numrecs: u64,
    closed: bool,
}

#[derive(Debug, Clone)]
struct RecordLayout {
    header_len: u64,
    /// Offset of each variable within the first record
    begins: Vec<u64>,
    vsizes: Vec<usize>,
    recsize: u64,
}

impl NcWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(NcWriter {
            file: BufWriter::new(file),
            columns: Vec::new(),
            attributes: Vec::new(),
            layout: None,
            numrecs: 0,
            closed: false,
        })
    }

    /// Number of records written so far
    pub fn num_records(&self) -> u64 {
        self.numrecs
    }

    /// Set a global attribute.
    ///
    /// New attributes may only be added before variables are defined;
    /// afterwards an existing attribute may be updated with a value of the
    /// same type and length.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: NcAttribute) -> Result<()> {
        self.check_open()?;
        let name = name.into();
        let fixed = self.layout.is_some();

        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => {
                if fixed && NcAttribute::encoded_len(&name, existing) != NcAttribute::encoded_len(&name, &value) {
                    return Err(DbdError::InvalidContainer(format!(
                        "attribute {} cannot change size after the header is written",
                        name
                    )));
                }
                *existing = value;
            }
            None if fixed => {
                return Err(DbdError::InvalidContainer(format!(
                    "attribute {} declared after the header was written",
                    name
                )))
            }
            None => self.attributes.push((name, value)),
        }
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&NcAttribute> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Declare one record variable per column and write the header
    pub fn define_variables(&mut self, columns: &[ColumnSpec]) -> Result<()> {
        self.check_open()?;
        if self.layout.is_some() {
            return Err(DbdError::InvalidContainer("variables already defined".into()));
        }
        self.columns = columns.to_vec();
        self.layout = Some(self.compute_layout());
        self.write_header()
    }

    fn compute_layout(&self) -> RecordLayout {
        let dim_list = 8 + name_len(RECORD_DIMENSION) + 4;
        let var_list = 8 + self
            .columns
            .iter()
            .map(|c| name_len(&c.name) + 8 + attributes_len(&variable_attributes(c)) + 16)
            .sum::<usize>();
        let header_len = (8 + dim_list + attributes_len(&self.attributes) + var_list) as u64;

        let vsizes: Vec<usize> = self.columns.iter().map(|c| padded_len(c.sensor_type.width())).collect();
        let mut begins = Vec::with_capacity(vsizes.len());
        let mut offset = header_len;
        for vsize in &vsizes {
            begins.push(offset);
            offset += *vsize as u64;
        }
        // A lone record variable is stored without per-record padding
        let recsize = match self.columns.as_slice() {
            [only] => only.sensor_type.width() as u64,
            _ => vsizes.iter().sum::<usize>() as u64,
        };

        RecordLayout {
            header_len,
            begins,
            vsizes,
            recsize,
        }
    }

    fn write_header(&mut self) -> Result<()> {
        let layout = match &self.layout {
            Some(layout) => layout.clone(),
            None => return Ok(()),
        };
        let numrecs = u32::try_from(self.numrecs)
            .map_err(|_| DbdError::InvalidContainer(format!("{} records exceed the format limit", self.numrecs)))?;

        self.file.seek(SeekFrom::Start(0))?;
        let w = &mut self.file;
        w.write_all(&MAGIC)?;
        w.write_u32::<BigEndian>(numrecs)?;

        w.write_u32::<BigEndian>(NC_DIMENSION)?;
        w.write_u32::<BigEndian>(1)?;
        write_name(w, RECORD_DIMENSION)?;
        w.write_u32::<BigEndian>(0)?;

        write_attributes(w, &self.attributes)?;

        if self.columns.is_empty() {
            w.write_u64::<BigEndian>(0)?;
        } else {
            w.write_u32::<BigEndian>(NC_VARIABLE)?;
            w.write_u32::<BigEndian>(self.columns.len() as u32)?;
            for (i, column) in self.columns.iter().enumerate() {
                write_name(w, &column.name)?;
                w.write_u32::<BigEndian>(1)?;
                w.write_u32::<BigEndian>(0)?;
                write_attributes(w, &variable_attributes(column))?;
                w.write_u32::<BigEndian>(NcType::for_sensor(column.sensor_type) as u32)?;
                w.write_u32::<BigEndian>(layout.vsizes[i] as u32)?;
                w.write_u64::<BigEndian>(layout.begins[i])?;
            }
        }

        let written = self.file.stream_position()?;
        if written != layout.header_len {
            return Err(DbdError::InvalidContainer(format!(
                "header is {} bytes, expected {}",
                written, layout.header_len
            )));
        }
        Ok(())
    }

    /// Write `columns[..][0..n]` as records `offset..offset + n`
    pub fn append_records(&mut self, offset: u64, columns: &[Column]) -> Result<()> {
        self.check_open()?;
        let layout = match &self.layout {
            Some(layout) => layout.clone(),
            None => return Err(DbdError::InvalidContainer("variables are not defined".into())),
        };
        if columns.len() != self.columns.len() {
            return Err(DbdError::TypeMismatch {
                expected: format!("{} variables", self.columns.len()),
                found: format!("{} columns", columns.len()),
            });
        }
        for (spec, column) in self.columns.iter().zip(columns) {
            if spec.sensor_type != column.sensor_type() {
                return Err(DbdError::TypeMismatch {
                    expected: spec.sensor_type.name().to_string(),
                    found: column.sensor_type().name().to_string(),
                });
            }
        }
        let n_rows = columns.first().map_or(0, Column::len);
        if columns.iter().any(|c| c.len() != n_rows) {
            return Err(DbdError::InvalidContainer("columns differ in length".into()));
        }
        if offset > self.numrecs {
            return Err(DbdError::InvalidContainer(format!(
                "append at record {} leaves a gap after record {}",
                offset, self.numrecs
            )));
        }
        if n_rows == 0 {
            return Ok(());
        }

        self.file
            .seek(SeekFrom::Start(layout.header_len + offset * layout.recsize))?;
        let single = columns.len() == 1;
        for row in 0..n_rows {
            for (column, vsize) in columns.iter().zip(&layout.vsizes) {
                write_value(&mut self.file, column, row)?;
                if !single {
                    let width = column.sensor_type().width();
                    self.file.write_all(&[0u8; 4][..vsize - width])?;
                }
            }
        }

        self.numrecs = self.numrecs.max(offset + n_rows as u64);
        Ok(())
    }

    /// Update the record count on disk and flush buffered data
    pub fn flush(&mut self) -> Result<()> {
        self.check_open()?;
        if self.layout.is_some() {
            let numrecs = u32::try_from(self.numrecs)
                .map_err(|_| DbdError::InvalidContainer(format!("{} records exceed the format limit", self.numrecs)))?;
            self.file.seek(SeekFrom::Start(4))?;
            self.file.write_u32::<BigEndian>(numrecs)?;
        }
        self.file.flush()?;
        Ok(())
    }

    /// Rewrite the header with final attribute values and close the file
    pub fn close(&mut self) -> Result<()> {
        self.check_open()?;
        if self.layout.is_none() {
            self.define_variables(&[])?;
        }
        self.write_header()?;
        self.file.flush()?;
        self.closed = true;
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(DbdError::WriterClosed)
        } else {
            Ok(())
        }
    }
}

impl Drop for NcWriter {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

fn variable_attributes(column: &ColumnSpec) -> Vec<(String, NcAttribute)> {
    vec![("units".to_string(), NcAttribute::Text(column.units.clone()))]
}

fn write_value<W: Write>(writer: &mut W, column: &Column, row: usize) -> Result<()> {
    match column {
        Column::I8(v) => writer.write_i8(v[row])?,
        Column::I16(v) => writer.write_i16::<BigEndian>(v[row])?,
        Column::F32(v) => writer.write_f32::<BigEndian>(v[row])?,
        Column::F64(v) => writer.write_f64::<BigEndian>(v[row])?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorType;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_header_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layout.nc");
        let mut writer = NcWriter::create(&path).unwrap();
        writer.set_attribute("n_files", NcAttribute::Ints(vec![0])).unwrap();
        writer
            .define_variables(&[
                ColumnSpec::new("a", "m", SensorType::I8),
                ColumnSpec::new("b", "s", SensorType::F64),
            ])
            .unwrap();
        writer.append_records(0, &[Column::I8(vec![1, 2]), Column::F64(vec![0.5, 1.5])]).unwrap();
        writer.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"CDF\x02");
        assert_eq!(&bytes[4..8], &2u32.to_be_bytes());
        // 4 + 8 bytes per record after the header
        let header_len = bytes.len() - 2 * 12;
        assert_eq!(bytes[header_len], 1);
        assert_eq!(&bytes[header_len + 1..header_len + 4], &[0, 0, 0]);
        assert_eq!(&bytes[header_len + 4..header_len + 12], &0.5f64.to_be_bytes());
    }

    #[test]
    fn test_single_variable_is_unpadded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("single.nc");
        let mut writer = NcWriter::create(&path).unwrap();
        writer.define_variables(&[ColumnSpec::new("a", "", SensorType::I16)]).unwrap();
        writer.append_records(0, &[Column::I16(vec![1, 2, 3])]).unwrap();
        writer.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[bytes.len() - 6..], &[0, 1, 0, 2, 0, 3]);
    }

    #[test]
    fn test_attribute_rules() {
        let dir = tempdir().unwrap();
        let mut writer = NcWriter::create(dir.path().join("attrs.nc")).unwrap();
        writer.set_attribute("total_records", NcAttribute::Ints(vec![0])).unwrap();
        writer.define_variables(&[ColumnSpec::new("a", "", SensorType::F32)]).unwrap();

        writer.set_attribute("total_records", NcAttribute::Ints(vec![12])).unwrap();
        assert_eq!(writer.attribute("total_records").and_then(NcAttribute::as_int), Some(12));
        assert!(writer.set_attribute("late", NcAttribute::Ints(vec![1])).is_err());
        assert!(writer
            .set_attribute("total_records", NcAttribute::Ints(vec![1, 2]))
            .is_err());
        assert!(writer.define_variables(&[]).is_err());
    }

    #[test]
    fn test_append_checks() {
        let dir = tempdir().unwrap();
        let mut writer = NcWriter::create(dir.path().join("checks.nc")).unwrap();
        assert!(writer.append_records(0, &[]).is_err());

        writer.define_variables(&[ColumnSpec::new("a", "", SensorType::F32)]).unwrap();
        assert!(writer.append_records(0, &[Column::F64(vec![1.0])]).is_err());
        assert!(writer.append_records(1, &[Column::F32(vec![1.0])]).is_err());
        writer.append_records(0, &[Column::F32(vec![1.0])]).unwrap();
        assert_eq!(writer.num_records(), 1);

        writer.close().unwrap();
        assert!(matches!(writer.flush(), Err(DbdError::WriterClosed)));
    }
}
