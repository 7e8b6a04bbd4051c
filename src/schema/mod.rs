// src/schema/mod.rs
//! Column schema shared by a set of files
//!
//! Files from one deployment rarely carry identical sensor lists. The
//! union keeps every output sensor once, in the order it was first seen
//! across the files (taken in sorted filename order). A sensor whose byte
//! width differs from the first sighting is treated as absent in that
//! file and stays sentinel-filled there.

use crate::decoder::{DecodePlan, PlanSlot};
use crate::error::DbdError;
use crate::sensors::SensorCatalog;
use crate::types::ColumnSpec;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnionSchema {
    columns: Vec<ColumnSpec>,
    index: HashMap<String, usize>,
}

impl UnionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the union of several catalogs, in the order given
    pub fn from_catalogs<'a>(catalogs: impl IntoIterator<Item = &'a SensorCatalog>) -> Self {
        let mut schema = UnionSchema::new();
        for catalog in catalogs {
            schema.add_catalog(catalog);
        }
        schema
    }

    /// Add a file's output sensors. Sensors outside the catalog's keep
    /// filter are never part of the union.
    pub fn add_catalog(&mut self, catalog: &SensorCatalog) {
        for sensor in catalog.output_sensors() {
            match self.index.get(&sensor.name) {
                Some(&i) => {
                    if self.columns[i].sensor_type != sensor.sensor_type {
                        log::debug!(
                            "Sensor {} is {} bytes, first seen as {}",
                            sensor.name,
                            sensor.width(),
                            self.columns[i].sensor_type.width()
                        );
                    }
                }
                None => {
                    self.index.insert(sensor.name.clone(), self.columns.len());
                    self.columns.push(ColumnSpec::new(
                        sensor.name.clone(),
                        sensor.units.clone(),
                        sensor.sensor_type,
                    ));
                }
            }
        }
    }

    /// Map a file's sensors onto the union columns.
    ///
    /// A width mismatch leaves the sensor without a column (its values are
    /// still consumed) and records a `SchemaConflict`.
    pub fn plan_for(&self, catalog: &SensorCatalog, diagnostics: &mut Vec<DbdError>) -> DecodePlan {
        let slots = catalog
            .iter()
            .map(|sensor| {
                let output = if sensor.keep {
                    self.index.get(&sensor.name).copied()
                } else {
                    None
                };
                let output = match output {
                    Some(i) if self.columns[i].sensor_type != sensor.sensor_type => {
                        let expected = self.columns[i].sensor_type.width();
                        log::debug!(
                            "Sensor {} is {} bytes wide, expected {}; treating it as absent",
                            sensor.name,
                            sensor.width(),
                            expected
                        );
                        diagnostics.push(DbdError::SchemaConflict {
                            sensor: sensor.name.clone(),
                            expected,
                            found: sensor.width(),
                        });
                        None
                    }
                    other => other,
                };
                PlanSlot {
                    sensor_type: sensor.sensor_type,
                    is_criterion: sensor.is_criterion,
                    output,
                }
            })
            .collect();
        DecodePlan::new(slots, self.columns.clone())
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
