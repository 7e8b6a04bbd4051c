// src/decoder/plan.rs
use crate::sensors::SensorCatalog;
use crate::types::{ColumnSpec, SensorType};

/// How one file sensor is handled while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSlot {
    /// Width of the sensor's values in the value stream
    pub sensor_type: SensorType,
    pub is_criterion: bool,
    /// Output column receiving the sensor's values, if any
    pub output: Option<usize>,
}

/// Per-file mapping from sensor-list position to output column
#[derive(Debug, Clone, PartialEq)]
pub struct DecodePlan {
    slots: Vec<PlanSlot>,
    columns: Vec<ColumnSpec>,
}

impl DecodePlan {
    pub fn new(slots: Vec<PlanSlot>, columns: Vec<ColumnSpec>) -> Self {
        DecodePlan { slots, columns }
    }

    /// Plan that emits the catalog's own output columns
    pub fn for_catalog(catalog: &SensorCatalog) -> Self {
        let slots = catalog
            .iter()
            .map(|s| PlanSlot {
                sensor_type: s.sensor_type,
                is_criterion: s.is_criterion,
                output: s.output_index,
            })
            .collect();
        let columns = catalog
            .output_sensors()
            .map(|s| ColumnSpec::new(s.name.clone(), s.units.clone(), s.sensor_type))
            .collect();
        DecodePlan { slots, columns }
    }

    pub fn slots(&self) -> &[PlanSlot] {
        &self.slots
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn n_sensors(&self) -> usize {
        self.slots.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Size of each record's code block
    pub fn header_bytes(&self) -> usize {
        (self.slots.len() + 3) / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{CatalogSource, SensorDescriptor};

    #[test]
    fn test_for_catalog_follows_filter() {
        let sensors = vec![
            SensorDescriptor::new("m_present_time", "timestamp", SensorType::F64, 0),
            SensorDescriptor::new("m_gps_status", "enum", SensorType::I8, 1),
            SensorDescriptor::new("m_depth", "m", SensorType::F32, 2),
        ];
        let mut catalog = SensorCatalog::new(sensors, CatalogSource::FromFile);
        catalog.filter(Some(&["m_present_time", "m_depth"][..]), Some(&["m_depth"][..]));

        let plan = DecodePlan::for_catalog(&catalog);
        assert_eq!(plan.n_sensors(), 3);
        assert_eq!(plan.header_bytes(), 1);
        assert_eq!(plan.slots()[1].output, None);
        assert_eq!(plan.slots()[2].output, Some(1));
        assert!(!plan.slots()[0].is_criterion);
        let names: Vec<_> = plan.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["m_present_time", "m_depth"]);
    }
}
