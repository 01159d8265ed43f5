//! # Operational Energy Stage (B6)
//!
//! Whole-building energy use over the study period. Not derived from the
//! BOM: a single row with the configured per-category values.

use crate::impacts::{ImpactVector, LifeCycleStage};
use crate::records::{ImpactRecord, ImpactRecords};

/// `element_index` of the single operational row
pub const OPERATIONAL_ELEMENT: &str = "operational_energy";

pub fn compute(values: &ImpactVector) -> ImpactRecords {
    let mut records = ImpactRecords::new(LifeCycleStage::Operational, Vec::new(), Vec::new());
    records.push(ImpactRecord {
        element_index: OPERATIONAL_ELEMENT.to_string(),
        fields: Vec::new(),
        provenance: Vec::new(),
        impacts: *values,
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperationalValues;
    use crate::impacts::ImpactCategory;

    #[test]
    fn test_single_row_with_configured_values() {
        let records = compute(&OperationalValues::default().to_vector());
        assert_eq!(records.len(), 1);
        assert_eq!(records.records[0].element_index, "operational_energy");
        assert_eq!(records.records[0].impacts.get(ImpactCategory::Eutrophication), Some(95.0));
        assert_eq!(records.null_count(), 0);

        let table = records.to_table();
        assert_eq!(table.headers.len(), 2 + ImpactCategory::ALL.len());
        assert_eq!(table.rows[0][1], "B6: Operational Energy");
    }
}
