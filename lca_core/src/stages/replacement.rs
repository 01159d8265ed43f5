//! # Replacement Stage (B2-B5)
//!
//! Components whose service life is shorter than the reference study period
//! (RSP) are replaced, and each replacement repeats the component's product,
//! transport, construction and end-of-life impacts:
//!
//! ```text
//! n        = RSP // service_life      (floor division)
//! n        = 0 when service_life == RSP
//! B[c]     = (A1-A3[c] + A4[c] + A5[c] + C2-C4[c]) × n
//! ```
//!
//! With the default RSP of 60 years:
//!
//! | service life | n |
//! |--------------|---|
//! | 61           | 0 |
//! | 60           | 0 |
//! | 25           | 2 |
//! | 20           | 3 |
//!
//! Service lives are looked up per element with its first BOM row
//! (`Assembly`). A missing or non-positive service life gives a null count
//! and null impacts.

use crate::background::ScalarTable;
use crate::bom::{BillOfMaterials, ASSEMBLY_COLUMN};
use crate::errors::LcaResult;
use crate::impacts::LifeCycleStage;
use crate::records::{ImpactRecord, ImpactRecords};
use crate::table::format_optional_f64;

use super::UpstreamImpacts;

pub const UPSTREAM: [LifeCycleStage; 4] = [
    LifeCycleStage::Product,
    LifeCycleStage::Transportation,
    LifeCycleStage::Construction,
    LifeCycleStage::EndOfLife,
];

/// Floor division of two floats, rounding the way `a // b` does for
/// positive operands (the quotient is rebuilt from the remainder so that
/// e.g. `60 // 0.1` is `599`, not `600`).
pub fn floor_div(a: f64, b: f64) -> f64 {
    let rem = a % b;
    let div = (a - rem) / b;
    let mut floored = div.floor();
    if div - floored > 0.5 {
        floored += 1.0;
    }
    floored
}

/// Replacements over `reference_study_period` years for a component lasting
/// `service_life` years. `None` when the service life is unknown or not
/// positive.
pub fn number_of_replacements(service_life: Option<f64>, reference_study_period: u32) -> Option<f64> {
    let service_life = service_life?;
    if service_life.is_nan() || service_life <= 0.0 {
        return None;
    }
    let rsp = f64::from(reference_study_period);
    if service_life == rsp {
        return Some(0.0);
    }
    Some(floor_div(rsp, service_life))
}

pub fn compute(
    bom: &BillOfMaterials,
    service_lives: &ScalarTable,
    upstream: &UpstreamImpacts,
    reference_study_period: u32,
) -> LcaResult<ImpactRecords> {
    bom.require_column(ASSEMBLY_COLUMN)?;

    let mut records = ImpactRecords::new(
        LifeCycleStage::Replacement,
        bom.columns.clone(),
        vec!["service_life".to_string(), "number_of_replacements".to_string()],
    );
    for element in bom.elements() {
        let lead = element.lead();
        let service_life = service_lives.get(&lead.assembly);
        let replacements = number_of_replacements(service_life, reference_study_period);

        records.push(ImpactRecord {
            element_index: element.element_index.to_string(),
            fields: lead.fields.clone(),
            provenance: vec![format_optional_f64(service_life), format_optional_f64(replacements)],
            impacts: upstream.total_for(element.element_index).scale(replacements),
        });
    }

    tracing::debug!(
        elements = records.len(),
        reference_study_period,
        "computed replacement counts"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::SERVICE_LIFE_COLUMN;
    use crate::bom::tests::sample_bom;
    use crate::impacts::{ImpactCategory, ImpactVector};
    use crate::stages::tests::uniform_records;
    use crate::table::Table;
    use pretty_assertions::assert_eq;

    fn service_lives(csv: &str) -> ScalarTable {
        let table = Table::from_reader(csv.as_bytes(), "service_life").unwrap();
        ScalarTable::from_table(&table, "service_life", ASSEMBLY_COLUMN, SERVICE_LIFE_COLUMN).unwrap()
    }

    fn upstream() -> UpstreamImpacts {
        UpstreamImpacts::from_records(&[
            uniform_records(LifeCycleStage::Product, &[("Element_0", 10.0), ("Element_1", 20.0)]),
            uniform_records(LifeCycleStage::Transportation, &[("Element_0", 1.0), ("Element_1", 2.0)]),
            uniform_records(LifeCycleStage::Construction, &[("Element_0", 0.5), ("Element_1", 1.0)]),
            uniform_records(LifeCycleStage::EndOfLife, &[("Element_0", 2.5), ("Element_1", 3.0)]),
        ])
    }

    #[test]
    fn test_replacement_counts_at_default_rsp() {
        assert_eq!(number_of_replacements(Some(60.0), 60), Some(0.0));
        assert_eq!(number_of_replacements(Some(61.0), 60), Some(0.0));
        assert_eq!(number_of_replacements(Some(25.0), 60), Some(2.0));
        assert_eq!(number_of_replacements(Some(20.0), 60), Some(3.0));
        assert_eq!(number_of_replacements(Some(15.0), 60), Some(4.0));
    }

    #[test]
    fn test_equality_correction_follows_rsp() {
        assert_eq!(number_of_replacements(Some(50.0), 50), Some(0.0));
        assert_eq!(number_of_replacements(Some(60.0), 50), Some(0.0));
        assert_eq!(number_of_replacements(Some(25.0), 50), Some(2.0));
    }

    #[test]
    fn test_unknown_or_invalid_service_life() {
        assert_eq!(number_of_replacements(None, 60), None);
        assert_eq!(number_of_replacements(Some(0.0), 60), None);
        assert_eq!(number_of_replacements(Some(-5.0), 60), None);
        assert_eq!(number_of_replacements(Some(f64::NAN), 60), None);
    }

    #[test]
    fn test_floor_div_fractional_divisor() {
        assert_eq!(floor_div(60.0, 0.1), 599.0);
        assert_eq!(floor_div(60.0, 7.0), 8.0);
        assert_eq!(floor_div(60.0, 2.5), 24.0);
    }

    #[test]
    fn test_scales_summed_upstream() {
        let lives = service_lives("Assembly,service_lives\nFoundation,60\nFrame,20\n");
        let records = compute(&sample_bom(), &lives, &upstream(), 60).unwrap();

        assert_eq!(records.len(), 2);
        // Foundation lasts the study period: no replacements
        assert_eq!(records.records[0].impacts.get(ImpactCategory::GwpFossil), Some(0.0));
        assert_eq!(records.records[0].provenance, vec!["60.0", "0.0"]);
        // Frame: (20 + 2 + 1 + 3) × 3
        assert_eq!(records.records[1].impacts.get(ImpactCategory::GwpFossil), Some(78.0));
        assert_eq!(records.records[1].provenance, vec!["20.0", "3.0"]);
        assert_eq!(records.to_table().rows[0][6], "B2-B5: Replacement");
    }

    #[test]
    fn test_missing_service_life_is_null() {
        let lives = service_lives("Assembly,service_lives\nFrame,25\n");
        let records = compute(&sample_bom(), &lives, &upstream(), 60).unwrap();

        assert_eq!(records.records[0].impacts, ImpactVector::null());
        assert_eq!(records.records[0].provenance, vec!["", ""]);
        assert_eq!(records.records[1].impacts.get(ImpactCategory::SmogFormation), Some(52.0));
    }

    #[test]
    fn test_requires_assembly_column() {
        let csv = "element_index,Tally material,Weight (kg)\nElement_0,Concrete,10\n";
        let bom = BillOfMaterials::from_table(&Table::from_reader(csv.as_bytes(), "bom").unwrap()).unwrap();
        let lives = service_lives("Assembly,service_lives\nFrame,25\n");
        let err = compute(&bom, &lives, &upstream(), 60).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_COLUMN");
    }
}
