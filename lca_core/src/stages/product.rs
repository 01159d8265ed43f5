//! # Product Stage (A1-A3)
//!
//! Left-joins the BOM to the manufacture table on material name:
//!
//! ```text
//! impact[c] = factor_mfg[c] × weight_kg
//! ```
//!
//! A material with no manufacture row yields null impacts for that row.

use crate::background::FactorTable;
use crate::bom::BillOfMaterials;
use crate::impacts::{ImpactVector, LifeCycleStage};
use crate::records::{ImpactRecord, ImpactRecords};

pub fn compute(bom: &BillOfMaterials, factors: &FactorTable) -> ImpactRecords {
    unit_factor_impacts(LifeCycleStage::Product, bom, factors)
}

/// `factor × weight` per row and category. Shared with end-of-life.
pub(crate) fn unit_factor_impacts(
    stage: LifeCycleStage,
    bom: &BillOfMaterials,
    factors: &FactorTable,
) -> ImpactRecords {
    let mut records = ImpactRecords::new(stage, bom.columns.clone(), Vec::new());
    for row in &bom.rows {
        let impacts = factors
            .get(&row.material)
            .map(|unit| unit.scale(row.weight_kg))
            .unwrap_or_else(ImpactVector::null);

        records.push(ImpactRecord {
            element_index: row.element_index.clone(),
            fields: row.fields.clone(),
            provenance: Vec::new(),
            impacts,
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::tests::factor_csv;
    use crate::background::{MATERIAL_KEY, MFG_SUFFIX};
    use crate::bom::tests::sample_bom;
    use crate::impacts::ImpactCategory;
    use crate::table::Table;

    fn manufacture_factors() -> FactorTable {
        let table = Table::from_reader(factor_csv(MFG_SUFFIX).as_bytes(), "a1-a3").unwrap();
        FactorTable::from_table(&table, "a1-a3", MATERIAL_KEY, MFG_SUFFIX).unwrap()
    }

    #[test]
    fn test_impact_is_factor_times_weight() {
        let bom = sample_bom();
        let records = compute(&bom, &manufacture_factors());

        assert_eq!(records.len(), 2);
        assert_eq!(records.stage, LifeCycleStage::Product);
        // Concrete: 1.5 × 10 kg; Steel: 2.0 × 20 kg
        assert_eq!(records.records[0].impacts.get(ImpactCategory::GwpFossil), Some(15.0));
        assert_eq!(records.records[1].impacts.get(ImpactCategory::GwpFossil), Some(40.0));
        assert_eq!(records.records[1].impacts.get(ImpactCategory::GwpBiogenic), Some(-10.0));
        assert_eq!(records.records[0].fields, bom.rows[0].fields);
    }

    #[test]
    fn test_two_elements_same_factor() {
        let csv = "element_index,Tally material,Weight (kg)\nElement_0,Concrete,10\nElement_1,Concrete,20\n";
        let bom = BillOfMaterials::from_table(&Table::from_reader(csv.as_bytes(), "bom").unwrap()).unwrap();
        let records = compute(&bom, &manufacture_factors());

        let gwp: Vec<Option<f64>> = records
            .records
            .iter()
            .map(|r| r.impacts.get(ImpactCategory::GwpFossil))
            .collect();
        assert_eq!(gwp, vec![Some(15.0), Some(30.0)]);
    }

    #[test]
    fn test_unmatched_material_is_null() {
        let csv = "element_index,Tally material,Weight (kg)\nElement_0,Unobtainium,10\nElement_1,Steel,\n";
        let bom = BillOfMaterials::from_table(&Table::from_reader(csv.as_bytes(), "bom").unwrap()).unwrap();
        let records = compute(&bom, &manufacture_factors());

        assert_eq!(records.records[0].impacts, ImpactVector::null());
        // matched material with an empty weight is null too
        assert_eq!(records.records[1].impacts, ImpactVector::null());
        assert_eq!(records.null_count(), 2);
    }
}
