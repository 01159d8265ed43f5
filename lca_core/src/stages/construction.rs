//! # Construction Stage (A5)
//!
//! Wastage on site, charged against everything the wasted material already
//! carries:
//!
//! ```text
//! A5[c] = (A1-A3[c] + A4[c] + C2-C4[c]) × wastage_rate
//! ```
//!
//! One row per element. The rate is looked up with the element's first BOM
//! row (`Building Material_name`).

use crate::background::ScalarTable;
use crate::bom::{BillOfMaterials, BUILDING_MATERIAL_COLUMN};
use crate::errors::LcaResult;
use crate::impacts::LifeCycleStage;
use crate::records::{ImpactRecord, ImpactRecords};
use crate::table::format_optional_f64;

use super::UpstreamImpacts;

pub const UPSTREAM: [LifeCycleStage; 3] = [
    LifeCycleStage::Product,
    LifeCycleStage::Transportation,
    LifeCycleStage::EndOfLife,
];

pub fn compute(bom: &BillOfMaterials, wastage: &ScalarTable, upstream: &UpstreamImpacts) -> LcaResult<ImpactRecords> {
    bom.require_column(BUILDING_MATERIAL_COLUMN)?;

    let mut records = ImpactRecords::new(
        LifeCycleStage::Construction,
        bom.columns.clone(),
        vec!["wastage_rate".to_string()],
    );
    for element in bom.elements() {
        let lead = element.lead();
        let rate = wastage.get(&lead.building_material);

        records.push(ImpactRecord {
            element_index: element.element_index.to_string(),
            fields: lead.fields.clone(),
            provenance: vec![format_optional_f64(rate)],
            impacts: upstream.total_for(element.element_index).scale(rate),
        });
    }
    Ok(records)
}
