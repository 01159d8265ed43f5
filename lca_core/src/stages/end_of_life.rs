//! # End-of-Life Stage (C2-C4)
//!
//! Same shape as the product stage, against the end-of-life table
//! (`{code}_eol` columns).

use crate::background::FactorTable;
use crate::bom::BillOfMaterials;
use crate::impacts::LifeCycleStage;
use crate::records::ImpactRecords;

use super::product::unit_factor_impacts;

pub fn compute(bom: &BillOfMaterials, factors: &FactorTable) -> ImpactRecords {
    unit_factor_impacts(LifeCycleStage::EndOfLife, bom, factors)
}
