//! # Module D (Beyond the System Boundary)
//!
//! Reuse, recovery and recycling credits. No calculation rule exists yet, so
//! the stage reports `NotImplemented` instead of writing an artifact.

use crate::bom::BillOfMaterials;
use crate::errors::{LcaError, LcaResult};
use crate::impacts::LifeCycleStage;
use crate::records::ImpactRecords;

pub fn compute(_bom: &BillOfMaterials) -> LcaResult<ImpactRecords> {
    Err(LcaError::NotImplemented {
        stage: LifeCycleStage::ModuleD.label().to_string(),
    })
}
