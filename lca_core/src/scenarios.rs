//! # Prebuilt Scenarios
//!
//! Alternative stage results shipped alongside the baseline impacts so a
//! front end can switch between them without recomputing.
//!
//! Only one scenario exists today: transportation with regionally-specific
//! truck and rail distances. Each mode applies the A4 rule on its own
//! distance (including its own return-trip factor) and the two are summed.
//! Output goes to `prebuilt_scenarios/{model}_transportation_prebuilt_scenarios.csv`
//! with a `scenario` provenance column.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::background::{FactorTable, PRODUCT_SYSTEM_KEY};
use crate::bom::BillOfMaterials;
use crate::config::PipelineConfig;
use crate::errors::LcaResult;
use crate::impacts::LifeCycleStage;
use crate::layout::DataRoot;
use crate::records::ImpactRecords;
use crate::stages::transportation::{self, TransportLeg};
use crate::stages::{load_background_dataset, load_bill_of_materials};

pub const REGIONAL_DISTANCES: &str = "Regionally-Specific Distances";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub model: String,
    pub scenario: String,
    pub stage: LifeCycleStage,
    pub path: PathBuf,
    pub rows: usize,
    pub unmatched_rows: usize,
}

/// Truck and rail legs from the configured transport modes.
pub fn regional_transport_legs(root: &DataRoot, config: &PipelineConfig) -> LcaResult<Vec<TransportLeg>> {
    let emissions_path = root.resolve(&config.background.transport_emissions);
    let distances_path = root.resolve(&config.background.transport_distances);
    let emissions = FactorTable::from_table(
        &load_background_dataset(&emissions_path)?,
        &emissions_path.display().to_string(),
        PRODUCT_SYSTEM_KEY,
        "",
    )?;
    let distances = load_background_dataset(&distances_path)?;
    let distances_name = distances_path.display().to_string();

    Ok(vec![
        TransportLeg::from_tables("truck", &config.transport.truck, &emissions, &distances, &distances_name)?,
        TransportLeg::from_tables("rail", &config.transport.rail, &emissions, &distances, &distances_name)?,
    ])
}

/// Compute the regional transportation scenario for one BOM.
pub fn transportation_scenario(bom: &BillOfMaterials, legs: &[TransportLeg]) -> ImpactRecords {
    transportation::compute(bom, legs, Some(REGIONAL_DISTANCES))
}

/// Build and write every prebuilt scenario for one model.
pub fn build_model_scenarios(root: &DataRoot, config: &PipelineConfig, model: &str) -> LcaResult<Vec<ScenarioOutput>> {
    let layout = root.model(model);
    let bom = load_bill_of_materials(&layout.bom_dir())?;
    let legs = regional_transport_legs(root, config)?;

    let records = transportation_scenario(&bom, &legs);
    let path = layout.scenario_path(LifeCycleStage::Transportation);
    records.to_table().write_csv(&path)?;

    let unmatched_rows = records.null_count();
    if unmatched_rows > 0 {
        tracing::warn!(model, scenario = REGIONAL_DISTANCES, unmatched_rows, "scenario rows carry null impacts");
    }
    tracing::info!(model, scenario = REGIONAL_DISTANCES, path = %path.display(), "wrote prebuilt scenario");

    Ok(vec![ScenarioOutput {
        model: model.to_string(),
        scenario: REGIONAL_DISTANCES.to_string(),
        stage: LifeCycleStage::Transportation,
        path,
        rows: records.len(),
        unmatched_rows,
    }])
}
