//! # Stage Calculators
//!
//! One calculator per life-cycle stage. Every stage follows the same
//! contract:
//!
//! 1. [`load_bill_of_materials`] - the model's single BOM file
//! 2. [`StageCalculator::load_backgrounds`] - reference datasets plus any
//!    upstream stage artifacts, read fresh from disk
//! 3. [`StageCalculator::compute`] - pure function of BOM + backgrounds
//! 4. [`write_impacts`] - atomic CSV keyed by `element_index`
//!
//! Stages are a closed set, so they are an enum carrying per-stage
//! configuration rather than a trait object hierarchy.
//!
//! ## Stage Dependencies
//!
//! ```text
//! Product ─────┐
//! Transport ───┼──> Construction ──┐
//! End-of-Life ─┘                   ├──> Replacement
//!   (Product, Transport, EoL) ─────┘
//! Operational (independent)
//! ```
//!
//! A missing upstream artifact is fatal for the model (`MissingUpstream`).
//! A background join miss is not: the row gets null impacts.

pub mod construction;
pub mod end_of_life;
pub mod module_d;
pub mod operational;
pub mod product;
pub mod replacement;
pub mod transportation;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::background::{
    FactorTable, ScalarTable, EOL_SUFFIX, MATERIAL_KEY, MFG_SUFFIX, PRODUCT_SYSTEM_KEY,
    SERVICE_LIFE_COLUMN,
};
use crate::bom::{BillOfMaterials, ASSEMBLY_COLUMN, BUILDING_MATERIAL_COLUMN};
use crate::config::{OperationalValues, PipelineConfig, TransportMode};
use crate::errors::{LcaError, LcaResult};
use crate::impacts::{ImpactVector, LifeCycleStage};
use crate::layout::{impacts_name, DataRoot, ModelLayout};
use crate::records::ImpactRecords;
use crate::table::Table;

pub use transportation::TransportLeg;

// ============================================================================
// Contract: load / write
// ============================================================================

/// Load the single BOM in a model's `bom/` directory.
pub fn load_bill_of_materials(bom_dir: &Path) -> LcaResult<BillOfMaterials> {
    BillOfMaterials::load(bom_dir)
}

/// Load a background reference table.
pub fn load_background_dataset(path: &Path) -> LcaResult<Table> {
    tracing::debug!(path = %path.display(), "loading background dataset");
    Table::read_csv(path)
}

/// Write impact records to `{dir}/{name}.csv`.
pub fn write_impacts(records: &ImpactRecords, dir: &Path, name: &str) -> LcaResult<PathBuf> {
    records.write(dir, name)
}

// ============================================================================
// Per-stage configuration
// ============================================================================

/// Manufacture / end-of-life factor join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorStageConfig {
    pub background_path: PathBuf,
    pub key_column: String,
    /// Category column suffix (`mfg` or `eol`)
    pub suffix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportationConfig {
    pub emissions_path: PathBuf,
    pub distances_path: PathBuf,
    /// `(label, mode)` pairs; impacts are summed over modes
    pub modes: Vec<(String, TransportMode)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionConfig {
    pub wastage_path: PathBuf,
    pub key_column: String,
    pub rate_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementConfig {
    pub service_life_path: PathBuf,
    pub key_column: String,
    pub service_life_column: String,
    /// Reference study period in years
    pub reference_study_period: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalConfig {
    pub values: OperationalValues,
}

/// A life-cycle stage together with everything needed to compute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage")]
pub enum StageCalculator {
    Product(FactorStageConfig),
    Transportation(TransportationConfig),
    Construction(ConstructionConfig),
    Replacement(ReplacementConfig),
    Operational(OperationalConfig),
    EndOfLife(FactorStageConfig),
    ModuleD,
}

/// Reference data (and upstream artifacts) a calculator computes from.
#[derive(Debug, Clone)]
pub enum Backgrounds {
    Factors(FactorTable),
    Transport(Vec<TransportLeg>),
    Construction {
        wastage: ScalarTable,
        upstream: UpstreamImpacts,
    },
    Replacement {
        service_lives: ScalarTable,
        upstream: UpstreamImpacts,
    },
    Operational(ImpactVector),
    Empty,
}

/// What a stage run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: LifeCycleStage,
    pub path: PathBuf,
    pub rows: usize,
    /// Rows with at least one null impact
    pub unmatched_rows: usize,
}

impl StageCalculator {
    /// Build the calculator for `stage` from pipeline configuration.
    pub fn for_stage(stage: LifeCycleStage, config: &PipelineConfig) -> Self {
        let bg = &config.background;
        match stage {
            LifeCycleStage::Product => StageCalculator::Product(FactorStageConfig {
                background_path: bg.product.clone(),
                key_column: MATERIAL_KEY.to_string(),
                suffix: MFG_SUFFIX.to_string(),
            }),
            LifeCycleStage::Transportation => StageCalculator::Transportation(TransportationConfig {
                emissions_path: bg.transport_emissions.clone(),
                distances_path: bg.transport_distances.clone(),
                modes: vec![("truck".to_string(), config.transport.truck.clone())],
            }),
            LifeCycleStage::Construction => StageCalculator::Construction(ConstructionConfig {
                wastage_path: bg.wastage.clone(),
                key_column: BUILDING_MATERIAL_COLUMN.to_string(),
                rate_column: config.wastage_rate_column.clone(),
            }),
            LifeCycleStage::Replacement => StageCalculator::Replacement(ReplacementConfig {
                service_life_path: bg.service_life.clone(),
                key_column: ASSEMBLY_COLUMN.to_string(),
                service_life_column: SERVICE_LIFE_COLUMN.to_string(),
                reference_study_period: config.reference_study_period,
            }),
            LifeCycleStage::Operational => StageCalculator::Operational(OperationalConfig {
                values: config.operational,
            }),
            LifeCycleStage::EndOfLife => StageCalculator::EndOfLife(FactorStageConfig {
                background_path: bg.end_of_life.clone(),
                key_column: MATERIAL_KEY.to_string(),
                suffix: EOL_SUFFIX.to_string(),
            }),
            LifeCycleStage::ModuleD => StageCalculator::ModuleD,
        }
    }

    /// Dispatch by stage code or artifact name (`"repl"`, `"end-of-life"`, ...)
    pub fn from_code(code: &str, config: &PipelineConfig) -> Option<Self> {
        LifeCycleStage::from_code(code).map(|stage| StageCalculator::for_stage(stage, config))
    }

    pub fn stage(&self) -> LifeCycleStage {
        match self {
            StageCalculator::Product(_) => LifeCycleStage::Product,
            StageCalculator::Transportation(_) => LifeCycleStage::Transportation,
            StageCalculator::Construction(_) => LifeCycleStage::Construction,
            StageCalculator::Replacement(_) => LifeCycleStage::Replacement,
            StageCalculator::Operational(_) => LifeCycleStage::Operational,
            StageCalculator::EndOfLife(_) => LifeCycleStage::EndOfLife,
            StageCalculator::ModuleD => LifeCycleStage::ModuleD,
        }
    }

    /// Stages whose artifacts must exist before this one can run
    pub fn upstream_stages(&self) -> &'static [LifeCycleStage] {
        match self {
            StageCalculator::Construction(_) => &construction::UPSTREAM,
            StageCalculator::Replacement(_) => &replacement::UPSTREAM,
            _ => &[],
        }
    }

    /// Read this stage's reference datasets and upstream artifacts.
    pub fn load_backgrounds(&self, root: &DataRoot, model: &ModelLayout) -> LcaResult<Backgrounds> {
        match self {
            StageCalculator::Product(cfg) | StageCalculator::EndOfLife(cfg) => {
                let path = root.resolve(&cfg.background_path);
                let table = load_background_dataset(&path)?;
                Ok(Backgrounds::Factors(FactorTable::from_table(
                    &table,
                    &path.display().to_string(),
                    &cfg.key_column,
                    &cfg.suffix,
                )?))
            }
            StageCalculator::Transportation(cfg) => {
                let emissions_path = root.resolve(&cfg.emissions_path);
                let distances_path = root.resolve(&cfg.distances_path);
                let emissions = FactorTable::from_table(
                    &load_background_dataset(&emissions_path)?,
                    &emissions_path.display().to_string(),
                    PRODUCT_SYSTEM_KEY,
                    "",
                )?;
                let distances = load_background_dataset(&distances_path)?;
                let legs = cfg
                    .modes
                    .iter()
                    .map(|(label, mode)| {
                        TransportLeg::from_tables(
                            label,
                            mode,
                            &emissions,
                            &distances,
                            &distances_path.display().to_string(),
                        )
                    })
                    .collect::<LcaResult<Vec<_>>>()?;
                Ok(Backgrounds::Transport(legs))
            }
            StageCalculator::Construction(cfg) => {
                let path = root.resolve(&cfg.wastage_path);
                let wastage = ScalarTable::from_table(
                    &load_background_dataset(&path)?,
                    &path.display().to_string(),
                    &cfg.key_column,
                    &cfg.rate_column,
                )?;
                let upstream = UpstreamImpacts::load(self.stage(), self.upstream_stages(), model)?;
                Ok(Backgrounds::Construction { wastage, upstream })
            }
            StageCalculator::Replacement(cfg) => {
                let path = root.resolve(&cfg.service_life_path);
                let service_lives = ScalarTable::from_table(
                    &load_background_dataset(&path)?,
                    &path.display().to_string(),
                    &cfg.key_column,
                    &cfg.service_life_column,
                )?;
                let upstream = UpstreamImpacts::load(self.stage(), self.upstream_stages(), model)?;
                Ok(Backgrounds::Replacement { service_lives, upstream })
            }
            StageCalculator::Operational(cfg) => Ok(Backgrounds::Operational(cfg.values.to_vector())),
            StageCalculator::ModuleD => Ok(Backgrounds::Empty),
        }
    }

    /// Compute impact records. Pure: no reads or writes.
    pub fn compute(&self, bom: &BillOfMaterials, backgrounds: &Backgrounds) -> LcaResult<ImpactRecords> {
        match (self, backgrounds) {
            (StageCalculator::Product(_), Backgrounds::Factors(factors)) => Ok(product::compute(bom, factors)),
            (StageCalculator::EndOfLife(_), Backgrounds::Factors(factors)) => {
                Ok(end_of_life::compute(bom, factors))
            }
            (StageCalculator::Transportation(_), Backgrounds::Transport(legs)) => {
                Ok(transportation::compute(bom, legs, None))
            }
            (StageCalculator::Construction(_), Backgrounds::Construction { wastage, upstream }) => {
                construction::compute(bom, wastage, upstream)
            }
            (StageCalculator::Replacement(cfg), Backgrounds::Replacement { service_lives, upstream }) => {
                replacement::compute(bom, service_lives, upstream, cfg.reference_study_period)
            }
            (StageCalculator::Operational(_), Backgrounds::Operational(values)) => {
                Ok(operational::compute(values))
            }
            (StageCalculator::ModuleD, _) => module_d::compute(bom),
            (calculator, _) => Err(LcaError::Internal {
                message: format!("backgrounds do not match the {} calculator", calculator.stage()),
            }),
        }
    }

    /// Load, compute and write one stage for one model.
    pub fn run(&self, root: &DataRoot, model: &ModelLayout, bom: &BillOfMaterials) -> LcaResult<StageOutput> {
        let stage = self.stage();
        let backgrounds = self.load_backgrounds(root, model)?;
        let records = self.compute(bom, &backgrounds)?;

        let unmatched_rows = records.null_count();
        if unmatched_rows > 0 {
            tracing::warn!(
                model = %model.name,
                stage = stage.artifact_name(),
                unmatched_rows,
                total_rows = records.len(),
                "rows without a background match carry null impacts"
            );
        }

        let path = write_impacts(&records, &model.impacts_dir(), &impacts_name(&model.name, stage))?;
        tracing::info!(model = %model.name, stage = stage.artifact_name(), rows = records.len(), path = %path.display(), "wrote impacts");

        Ok(StageOutput {
            stage,
            path,
            rows: records.len(),
            unmatched_rows,
        })
    }
}

// ============================================================================
// Upstream impacts
// ============================================================================

/// Previously computed stage impacts, summed per `element_index`.
#[derive(Debug, Clone, Default)]
pub struct UpstreamImpacts {
    stages: Vec<(LifeCycleStage, HashMap<String, ImpactVector>)>,
}

impl UpstreamImpacts {
    pub fn from_records(records: &[ImpactRecords]) -> Self {
        UpstreamImpacts {
            stages: records
                .iter()
                .map(|r| (r.stage, r.impacts_by_element()))
                .collect(),
        }
    }

    /// Read the artifacts of `upstream` for `model`; any missing one is fatal.
    pub fn load(stage: LifeCycleStage, upstream: &[LifeCycleStage], model: &ModelLayout) -> LcaResult<Self> {
        let mut records = Vec::with_capacity(upstream.len());
        for &dependency in upstream {
            let path = model.impacts_path(dependency);
            if !path.is_file() {
                return Err(LcaError::missing_upstream(
                    stage.artifact_name(),
                    dependency.artifact_name(),
                    path.display().to_string(),
                ));
            }
            records.push(ImpactRecords::read(&path, dependency)?);
        }
        Ok(UpstreamImpacts::from_records(&records))
    }

    pub fn stages(&self) -> impl Iterator<Item = LifeCycleStage> + '_ {
        self.stages.iter().map(|(stage, _)| *stage)
    }

    /// Sum of every upstream stage for one element; an element absent from
    /// any upstream table is null.
    pub fn total_for(&self, element_index: &str) -> ImpactVector {
        self.stages
            .iter()
            .map(|(_, by_element)| by_element.get(element_index).copied().unwrap_or_else(ImpactVector::null))
            .sum()
    }
}
