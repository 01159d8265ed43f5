//! # Pipeline Orchestrator
//!
//! Runs every stage calculator for each template model, in dependency order:
//!
//! ```text
//! Product, Transportation, End-of-Life -> Construction -> Replacement -> Operational [-> Module D]
//! ```
//!
//! A failure aborts the model it happened in; the remaining models still
//! run. Each model run holds the model directory lock and finishes by
//! writing `run_manifest.json` next to the model's artifacts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lca_core::config::load_config;
//! use lca_core::layout::DataRoot;
//! use lca_core::pipeline::Pipeline;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("references/config.yml"))?;
//! let pipeline = Pipeline::new(DataRoot::new("."), config);
//! let report = pipeline.run(&pipeline.config().tme_models)?;
//! assert!(report.is_success());
//! # Ok::<(), lca_core::errors::LcaError>(())
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::errors::{LcaError, LcaResult};
use crate::file_io::{atomic_write, ModelLock};
use crate::impacts::LifeCycleStage;
use crate::layout::{DataRoot, ModelLayout};
use crate::stages::{load_bill_of_materials, StageCalculator, StageOutput};

/// Schema version of `run_manifest.json`
pub const MANIFEST_VERSION: &str = "0.1.0";

/// Stages every run computes, in execution order
pub const STAGE_ORDER: [LifeCycleStage; 6] = [
    LifeCycleStage::Product,
    LifeCycleStage::Transportation,
    LifeCycleStage::EndOfLife,
    LifeCycleStage::Construction,
    LifeCycleStage::Replacement,
    LifeCycleStage::Operational,
];

/// A stage that was requested but produced no artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedStage {
    pub stage: LifeCycleStage,
    pub reason: String,
}

/// Record of one model run, persisted as `run_manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub version: String,
    pub run_id: Uuid,
    pub model: String,
    /// Who held the model lock
    pub operator: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reference_study_period: u32,
    /// Written artifacts in execution order
    pub artifacts: Vec<StageOutput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedStage>,
}

impl RunManifest {
    /// Artifact path for `stage`, if it was written
    pub fn artifact(&self, stage: LifeCycleStage) -> Option<&Path> {
        self.artifacts
            .iter()
            .find(|a| a.stage == stage)
            .map(|a| a.path.as_path())
    }

    /// Rows with null impacts across all stages
    pub fn unmatched_rows(&self) -> usize {
        self.artifacts.iter().map(|a| a.unmatched_rows).sum()
    }

    /// Read a manifest written by a previous run
    pub fn read(path: &Path) -> LcaResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LcaError::file_error("read manifest", path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| LcaError::serialization(e.to_string()))
    }
}

/// Outcome of a multi-model run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub models: BTreeMap<String, RunManifest>,
    pub failures: BTreeMap<String, LcaError>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Artifacts per model, keyed by stage
    pub fn artifacts(&self) -> BTreeMap<&str, BTreeMap<LifeCycleStage, &Path>> {
        self.models
            .iter()
            .map(|(model, manifest)| {
                let paths = manifest
                    .artifacts
                    .iter()
                    .map(|a| (a.stage, a.path.as_path()))
                    .collect();
                (model.as_str(), paths)
            })
            .collect()
    }
}

/// Runs the stage calculators over a data root.
#[derive(Debug, Clone)]
pub struct Pipeline {
    root: DataRoot,
    config: PipelineConfig,
    operator: String,
}

impl Pipeline {
    pub fn new(root: DataRoot, config: PipelineConfig) -> Self {
        let operator = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "lca".to_string());
        Pipeline { root, config, operator }
    }

    /// Name recorded in lock files and manifests
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn root(&self) -> &DataRoot {
        &self.root
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Calculators in execution order for this configuration
    pub fn calculators(&self) -> Vec<StageCalculator> {
        let mut stages = STAGE_ORDER.to_vec();
        if self.config.include_module_d {
            stages.push(LifeCycleStage::ModuleD);
        }
        stages
            .into_iter()
            .map(|stage| StageCalculator::for_stage(stage, &self.config))
            .collect()
    }

    /// Run every model. Only an invalid configuration fails the whole run;
    /// per-model errors are collected in the report.
    pub fn run(&self, models: &[String]) -> LcaResult<PipelineReport> {
        self.config.validate()?;

        let mut report = PipelineReport::default();
        for model in models {
            match self.run_model(model) {
                Ok(manifest) => {
                    report.models.insert(model.clone(), manifest);
                }
                Err(err) => {
                    tracing::error!(model = %model, code = err.error_code(), error = %err, "model run failed");
                    report.failures.insert(model.clone(), err);
                }
            }
        }

        tracing::info!(
            succeeded = report.models.len(),
            failed = report.failures.len(),
            "pipeline finished"
        );
        Ok(report)
    }

    /// Run all stages for one model under its directory lock.
    pub fn run_model(&self, name: &str) -> LcaResult<RunManifest> {
        let model = self.root.model(name);
        if !model.dir.is_dir() {
            return Err(LcaError::SourceNotFound {
                directory: model.dir.display().to_string(),
                expected: "template model directory".to_string(),
            });
        }

        let _lock = ModelLock::acquire(&model.dir, self.operator.clone())?;
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        tracing::info!(model = name, %run_id, "starting model run");

        let bom = load_bill_of_materials(&model.bom_dir())?;
        tracing::debug!(model = name, rows = bom.len(), "loaded bill of materials");

        let mut artifacts = Vec::new();
        let mut skipped = Vec::new();
        for calculator in self.calculators() {
            match calculator.run(&self.root, &model, &bom) {
                Ok(output) => artifacts.push(output),
                Err(err @ LcaError::NotImplemented { .. }) => {
                    tracing::warn!(model = name, stage = calculator.stage().artifact_name(), "stage skipped: {}", err);
                    skipped.push(SkippedStage {
                        stage: calculator.stage(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let manifest = RunManifest {
            version: MANIFEST_VERSION.to_string(),
            run_id,
            model: name.to_string(),
            operator: self.operator.clone(),
            started_at,
            finished_at: Utc::now(),
            reference_study_period: self.config.reference_study_period,
            artifacts,
            skipped,
        };
        write_manifest(&model, &manifest)?;
        Ok(manifest)
    }
}

/// Write `run_manifest.json` atomically.
pub fn write_manifest(model: &ModelLayout, manifest: &RunManifest) -> LcaResult<PathBuf> {
    let path = model.manifest_path();
    let json = serde_json::to_vec_pretty(manifest).map_err(|e| LcaError::serialization(e.to_string()))?;
    atomic_write(&path, &json)?;
    tracing::debug!(model = %model.name, path = %path.display(), "wrote run manifest");
    Ok(path)
}
