//! # lca_core - Building Life-Cycle Impact Engine
//!
//! `lca_core` turns a building template model's bill of materials into
//! per-life-cycle-stage environmental impact tables (EN 15978 stages A1-A5,
//! B2-B6, C2-C4), then combines the results of many models into tables for a
//! front end. All configuration, records and reports are serde types.
//!
//! ## Design Philosophy
//!
//! - **Flat files**: every stage reads CSV and writes CSV; later stages
//!   re-read earlier artifacts from disk instead of sharing memory
//! - **Pure stages**: each calculator is `compute(bom, backgrounds)`, with
//!   loading and writing kept at the edges
//! - **Nulls, not guesses**: a row without a background match gets null
//!   impacts and is counted, never dropped
//! - **Rich Errors**: structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lca_core::config::load_config;
//! use lca_core::layout::{DataRoot, DEFAULT_CONFIG_PATH};
//! use lca_core::pipeline::Pipeline;
//!
//! let root = DataRoot::new(".");
//! let config = load_config(&root.resolve(DEFAULT_CONFIG_PATH))?;
//! let models = config.tme_models.clone();
//!
//! let report = Pipeline::new(root, config).run(&models)?;
//! for (model, manifest) in &report.models {
//!     println!("{}: {} artifacts", model, manifest.artifacts.len());
//! }
//! # Ok::<(), lca_core::errors::LcaError>(())
//! ```
//!
//! ## Modules
//!
//! - [`impacts`] - Impact categories, impact vectors, life-cycle stages
//! - [`bom`] / [`background`] - Inputs: bill of materials and reference datasets
//! - [`stages`] - One calculator per life-cycle stage
//! - [`records`] - Stage output tables
//! - [`pipeline`] - Runs all stages per model and writes run manifests
//! - [`extract`], [`scenarios`], [`combine`] - BOM extraction, prebuilt
//!   scenarios, cross-model combination
//! - [`config`] / [`layout`] - YAML configuration and directory conventions
//! - [`errors`] - Structured error types
//! - [`file_io`] - Atomic writes and model locking

pub mod background;
pub mod bom;
pub mod combine;
pub mod config;
pub mod errors;
pub mod extract;
pub mod file_io;
pub mod impacts;
pub mod layout;
pub mod pipeline;
pub mod records;
pub mod scenarios;
pub mod stages;
pub mod table;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use config::{load_config, PipelineConfig};
pub use errors::{LcaError, LcaResult};
pub use impacts::{ImpactCategory, ImpactVector, LifeCycleStage};
pub use layout::DataRoot;
pub use pipeline::{Pipeline, PipelineReport, RunManifest};
pub use records::{ImpactRecord, ImpactRecords};
pub use stages::StageCalculator;
