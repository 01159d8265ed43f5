//! # Pipeline Configuration
//!
//! YAML configuration for a pipeline run. Only `tme_models` and
//! `cols_to_drop` are required; every other key falls back to the reference
//! layout under `references/background_data`.
//!
//! ```yaml
//! tme_models:
//!   - S1_O1_T1_R1
//! cols_to_drop:
//!   - Revit category
//! reference_study_period: 60
//! ```
//!
//! A missing required key aborts the whole run with a `Configuration` error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{LcaError, LcaResult};
use crate::impacts::{ImpactCategory, ImpactVector};
use crate::layout::BACKGROUND_DIR;

/// Default reference study period in years
pub const DEFAULT_RSP_YEARS: u32 = 60;

/// Raw rows per logical element in a Tally extraction
pub const DEFAULT_ROWS_PER_ELEMENT: usize = 5;

/// How `extract` builds a model's bill of materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// The model's own `raw/*.csv` Tally export
    #[default]
    RawExport,
    /// Rows picked from the shared category sources by the option codes in
    /// the model name
    OptionSelection,
}

/// Validated pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Template models to process
    pub tme_models: Vec<String>,
    /// Columns removed when building a BOM from a raw extraction
    pub cols_to_drop: Vec<String>,
    /// Reference study period (years) for replacement counts
    pub reference_study_period: u32,
    /// Raw extraction rows that share one `element_index`
    pub rows_per_element: usize,
    pub extraction: ExtractionMode,
    /// Run the Module D placeholder (always reported as not implemented)
    pub include_module_d: bool,
    pub background: BackgroundPaths,
    pub transport: TransportSettings,
    /// Column of the wastage table holding the applied rate
    pub wastage_rate_column: String,
    pub operational: OperationalValues,
}

impl PipelineConfig {
    /// Config with defaults for everything but the two required lists.
    pub fn new(tme_models: Vec<String>, cols_to_drop: Vec<String>) -> Self {
        PipelineConfig {
            tme_models,
            cols_to_drop,
            reference_study_period: DEFAULT_RSP_YEARS,
            rows_per_element: DEFAULT_ROWS_PER_ELEMENT,
            extraction: ExtractionMode::default(),
            include_module_d: false,
            background: BackgroundPaths::default(),
            transport: TransportSettings::default(),
            wastage_rate_column: default_wastage_rate_column(),
            operational: OperationalValues::default(),
        }
    }

    /// Check value ranges and model names.
    pub fn validate(&self) -> LcaResult<()> {
        if self.reference_study_period == 0 {
            return Err(LcaError::configuration(
                "reference_study_period",
                "The reference study period must be a positive number of years",
            ));
        }
        if self.rows_per_element == 0 {
            return Err(LcaError::configuration(
                "rows_per_element",
                "At least one raw row per element is required",
            ));
        }
        for model in &self.tme_models {
            if model.trim().is_empty() || model.contains(['/', '\\']) || model.starts_with('.') {
                return Err(LcaError::configuration(
                    "tme_models",
                    format!("'{}' is not a valid template model directory name", model),
                ));
            }
        }
        Ok(())
    }
}

/// On-disk shape; required keys stay optional here so their absence can be
/// reported by name.
#[derive(Debug, Deserialize)]
struct RawConfig {
    tme_models: Option<Vec<String>>,
    cols_to_drop: Option<Vec<String>>,
    reference_study_period: Option<u32>,
    rows_per_element: Option<usize>,
    #[serde(default)]
    extraction: ExtractionMode,
    #[serde(default)]
    include_module_d: bool,
    #[serde(default)]
    background: BackgroundPaths,
    #[serde(default)]
    transport: TransportSettings,
    #[serde(default = "default_wastage_rate_column")]
    wastage_rate_column: String,
    #[serde(default)]
    operational: OperationalValues,
}

/// Background dataset locations, relative to the data root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundPaths {
    pub product: PathBuf,
    pub end_of_life: PathBuf,
    pub transport_emissions: PathBuf,
    pub transport_distances: PathBuf,
    pub wastage: PathBuf,
    pub service_life: PathBuf,
}

impl Default for BackgroundPaths {
    fn default() -> Self {
        let dir = Path::new(BACKGROUND_DIR);
        BackgroundPaths {
            product: dir.join("a1-a3.csv"),
            end_of_life: dir.join("c2-c4.csv"),
            transport_emissions: dir.join("a4_emissions.csv"),
            transport_distances: dir.join("a4_distances.csv"),
            wastage: dir.join("a5_wastage.csv"),
            service_life: dir.join("service_life.csv"),
        }
    }
}

/// One freight mode: the emissions-table row and the distance-table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportMode {
    /// `Product system name` in the emissions table
    pub emission_name: String,
    /// Distance column (miles) in the distances table
    pub distance_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub truck: TransportMode,
    pub rail: TransportMode,
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings {
            truck: TransportMode {
                emission_name: "Transport, combination truck, average fuel mix".to_string(),
                distance_column: "R dist CA_truck".to_string(),
            },
            rail: TransportMode {
                emission_name: "Transport, train, diesel powered".to_string(),
                distance_column: "R dist CA dist_rail".to_string(),
            },
        }
    }
}

/// Whole-building B6 impacts, keyed by category short code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationalValues {
    #[serde(rename = "GWPf")]
    pub gwp_fossil: f64,
    #[serde(rename = "GWPb")]
    pub gwp_biogenic: f64,
    #[serde(rename = "GWP-LULUC")]
    pub gwp_luluc: f64,
    #[serde(rename = "acp")]
    pub acidification: f64,
    #[serde(rename = "eup")]
    pub eutrophication: f64,
    #[serde(rename = "smg")]
    pub smog_formation: f64,
    #[serde(rename = "odp")]
    pub ozone_depletion: f64,
}

impl Default for OperationalValues {
    fn default() -> Self {
        OperationalValues {
            gwp_fossil: 1_250_000.0,
            gwp_biogenic: 0.0,
            gwp_luluc: 0.0,
            acidification: 3_100.0,
            eutrophication: 95.0,
            smog_formation: 41_000.0,
            ozone_depletion: 0.0,
        }
    }
}

impl OperationalValues {
    pub fn to_vector(&self) -> ImpactVector {
        ImpactVector::from_fn(|category| {
            Some(match category {
                ImpactCategory::GwpFossil => self.gwp_fossil,
                ImpactCategory::GwpBiogenic => self.gwp_biogenic,
                ImpactCategory::GwpLuluc => self.gwp_luluc,
                ImpactCategory::Acidification => self.acidification,
                ImpactCategory::Eutrophication => self.eutrophication,
                ImpactCategory::SmogFormation => self.smog_formation,
                ImpactCategory::OzoneDepletion => self.ozone_depletion,
            })
        })
    }
}

fn default_wastage_rate_column() -> String {
    "enhanced wastage".to_string()
}

/// Parse and validate configuration from YAML text.
pub fn parse_config(contents: &str) -> LcaResult<PipelineConfig> {
    let raw: Option<RawConfig> = serde_yaml::from_str(contents)
        .map_err(|e| LcaError::configuration("config", format!("Invalid YAML: {}", e)))?;
    let raw = raw.ok_or_else(|| LcaError::configuration("config", "The config dictionary could not be set"))?;

    let tme_models = raw.tme_models.ok_or_else(|| {
        LcaError::configuration("tme_models", "The list of template models could not be set")
    })?;
    let cols_to_drop = raw.cols_to_drop.ok_or_else(|| {
        LcaError::configuration("cols_to_drop", "The list for columns to drop could not be set")
    })?;

    let config = PipelineConfig {
        tme_models,
        cols_to_drop,
        reference_study_period: raw.reference_study_period.unwrap_or(DEFAULT_RSP_YEARS),
        rows_per_element: raw.rows_per_element.unwrap_or(DEFAULT_ROWS_PER_ELEMENT),
        extraction: raw.extraction,
        include_module_d: raw.include_module_d,
        background: raw.background,
        transport: raw.transport,
        wastage_rate_column: raw.wastage_rate_column,
        operational: raw.operational,
    };
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate a YAML config file.
pub fn load_config(path: &Path) -> LcaResult<PipelineConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        LcaError::file_error("read config", path.display().to_string(), e.to_string())
    })?;
    let config = parse_config(&contents)?;
    tracing::debug!(path = %path.display(), models = config.tme_models.len(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("tme_models: [S1_O1_T1_R1]\ncols_to_drop: []\n").unwrap();
        assert_eq!(config.tme_models, vec!["S1_O1_T1_R1"]);
        assert_eq!(config.reference_study_period, 60);
        assert_eq!(config.rows_per_element, 5);
        assert!(!config.include_module_d);
        assert_eq!(config.extraction, ExtractionMode::RawExport);
        assert_eq!(config.background.product, Path::new("references/background_data/a1-a3.csv"));
        assert_eq!(config.transport.truck.distance_column, "R dist CA_truck");
        assert_eq!(config.wastage_rate_column, "enhanced wastage");
    }

    #[test]
    fn test_missing_required_keys() {
        let err = parse_config("cols_to_drop: []\n").unwrap_err();
        assert_eq!(
            err,
            LcaError::configuration("tme_models", "The list of template models could not be set")
        );

        let err = parse_config("tme_models: [A]\n").unwrap_err();
        assert!(matches!(err, LcaError::Configuration { ref key, .. } if key == "cols_to_drop"));
        assert!(err.aborts_run());
    }

    #[test]
    fn test_empty_document() {
        let err = parse_config("").unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION");
    }

    #[test]
    fn test_overrides() {
        let yaml = r#"
tme_models: [A]
cols_to_drop: [Revit category]
reference_study_period: 50
extraction: option_selection
background:
  wastage: custom/wastage.csv
operational:
  GWPf: 10.0
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.reference_study_period, 50);
        assert_eq!(config.extraction, ExtractionMode::OptionSelection);
        assert_eq!(config.background.wastage, Path::new("custom/wastage.csv"));
        assert_eq!(config.background.service_life, BackgroundPaths::default().service_life);
        assert_eq!(config.operational.gwp_fossil, 10.0);
        assert_eq!(config.operational.eutrophication, 95.0);
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_config("tme_models: [A]\ncols_to_drop: []\nreference_study_period: 0\n").is_err());
        assert!(parse_config("tme_models: ['../escape']\ncols_to_drop: []\n").is_err());
    }

    #[test]
    fn test_operational_vector_order() {
        let v = OperationalValues::default().to_vector();
        assert_eq!(v.get(ImpactCategory::GwpFossil), Some(1_250_000.0));
        assert_eq!(v.get(ImpactCategory::SmogFormation), Some(41_000.0));
    }
}
