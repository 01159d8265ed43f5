//! # Background Datasets
//!
//! Reference tables the stages join a BOM against. Two shapes cover all of
//! them:
//!
//! - [`FactorTable`] - key to one factor per impact category (manufacture,
//!   end-of-life, transport emissions)
//! - [`ScalarTable`] - key to a single number (distances, wastage rates,
//!   service lives)
//!
//! Keys are matched after trimming whitespace. A duplicate key keeps its
//! first row.

use std::collections::HashMap;

use crate::errors::LcaResult;
use crate::impacts::{ImpactCategory, ImpactVector};
use crate::table::{parse_optional_f64, Table};

/// Material key column of the manufacture, end-of-life and distance tables
pub const MATERIAL_KEY: &str = "Name_Tally Material";
/// Key column of the transport emissions table
pub const PRODUCT_SYSTEM_KEY: &str = "Product system name";
/// Service-life column of the replacement table
pub const SERVICE_LIFE_COLUMN: &str = "service_lives";
/// Manufacture factor column suffix (`GWPf_mfg`)
pub const MFG_SUFFIX: &str = "mfg";
/// End-of-life factor column suffix (`GWPf_eol`)
pub const EOL_SUFFIX: &str = "eol";

/// Per-category unit factors keyed by name.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    pub dataset: String,
    factors: HashMap<String, ImpactVector>,
}

impl FactorTable {
    /// Build from a table with `key_column` and one `{code}_{suffix}` column
    /// per category (bare codes when `suffix` is empty).
    pub fn from_table(table: &Table, dataset: &str, key_column: &str, suffix: &str) -> LcaResult<Self> {
        let key_col = table.require_column(key_column, dataset)?;
        let mut category_cols = Vec::with_capacity(ImpactCategory::ALL.len());
        for category in ImpactCategory::ALL {
            let column = category.background_column(suffix);
            category_cols.push((category, table.require_column(&column, dataset)?));
        }

        let mut factors = HashMap::with_capacity(table.len());
        for row in &table.rows {
            let key = row[key_col].trim().to_string();
            if factors.contains_key(&key) {
                tracing::warn!(dataset, key = %key, "duplicate background key, keeping first row");
                continue;
            }
            let mut vector = ImpactVector::null();
            for (category, col) in &category_cols {
                vector.set(*category, parse_optional_f64(&row[*col], &category.background_column(suffix))?);
            }
            factors.insert(key, vector);
        }

        Ok(FactorTable {
            dataset: dataset.to_string(),
            factors,
        })
    }

    pub fn get(&self, key: &str) -> Option<&ImpactVector> {
        self.factors.get(key.trim())
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// One number per key.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarTable {
    pub dataset: String,
    pub value_column: String,
    values: HashMap<String, Option<f64>>,
}

impl ScalarTable {
    pub fn from_table(table: &Table, dataset: &str, key_column: &str, value_column: &str) -> LcaResult<Self> {
        let key_col = table.require_column(key_column, dataset)?;
        let value_col = table.require_column(value_column, dataset)?;

        let mut values = HashMap::with_capacity(table.len());
        for row in &table.rows {
            let key = row[key_col].trim().to_string();
            if values.contains_key(&key) {
                tracing::warn!(dataset, key = %key, "duplicate background key, keeping first row");
                continue;
            }
            values.insert(key, parse_optional_f64(&row[value_col], value_column)?);
        }

        Ok(ScalarTable {
            dataset: dataset.to_string(),
            value_column: value_column.to_string(),
            values,
        })
    }

    /// `None` for a missing key or an empty cell
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key.trim()).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
