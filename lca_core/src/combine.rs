//! # Cross-Model Combination
//!
//! Stacks every model's BOM, impact and prebuilt-scenario tables into three
//! frontend tables:
//!
//! | File | Source |
//! |------|--------|
//! | `combined_bom.bin` | `bom/*.csv` |
//! | `combined_impacts.bin` | `impacts/*.csv` |
//! | `combined_prebuilt_scenarios.bin` | `prebuilt_scenarios/*.csv` |
//!
//! Each row gets a `template_model` column. Tables with different columns
//! are stacked over the union of their columns (first-seen order, missing
//! cells empty). Files are postcard-encoded [`Table`]s.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{LcaError, LcaResult};
use crate::file_io::{atomic_write, read_bytes};
use crate::layout::{list_files, DataRoot, ModelLayout};
use crate::table::Table;

pub const TEMPLATE_MODEL_COLUMN: &str = "template_model";

/// Extension of the combined binary tables
pub const COMBINED_EXTENSION: &str = "bin";

/// The three combined tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinedTable {
    Bom,
    Impacts,
    PrebuiltScenarios,
}

impl CombinedTable {
    pub const ALL: [CombinedTable; 3] = [
        CombinedTable::Bom,
        CombinedTable::Impacts,
        CombinedTable::PrebuiltScenarios,
    ];

    /// File stem in the frontend directory
    pub fn file_stem(&self) -> &'static str {
        match self {
            CombinedTable::Bom => "combined_bom",
            CombinedTable::Impacts => "combined_impacts",
            CombinedTable::PrebuiltScenarios => "combined_prebuilt_scenarios",
        }
    }

    /// Per-model source directory
    pub fn source_dir(&self, model: &ModelLayout) -> PathBuf {
        match self {
            CombinedTable::Bom => model.bom_dir(),
            CombinedTable::Impacts => model.impacts_dir(),
            CombinedTable::PrebuiltScenarios => model.prebuilt_scenarios_dir(),
        }
    }

    pub fn path(&self, root: &DataRoot) -> PathBuf {
        root.frontend_dir()
            .join(format!("{}.{}", self.file_stem(), COMBINED_EXTENSION))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombineOutput {
    pub table: CombinedTable,
    pub path: PathBuf,
    pub source_files: usize,
    pub rows: usize,
    pub columns: usize,
}

/// `table` with its `template_model` column set to `model`.
///
/// An existing column is overwritten in place, otherwise one is appended.
pub fn tag_with_model(table: Table, model: &str) -> Table {
    let mut tagged = table;
    match tagged.column_index(TEMPLATE_MODEL_COLUMN) {
        Some(col) => {
            for row in &mut tagged.rows {
                row[col] = model.to_string();
            }
        }
        None => {
            tagged.headers.push(TEMPLATE_MODEL_COLUMN.to_string());
            for row in &mut tagged.rows {
                row.push(model.to_string());
            }
        }
    }
    tagged
}

/// Read and stack one kind of table across `models`.
pub fn combine_tables(root: &DataRoot, models: &[String], kind: CombinedTable) -> LcaResult<(Table, usize)> {
    let mut tables = Vec::new();
    for model in models {
        let layout = root.model(model);
        for path in list_files(&kind.source_dir(&layout), "*.csv")? {
            tracing::debug!(model = %model, path = %path.display(), "combining table");
            tables.push(tag_with_model(Table::read_csv(&path)?, model));
        }
    }
    let sources = tables.len();
    Ok((Table::concat(tables), sources))
}

pub fn encode_table(table: &Table) -> LcaResult<Vec<u8>> {
    postcard::to_allocvec(table).map_err(|e| LcaError::serialization(e.to_string()))
}

pub fn decode_table(bytes: &[u8]) -> LcaResult<Table> {
    postcard::from_bytes(bytes).map_err(|e| LcaError::serialization(e.to_string()))
}

/// Build and write all three combined tables.
pub fn combine(root: &DataRoot, models: &[String]) -> LcaResult<Vec<CombineOutput>> {
    let mut outputs = Vec::with_capacity(CombinedTable::ALL.len());
    for kind in CombinedTable::ALL {
        let (table, source_files) = combine_tables(root, models, kind)?;
        if source_files == 0 {
            tracing::warn!(table = kind.file_stem(), "no source tables found, writing an empty table");
        }

        let path = kind.path(root);
        atomic_write(&path, &encode_table(&table)?)?;
        tracing::info!(table = kind.file_stem(), rows = table.len(), path = %path.display(), "wrote combined table");

        outputs.push(CombineOutput {
            table: kind,
            path,
            source_files,
            rows: table.len(),
            columns: table.headers.len(),
        });
    }
    Ok(outputs)
}

/// Decode a combined table written by [`combine`].
pub fn read_combined(path: &Path) -> LcaResult<Table> {
    decode_table(&read_bytes(path)?)
}
