//! # Bill of Materials
//!
//! A BOM is the ordered list of element rows for one template model. The
//! columns the stages join on are parsed into [`BomRow`] fields; every column
//! (except `element_index`) is also kept verbatim in `fields` so it can be
//! carried into the impact artifacts in its original order.
//!
//! `element_index` is not unique: a Tally extraction emits several rows per
//! logical element, and they share one index.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{LcaError, LcaResult};
use crate::layout;
use crate::table::{parse_optional_f64, Table};

pub const ELEMENT_INDEX: &str = "element_index";
pub const MATERIAL_COLUMN: &str = "Tally material";
pub const WEIGHT_COLUMN: &str = "Weight (kg)";
pub const ASSEMBLY_COLUMN: &str = "Assembly";
pub const BUILDING_MATERIAL_COLUMN: &str = "Building Material_name";

const TABLE_NAME: &str = "bill of materials";

/// One BOM row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomRow {
    pub element_index: String,
    /// Join key for the manufacture, end-of-life and distance tables
    pub material: String,
    /// `None` when the weight cell is empty
    pub weight_kg: Option<f64>,
    /// Join key for the service-life table (empty when the column is absent)
    pub assembly: String,
    /// Join key for the wastage table (empty when the column is absent)
    pub building_material: String,
    /// Cells aligned with [`BillOfMaterials::columns`]
    pub fields: Vec<String>,
}

/// Rows sharing one `element_index`, in BOM order.
#[derive(Debug, Clone)]
pub struct ElementGroup<'a> {
    pub element_index: &'a str,
    pub rows: Vec<&'a BomRow>,
}

impl<'a> ElementGroup<'a> {
    /// The row whose descriptive columns and join keys represent the element
    pub fn lead(&self) -> &'a BomRow {
        self.rows[0]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BillOfMaterials {
    /// Every BOM column except `element_index`, in file order
    pub columns: Vec<String>,
    pub rows: Vec<BomRow>,
}

impl BillOfMaterials {
    /// Load the single BOM file in `bom_dir`.
    ///
    /// Fails with `SourceNotFound` / `AmbiguousSource` unless exactly one
    /// `.csv` file is present.
    pub fn load(bom_dir: &Path) -> LcaResult<Self> {
        let path = layout::find_single_file(bom_dir, "*.csv", TABLE_NAME)?;
        tracing::debug!(path = %path.display(), "loading bill of materials");
        let table = Table::read_csv(&path)?;
        BillOfMaterials::from_table(&table)
    }

    /// Parse a BOM from a table with at least `element_index`,
    /// `Tally material` and `Weight (kg)` columns.
    pub fn from_table(table: &Table) -> LcaResult<Self> {
        let index_col = table.require_column(ELEMENT_INDEX, TABLE_NAME)?;
        let material_col = table.require_column(MATERIAL_COLUMN, TABLE_NAME)?;
        let weight_col = table.require_column(WEIGHT_COLUMN, TABLE_NAME)?;
        let assembly_col = table.column_index(ASSEMBLY_COLUMN);
        let building_col = table.column_index(BUILDING_MATERIAL_COLUMN);

        let columns = table
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index_col)
            .map(|(_, h)| h.clone())
            .collect();

        let mut rows = Vec::with_capacity(table.len());
        for row in &table.rows {
            let weight_kg = parse_optional_f64(&row[weight_col], WEIGHT_COLUMN)?;
            if let Some(w) = weight_kg {
                if w < 0.0 {
                    return Err(LcaError::invalid_input(WEIGHT_COLUMN, w.to_string(), "Weight cannot be negative"));
                }
            }

            rows.push(BomRow {
                element_index: row[index_col].clone(),
                material: row[material_col].clone(),
                weight_kg,
                assembly: assembly_col.map(|c| row[c].clone()).unwrap_or_default(),
                building_material: building_col.map(|c| row[c].clone()).unwrap_or_default(),
                fields: row
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index_col)
                    .map(|(_, v)| v.clone())
                    .collect(),
            });
        }

        Ok(BillOfMaterials { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fail with `MissingColumn` unless the BOM carries `column`.
    pub fn require_column(&self, column: &str) -> LcaResult<()> {
        if self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(LcaError::missing_column(TABLE_NAME, column))
        }
    }

    /// Rows grouped by `element_index`, groups in first-seen order.
    pub fn elements(&self) -> Vec<ElementGroup<'_>> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<ElementGroup<'_>> = Vec::new();
        for row in &self.rows {
            match positions.get(row.element_index.as_str()) {
                Some(&pos) => groups[pos].rows.push(row),
                None => {
                    positions.insert(&row.element_index, groups.len());
                    groups.push(ElementGroup {
                        element_index: &row.element_index,
                        rows: vec![row],
                    });
                }
            }
        }
        groups
    }

    /// Back to a table with `element_index` first
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(std::iter::once(ELEMENT_INDEX.to_string()).chain(self.columns.iter().cloned()));
        for row in &self.rows {
            let mut cells = Vec::with_capacity(row.fields.len() + 1);
            cells.push(row.element_index.clone());
            cells.extend(row.fields.iter().cloned());
            table.rows.push(cells);
        }
        table
    }
}
