//! # Impact Records
//!
//! The output of every stage: BOM row + life-cycle-stage label + provenance
//! columns + seven impact values, keyed by `element_index`.
//!
//! ## Artifact Layout
//!
//! ```text
//! element_index | <BOM columns...> | life_cycle_stage | <provenance...> | <7 impact columns>
//! ```
//!
//! Null impacts are written as empty cells. Numbers use the shortest text
//! that parses back to the same `f64`, so writing then reading an artifact is
//! lossless and writing twice is byte-identical.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bom::ELEMENT_INDEX;
use crate::errors::{LcaError, LcaResult};
use crate::impacts::{ImpactCategory, ImpactVector, LifeCycleStage};
use crate::table::{format_optional_f64, parse_optional_f64, Table};

pub const LIFE_CYCLE_STAGE_COLUMN: &str = "life_cycle_stage";

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecord {
    pub element_index: String,
    /// Cells aligned with [`ImpactRecords::bom_columns`]
    pub fields: Vec<String>,
    /// Cells aligned with [`ImpactRecords::provenance_columns`]
    pub provenance: Vec<String>,
    pub impacts: ImpactVector,
}

/// All rows one stage produced for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactRecords {
    pub stage: LifeCycleStage,
    pub bom_columns: Vec<String>,
    pub provenance_columns: Vec<String>,
    pub records: Vec<ImpactRecord>,
}

impl ImpactRecords {
    pub fn new(stage: LifeCycleStage, bom_columns: Vec<String>, provenance_columns: Vec<String>) -> Self {
        ImpactRecords {
            stage,
            bom_columns,
            provenance_columns,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: ImpactRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows with at least one null impact (background join misses)
    pub fn null_count(&self) -> usize {
        self.records.iter().filter(|r| r.impacts.has_nulls()).count()
    }

    /// First record for an element
    pub fn get(&self, element_index: &str) -> Option<&ImpactRecord> {
        self.records.iter().find(|r| r.element_index == element_index)
    }

    /// Impacts summed per `element_index`; nulls propagate into the sum.
    pub fn impacts_by_element(&self) -> HashMap<String, ImpactVector> {
        let mut totals: HashMap<String, ImpactVector> = HashMap::new();
        for record in &self.records {
            totals
                .entry(record.element_index.clone())
                .and_modify(|total| *total = *total + record.impacts)
                .or_insert(record.impacts);
        }
        totals
    }

    pub fn to_table(&self) -> Table {
        let headers = std::iter::once(ELEMENT_INDEX.to_string())
            .chain(self.bom_columns.iter().cloned())
            .chain(std::iter::once(LIFE_CYCLE_STAGE_COLUMN.to_string()))
            .chain(self.provenance_columns.iter().cloned())
            .chain(ImpactCategory::ALL.iter().map(|c| c.column_name().to_string()));

        let mut table = Table::new(headers);
        for record in &self.records {
            let mut cells = Vec::with_capacity(table.headers.len());
            cells.push(record.element_index.clone());
            cells.extend(record.fields.iter().cloned());
            cells.push(self.stage.label().to_string());
            cells.extend(record.provenance.iter().cloned());
            cells.extend(record.impacts.iter().map(|(_, v)| format_optional_f64(v)));
            table.rows.push(cells);
        }
        table
    }

    /// Parse an artifact written by [`ImpactRecords::write`].
    pub fn from_table(table: &Table, stage: LifeCycleStage, source: &str) -> LcaResult<Self> {
        let index_col = table.require_column(ELEMENT_INDEX, source)?;
        let stage_col = table.require_column(LIFE_CYCLE_STAGE_COLUMN, source)?;
        let mut category_cols = Vec::with_capacity(ImpactCategory::ALL.len());
        for category in ImpactCategory::ALL {
            category_cols.push((category, table.require_column(category.column_name(), source)?));
        }
        let first_category_col = category_cols.iter().map(|(_, c)| *c).min().unwrap_or(table.headers.len());
        if first_category_col < stage_col {
            return Err(LcaError::format_error(
                source,
                "impact columns must follow the life_cycle_stage column",
            ));
        }

        let bom_cols: Vec<usize> = (0..stage_col).filter(|&i| i != index_col).collect();
        let provenance_cols: Vec<usize> = (stage_col + 1..first_category_col).collect();

        let mut records = ImpactRecords::new(
            stage,
            bom_cols.iter().map(|&i| table.headers[i].clone()).collect(),
            provenance_cols.iter().map(|&i| table.headers[i].clone()).collect(),
        );

        for row in &table.rows {
            let mut impacts = ImpactVector::null();
            for (category, col) in &category_cols {
                impacts.set(*category, parse_optional_f64(&row[*col], category.column_name())?);
            }
            records.push(ImpactRecord {
                element_index: row[index_col].clone(),
                fields: bom_cols.iter().map(|&i| row[i].clone()).collect(),
                provenance: provenance_cols.iter().map(|&i| row[i].clone()).collect(),
                impacts,
            });
        }
        Ok(records)
    }

    /// Atomically write `{dir}/{name}.csv`, returning the path.
    pub fn write(&self, dir: &Path, name: &str) -> LcaResult<PathBuf> {
        let path = dir.join(format!("{}.csv", name));
        self.to_table().write_csv(&path)?;
        Ok(path)
    }

    pub fn read(path: &Path, stage: LifeCycleStage) -> LcaResult<Self> {
        let table = Table::read_csv(path)?;
        ImpactRecords::from_table(&table, stage, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_records() -> ImpactRecords {
        let mut records = ImpactRecords::new(
            LifeCycleStage::Transportation,
            vec!["Tally material".to_string(), "Weight (kg)".to_string()],
            vec!["distance_mi".to_string()],
        );
        records.push(ImpactRecord {
            element_index: "Element_0".to_string(),
            fields: vec!["Concrete".to_string(), "10.0".to_string()],
            provenance: vec!["120.0".to_string()],
            impacts: ImpactVector::from_fn(|_| Some(0.1 + 0.2)),
        });
        let mut partial = ImpactVector::from_fn(|_| Some(-1.0e-9));
        partial.set(ImpactCategory::OzoneDepletion, None);
        records.push(ImpactRecord {
            element_index: "Element_1".to_string(),
            fields: vec!["Unknown".to_string(), "3".to_string()],
            provenance: vec![String::new()],
            impacts: partial,
        });
        records
    }

    #[test]
    fn test_table_layout() {
        let table = sample_records().to_table();
        assert_eq!(table.headers[0], "element_index");
        assert_eq!(table.headers[3], "life_cycle_stage");
        assert_eq!(table.headers[4], "distance_mi");
        assert_eq!(table.headers[5], "Global Warming Potential_fossil");
        assert_eq!(table.headers.len(), 12);
        assert_eq!(table.rows[0][3], "A4: Transportation");
        assert_eq!(table.rows[1][11], "");
    }

    #[test]
    fn test_write_then_read_preserves_keys_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let records = sample_records();

        let path = records.write(dir.path(), "m_transportation_impacts").unwrap();
        assert_eq!(path.file_name().unwrap(), "m_transportation_impacts.csv");

        let read = ImpactRecords::read(&path, LifeCycleStage::Transportation).unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn test_write_twice_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let records = sample_records();

        let path = records.write(dir.path(), "a").unwrap();
        let first = std::fs::read(&path).unwrap();
        records.write(dir.path(), "a").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_impacts_by_element_sums_shared_keys() {
        let mut records = ImpactRecords::new(LifeCycleStage::Product, vec![], vec![]);
        for (idx, v) in [("E0", 1.0), ("E0", 2.0), ("E1", 5.0)] {
            records.push(ImpactRecord {
                element_index: idx.to_string(),
                fields: vec![],
                provenance: vec![],
                impacts: ImpactVector::from_fn(|_| Some(v)),
            });
        }
        let totals = records.impacts_by_element();
        assert_eq!(totals["E0"].get(ImpactCategory::GwpFossil), Some(3.0));
        assert_eq!(totals["E1"].get(ImpactCategory::GwpFossil), Some(5.0));
    }

    #[test]
    fn test_null_count() {
        assert_eq!(sample_records().null_count(), 1);
    }

    #[test]
    fn test_read_rejects_missing_category() {
        let table = Table::from_reader("element_index,life_cycle_stage\nE0,x\n".as_bytes(), "t").unwrap();
        let err = ImpactRecords::from_table(&table, LifeCycleStage::Product, "t").unwrap_err();
        assert_eq!(err.error_code(), "MISSING_COLUMN");
    }
}
