//! # Tabular Data Access
//!
//! A small CSV table: ordered headers plus string cells. Stages
//! parse the cells they need and carry every other column through untouched,
//! so the column order of a BOM survives into its impact artifacts.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{LcaError, LcaResult};
use crate::file_io;

/// Headers plus string rows, all rows the same width as `headers`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given headers
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Table {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the headers.
    pub fn push_row(&mut self, row: Vec<String>) -> LcaResult<()> {
        if row.len() != self.headers.len() {
            return Err(LcaError::invalid_input(
                "row",
                format!("{} cells", row.len()),
                format!("expected {} cells to match headers", self.headers.len()),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a column, or `MissingColumn` naming `table`
    pub fn require_column(&self, name: &str, table: &str) -> LcaResult<usize> {
        self.column_index(name)
            .ok_or_else(|| LcaError::missing_column(table, name))
    }

    /// Cell at `(row, column)`
    pub fn cell(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }

    /// Read a CSV file with a header row.
    pub fn read_csv(path: &Path) -> LcaResult<Table> {
        let file = std::fs::File::open(path).map_err(|e| {
            LcaError::file_error("open", path.display().to_string(), e.to_string())
        })?;
        Table::from_reader(file, &path.display().to_string())
    }

    /// Parse CSV from any reader; `source` names it in errors.
    pub fn from_reader<R: Read>(reader: R, source: &str) -> LcaResult<Table> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| LcaError::format_error(source, e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = Table::new(headers);
        for record in csv_reader.records() {
            let record = record.map_err(|e| LcaError::format_error(source, e.to_string()))?;
            table.rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }

    /// Serialize to CSV bytes (header row first)
    pub fn to_csv_bytes(&self) -> LcaResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|e| LcaError::serialization(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| LcaError::serialization(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| LcaError::serialization(e.to_string()))
    }

    /// Atomically write as CSV
    pub fn write_csv(&self, path: &Path) -> LcaResult<()> {
        let bytes = self.to_csv_bytes()?;
        file_io::atomic_write(path, &bytes)
    }

    /// Concatenate tables row-wise over the union of their columns.
    ///
    /// Columns keep first-seen order; cells a table lacks are left empty.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let tables: Vec<Table> = tables.into_iter().collect();

        let mut headers: Vec<String> = Vec::new();
        for table in &tables {
            for header in &table.headers {
                if !headers.contains(header) {
                    headers.push(header.clone());
                }
            }
        }

        let mut combined = Table::new(headers.clone());
        for table in tables {
            let mapping: Vec<Option<usize>> = headers.iter().map(|h| table.column_index(h)).collect();
            for row in table.rows {
                combined.rows.push(
                    mapping
                        .iter()
                        .map(|idx| idx.map(|i| row[i].clone()).unwrap_or_default())
                        .collect(),
                );
            }
        }
        combined
    }
}

/// Parse a numeric cell. Empty and `nan` cells are null.
pub fn parse_optional_f64(value: &str, field: &str) -> LcaResult<Option<f64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| LcaError::invalid_input(field, trimmed, "not a number"))
}

/// Format a numeric cell. Null is an empty cell; values use the shortest
/// representation that parses back to the same `f64`.
pub fn format_optional_f64(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:?}", v),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_from_reader() {
        let csv = "element_index,Tally material,Weight (kg)\nElement_0,Concrete,10.5\nElement_1,\"Steel, rebar\",2\n";
        let table = Table::from_reader(csv.as_bytes(), "inline").unwrap();
        assert_eq!(table.headers, vec!["element_index", "Tally material", "Weight (kg)"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 1), "Steel, rebar");
    }

    #[test]
    fn test_ragged_csv_is_format_error() {
        let csv = "a,b\n1,2,3\n";
        let err = Table::from_reader(csv.as_bytes(), "inline").unwrap_err();
        assert_eq!(err.error_code(), "FORMAT_ERROR");
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");

        let mut table = Table::new(["element_index", "value"]);
        table.push_row(vec!["Element_0".into(), "1.25".into()]).unwrap();
        table.write_csv(&path).unwrap();

        assert_eq!(Table::read_csv(&path).unwrap(), table);
    }

    #[test]
    fn test_push_row_width_mismatch() {
        let mut table = Table::new(["a", "b"]);
        assert!(table.push_row(vec!["1".into()]).is_err());
    }

    #[test]
    fn test_concat_unions_columns() {
        let mut a = Table::new(["element_index", "x"]);
        a.push_row(vec!["E0".into(), "1".into()]).unwrap();
        let mut b = Table::new(["element_index", "y"]);
        b.push_row(vec!["E1".into(), "2".into()]).unwrap();

        let combined = Table::concat([a, b]);
        assert_eq!(combined.headers, vec!["element_index", "x", "y"]);
        assert_eq!(combined.rows[0], vec!["E0", "1", ""]);
        assert_eq!(combined.rows[1], vec!["E1", "", "2"]);
    }

    #[test]
    fn test_numeric_cells() {
        assert_eq!(parse_optional_f64(" 3.5 ", "w").unwrap(), Some(3.5));
        assert_eq!(parse_optional_f64("", "w").unwrap(), None);
        assert_eq!(parse_optional_f64("NaN", "w").unwrap(), None);
        assert!(parse_optional_f64("heavy", "w").is_err());

        assert_eq!(format_optional_f64(Some(15.0)), "15.0");
        assert_eq!(format_optional_f64(None), "");
        let v = 0.1 + 0.2;
        assert_eq!(parse_optional_f64(&format_optional_f64(Some(v)), "v").unwrap(), Some(v));
    }
}
