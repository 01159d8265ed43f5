//! # BOM Extraction
//!
//! Builds a model's bill of materials, in one of two ways
//! ([`ExtractionMode`]).
//!
//! **Raw export**, from the model's own Tally extraction:
//!
//! 1. read the single `raw/*.csv` file
//! 2. drop the configured `cols_to_drop`
//! 3. stamp `Revit model` with the model name
//! 4. assign `element_index = Element_{row / rows_per_element}`
//!
//! **Option selection**, from the shared category sources in `data/raw/`:
//!
//! 1. split the model name `{structure}_{opaque}_{translucent}_{roofing}`
//!    into four option codes (`S1_O1_T1_R1`)
//! 2. keep each category's rows whose `Option` matches its code
//! 3. stack the categories in [`BomCategory::ALL`] order
//! 4. assign `element_index = Element_{row}`
//!
//! Both write `bom/{model}_bom.csv` with `element_index` first.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bom::{BillOfMaterials, ELEMENT_INDEX};
use crate::config::{ExtractionMode, PipelineConfig};
use crate::errors::{LcaError, LcaResult};
use crate::layout::{self, DataRoot};
use crate::table::Table;

/// Column stamped with the model name
pub const REVIT_MODEL_COLUMN: &str = "Revit model";

/// Column of a category source naming the option a row belongs to
pub const OPTION_COLUMN: &str = "Option";

/// Building systems a template model picks one option for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BomCategory {
    Structure,
    EnclosureOpaque,
    EnclosureTranslucent,
    EnclosureRoofing,
}

impl BomCategory {
    /// Order of the option codes in a model name, and of the rows in its BOM
    pub const ALL: [BomCategory; 4] = [
        BomCategory::Structure,
        BomCategory::EnclosureOpaque,
        BomCategory::EnclosureTranslucent,
        BomCategory::EnclosureRoofing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BomCategory::Structure => "Structure",
            BomCategory::EnclosureOpaque => "Enclosure - Opaque",
            BomCategory::EnclosureTranslucent => "Enclosure - Translucent",
            BomCategory::EnclosureRoofing => "Enclosure - Roofing",
        }
    }

    /// Source file under `data/raw/`
    pub fn file_name(&self) -> &'static str {
        match self {
            BomCategory::Structure => "structure.csv",
            BomCategory::EnclosureOpaque => "enclosure_opaque.csv",
            BomCategory::EnclosureTranslucent => "enclosure_translucent.csv",
            BomCategory::EnclosureRoofing => "enclosure_roofing.csv",
        }
    }

    fn position(&self) -> usize {
        match self {
            BomCategory::Structure => 0,
            BomCategory::EnclosureOpaque => 1,
            BomCategory::EnclosureTranslucent => 2,
            BomCategory::EnclosureRoofing => 3,
        }
    }
}

/// Option codes encoded in a template model name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    codes: [String; 4],
}

impl ModelOptions {
    /// Decode `{structure}_{opaque}_{translucent}_{roofing}`.
    pub fn parse(model: &str) -> LcaResult<Self> {
        let parts: Vec<&str> = model.split('_').collect();
        match parts.as_slice() {
            [s, o, t, r] if parts.iter().all(|p| !p.trim().is_empty()) => Ok(ModelOptions {
                codes: [s.to_string(), o.to_string(), t.to_string(), r.to_string()],
            }),
            _ => Err(LcaError::invalid_input(
                "template model",
                model,
                "expected four option codes: {structure}_{opaque}_{translucent}_{roofing}",
            )),
        }
    }

    pub fn code(&self, category: BomCategory) -> &str {
        &self.codes[category.position()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractOutput {
    pub model: String,
    pub source: PathBuf,
    pub path: PathBuf,
    pub rows: usize,
    pub elements: usize,
}

/// `Element_{row / rows_per_element}`
pub fn element_index(row: usize, rows_per_element: usize) -> String {
    format!("Element_{}", row / rows_per_element.max(1))
}

/// Turn a raw extraction table into BOM layout.
///
/// Every name in `cols_to_drop` must exist in the raw table.
pub fn build_bom(raw: &Table, model: &str, cols_to_drop: &[String], rows_per_element: usize) -> LcaResult<Table> {
    for column in cols_to_drop {
        raw.require_column(column, "raw extraction")?;
    }
    if raw.column_index(ELEMENT_INDEX).is_some() {
        return Err(LcaError::invalid_input(
            ELEMENT_INDEX,
            "raw extraction",
            "element_index is assigned during extraction and must not be present",
        ));
    }

    let kept: Vec<usize> = (0..raw.headers.len())
        .filter(|&i| !cols_to_drop.contains(&raw.headers[i]))
        .collect();
    let model_col = kept.iter().position(|&i| raw.headers[i] == REVIT_MODEL_COLUMN);

    let mut headers: Vec<String> = std::iter::once(ELEMENT_INDEX.to_string())
        .chain(kept.iter().map(|&i| raw.headers[i].clone()))
        .collect();
    if model_col.is_none() {
        headers.push(REVIT_MODEL_COLUMN.to_string());
    }

    let mut bom = Table::new(headers);
    for (row_number, row) in raw.rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(bom.headers.len());
        cells.push(element_index(row_number, rows_per_element));
        cells.extend(kept.iter().map(|&i| row[i].clone()));
        match model_col {
            Some(pos) => cells[pos + 1] = model.to_string(),
            None => cells.push(model.to_string()),
        }
        bom.rows.push(cells);
    }
    Ok(bom)
}

/// Stack the rows of each category source that belong to the model's options.
///
/// Sources are taken in slice order; each must carry an `Option` column.
/// Every selected row becomes its own element.
pub fn select_options(sources: &[(BomCategory, Table)], options: &ModelOptions) -> LcaResult<Table> {
    let mut selected = Vec::with_capacity(sources.len());
    for (category, source) in sources {
        let option_col = source.require_column(OPTION_COLUMN, category.label())?;
        let code = options.code(*category);

        let mut rows = Table::new(source.headers.clone());
        rows.rows = source
            .rows
            .iter()
            .filter(|row| row[option_col] == code)
            .cloned()
            .collect();
        if rows.is_empty() {
            tracing::warn!(category = category.label(), option = code, "no rows for option");
        }
        selected.push(rows);
    }

    let stacked = Table::concat(selected);
    if stacked.column_index(ELEMENT_INDEX).is_some() {
        return Err(LcaError::invalid_input(
            ELEMENT_INDEX,
            "category sources",
            "element_index is assigned during extraction and must not be present",
        ));
    }

    let mut bom = Table::new(std::iter::once(ELEMENT_INDEX.to_string()).chain(stacked.headers));
    for (row_number, row) in stacked.rows.into_iter().enumerate() {
        let mut cells = Vec::with_capacity(bom.headers.len());
        cells.push(element_index(row_number, 1));
        cells.extend(row);
        bom.rows.push(cells);
    }
    Ok(bom)
}

/// Read the four category sources from `dir`, in [`BomCategory::ALL`] order.
pub fn read_category_sources(dir: &Path) -> LcaResult<Vec<(BomCategory, Table)>> {
    let mut sources = Vec::with_capacity(BomCategory::ALL.len());
    for category in BomCategory::ALL {
        let path = dir.join(category.file_name());
        if !path.is_file() {
            return Err(LcaError::SourceNotFound {
                directory: dir.display().to_string(),
                expected: format!("{} ({})", category.label(), category.file_name()),
            });
        }
        sources.push((category, Table::read_csv(&path)?));
    }
    Ok(sources)
}

/// Extract one model's BOM the configured way and write it.
pub fn extract_model(root: &DataRoot, config: &PipelineConfig, model: &str) -> LcaResult<ExtractOutput> {
    match config.extraction {
        ExtractionMode::RawExport => extract_raw_export(root, config, model),
        ExtractionMode::OptionSelection => extract_option_selection(root, model),
    }
}

/// BOM from the model's `raw/*.csv` Tally export.
pub fn extract_raw_export(root: &DataRoot, config: &PipelineConfig, model: &str) -> LcaResult<ExtractOutput> {
    let layout = root.model(model);
    let source = layout::find_single_file(&layout.raw_dir(), "*.csv", "raw extraction")?;
    tracing::debug!(model, path = %source.display(), "reading raw extraction");

    let raw = Table::read_csv(&source)?;
    let bom = build_bom(&raw, model, &config.cols_to_drop, config.rows_per_element)?;
    write_bom(root, model, source, bom)
}

/// BOM cut from `data/raw/` by the option codes in the model name.
pub fn extract_option_selection(root: &DataRoot, model: &str) -> LcaResult<ExtractOutput> {
    let options = ModelOptions::parse(model)?;
    let source = root.raw_boms_dir();
    tracing::debug!(model, path = %source.display(), "selecting options from category sources");

    let sources = read_category_sources(&source)?;
    let bom = select_options(&sources, &options)?;
    write_bom(root, model, source, bom)
}

fn write_bom(root: &DataRoot, model: &str, source: PathBuf, bom: Table) -> LcaResult<ExtractOutput> {
    let elements = BillOfMaterials::from_table(&bom)?.elements().len();

    let path = root.model(model).bom_path();
    bom.write_csv(&path)?;
    tracing::info!(model, rows = bom.len(), elements, path = %path.display(), "wrote bill of materials");

    Ok(ExtractOutput {
        model: model.to_string(),
        source,
        path,
        rows: bom.len(),
        elements,
    })
}
