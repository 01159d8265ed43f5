//! # Data Root Layout
//!
//! Directory conventions and file naming for a data root:
//!
//! ```text
//! <root>/
//! ├── references/
//! │   ├── config.yml
//! │   └── background_data/*.csv
//! └── data/
//!     ├── raw/                     per-category option sources (shared)
//!     ├── frontend/
//!     └── template_models/<model>/
//!         ├── raw/                 raw extraction (one file)
//!         ├── bom/                 bill of materials (one file)
//!         ├── impacts/             <model>_<stage>_impacts.csv
//!         └── prebuilt_scenarios/  <model>_<stage>_prebuilt_scenarios.csv
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{LcaError, LcaResult};
use crate::impacts::LifeCycleStage;

pub const TEMPLATE_MODELS_DIR: &str = "data/template_models";
pub const FRONTEND_DIR: &str = "data/frontend";
pub const RAW_BOMS_DIR: &str = "data/raw";
pub const BACKGROUND_DIR: &str = "references/background_data";
pub const DEFAULT_CONFIG_PATH: &str = "references/config.yml";

/// Placeholder kept in empty directories under version control
pub const PLACEHOLDER_FILE: &str = ".gitkeep";

/// Root directory all relative paths resolve against.
#[derive(Debug, Clone)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataRoot { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path from configuration; absolute paths are kept as-is.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn template_models_dir(&self) -> PathBuf {
        self.root.join(TEMPLATE_MODELS_DIR)
    }

    pub fn frontend_dir(&self) -> PathBuf {
        self.root.join(FRONTEND_DIR)
    }

    /// Category sources every option-selected BOM is cut from
    pub fn raw_boms_dir(&self) -> PathBuf {
        self.root.join(RAW_BOMS_DIR)
    }

    pub fn model(&self, name: &str) -> ModelLayout {
        ModelLayout {
            name: name.to_string(),
            dir: self.template_models_dir().join(name),
        }
    }

    /// Every model directory under `data/template_models`, sorted by name.
    pub fn discover_models(&self) -> LcaResult<Vec<String>> {
        let dir = self.template_models_dir();
        let entries = fs::read_dir(&dir)
            .map_err(|e| LcaError::file_error("list models", dir.display().to_string(), e.to_string()))?;

        let mut models = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| LcaError::file_error("list models", dir.display().to_string(), e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && !name.starts_with('.') {
                models.push(name);
            }
        }
        models.sort();
        Ok(models)
    }
}

/// Paths belonging to one template model.
#[derive(Debug, Clone)]
pub struct ModelLayout {
    pub name: String,
    pub dir: PathBuf,
}

impl ModelLayout {
    pub fn raw_dir(&self) -> PathBuf {
        self.dir.join("raw")
    }

    pub fn bom_dir(&self) -> PathBuf {
        self.dir.join("bom")
    }

    pub fn impacts_dir(&self) -> PathBuf {
        self.dir.join("impacts")
    }

    pub fn prebuilt_scenarios_dir(&self) -> PathBuf {
        self.dir.join("prebuilt_scenarios")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join("run_manifest.json")
    }

    /// Where the extractor writes this model's BOM
    pub fn bom_path(&self) -> PathBuf {
        self.bom_dir().join(format!("{}_bom.csv", self.name))
    }

    /// Artifact path for one stage's impacts
    pub fn impacts_path(&self, stage: LifeCycleStage) -> PathBuf {
        self.impacts_dir()
            .join(format!("{}.csv", impacts_name(&self.name, stage)))
    }

    /// Artifact path for one stage's prebuilt scenario
    pub fn scenario_path(&self, stage: LifeCycleStage) -> PathBuf {
        self.prebuilt_scenarios_dir().join(format!(
            "{}_{}_prebuilt_scenarios.csv",
            self.name,
            stage.artifact_name()
        ))
    }
}

/// Artifact name `{model}_{stage}_impacts` (no extension)
pub fn impacts_name(model: &str, stage: LifeCycleStage) -> String {
    format!("{}_{}_impacts", model, stage.artifact_name())
}

/// Files in `dir` matching `pattern` (e.g. `*.csv`), sorted, placeholders skipped.
///
/// A missing directory yields an empty list.
pub fn list_files(dir: &Path, pattern: &str) -> LcaResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let paths = glob::glob(&full_pattern)
        .map_err(|e| LcaError::invalid_input("pattern", full_pattern.clone(), e.to_string()))?;

    let mut files = Vec::new();
    for path in paths {
        let path = path.map_err(|e| {
            LcaError::file_error("glob", dir.display().to_string(), e.to_string())
        })?;
        let is_placeholder = path
            .file_name()
            .map(|n| n == PLACEHOLDER_FILE)
            .unwrap_or(false);
        if path.is_file() && !is_placeholder {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The single file in `dir` matching `pattern`.
///
/// Zero candidates is `SourceNotFound`, more than one is `AmbiguousSource`.
pub fn find_single_file(dir: &Path, pattern: &str, expected: &str) -> LcaResult<PathBuf> {
    let mut files = list_files(dir, pattern)?;
    match files.len() {
        0 => Err(LcaError::SourceNotFound {
            directory: dir.display().to_string(),
            expected: expected.to_string(),
        }),
        1 => Ok(files.remove(0)),
        _ => Err(LcaError::AmbiguousSource {
            directory: dir.display().to_string(),
            expected: expected.to_string(),
            candidates: files
                .iter()
                .map(|f| f.file_name().unwrap_or_default().to_string_lossy().to_string())
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_naming() {
        let root = DataRoot::new("/data");
        let model = root.model("S1_O1_T1_R1");
        assert_eq!(impacts_name("S1_O1_T1_R1", LifeCycleStage::EndOfLife), "S1_O1_T1_R1_end-of-life_impacts");
        assert_eq!(
            model.impacts_path(LifeCycleStage::Product),
            Path::new("/data/data/template_models/S1_O1_T1_R1/impacts/S1_O1_T1_R1_product_impacts.csv")
        );
        assert_eq!(
            model.scenario_path(LifeCycleStage::Transportation).file_name().unwrap(),
            "S1_O1_T1_R1_transportation_prebuilt_scenarios.csv"
        );
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let root = DataRoot::new("/data");
        assert_eq!(root.resolve("references/x.csv"), Path::new("/data/references/x.csv"));
        assert_eq!(root.resolve("/elsewhere/x.csv"), Path::new("/elsewhere/x.csv"));
    }

    #[test]
    fn test_find_single_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PLACEHOLDER_FILE), "").unwrap();

        let err = find_single_file(dir.path(), "*", "bill of materials").unwrap_err();
        assert_eq!(err.error_code(), "SOURCE_NOT_FOUND");

        fs::write(dir.path().join("a_bom.csv"), "x\n").unwrap();
        let found = find_single_file(dir.path(), "*", "bill of materials").unwrap();
        assert_eq!(found.file_name().unwrap(), "a_bom.csv");

        fs::write(dir.path().join("b_bom.csv"), "x\n").unwrap();
        let err = find_single_file(dir.path(), "*", "bill of materials").unwrap_err();
        assert_eq!(err.error_code(), "AMBIGUOUS_SOURCE");
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_single_file(&dir.path().join("bom"), "*", "bill of materials").unwrap_err();
        assert_eq!(err.error_code(), "SOURCE_NOT_FOUND");
    }

    #[test]
    fn test_discover_models_skips_files_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = DataRoot::new(dir.path());
        let models_dir = root.template_models_dir();
        fs::create_dir_all(models_dir.join("S2_O1")).unwrap();
        fs::create_dir_all(models_dir.join("S1_O1")).unwrap();
        fs::create_dir_all(models_dir.join(".cache")).unwrap();
        fs::write(models_dir.join(PLACEHOLDER_FILE), "").unwrap();

        assert_eq!(root.discover_models().unwrap(), vec!["S1_O1", "S2_O1"]);
    }
}
