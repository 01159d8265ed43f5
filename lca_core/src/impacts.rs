//! # Impact Categories and Life-Cycle Stages
//!
//! The two static lookup tables every stage shares:
//!
//! - [`ImpactCategory`] - the seven environmental indicators, with the long
//!   column name used in impact artifacts and the short code used in the
//!   background datasets (`GWPf_mfg`, `acp_eol`, ...)
//! - [`LifeCycleStage`] - the EN 15978 stage map from short code to display
//!   label and artifact name
//!
//! [`ImpactVector`] holds one value per category. A `None` entry is a null
//! impact (a background join miss) and propagates through every sum and
//! product, the same way a missing value does in a spreadsheet.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::impacts::{ImpactCategory, ImpactVector, LifeCycleStage};
//!
//! let per_kg = ImpactVector::from_fn(|_| Some(1.5));
//! let impacts = per_kg.scale(Some(10.0));
//! assert_eq!(impacts.get(ImpactCategory::GwpFossil), Some(15.0));
//!
//! let stage = LifeCycleStage::from_code("repl").unwrap();
//! assert_eq!(stage.label(), "B2-B5: Replacement");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::Add;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// ============================================================================
// Impact Categories
// ============================================================================

/// Number of impact categories tracked per row
pub const CATEGORY_COUNT: usize = 7;

/// Environmental impact indicators reported for every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImpactCategory {
    /// Global warming potential from fossil sources (kg CO2e)
    GwpFossil,
    /// Global warming potential from biogenic sources (kg CO2e)
    GwpBiogenic,
    /// Global warming potential from land use and land-use change (kg CO2e)
    GwpLuluc,
    /// Acidification potential (kg SO2e)
    Acidification,
    /// Eutrophication potential (kg Ne)
    Eutrophication,
    /// Smog formation potential (kg O3e)
    SmogFormation,
    /// Ozone depletion potential (kg CFC-11e)
    OzoneDepletion,
}

impl ImpactCategory {
    /// All categories in artifact column order
    pub const ALL: [ImpactCategory; CATEGORY_COUNT] = [
        ImpactCategory::GwpFossil,
        ImpactCategory::GwpBiogenic,
        ImpactCategory::GwpLuluc,
        ImpactCategory::Acidification,
        ImpactCategory::Eutrophication,
        ImpactCategory::SmogFormation,
        ImpactCategory::OzoneDepletion,
    ];

    /// Column name in impact artifacts
    pub fn column_name(&self) -> &'static str {
        match self {
            ImpactCategory::GwpFossil => "Global Warming Potential_fossil",
            ImpactCategory::GwpBiogenic => "Global Warming Potential_biogenic",
            ImpactCategory::GwpLuluc => "Global Warming Potential_luluc",
            ImpactCategory::Acidification => "Acidification Potential",
            ImpactCategory::Eutrophication => "Eutrophication Potential",
            ImpactCategory::SmogFormation => "Smog Formation Potential",
            ImpactCategory::OzoneDepletion => "Ozone Depletion Potential",
        }
    }

    /// Short code used by the background datasets
    pub fn short_code(&self) -> &'static str {
        match self {
            ImpactCategory::GwpFossil => "GWPf",
            ImpactCategory::GwpBiogenic => "GWPb",
            ImpactCategory::GwpLuluc => "GWP-LULUC",
            ImpactCategory::Acidification => "acp",
            ImpactCategory::Eutrophication => "eup",
            ImpactCategory::SmogFormation => "smg",
            ImpactCategory::OzoneDepletion => "odp",
        }
    }

    /// Background column for this category with a dataset suffix
    /// (`"mfg"` gives `GWPf_mfg`, an empty suffix gives the bare code).
    pub fn background_column(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            self.short_code().to_string()
        } else {
            format!("{}_{}", self.short_code(), suffix)
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ImpactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

// ============================================================================
// Impact Vector
// ============================================================================

/// One value per impact category; `None` is a null impact.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImpactVector([Option<f64>; CATEGORY_COUNT]);

impl ImpactVector {
    /// All categories null
    pub fn null() -> Self {
        ImpactVector([None; CATEGORY_COUNT])
    }

    /// All categories zero
    pub fn zero() -> Self {
        ImpactVector([Some(0.0); CATEGORY_COUNT])
    }

    /// Build a vector by evaluating `f` for each category
    pub fn from_fn(mut f: impl FnMut(ImpactCategory) -> Option<f64>) -> Self {
        let mut values = [None; CATEGORY_COUNT];
        for category in ImpactCategory::ALL {
            values[category.index()] = f(category);
        }
        ImpactVector(values)
    }

    /// Value for one category
    pub fn get(&self, category: ImpactCategory) -> Option<f64> {
        self.0[category.index()]
    }

    /// Overwrite one category
    pub fn set(&mut self, category: ImpactCategory, value: Option<f64>) {
        self.0[category.index()] = value;
    }

    /// Multiply every category by `factor`; a null factor nulls every entry.
    pub fn scale(&self, factor: Option<f64>) -> Self {
        ImpactVector::from_fn(|category| Some(self.get(category)? * factor?))
    }

    /// True when at least one category is null
    pub fn has_nulls(&self) -> bool {
        self.0.iter().any(Option::is_none)
    }

    /// Iterate `(category, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (ImpactCategory, Option<f64>)> + '_ {
        ImpactCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl Add for ImpactVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ImpactVector::from_fn(|category| Some(self.get(category)? + rhs.get(category)?))
    }
}

impl std::iter::Sum for ImpactVector {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ImpactVector::zero(), |acc, v| acc + v)
    }
}

// ============================================================================
// Life-Cycle Stages
// ============================================================================

/// Life-cycle stages per EN 15978.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifeCycleStage {
    /// A1-A3 raw material supply, transport to factory, manufacture
    Product,
    /// A4 transport to site
    Transportation,
    /// A5 construction wastage
    Construction,
    /// B2-B5 maintenance, repair, replacement, refurbishment
    Replacement,
    /// B6 operational energy use
    Operational,
    /// C2-C4 waste transport, processing and disposal
    EndOfLife,
    /// D benefits and loads beyond the system boundary
    ModuleD,
}

/// Short code to stage, built once.
static STAGE_MAP: Lazy<HashMap<&'static str, LifeCycleStage>> = Lazy::new(|| {
    LifeCycleStage::ALL
        .into_iter()
        .flat_map(|stage| [(stage.code(), stage), (stage.artifact_name(), stage)])
        .collect()
});

impl LifeCycleStage {
    /// All stages in life-cycle order
    pub const ALL: [LifeCycleStage; 7] = [
        LifeCycleStage::Product,
        LifeCycleStage::Transportation,
        LifeCycleStage::Construction,
        LifeCycleStage::Replacement,
        LifeCycleStage::Operational,
        LifeCycleStage::EndOfLife,
        LifeCycleStage::ModuleD,
    ];

    /// Short code (`product`, `trans`, `constr`, `repl`, `op`, `eol`, `modD`)
    pub fn code(&self) -> &'static str {
        match self {
            LifeCycleStage::Product => "product",
            LifeCycleStage::Transportation => "trans",
            LifeCycleStage::Construction => "constr",
            LifeCycleStage::Replacement => "repl",
            LifeCycleStage::Operational => "op",
            LifeCycleStage::EndOfLife => "eol",
            LifeCycleStage::ModuleD => "modD",
        }
    }

    /// Display label written to the `life_cycle_stage` column
    pub fn label(&self) -> &'static str {
        match self {
            LifeCycleStage::Product => "A1-A3: Product",
            LifeCycleStage::Transportation => "A4: Transportation",
            LifeCycleStage::Construction => "A5: Construction",
            LifeCycleStage::Replacement => "B2-B5: Replacement",
            LifeCycleStage::Operational => "B6: Operational Energy",
            LifeCycleStage::EndOfLife => "C2-C4: End-of-Life",
            LifeCycleStage::ModuleD => "D: Beyond System Boundary",
        }
    }

    /// Name used in artifact files (`{model}_{artifact_name}_impacts.csv`)
    pub fn artifact_name(&self) -> &'static str {
        match self {
            LifeCycleStage::Product => "product",
            LifeCycleStage::Transportation => "transportation",
            LifeCycleStage::Construction => "construction",
            LifeCycleStage::Replacement => "replacement",
            LifeCycleStage::Operational => "operational",
            LifeCycleStage::EndOfLife => "end-of-life",
            LifeCycleStage::ModuleD => "module-d",
        }
    }

    /// Look up a stage by short code or artifact name
    pub fn from_code(code: &str) -> Option<LifeCycleStage> {
        STAGE_MAP.get(code).copied()
    }
}

impl fmt::Display for LifeCycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
