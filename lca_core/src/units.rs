//! # Unit Types
//!
//! Type-safe wrappers for the handful of units the impact calculators mix.
//! Distances in the background data are tabulated in miles while transport
//! emission factors are per tonne-kilometre.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::units::{Kilograms, Kilometers, Miles, Tonnes};
//!
//! let distance: Kilometers = Miles(100.0).into();
//! assert!((distance.0 - 160.934).abs() < 1e-9);
//!
//! let mass: Tonnes = Kilograms(2500.0).into();
//! assert_eq!(mass.0, 2.5);
//! ```

use serde::{Deserialize, Serialize};

/// Statute miles to kilometres
pub const MI_TO_KM: f64 = 1.60934;

/// Kilograms per metric tonne
pub const KG_PER_TONNE: f64 = 1000.0;

// ============================================================================
// Distance Units
// ============================================================================

/// Distance in statute miles
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Miles(pub f64);

/// Distance in kilometres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilometers(pub f64);

impl From<Miles> for Kilometers {
    fn from(mi: Miles) -> Self {
        Kilometers(mi.0 * MI_TO_KM)
    }
}

// ============================================================================
// Mass Units
// ============================================================================

/// Mass in kilograms
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kilograms(pub f64);

/// Mass in metric tonnes
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tonnes(pub f64);

impl From<Kilograms> for Tonnes {
    fn from(kg: Kilograms) -> Self {
        Tonnes(kg.0 / KG_PER_TONNE)
    }
}
