//! # Transportation Stage (A4)
//!
//! Freight from factory to site, per leg (freight mode):
//!
//! ```text
//! impact[c] = (weight_kg / 1000) × EF[c] × (distance_mi × 1.60934) × RF
//! RF = 1.5 when distance_mi > 500, else 1.0
//! ```
//!
//! `EF` is the per tonne-km emission factor of the mode's row in the
//! emissions table; distances come from the distance table joined on
//! material name. The A4 stage uses the truck leg only; prebuilt scenarios
//! add rail and sum the legs.

use crate::background::{FactorTable, ScalarTable, MATERIAL_KEY};
use crate::bom::BillOfMaterials;
use crate::config::TransportMode;
use crate::errors::{LcaError, LcaResult};
use crate::impacts::{ImpactVector, LifeCycleStage};
use crate::records::{ImpactRecord, ImpactRecords};
use crate::table::{format_optional_f64, Table};
use crate::units::{Kilograms, Kilometers, Miles, Tonnes};

/// Distances strictly above this get the return-trip factor
pub const RETURN_TRIP_THRESHOLD_MI: f64 = 500.0;

/// Empty backhaul allowance for long hauls
pub const RETURN_TRIP_FACTOR: f64 = 1.5;

/// One freight mode resolved against the background tables.
#[derive(Debug, Clone)]
pub struct TransportLeg {
    /// Short label (`truck`, `rail`) used in provenance column names
    pub label: String,
    pub emission_factors: ImpactVector,
    pub distances: ScalarTable,
}

impl TransportLeg {
    /// Resolve `mode` against the emissions and distance tables.
    ///
    /// The mode's emissions row applies to every BOM row, so its absence is
    /// fatal (`BackgroundKeyNotFound`) rather than a per-row null.
    pub fn from_tables(
        label: &str,
        mode: &TransportMode,
        emissions: &FactorTable,
        distances: &Table,
        distances_name: &str,
    ) -> LcaResult<Self> {
        let emission_factors = *emissions.get(&mode.emission_name).ok_or_else(|| {
            LcaError::BackgroundKeyNotFound {
                dataset: emissions.dataset.clone(),
                key: mode.emission_name.clone(),
            }
        })?;
        let distances = ScalarTable::from_table(distances, distances_name, MATERIAL_KEY, &mode.distance_column)?;
        Ok(TransportLeg {
            label: label.to_string(),
            emission_factors,
            distances,
        })
    }
}

/// 1.5 above 500 mi, 1.0 otherwise (500 mi exactly is not a long haul)
pub fn return_factor(distance: Miles) -> f64 {
    if distance.0 > RETURN_TRIP_THRESHOLD_MI {
        RETURN_TRIP_FACTOR
    } else {
        1.0
    }
}

/// Impacts of moving `weight_kg` over `distance_mi` with `emission_factors`.
pub fn leg_impacts(weight_kg: Option<f64>, emission_factors: &ImpactVector, distance_mi: Option<f64>) -> ImpactVector {
    let (Some(weight_kg), Some(distance_mi)) = (weight_kg, distance_mi) else {
        return ImpactVector::null();
    };
    let tonnes: Tonnes = Kilograms(weight_kg).into();
    let km: Kilometers = Miles(distance_mi).into();
    let rf = return_factor(Miles(distance_mi));

    ImpactVector::from_fn(|category| {
        let base = tonnes.0 * emission_factors.get(category)? * km.0;
        Some(base * rf)
    })
}

/// Sum of all legs per BOM row.
///
/// Provenance: an optional `scenario` column, then the distance of each leg
/// (`distance_mi` for a single leg, `distance_mi_{label}` otherwise).
pub fn compute(bom: &BillOfMaterials, legs: &[TransportLeg], scenario: Option<&str>) -> ImpactRecords {
    let mut provenance_columns = Vec::new();
    if scenario.is_some() {
        provenance_columns.push("scenario".to_string());
    }
    for leg in legs {
        provenance_columns.push(if legs.len() == 1 {
            "distance_mi".to_string()
        } else {
            format!("distance_mi_{}", leg.label)
        });
    }

    let mut records = ImpactRecords::new(LifeCycleStage::Transportation, bom.columns.clone(), provenance_columns);
    for row in &bom.rows {
        let mut provenance = Vec::with_capacity(legs.len() + 1);
        if let Some(name) = scenario {
            provenance.push(name.to_string());
        }

        let mut impacts = ImpactVector::zero();
        for leg in legs {
            let distance = leg.distances.get(&row.material);
            provenance.push(format_optional_f64(distance));
            impacts = impacts + leg_impacts(row.weight_kg, &leg.emission_factors, distance);
        }
        if legs.is_empty() {
            impacts = ImpactVector::null();
        }

        records.push(ImpactRecord {
            element_index: row.element_index.clone(),
            fields: row.fields.clone(),
            provenance,
            impacts,
        });
    }
    records
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::background::PRODUCT_SYSTEM_KEY;
    use crate::config::TransportSettings;
    use crate::impacts::ImpactCategory;
    use crate::units::MI_TO_KM;

    pub(crate) const EMISSIONS_CSV: &str = "\
Product system name,GWPf,GWPb,GWP-LULUC,acp,eup,smg,odp
\"Transport, combination truck, average fuel mix\",0.1,0.0,0.001,0.002,0.0001,0.03,1e-9
\"Transport, train, diesel powered\",0.02,0.0,0.0002,0.0004,0.00002,0.006,2e-10
";

    pub(crate) const DISTANCES_CSV: &str = "\
Name_Tally Material,R dist CA_truck,R dist CA dist_rail
Concrete,100,0
Steel,600,800
Timber,500,
";

    pub(crate) fn legs(modes: &[(&str, TransportMode)]) -> Vec<TransportLeg> {
        let emissions = FactorTable::from_table(
            &Table::from_reader(EMISSIONS_CSV.as_bytes(), "a4_emissions").unwrap(),
            "a4_emissions",
            PRODUCT_SYSTEM_KEY,
            "",
        )
        .unwrap();
        let distances = Table::from_reader(DISTANCES_CSV.as_bytes(), "a4_distances").unwrap();
        modes
            .iter()
            .map(|(label, mode)| TransportLeg::from_tables(label, mode, &emissions, &distances, "a4_distances").unwrap())
            .collect()
    }

    fn bom(csv: &str) -> BillOfMaterials {
        BillOfMaterials::from_table(&Table::from_reader(csv.as_bytes(), "bom").unwrap()).unwrap()
    }

    #[test]
    fn test_return_factor_boundary() {
        assert_eq!(return_factor(Miles(499.9)), 1.0);
        assert_eq!(return_factor(Miles(500.0)), 1.0);
        assert_eq!(return_factor(Miles(500.1)), 1.5);
    }

    #[test]
    fn test_short_haul_formula() {
        let ef = ImpactVector::from_fn(|_| Some(0.1));
        let impacts = leg_impacts(Some(2000.0), &ef, Some(100.0));
        let expected = (2000.0 / 1000.0) * 0.1 * (100.0 * MI_TO_KM);
        assert_eq!(impacts.get(ImpactCategory::GwpFossil), Some(expected));
    }

    #[test]
    fn test_long_haul_is_exactly_one_and_a_half() {
        let ef = ImpactVector::from_fn(|_| Some(0.1));
        let long = leg_impacts(Some(1000.0), &ef, Some(600.0));
        let base = (1000.0 / 1000.0) * 0.1 * (600.0 * MI_TO_KM);
        assert_eq!(long.get(ImpactCategory::GwpFossil), Some(base * 1.5));
    }

    #[test]
    fn test_boundary_at_500_not_multiplied() {
        let ef = ImpactVector::from_fn(|_| Some(0.1));
        let at_boundary = leg_impacts(Some(1000.0), &ef, Some(500.0));
        let base = (1000.0 / 1000.0) * 0.1 * (500.0 * MI_TO_KM);
        assert_eq!(at_boundary.get(ImpactCategory::GwpFossil), Some(base));
    }

    #[test]
    fn test_truck_stage() {
        let truck = TransportSettings::default().truck;
        let legs = legs(&[("truck", truck)]);
        let bom = bom("element_index,Tally material,Weight (kg)\nE0,Concrete,1000\nE1,Steel,1000\nE2,Unknown,1000\n");

        let records = compute(&bom, &legs, None);
        assert_eq!(records.provenance_columns, vec!["distance_mi"]);
        assert_eq!(records.records[0].provenance, vec!["100.0"]);

        let short = (1000.0 / 1000.0) * 0.1 * (100.0 * MI_TO_KM);
        let long = (1000.0 / 1000.0) * 0.1 * (600.0 * MI_TO_KM) * 1.5;
        assert_eq!(records.records[0].impacts.get(ImpactCategory::GwpFossil), Some(0.0 + short));
        assert_eq!(records.records[1].impacts.get(ImpactCategory::GwpFossil), Some(0.0 + long));
        assert_eq!(records.records[2].impacts, ImpactVector::null());
        assert_eq!(records.records[2].provenance, vec![""]);
    }

    #[test]
    fn test_missing_mode_is_fatal() {
        let emissions = FactorTable::from_table(
            &Table::from_reader(EMISSIONS_CSV.as_bytes(), "a4_emissions").unwrap(),
            "a4_emissions",
            PRODUCT_SYSTEM_KEY,
            "",
        )
        .unwrap();
        let distances = Table::from_reader(DISTANCES_CSV.as_bytes(), "a4_distances").unwrap();
        let mode = TransportMode {
            emission_name: "Transport, barge".to_string(),
            distance_column: "R dist CA_truck".to_string(),
        };
        let err = TransportLeg::from_tables("barge", &mode, &emissions, &distances, "a4_distances").unwrap_err();
        assert_eq!(err.error_code(), "BACKGROUND_KEY_NOT_FOUND");
    }
}
