//! End-to-end runs over a synthetic data root.

use std::path::Path;

use lca_core::combine::{read_combined, CombinedTable};
use lca_core::extract::extract_model;
use lca_core::file_io::{LockInfo, ModelLock, LOCK_FILE_NAME};
use lca_core::scenarios::{build_model_scenarios, REGIONAL_DISTANCES};
use lca_core::stages::StageCalculator;
use lca_core::{
    DataRoot, ImpactCategory, ImpactRecords, LcaError, LifeCycleStage, Pipeline, PipelineConfig, RunManifest,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const BOM: &str = "\
element_index,Category,Tally material,Weight (kg),Assembly,Building Material_name
Element_0,Structure,Concrete,10,Foundation,Cast-in-place concrete
Element_1,Structure,Concrete,20,Frame,Cast-in-place concrete
";

const RAW: &str = "\
Revit category,Category,Tally material,Weight (kg),Assembly,Building Material_name
Walls,Structure,Concrete,10,Foundation,Cast-in-place concrete
Walls,Structure,Concrete,20,Frame,Cast-in-place concrete
";

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn factor_table(suffix: &str, value: &str) -> String {
    let header: Vec<String> = ImpactCategory::ALL
        .iter()
        .map(|c| c.background_column(suffix))
        .collect();
    let values = vec![value; ImpactCategory::ALL.len()];
    format!("Name_Tally Material,{}\nConcrete,{}\n", header.join(","), values.join(","))
}

/// Data root with the six background tables and one model `S1`.
fn data_root() -> (TempDir, DataRoot) {
    let dir = tempfile::tempdir().unwrap();
    let root = DataRoot::new(dir.path());
    let bg = dir.path().join("references/background_data");

    write(&bg.join("a1-a3.csv"), &factor_table("mfg", "1.5"));
    write(&bg.join("c2-c4.csv"), &factor_table("eol", "0.5"));
    write(
        &bg.join("a4_emissions.csv"),
        "Product system name,GWPf,GWPb,GWP-LULUC,acp,eup,smg,odp\n\
         \"Transport, combination truck, average fuel mix\",0.1,0,0,0.01,0.001,0.02,0\n\
         \"Transport, train, diesel powered\",0.02,0,0,0.002,0.0002,0.004,0\n",
    );
    write(
        &bg.join("a4_distances.csv"),
        "Name_Tally Material,R dist CA_truck,R dist CA dist_rail\nConcrete,100,700\n",
    );
    write(
        &bg.join("a5_wastage.csv"),
        "Building Material_name,enhanced wastage\nCast-in-place concrete,0.1\n",
    );
    write(&bg.join("service_life.csv"), "Assembly,service_lives\nFoundation,60\nFrame,20\n");

    write(&root.model("S1").bom_dir().join("S1_bom.csv"), BOM);
    (dir, root)
}

fn config() -> PipelineConfig {
    PipelineConfig::new(vec!["S1".to_string()], vec![])
}

fn gwp(records: &ImpactRecords, element: &str) -> Option<f64> {
    records.get(element)?.impacts.get(ImpactCategory::GwpFossil)
}

#[test]
fn test_full_run_writes_every_stage() {
    let (_dir, root) = data_root();
    let pipeline = Pipeline::new(root.clone(), config()).with_operator("tester");
    let report = pipeline.run(&["S1".to_string()]).unwrap();

    assert!(report.is_success(), "failures: {:?}", report.failures);
    let manifest = &report.models["S1"];
    assert_eq!(manifest.artifacts.len(), 6);
    assert_eq!(manifest.unmatched_rows(), 0);
    assert_eq!(manifest.operator, "tester");

    let model = root.model("S1");
    for stage in [
        LifeCycleStage::Product,
        LifeCycleStage::Transportation,
        LifeCycleStage::Construction,
        LifeCycleStage::Replacement,
        LifeCycleStage::Operational,
        LifeCycleStage::EndOfLife,
    ] {
        assert_eq!(manifest.artifact(stage), Some(model.impacts_path(stage).as_path()));
        assert!(model.impacts_path(stage).is_file(), "{} missing", stage);
    }
    assert!(manifest.artifact(LifeCycleStage::ModuleD).is_none());

    let on_disk = RunManifest::read(&model.manifest_path()).unwrap();
    assert_eq!(&on_disk, manifest);
    assert!(ModelLock::check(&model.dir).is_none());
}

#[test]
fn test_lock_left_by_killed_run_does_not_block_next_run() {
    let (_dir, root) = data_root();
    let model = root.model("S1");
    let mut leftover = LockInfo::new("crashed-run");
    leftover.machine = "unknown".to_string();
    leftover.pid = u32::MAX;
    write(
        &model.dir.join(LOCK_FILE_NAME),
        &serde_json::to_string_pretty(&leftover).unwrap(),
    );

    let manifest = Pipeline::new(root.clone(), config()).run_model("S1").unwrap();
    assert_eq!(manifest.artifacts.len(), 6);
    assert!(!model.dir.join(LOCK_FILE_NAME).exists());
}

#[test]
fn test_product_is_factor_times_weight() {
    let (_dir, root) = data_root();
    Pipeline::new(root.clone(), config()).run_model("S1").unwrap();

    let path = root.model("S1").impacts_path(LifeCycleStage::Product);
    let product = ImpactRecords::read(&path, LifeCycleStage::Product).unwrap();
    let values: Vec<Option<f64>> = product
        .records
        .iter()
        .map(|r| r.impacts.get(ImpactCategory::GwpFossil))
        .collect();
    assert_eq!(values, vec![Some(15.0), Some(30.0)]);
    assert_eq!(product.bom_columns[1], "Tally material");
}

#[test]
fn test_replacement_combines_upstream_artifacts() {
    let (_dir, root) = data_root();
    Pipeline::new(root.clone(), config()).run_model("S1").unwrap();
    let model = root.model("S1");
    let read = |stage| ImpactRecords::read(&model.impacts_path(stage), stage).unwrap();

    let product = read(LifeCycleStage::Product);
    let transport = read(LifeCycleStage::Transportation);
    let construction = read(LifeCycleStage::Construction);
    let end_of_life = read(LifeCycleStage::EndOfLife);
    let replacement = read(LifeCycleStage::Replacement);

    // A5 = (A1-A3 + A4 + C2-C4) × 0.1
    let upstream_a5 = gwp(&product, "Element_1").unwrap()
        + gwp(&transport, "Element_1").unwrap()
        + gwp(&end_of_life, "Element_1").unwrap();
    assert!((gwp(&construction, "Element_1").unwrap() - upstream_a5 * 0.1).abs() < 1e-9);

    // Foundation lasts the 60-year study period, Frame (20 years) is replaced 3 times
    assert_eq!(gwp(&replacement, "Element_0"), Some(0.0));
    let upstream_b = upstream_a5 + gwp(&construction, "Element_1").unwrap();
    assert!((gwp(&replacement, "Element_1").unwrap() - upstream_b * 3.0).abs() < 1e-9);

    let row = replacement.get("Element_1").unwrap();
    assert_eq!(row.provenance, vec!["20.0", "3.0"]);
}

#[test]
fn test_rerun_is_byte_identical() {
    let (_dir, root) = data_root();
    let pipeline = Pipeline::new(root.clone(), config());
    let model = root.model("S1");

    pipeline.run_model("S1").unwrap();
    let first: Vec<Vec<u8>> = LifeCycleStage::ALL[..6]
        .iter()
        .map(|s| std::fs::read(model.impacts_path(*s)).unwrap())
        .collect();

    pipeline.run_model("S1").unwrap();
    let second: Vec<Vec<u8>> = LifeCycleStage::ALL[..6]
        .iter()
        .map(|s| std::fs::read(model.impacts_path(*s)).unwrap())
        .collect();
    assert!(first == second);
}

#[test]
fn test_construction_without_upstream_fails() {
    let (_dir, root) = data_root();
    let config = config();
    let model = root.model("S1");
    let bom = lca_core::stages::load_bill_of_materials(&model.bom_dir()).unwrap();

    let calculator = StageCalculator::for_stage(LifeCycleStage::Construction, &config);
    let err = calculator.run(&root, &model, &bom).unwrap_err();
    assert_eq!(err.error_code(), "MISSING_UPSTREAM");
    assert!(!model.impacts_path(LifeCycleStage::Construction).exists());
}

#[test]
fn test_module_d_is_reported_as_skipped() {
    let (_dir, root) = data_root();
    let mut config = config();
    config.include_module_d = true;

    let manifest = Pipeline::new(root, config).run_model("S1").unwrap();
    assert_eq!(manifest.artifacts.len(), 6);
    assert_eq!(manifest.skipped.len(), 1);
    assert_eq!(manifest.skipped[0].stage, LifeCycleStage::ModuleD);
}

#[test]
fn test_one_failing_model_does_not_stop_others() {
    let (_dir, root) = data_root();
    std::fs::create_dir_all(root.model("S2").bom_dir()).unwrap();
    let models = vec!["S1".to_string(), "S2".to_string()];

    let report = Pipeline::new(root, config()).run(&models).unwrap();
    assert!(report.models.contains_key("S1"));
    assert!(matches!(report.failures["S2"], LcaError::SourceNotFound { .. }));
}

#[test]
fn test_extract_scenarios_combine() {
    let (_dir, root) = data_root();
    let s2 = root.model("S2");
    write(&s2.raw_dir().join("export.csv"), RAW);

    let models = vec!["S1".to_string(), "S2".to_string()];
    let config = PipelineConfig::new(models.clone(), vec!["Revit category".to_string()]);

    let extracted = extract_model(&root, &config, "S2").unwrap();
    assert_eq!(extracted.path, s2.bom_path());
    assert_eq!(extracted.elements, 1);

    let report = Pipeline::new(root.clone(), config.clone()).run(&models).unwrap();
    assert!(report.is_success(), "failures: {:?}", report.failures);

    for model in &models {
        let outputs = build_model_scenarios(&root, &config, model).unwrap();
        assert_eq!(outputs[0].scenario, REGIONAL_DISTANCES);
        assert_eq!(outputs[0].unmatched_rows, 0);
    }

    let outputs = lca_core::combine::combine(&root, &models).unwrap();
    assert_eq!(outputs.len(), 3);

    let impacts = read_combined(&CombinedTable::Impacts.path(&root)).unwrap();
    let model_col = impacts.column_index("template_model").unwrap();
    let s2_rows = impacts.rows.iter().filter(|r| r[model_col] == "S2").count();
    // product, transport, eol: 2 rows; construction, replacement: 1 element; operational: 1
    assert_eq!(s2_rows, 2 + 2 + 2 + 1 + 1 + 1);

    let scenarios = read_combined(&CombinedTable::PrebuiltScenarios.path(&root)).unwrap();
    assert_eq!(scenarios.len(), 4);
    assert!(scenarios.column_index("scenario").is_some());
}
