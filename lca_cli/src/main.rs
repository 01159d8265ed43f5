//! # lca - Scenario Explorer Data Pipeline
//!
//! Command line front end over `lca_core`:
//!
//! ```text
//! lca extract      raw extraction -> bom/{model}_bom.csv
//! lca calculate    bom -> impacts/{model}_{stage}_impacts.csv (+ run_manifest.json)
//! lca scenarios    bom -> prebuilt_scenarios/*.csv
//! lca combine      all models -> data/frontend/combined_*.bin
//! lca all          every step above, in order
//! ```
//!
//! Logging goes to stderr through `tracing-subscriber`; `RUST_LOG` overrides
//! the level picked by `-v`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lca_core::combine::{self, CombineOutput};
use lca_core::extract::{self, ExtractOutput};
use lca_core::layout::DEFAULT_CONFIG_PATH;
use lca_core::scenarios::{self, ScenarioOutput};
use lca_core::{load_config, DataRoot, LcaError, Pipeline, PipelineConfig, PipelineReport};

#[derive(Parser, Debug)]
#[command(name = "lca")]
#[command(about = "Building life-cycle impact pipeline for template models", long_about = None)]
#[command(version)]
struct Cli {
    /// Data root containing `references/` and `data/`
    #[arg(long, global = true, env = "LCA_ROOT", default_value = ".")]
    root: PathBuf,

    /// Configuration file (relative paths resolve against the data root)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Process every directory under data/template_models instead of `tme_models`
    #[arg(long, global = true)]
    discover: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Build each model's bill of materials from its raw extraction
    Extract,
    /// Run every life-cycle stage for each model
    Calculate,
    /// Build prebuilt scenarios for each model
    Scenarios,
    /// Combine all models into frontend tables
    Combine,
    /// Extract, calculate, build scenarios, combine
    All,
}

/// Everything a command produced, for `--json` output.
#[derive(Debug, Default, Serialize)]
struct Summary {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extracted: BTreeMap<String, ExtractOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calculated: Option<PipelineReport>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    scenarios: BTreeMap<String, Vec<ScenarioOutput>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    combined: Vec<CombineOutput>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    failures: BTreeMap<String, LcaError>,
}

impl Summary {
    fn failure_count(&self) -> usize {
        self.failures.len() + self.calculated.as_ref().map_or(0, |r| r.failures.len())
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            let failures = summary.failure_count();
            if let Err(e) = print_summary(&summary, cli.json) {
                eprintln!("Error: {:#}", e);
                return ExitCode::FAILURE;
            }
            if failures > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if cli.json {
                if let Some(lca) = e.downcast_ref::<LcaError>() {
                    if let Ok(json) = serde_json::to_string_pretty(lca) {
                        eprintln!("{}", json);
                    }
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Summary> {
    let root = DataRoot::new(&cli.root);
    let config_path = root.resolve(&cli.config);
    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    let models = select_models(&root, &config, cli.discover)?;
    if models.is_empty() {
        bail!("no template models to process");
    }

    let mut summary = Summary::default();
    let command = cli.command;

    if matches!(command, Commands::Extract | Commands::All) {
        for model in &models {
            match extract::extract_model(&root, &config, model) {
                Ok(output) => {
                    summary.extracted.insert(model.clone(), output);
                }
                Err(err) => {
                    tracing::error!(model = %model, error = %err, "extraction failed");
                    summary.failures.insert(format!("extract:{}", model), err);
                }
            }
        }
    }

    if matches!(command, Commands::Calculate | Commands::All) {
        let pipeline = Pipeline::new(root.clone(), config.clone());
        let report = pipeline.run(&models).context("running stage calculators")?;
        summary.calculated = Some(report);
    }

    if matches!(command, Commands::Scenarios | Commands::All) {
        for model in &models {
            match scenarios::build_model_scenarios(&root, &config, model) {
                Ok(outputs) => {
                    summary.scenarios.insert(model.clone(), outputs);
                }
                Err(err) => {
                    tracing::error!(model = %model, error = %err, "scenario build failed");
                    summary.failures.insert(format!("scenarios:{}", model), err);
                }
            }
        }
    }

    if matches!(command, Commands::Combine | Commands::All) {
        summary.combined = combine::combine(&root, &models).context("combining template models")?;
    }

    Ok(summary)
}

fn select_models(root: &DataRoot, config: &PipelineConfig, discover: bool) -> Result<Vec<String>> {
    if discover {
        root.discover_models()
            .with_context(|| format!("listing {}", root.template_models_dir().display()))
    } else {
        Ok(config.tme_models.clone())
    }
}

fn print_summary(summary: &Summary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    for (model, output) in &summary.extracted {
        println!(
            "extract    {:<24} {} rows, {} elements -> {}",
            model,
            output.rows,
            output.elements,
            output.path.display()
        );
    }

    if let Some(report) = &summary.calculated {
        for (model, manifest) in &report.models {
            println!(
                "calculate  {:<24} {} stages, {} unmatched rows (run {})",
                model,
                manifest.artifacts.len(),
                manifest.unmatched_rows(),
                manifest.run_id
            );
            for skipped in &manifest.skipped {
                println!("           {:<24} skipped {}: {}", "", skipped.stage, skipped.reason);
            }
        }
        for (model, err) in &report.failures {
            println!("calculate  {:<24} FAILED [{}] {}", model, err.error_code(), err);
        }
    }

    for (model, outputs) in &summary.scenarios {
        for output in outputs {
            println!("scenario   {:<24} {} -> {}", model, output.scenario, output.path.display());
        }
    }

    for output in &summary.combined {
        println!(
            "combine    {:<24} {} rows from {} files -> {}",
            output.table.file_stem(),
            output.rows,
            output.source_files,
            output.path.display()
        );
    }

    for (step, err) in &summary.failures {
        println!("{:<35} FAILED [{}] {}", step, err.error_code(), err);
    }
    Ok(())
}
