use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use outcome_lab::classifier::default_registry;
use outcome_lab::config::{self, PipelineConfig};
use outcome_lab::dataset::{self, Dataset};
use outcome_lab::pipeline::{self, PipelineReport};
use outcome_lab::report_export;
use outcome_lab::synthetic;

const DEFAULT_INPUT: &str = "all_matches.csv";

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outcome_lab=info".into()),
        )
        .init();

    let config = load_config()?;
    let data = load_input(&config)?;
    let report = pipeline::run(&config, &data, default_registry()).context("pipeline run failed")?;
    print_report(&report);

    if let Some(path) = parse_path_arg("--out-json")
        .or_else(|| std::env::var("OUTCOME_OUT_JSON").ok().map(PathBuf::from))
    {
        report_export::write_json(&report, &path)?;
        info!(path = %path.display(), "wrote json report");
    }
    if let Some(path) = parse_path_arg("--out-xlsx")
        .or_else(|| std::env::var("OUTCOME_OUT_XLSX").ok().map(PathBuf::from))
    {
        report_export::write_workbook(&report, &path)?;
        info!(path = %path.display(), "wrote workbook");
    }
    Ok(())
}

/// Defaults, then the JSON file, then `OUTCOME_*` variables, then flags.
fn load_config() -> Result<PipelineConfig> {
    let mut config = match parse_path_arg("--config")
        .or_else(|| std::env::var("OUTCOME_CONFIG").ok().map(PathBuf::from))
    {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("failed loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.apply_env()?;

    if let Some(v) = parse_f64_arg("--train-fraction") {
        config.train_fraction = v;
    }
    if let Some(v) = parse_f64_arg("--mask-fraction") {
        config.mask_fraction = v;
    }
    if let Some(v) = parse_u64_arg("--seed") {
        config.seed = v;
    }
    if let Some(raw) = parse_str_arg("--scaling") {
        config.scaling_scope = config::parse_scope(&raw)?;
    }
    if has_flag("--parallel") {
        config.parallel = true;
    }
    config.validate()?;
    Ok(config)
}

fn load_input(config: &PipelineConfig) -> Result<Dataset> {
    if let Some(rows) = parse_u64_arg("--synthetic") {
        let rows = usize::try_from(rows).map_err(|_| anyhow!("--synthetic is too large"))?;
        let generated = synthetic::synthetic_matches(rows, rows / 2 + rows / 10, config.seed)?;
        return Ok(match &config.date_column {
            Some(date) => generated.drop_column(date),
            None => generated,
        });
    }
    let path = parse_path_arg("--input")
        .or_else(|| std::env::var("OUTCOME_INPUT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
    dataset::load_dataset(&path, config.date_column.as_deref())
        .with_context(|| format!("failed loading {}", path.display()))
}

fn print_report(report: &PipelineReport) {
    println!(
        "rows={} features={} positives={} negatives={} masked_cells={}",
        report.rows, report.feature_count, report.positives, report.negatives, report.masked_cells
    );
    println!(
        "train={} eval={} eval_positives={}",
        report.train_rows, report.eval_rows, report.eval_positives
    );
    for entry in &report.metrics.entries {
        println!();
        println!("{}:", entry.name);
        println!("{}", entry.report);
    }
    println!();
    println!("{:<22} {:>9} {:>9} {:>9}", "classifier", "precision", "recall", "f1");
    for entry in &report.metrics.entries {
        let m = &entry.metrics;
        println!(
            "{:<22} {:>9.3} {:>9.3} {:>9.3}",
            entry.name, m.precision, m.recall, m.f1
        );
    }
    if let Some(best) = report.metrics.best_by_f1() {
        println!("best by f1: {} ({:.3})", best.name, best.metrics.f1);
    }

    let corr = &report.correlation;
    println!();
    println!("correlation over {} rows:", corr.samples);
    for (name, row) in corr.names.iter().zip(&corr.values) {
        let cells = row
            .iter()
            .map(|v| format!("{v:>7.3}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{name:<12} {cells}");
    }
}

fn parse_str_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_str_arg(name).map(PathBuf::from)
}

fn parse_f64_arg(name: &str) -> Option<f64> {
    parse_str_arg(name).and_then(|raw| raw.parse::<f64>().ok())
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    parse_str_arg(name).and_then(|raw| raw.parse::<u64>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
