use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::pipeline::PipelineReport;
use crate::scaler::ScalingScope;

enum Entry {
    Text(String),
    Num(f64),
}

impl From<&str> for Entry {
    fn from(value: &str) -> Self {
        Entry::Text(value.to_string())
    }
}

impl From<String> for Entry {
    fn from(value: String) -> Self {
        Entry::Text(value)
    }
}

impl From<f64> for Entry {
    fn from(value: f64) -> Self {
        Entry::Num(value)
    }
}

impl From<usize> for Entry {
    fn from(value: usize) -> Self {
        Entry::Num(value as f64)
    }
}

/// Writes the report as pretty JSON through a temp file and a rename.
pub fn write_json(report: &PipelineReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serialize pipeline report")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("failed writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed moving {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Sheets `Metrics`, `Correlation` and `Summary`, one row per record.
pub fn write_workbook(report: &PipelineReport, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Metrics")?;
        write_rows(sheet, &metric_rows(report))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Correlation")?;
        write_rows(sheet, &correlation_rows(report))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows(report))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn metric_rows(report: &PipelineReport) -> Vec<Vec<Entry>> {
    let mut rows = vec![
        [
            "classifier",
            "precision",
            "recall",
            "f1",
            "accuracy",
            "tp",
            "fp",
            "fn",
            "tn",
        ]
        .into_iter()
        .map(Entry::from)
        .collect::<Vec<_>>(),
    ];
    for entry in &report.metrics.entries {
        let m = &entry.metrics;
        rows.push(vec![
            entry.name.clone().into(),
            m.precision.into(),
            m.recall.into(),
            m.f1.into(),
            m.accuracy.into(),
            m.true_positive.into(),
            m.false_positive.into(),
            m.false_negative.into(),
            m.true_negative.into(),
        ]);
    }
    rows
}

fn correlation_rows(report: &PipelineReport) -> Vec<Vec<Entry>> {
    let corr = &report.correlation;
    let mut header = vec![Entry::from("")];
    header.extend(corr.names.iter().map(|n| Entry::from(n.clone())));
    let mut rows = vec![header];
    for (name, values) in corr.names.iter().zip(&corr.values) {
        let mut row = vec![Entry::from(name.clone())];
        row.extend(values.iter().map(|v| Entry::from(*v)));
        rows.push(row);
    }
    rows
}

fn summary_rows(report: &PipelineReport) -> Vec<Vec<Entry>> {
    let scope = match report.config.scaling_scope {
        ScalingScope::Global => "global",
        ScalingScope::TrainOnly => "train_only",
    };
    let mut rows: Vec<Vec<Entry>> = vec![
        vec!["generated_at".into(), report.generated_at.clone().into()],
        vec!["rows".into(), report.rows.into()],
        vec!["masked_cells".into(), report.masked_cells.into()],
        vec!["features".into(), report.feature_count.into()],
        vec!["positives".into(), report.positives.into()],
        vec!["negatives".into(), report.negatives.into()],
        vec!["train_rows".into(), report.train_rows.into()],
        vec!["eval_rows".into(), report.eval_rows.into()],
        vec!["eval_positives".into(), report.eval_positives.into()],
        vec!["train_fraction".into(), report.config.train_fraction.into()],
        vec!["seed".into(), report.config.seed.to_string().into()],
        vec!["scaling_scope".into(), scope.into()],
    ];
    for fill in &report.imputation.fills {
        rows.push(vec![format!("fill:{}", fill.column).into(), fill.value.into()]);
    }
    rows
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Entry>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            match value {
                Entry::Text(s) => worksheet.write_string(r, c, s),
                Entry::Num(v) => worksheet.write_number(r, c, *v),
            }
            .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::default_registry;
    use crate::config::PipelineConfig;
    use crate::pipeline;
    use crate::synthetic::synthetic_matches;

    fn report() -> PipelineReport {
        let data = synthetic_matches(30, 15, 4).unwrap();
        pipeline::run(&PipelineConfig::default(), &data, default_registry()).unwrap()
    }

    #[test]
    fn metric_sheet_has_one_row_per_classifier() {
        let rows = metric_rows(&report());
        assert_eq!(rows.len(), 4);
        assert!(matches!(&rows[1][0], Entry::Text(name) if name == "KNN"));
    }

    #[test]
    fn json_round_trip_on_disk() {
        let report = report();
        let dir = std::env::temp_dir().join(format!("outcome_lab_export_{}", std::process::id()));
        let path = dir.join("report.json");
        write_json(&report, &path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        let back: PipelineReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.metrics.names(), report.metrics.names());
        assert!(!path.with_extension("json.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
