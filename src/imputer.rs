use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Cell, Dataset};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    #[default]
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFill {
    pub column: String,
    pub value: f64,
    pub observed: usize,
}

/// Fill values per numeric column, fixed at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationStats {
    pub strategy: ImputeStrategy,
    pub fills: Vec<ColumnFill>,
}

impl ImputationStats {
    pub fn fill_for(&self, column: &str) -> Option<f64> {
        self.fills
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.value)
    }
}

pub fn fit<S: AsRef<str>>(
    dataset: &Dataset,
    columns: &[S],
    strategy: ImputeStrategy,
) -> Result<ImputationStats> {
    let mut fills = Vec::with_capacity(columns.len());
    for name in columns {
        let name = name.as_ref();
        let values = dataset.numeric_column(name)?;
        let present: Vec<f64> = values.into_iter().flatten().collect();
        if present.is_empty() {
            return Err(PipelineError::data(format!(
                "column `{name}` has no observed values to impute from"
            )));
        }
        let value = match strategy {
            ImputeStrategy::Mean => present.iter().sum::<f64>() / present.len() as f64,
        };
        debug!(column = name, fill = value, observed = present.len(), "imputation fit");
        fills.push(ColumnFill {
            column: name.to_string(),
            value,
            observed: present.len(),
        });
    }
    Ok(ImputationStats { strategy, fills })
}

/// Returns a copy of `dataset` with gaps in the fitted columns filled.
pub fn transform(dataset: &Dataset, stats: &ImputationStats) -> Result<Dataset> {
    let mut targets = Vec::with_capacity(stats.fills.len());
    for fill in &stats.fills {
        let idx = dataset.column_index(&fill.column).ok_or_else(|| {
            PipelineError::schema(format!(
                "fitted column `{}` is absent from the dataset",
                fill.column
            ))
        })?;
        targets.push((idx, fill));
    }

    let mut rows = dataset.rows().to_vec();
    for (row_idx, row) in rows.iter_mut().enumerate() {
        for (idx, fill) in &targets {
            match &row[*idx] {
                Cell::Missing => row[*idx] = Cell::Num(fill.value),
                Cell::Num(_) => {}
                Cell::Text(s) => {
                    return Err(PipelineError::data(format!(
                        "column `{}` row {row_idx}: expected a number, got `{s}`",
                        fill.column
                    )));
                }
            }
        }
    }
    Ok(dataset.with_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores() -> Dataset {
        Dataset::new(
            vec!["home_score".to_string(), "away_score".to_string()],
            vec![
                vec![Cell::Num(2.0), Cell::Num(0.0)],
                vec![Cell::Missing, Cell::Num(1.0)],
                vec![Cell::Num(4.0), Cell::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn mean_ignores_gaps() {
        let stats = fit(&scores(), &["home_score", "away_score"], ImputeStrategy::Mean).unwrap();
        assert_eq!(stats.fill_for("home_score"), Some(3.0));
        assert_eq!(stats.fill_for("away_score"), Some(0.5));
    }

    #[test]
    fn transform_fills_and_keeps_input() {
        let data = scores();
        let stats = fit(&data, &["home_score", "away_score"], ImputeStrategy::Mean).unwrap();
        let out = transform(&data, &stats).unwrap();
        assert_eq!(out.len(), data.len());
        assert_eq!(out.rows()[1][0], Cell::Num(3.0));
        assert_eq!(out.rows()[2][1], Cell::Num(0.5));
        assert!(data.rows()[1][0].is_missing());
    }

    #[test]
    fn all_missing_column_is_a_data_error() {
        let data = Dataset::new(
            vec!["home_score".to_string()],
            vec![vec![Cell::Missing], vec![Cell::Missing]],
        )
        .unwrap();
        let err = fit(&data, &["home_score"], ImputeStrategy::Mean).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn transform_on_other_schema_fails() {
        let stats = fit(&scores(), &["home_score"], ImputeStrategy::Mean).unwrap();
        let other = scores().drop_column("home_score");
        assert!(matches!(
            transform(&other, &stats).unwrap_err(),
            PipelineError::Schema(_)
        ));
    }
}
