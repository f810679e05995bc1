use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::encoder::IndicatorTable;
use crate::error::{PipelineError, Result};

/// Numeric columns pulled out of an imputed dataset, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTable {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl NumericTable {
    pub fn from_dataset<S: AsRef<str>>(dataset: &Dataset, columns: &[S]) -> Result<Self> {
        let mut rows = vec![Vec::with_capacity(columns.len()); dataset.len()];
        for name in columns {
            let name = name.as_ref();
            for (row_idx, value) in dataset.numeric_column(name)?.into_iter().enumerate() {
                let Some(v) = value else {
                    return Err(PipelineError::data(format!(
                        "column `{name}` row {row_idx} is still missing after imputation"
                    )));
                };
                rows[row_idx].push(v);
            }
        }
        Ok(Self {
            names: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != names.len()) {
            return Err(PipelineError::schema(format!(
                "feature row {idx} has {} values, expected {}",
                row.len(),
                names.len()
            )));
        }
        Ok(Self { names, rows })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[idx]).collect()
    }

    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    pub(crate) fn with_rows(&self, rows: Vec<Vec<f64>>) -> Self {
        Self {
            names: self.names.clone(),
            rows,
        }
    }
}

/// Binary outcome per row: `1` when the home side scored.
pub type LabelVector = Vec<u8>;

/// Joins numeric and indicator columns and derives the label from `target`.
///
/// The label comes from the unscaled target value and the target column itself
/// is left out of the features, so the classifiers never see the answer.
pub fn assemble(
    numeric: &NumericTable,
    indicators: &IndicatorTable,
    target: &str,
) -> Result<(FeatureMatrix, LabelVector)> {
    if numeric.len() != indicators.len() {
        return Err(PipelineError::schema(format!(
            "numeric table has {} rows but indicator table has {}",
            numeric.len(),
            indicators.len()
        )));
    }
    let target_idx = numeric
        .names
        .iter()
        .position(|n| n == target)
        .ok_or_else(|| {
            PipelineError::schema(format!("target column `{target}` is not a numeric column"))
        })?;

    let names = numeric
        .names
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != target_idx)
        .map(|(_, n)| n.clone())
        .chain(indicators.names.iter().cloned())
        .collect::<Vec<_>>();

    let mut labels = Vec::with_capacity(numeric.len());
    let mut rows = Vec::with_capacity(numeric.len());
    for (num_row, ind_row) in numeric.rows.iter().zip(&indicators.rows) {
        labels.push(u8::from(num_row[target_idx] > 0.0));
        let mut row = Vec::with_capacity(names.len());
        row.extend(
            num_row
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != target_idx)
                .map(|(_, v)| *v),
        );
        row.extend_from_slice(ind_row);
        rows.push(row);
    }

    Ok((FeatureMatrix::new(names, rows)?, labels))
}
