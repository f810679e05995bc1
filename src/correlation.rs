use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::Result;

/// Symmetric Pearson matrix; `values[i][j]` pairs `names[i]` with `names[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
    /// Rows with a value in every selected column.
    pub samples: usize,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }
}

/// Pearson coefficients over the rows where every selected column has a number.
///
/// A column with zero variance has no defined coefficient; it is reported as 0
/// against every other column and 1 on the diagonal.
pub fn correlation_matrix<S: AsRef<str>>(
    dataset: &Dataset,
    columns: &[S],
) -> Result<CorrelationMatrix> {
    dataset.require_columns(columns)?;
    let raw = columns
        .iter()
        .map(|c| dataset.numeric_column(c.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let complete: Vec<usize> = (0..dataset.len())
        .filter(|&row| raw.iter().all(|col| col[row].is_some()))
        .collect();
    let series: Vec<Vec<f64>> = raw
        .iter()
        .map(|col| complete.iter().filter_map(|&row| col[row]).collect())
        .collect();

    let k = series.len();
    let mut values = vec![vec![0.0; k]; k];
    for i in 0..k {
        values[i][i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        names: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        values,
        samples: complete.len(),
    })
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len();
    if n < 2 {
        return 0.0;
    }
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}
