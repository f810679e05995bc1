use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::features::FeatureMatrix;

/// Standard deviations below this are treated as 1 so constant columns stay finite.
pub const STD_EPSILON: f64 = 1e-12;

/// Which rows the scaler learns its statistics from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingScope {
    /// Fit on the whole matrix before splitting. Evaluation rows leak into the statistics.
    #[default]
    Global,
    /// Fit on the training partition only and reuse the statistics for evaluation.
    TrainOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingStats {
    pub names: Vec<String>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl ScalingStats {
    /// Divisor actually applied to column `idx`.
    pub fn scale(&self, idx: usize) -> f64 {
        let std = self.stds[idx];
        if std < STD_EPSILON { 1.0 } else { std }
    }
}

pub fn fit(matrix: &FeatureMatrix) -> Result<ScalingStats> {
    if matrix.n_rows() == 0 {
        return Err(PipelineError::data("cannot fit scaler on an empty matrix"));
    }
    let n = matrix.n_rows() as f64;
    let mut means = vec![0.0; matrix.n_cols()];
    for row in matrix.rows() {
        for (acc, v) in means.iter_mut().zip(row) {
            *acc += v;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut stds = vec![0.0; matrix.n_cols()];
    for row in matrix.rows() {
        for ((acc, v), m) in stds.iter_mut().zip(row).zip(&means) {
            *acc += (v - m).powi(2);
        }
    }
    for s in &mut stds {
        *s = (*s / n).sqrt();
    }

    Ok(ScalingStats {
        names: matrix.names().to_vec(),
        means,
        stds,
    })
}

pub fn transform(matrix: &FeatureMatrix, stats: &ScalingStats) -> Result<FeatureMatrix> {
    if matrix.names() != stats.names.as_slice() {
        return Err(PipelineError::schema(format!(
            "scaler fitted on {} columns, matrix has {} with a different layout",
            stats.names.len(),
            matrix.n_cols()
        )));
    }
    let scales: Vec<f64> = (0..stats.names.len()).map(|j| stats.scale(j)).collect();
    let rows = matrix
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&stats.means)
                .zip(&scales)
                .map(|((v, m), s)| (v - m) / s)
                .collect()
        })
        .collect();
    Ok(matrix.with_rows(rows))
}
