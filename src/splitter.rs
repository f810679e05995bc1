use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::features::{FeatureMatrix, LabelVector};

#[derive(Debug, Clone, PartialEq)]
pub struct SplitData {
    pub train_x: FeatureMatrix,
    pub train_y: LabelVector,
    pub eval_x: FeatureMatrix,
    pub eval_y: LabelVector,
    /// Source row indices, in the order the rows appear in `train_x`.
    pub train_indices: Vec<usize>,
    pub eval_indices: Vec<usize>,
}

impl SplitData {
    pub fn eval_positives(&self) -> usize {
        self.eval_y.iter().filter(|y| **y == 1).count()
    }
}

pub fn validate_fraction(train_fraction: f64) -> Result<()> {
    if !train_fraction.is_finite() || train_fraction <= 0.0 || train_fraction >= 1.0 {
        return Err(PipelineError::config(format!(
            "train fraction must lie strictly between 0 and 1, got {train_fraction}"
        )));
    }
    Ok(())
}

/// Seeded split; identical seed and row count give an identical partition.
pub fn split(
    matrix: &FeatureMatrix,
    labels: &[u8],
    train_fraction: f64,
    seed: u64,
) -> Result<SplitData> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    split_with_rng(matrix, labels, train_fraction, &mut rng)
}

pub fn split_with_rng<R: Rng + ?Sized>(
    matrix: &FeatureMatrix,
    labels: &[u8],
    train_fraction: f64,
    rng: &mut R,
) -> Result<SplitData> {
    validate_fraction(train_fraction)?;
    if matrix.n_rows() != labels.len() {
        return Err(PipelineError::schema(format!(
            "feature matrix has {} rows but label vector has {}",
            matrix.n_rows(),
            labels.len()
        )));
    }

    let n = matrix.n_rows();
    let n_train = ((n as f64) * train_fraction).round() as usize;
    if n_train == 0 || n_train >= n {
        return Err(PipelineError::data(format!(
            "{n} rows cannot be split at fraction {train_fraction} without an empty side"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let eval_indices = order.split_off(n_train);
    let train_indices = order;
    debug!(train = train_indices.len(), eval = eval_indices.len(), "split rows");

    Ok(SplitData {
        train_x: matrix.select_rows(&train_indices),
        train_y: train_indices.iter().map(|&i| labels[i]).collect(),
        eval_x: matrix.select_rows(&eval_indices),
        eval_y: eval_indices.iter().map(|&i| labels[i]).collect(),
        train_indices,
        eval_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n: usize) -> (FeatureMatrix, Vec<u8>) {
        let x = FeatureMatrix::new(
            vec!["idx".to_string()],
            (0..n).map(|i| vec![i as f64]).collect(),
        )
        .unwrap();
        let y = (0..n).map(|i| (i % 2) as u8).collect();
        (x, y)
    }

    #[test]
    fn rows_follow_their_indices() {
        let (x, y) = matrix(20);
        let s = split(&x, &y, 0.7, 42).unwrap();
        for (row, idx) in s.train_x.rows().iter().zip(&s.train_indices) {
            assert_eq!(row[0], *idx as f64);
        }
        for (label, idx) in s.eval_y.iter().zip(&s.eval_indices) {
            assert_eq!(*label, y[*idx]);
        }
    }

    #[test]
    fn caller_supplied_rng_drives_the_shuffle() {
        let (x, y) = matrix(50);
        let stream = |n: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            rng.set_stream(n);
            rng
        };
        let a = split_with_rng(&x, &y, 0.7, &mut stream(5)).unwrap();
        let b = split_with_rng(&x, &y, 0.7, &mut stream(5)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.train_indices.len(), 35);

        let seeded = split(&x, &y, 0.7, 42).unwrap();
        assert_ne!(a.train_indices, seeded.train_indices);
        let stream_zero = split_with_rng(&x, &y, 0.7, &mut stream(0)).unwrap();
        assert_eq!(stream_zero, seeded);
    }

    #[test]
    fn fraction_bounds() {
        let (x, y) = matrix(10);
        for bad in [0.0, 1.0, -0.2, 1.3, f64::NAN] {
            assert!(matches!(
                split(&x, &y, bad, 1).unwrap_err(),
                PipelineError::Config(_)
            ));
        }
    }

    #[test]
    fn too_few_rows_is_data_error() {
        let (x, y) = matrix(1);
        assert!(matches!(
            split(&x, &y, 0.7, 1).unwrap_err(),
            PipelineError::Data(_)
        ));
    }

    #[test]
    fn label_length_mismatch_is_schema_error() {
        let (x, _) = matrix(10);
        assert!(matches!(
            split(&x, &[1, 0], 0.5, 1).unwrap_err(),
            PipelineError::Schema(_)
        ));
    }
}
