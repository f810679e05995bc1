use rayon::prelude::*;

use crate::classifier::{Classifier, check_features, check_training};
use crate::error::ClassifierError;
use crate::features::FeatureMatrix;

const DEFAULT_K: usize = 5;

/// k-nearest-neighbours with Euclidean distance and a majority vote.
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    pub k: usize,
    train_x: Vec<Vec<f64>>,
    train_y: Vec<u8>,
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::with_k(DEFAULT_K)
    }
}

impl KnnClassifier {
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            train_x: Vec::new(),
            train_y: Vec::new(),
        }
    }

    fn vote(&self, row: &[f64]) -> u8 {
        let mut dists: Vec<(f64, u8)> = self
            .train_x
            .iter()
            .zip(&self.train_y)
            .map(|(t, y)| (squared_distance(row, t), *y))
            .collect();
        let k = self.k.min(dists.len());
        if k < dists.len() {
            dists.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
            dists.truncate(k);
        }
        let positives = dists.iter().filter(|(_, y)| *y == 1).count();
        let negatives = k - positives;
        if positives != negatives {
            return u8::from(positives > negatives);
        }
        // Tie: fall back to the single nearest neighbour.
        dists
            .iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, y)| *y)
            .unwrap_or(0)
    }
}

impl Classifier for KnnClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<(), ClassifierError> {
        if self.k == 0 {
            return Err(ClassifierError::InvalidParameter {
                name: "k",
                reason: "must be at least 1".to_string(),
            });
        }
        check_training(x, y)?;
        self.train_x = x.rows().to_vec();
        self.train_y = y.to_vec();
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<u8>, ClassifierError> {
        let Some(first) = self.train_x.first() else {
            return Err(ClassifierError::NotFitted);
        };
        check_features(first.len(), x)?;
        Ok(x.rows().par_iter().map(|row| self.vote(row)).collect())
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
