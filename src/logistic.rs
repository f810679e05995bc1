use crate::classifier::{Classifier, check_features, check_training};
use crate::error::ClassifierError;
use crate::features::FeatureMatrix;

/// L2-regularised logistic regression trained with full-batch gradient descent.
///
/// The penalty `l2 / 2 * |w|^2` is added to the summed log loss; the bias is not
/// penalised. Training stops after `max_iter` passes or once every
/// gradient component falls below `tolerance`.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub max_iter: usize,
    pub learning_rate: f64,
    pub l2: f64,
    pub tolerance: f64,
    weights: Vec<f64>,
    bias: f64,
    fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            learning_rate: 0.5,
            l2: 1.0,
            tolerance: 1e-6,
            weights: Vec::new(),
            bias: 0.0,
            fitted: false,
        }
    }
}

impl LogisticRegression {
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>, ClassifierError> {
        if !self.fitted {
            return Err(ClassifierError::NotFitted);
        }
        check_features(self.weights.len(), x)?;
        Ok(x.rows().iter().map(|row| sigmoid(self.logit(row))).collect())
    }

    fn logit(&self, row: &[f64]) -> f64 {
        self.bias + row.iter().zip(&self.weights).map(|(v, w)| v * w).sum::<f64>()
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<(), ClassifierError> {
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(ClassifierError::InvalidParameter {
                name: "learning_rate",
                reason: format!("must be positive, got {}", self.learning_rate),
            });
        }
        if self.l2 < 0.0 {
            return Err(ClassifierError::InvalidParameter {
                name: "l2",
                reason: format!("must be non-negative, got {}", self.l2),
            });
        }
        check_training(x, y)?;

        let n = x.n_rows() as f64;
        self.weights = vec![0.0; x.n_cols()];
        self.bias = 0.0;
        let mut grad_w = vec![0.0; x.n_cols()];

        for _ in 0..self.max_iter {
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;
            for (row, label) in x.rows().iter().zip(y) {
                let err = sigmoid(self.logit(row)) - f64::from(*label);
                grad_b += err;
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += err * v;
                }
            }
            let mut largest = (grad_b / n).abs();
            for (g, w) in grad_w.iter_mut().zip(&self.weights) {
                *g = (*g + self.l2 * w) / n;
                largest = largest.max(g.abs());
            }
            for (w, g) in self.weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * g;
            }
            self.bias -= self.learning_rate * grad_b / n;
            if largest < self.tolerance {
                break;
            }
        }
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<u8>, ClassifierError> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect())
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
