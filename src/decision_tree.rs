use rayon::prelude::*;

use crate::classifier::{Classifier, check_features, check_training};
use crate::error::ClassifierError;
use crate::features::FeatureMatrix;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        label: u8,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// CART tree on Gini impurity. Rows with `x[feature] <= threshold` go left.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    root: Option<Node>,
    n_features: usize,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            root: None,
            n_features: 0,
        }
    }
}

impl DecisionTreeClassifier {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map(walk).unwrap_or(0)
    }

    fn build(&self, rows: &[Vec<f64>], y: &[u8], indices: Vec<usize>, depth: usize) -> Node {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| y[i] == 1).count();
        let leaf = Node::Leaf {
            label: u8::from(positives * 2 > n),
        };

        let depth_exhausted = self.max_depth.is_some_and(|d| depth >= d);
        if positives == 0 || positives == n || n < self.min_samples_split || depth_exhausted {
            return leaf;
        }

        let best = (0..self.n_features)
            .into_par_iter()
            .filter_map(|f| best_threshold(rows, y, &indices, f))
            .min_by(|a, b| {
                a.impurity
                    .total_cmp(&b.impurity)
                    .then(a.feature.cmp(&b.feature))
            });
        // No two distinct values left on any feature.
        let Some(best) = best else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| rows[i][best.feature] <= best.threshold);
        if left.is_empty() || right.is_empty() {
            return leaf;
        }
        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(rows, y, left, depth + 1)),
            right: Box::new(self.build(rows, y, right, depth + 1)),
        }
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<(), ClassifierError> {
        if self.min_samples_split < 2 {
            return Err(ClassifierError::InvalidParameter {
                name: "min_samples_split",
                reason: "must be at least 2".to_string(),
            });
        }
        check_training(x, y)?;
        self.n_features = x.n_cols();
        let indices = (0..x.n_rows()).collect();
        self.root = Some(self.build(x.rows(), y, indices, 0));
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<u8>, ClassifierError> {
        let root = self.root.as_ref().ok_or(ClassifierError::NotFitted)?;
        check_features(self.n_features, x)?;
        Ok(x.rows().iter().map(|row| descend(root, row)).collect())
    }
}

fn descend(mut node: &Node, row: &[f64]) -> u8 {
    loop {
        match node {
            Node::Leaf { label } => return *label,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                node = if row[*feature] <= *threshold { left } else { right };
            }
        }
    }
}

fn best_threshold(rows: &[Vec<f64>], y: &[u8], indices: &[usize], feature: usize) -> Option<Candidate> {
    let mut values: Vec<(f64, u8)> = indices.iter().map(|&i| (rows[i][feature], y[i])).collect();
    values.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = values.len();
    let total_pos = values.iter().filter(|(_, l)| *l == 1).count();
    let mut left_pos = 0usize;
    let mut best: Option<Candidate> = None;

    for i in 0..n - 1 {
        if values[i].1 == 1 {
            left_pos += 1;
        }
        if values[i].0 == values[i + 1].0 {
            continue;
        }
        let left_n = i + 1;
        let right_n = n - left_n;
        let impurity = (left_n as f64 * gini(left_pos, left_n)
            + right_n as f64 * gini(total_pos - left_pos, right_n))
            / n as f64;
        if best.is_none_or(|b| impurity < b.impurity) {
            best = Some(Candidate {
                feature,
                threshold: midpoint(values[i].0, values[i + 1].0),
                impurity,
            });
        }
    }
    best
}

/// Midpoint of two sorted distinct values that still sends `hi` right.
/// Adjacent floats can round the midpoint up to `hi`; fall back to `lo`.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo / 2.0 + hi / 2.0;
    if mid >= hi || mid < lo || !mid.is_finite() { lo } else { mid }
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}
