use crate::decision_tree::DecisionTreeClassifier;
use crate::error::{ClassifierError, PipelineError, Result};
use crate::features::FeatureMatrix;
use crate::knn::KnnClassifier;
use crate::logistic::LogisticRegression;

/// Anything that can learn binary labels from a feature matrix.
///
/// Implementations own their fitted state; the harness moves each one into a
/// single worker, hence the `Send` bound.
pub trait Classifier: Send {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> std::result::Result<(), ClassifierError>;

    fn predict(&self, x: &FeatureMatrix) -> std::result::Result<Vec<u8>, ClassifierError>;
}

/// Always answers the same label.
#[derive(Debug, Clone, Copy)]
pub struct ConstantClassifier {
    pub label: u8,
}

impl ConstantClassifier {
    pub fn new(label: u8) -> Self {
        Self { label }
    }
}

impl Classifier for ConstantClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> std::result::Result<(), ClassifierError> {
        check_training(x, y)
    }

    fn predict(&self, x: &FeatureMatrix) -> std::result::Result<Vec<u8>, ClassifierError> {
        Ok(vec![self.label; x.n_rows()])
    }
}

pub(crate) fn check_training(x: &FeatureMatrix, y: &[u8]) -> std::result::Result<(), ClassifierError> {
    if x.n_rows() == 0 {
        return Err(ClassifierError::EmptyTrainingSet);
    }
    if x.n_rows() != y.len() {
        return Err(ClassifierError::LengthMismatch {
            expected: x.n_rows(),
            actual: y.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_features(
    expected: usize,
    x: &FeatureMatrix,
) -> std::result::Result<(), ClassifierError> {
    if x.n_cols() != expected {
        return Err(ClassifierError::FeatureMismatch {
            expected,
            actual: x.n_cols(),
        });
    }
    Ok(())
}

/// Named classifiers in registration order.
#[derive(Default)]
pub struct ClassifierRegistry {
    entries: Vec<(String, Box<dyn Classifier>)>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        classifier: impl Classifier + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| *n == name) {
            return Err(PipelineError::config(format!(
                "classifier `{name}` is registered twice"
            )));
        }
        self.entries.push((name, Box::new(classifier)));
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [(String, Box<dyn Classifier>)] {
        &mut self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Box<dyn Classifier>)> {
        self.entries
    }
}

/// KNN, a CART tree and logistic regression, under their report names.
pub fn default_registry() -> ClassifierRegistry {
    let mut registry = ClassifierRegistry::new();
    registry.entries.push(("KNN".to_string(), Box::new(KnnClassifier::default())));
    registry.entries.push((
        "Decision Tree".to_string(),
        Box::new(DecisionTreeClassifier::default()),
    ));
    registry.entries.push((
        "Logistic Regression".to_string(),
        Box::new(LogisticRegression::default()),
    ));
    registry
}
