use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::{Classifier, ClassifierRegistry};
use crate::error::{PipelineError, Result};
use crate::metrics::{self, ClassificationReport, MetricRecord};
use crate::splitter::SplitData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub name: String,
    pub metrics: MetricRecord,
    pub report: ClassificationReport,
    pub fit_millis: u64,
}

/// Results keyed by classifier name, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub entries: Vec<ModelResult>,
}

impl MetricReport {
    pub fn get(&self, name: &str) -> Option<&MetricRecord> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.metrics)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best_by_f1(&self) -> Option<&ModelResult> {
        self.entries
            .iter()
            .max_by(|a, b| a.metrics.f1.total_cmp(&b.metrics.f1))
    }
}

/// Fits on the training rows and scores the evaluation rows.
pub fn evaluate(
    name: &str,
    classifier: &mut dyn Classifier,
    split: &SplitData,
) -> Result<MetricRecord> {
    run_one(name, classifier, split).map(|r| r.metrics)
}

/// Runs every registered classifier against the same split, one after another.
pub fn compare(registry: &mut ClassifierRegistry, split: &SplitData) -> Result<MetricReport> {
    let mut entries = Vec::with_capacity(registry.len());
    for (name, classifier) in registry.entries_mut() {
        entries.push(run_one(name, classifier.as_mut(), split)?);
    }
    Ok(MetricReport { entries })
}

/// Same contract as [`compare`], one rayon worker per classifier.
pub fn compare_parallel(registry: ClassifierRegistry, split: &SplitData) -> Result<MetricReport> {
    let entries = registry
        .into_entries()
        .into_par_iter()
        .map(|(name, mut classifier)| run_one(&name, classifier.as_mut(), split))
        .collect::<Result<Vec<_>>>()?;
    Ok(MetricReport { entries })
}

fn run_one(name: &str, classifier: &mut dyn Classifier, split: &SplitData) -> Result<ModelResult> {
    let started = Instant::now();
    classifier
        .fit(&split.train_x, &split.train_y)
        .map_err(|source| PipelineError::Classifier {
            name: name.to_string(),
            source,
        })?;
    let fit_millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let predicted = classifier
        .predict(&split.eval_x)
        .map_err(|source| PipelineError::Classifier {
            name: name.to_string(),
            source,
        })?;
    if predicted.len() != split.eval_y.len() {
        return Err(PipelineError::schema(format!(
            "classifier `{name}` returned {} predictions for {} rows",
            predicted.len(),
            split.eval_y.len()
        )));
    }

    let record = metrics::binary_metrics(&split.eval_y, &predicted)?;
    let report = metrics::classification_report(&split.eval_y, &predicted)?;
    info!(
        classifier = name,
        precision = record.precision,
        recall = record.recall,
        f1 = record.f1,
        fit_millis,
        "classifier evaluated"
    );
    Ok(ModelResult {
        name: name.to_string(),
        metrics: record,
        report,
        fit_millis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ConstantClassifier;
    use crate::error::ClassifierError;
    use crate::features::FeatureMatrix;
    use crate::splitter;

    struct Broken;

    impl Classifier for Broken {
        fn fit(&mut self, _: &FeatureMatrix, _: &[u8]) -> std::result::Result<(), ClassifierError> {
            Ok(())
        }

        fn predict(&self, _: &FeatureMatrix) -> std::result::Result<Vec<u8>, ClassifierError> {
            Err(ClassifierError::NotFitted)
        }
    }

    struct ShortAnswer;

    impl Classifier for ShortAnswer {
        fn fit(&mut self, _: &FeatureMatrix, _: &[u8]) -> std::result::Result<(), ClassifierError> {
            Ok(())
        }

        fn predict(&self, _: &FeatureMatrix) -> std::result::Result<Vec<u8>, ClassifierError> {
            Ok(vec![1])
        }
    }

    fn split() -> SplitData {
        let x = FeatureMatrix::new(
            vec!["x".to_string()],
            (0..20).map(|i| vec![i as f64]).collect(),
        )
        .unwrap();
        let y: Vec<u8> = (0..20).map(|i| u8::from(i % 3 != 0)).collect();
        splitter::split(&x, &y, 0.5, 3).unwrap()
    }

    #[test]
    fn compare_preserves_registration_order() {
        let mut reg = ClassifierRegistry::new();
        reg.register("zeta", ConstantClassifier::new(0)).unwrap();
        reg.register("alpha", ConstantClassifier::new(1)).unwrap();
        let report = compare(&mut reg, &split()).unwrap();
        assert_eq!(report.names(), vec!["zeta", "alpha"]);
        assert_eq!(report.get("alpha").unwrap().recall, 1.0);
        assert_eq!(report.get("zeta").unwrap().precision, 0.0);
    }

    #[test]
    fn failure_aborts_without_partial_report() {
        let mut reg = ClassifierRegistry::new();
        reg.register("ok", ConstantClassifier::new(1)).unwrap();
        reg.register("broken", Broken).unwrap();
        let err = compare(&mut reg, &split()).unwrap_err();
        assert!(matches!(err, PipelineError::Classifier { ref name, .. } if name == "broken"));
    }

    #[test]
    fn wrong_prediction_length_is_schema_error() {
        let err = evaluate("short", &mut ShortAnswer, &split()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }
}
