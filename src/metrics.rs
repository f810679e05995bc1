use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Positive-class quality of one classifier on the evaluation rows.
///
/// Undefined ratios are reported as 0: no predicted positives gives
/// `precision = 0`, no actual positives gives `recall = 0`, and
/// `precision + recall = 0` gives `f1 = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    pub samples: usize,
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassRow {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class breakdown, both outcome classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassRow>,
    pub accuracy: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Confusion {
    tp: usize,
    fp: usize,
    fn_: usize,
    tn: usize,
}

impl Confusion {
    fn count(truth: &[u8], predicted: &[u8], positive: u8) -> Self {
        let mut out = Self::default();
        for (t, p) in truth.iter().zip(predicted) {
            match (*t == positive, *p == positive) {
                (true, true) => out.tp += 1,
                (false, true) => out.fp += 1,
                (true, false) => out.fn_ += 1,
                (false, false) => out.tn += 1,
            }
        }
        out
    }

    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }
}

pub fn binary_metrics(truth: &[u8], predicted: &[u8]) -> Result<MetricRecord> {
    check_lengths(truth, predicted)?;
    let c = Confusion::count(truth, predicted, 1);
    let precision = c.precision();
    let recall = c.recall();
    Ok(MetricRecord {
        precision,
        recall,
        f1: f1(precision, recall),
        accuracy: ratio(c.tp + c.tn, truth.len()),
        samples: truth.len(),
        true_positive: c.tp,
        false_positive: c.fp,
        false_negative: c.fn_,
        true_negative: c.tn,
    })
}

pub fn classification_report(truth: &[u8], predicted: &[u8]) -> Result<ClassificationReport> {
    check_lengths(truth, predicted)?;
    let classes = [0u8, 1u8]
        .into_iter()
        .map(|label| {
            let c = Confusion::count(truth, predicted, label);
            ClassRow {
                label,
                precision: c.precision(),
                recall: c.recall(),
                f1: f1(c.precision(), c.recall()),
                support: c.tp + c.fn_,
            }
        })
        .collect();
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Ok(ClassificationReport {
        classes,
        accuracy: ratio(correct, truth.len()),
        samples: truth.len(),
    })
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for row in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                row.label, row.precision, row.recall, row.f1, row.support
            )?;
        }
        write!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.samples
        )
    }
}

fn check_lengths(truth: &[u8], predicted: &[u8]) -> Result<()> {
    if truth.len() != predicted.len() {
        return Err(PipelineError::schema(format!(
            "{} labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    Ok(())
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    let sum = precision + recall;
    if sum <= 0.0 {
        0.0
    } else {
        2.0 * precision * recall / sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_ratios() {
        let m = binary_metrics(&[1, 1, 0, 0, 1], &[1, 0, 1, 0, 1]).unwrap();
        assert_eq!(
            (m.true_positive, m.false_positive, m.false_negative, m.true_negative),
            (2, 1, 1, 1)
        );
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
    }

    #[test]
    fn all_negative_predictions_are_zero_not_nan() {
        let m = binary_metrics(&[1, 0, 1], &[0, 0, 0]).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn no_actual_positives_gives_zero_recall() {
        let m = binary_metrics(&[0, 0], &[1, 0]).unwrap();
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.precision, 0.0);
    }

    #[test]
    fn report_has_both_classes() {
        let r = classification_report(&[1, 1, 0, 0], &[1, 0, 0, 0]).unwrap();
        assert_eq!(r.classes[0].support, 2);
        assert!((r.classes[0].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(r.classes[1].recall, 0.5);
        assert!(r.to_string().contains("accuracy"));
    }

    #[test]
    fn length_mismatch_is_schema_error() {
        assert!(matches!(
            binary_metrics(&[1], &[1, 0]).unwrap_err(),
            PipelineError::Schema(_)
        ));
    }
}
