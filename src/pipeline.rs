use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::ClassifierRegistry;
use crate::config::PipelineConfig;
use crate::correlation::{self, CorrelationMatrix};
use crate::dataset::{self, Dataset};
use crate::encoder::{self, EncodingSchema};
use crate::error::Result;
use crate::features::{self, NumericTable};
use crate::harness::{self, MetricReport};
use crate::imputer::{self, ImputationStats};
use crate::scaler::{self, ScalingScope, ScalingStats};
use crate::splitter::{self, SplitData};

/// Everything the classifiers need, plus the fitted preprocessing state.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Post-imputation dataset, before encoding.
    pub imputed: Dataset,
    pub imputation: ImputationStats,
    pub encoding: EncodingSchema,
    pub scaling: ScalingStats,
    pub split: SplitData,
    pub positives: usize,
    pub masked_cells: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub generated_at: String,
    pub config: PipelineConfig,
    pub rows: usize,
    pub masked_cells: usize,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
    pub positives: usize,
    pub negatives: usize,
    pub train_rows: usize,
    pub eval_rows: usize,
    pub eval_positives: usize,
    pub imputation: ImputationStats,
    pub metrics: MetricReport,
    pub correlation: CorrelationMatrix,
}

/// Impute, encode, assemble, scale and split according to `config`.
pub fn prepare(config: &PipelineConfig, raw: &Dataset) -> Result<PreparedData> {
    config.validate()?;
    raw.require_columns(&config.numeric_columns)?;
    raw.require_columns(&config.categorical_columns)?;
    raw.require_columns(&config.correlation_columns)?;

    let missing_before = count_missing(raw, &config.numeric_columns);
    let masked = if config.mask_fraction > 0.0 {
        dataset::mask_missing(raw, &config.mask_columns, config.mask_fraction, config.seed)?
    } else {
        raw.clone()
    };
    let masked_cells = count_missing(&masked, &config.numeric_columns) - missing_before;

    let imputation = imputer::fit(&masked, &config.numeric_columns, config.impute_strategy)?;
    let imputed = imputer::transform(&masked, &imputation)?;
    info!(
        rows = imputed.len(),
        masked_cells,
        filled = missing_before + masked_cells,
        "imputation done"
    );

    let encoding = encoder::fit(&imputed, &config.categorical_columns)?;
    let indicators = encoder::transform(&imputed, &encoding)?;
    let numeric = NumericTable::from_dataset(&imputed, &config.numeric_columns)?;
    let (matrix, labels) = features::assemble(&numeric, &indicators, &config.target_column)?;
    let positives = labels.iter().filter(|y| **y == 1).count();
    info!(
        features = matrix.n_cols(),
        indicators = encoding.width(),
        positives,
        "feature matrix assembled"
    );

    let (scaling, split) = match config.scaling_scope {
        ScalingScope::Global => {
            let stats = scaler::fit(&matrix)?;
            let scaled = scaler::transform(&matrix, &stats)?;
            let split = splitter::split(&scaled, &labels, config.train_fraction, config.seed)?;
            (stats, split)
        }
        ScalingScope::TrainOnly => {
            let mut split =
                splitter::split(&matrix, &labels, config.train_fraction, config.seed)?;
            let stats = scaler::fit(&split.train_x)?;
            split.train_x = scaler::transform(&split.train_x, &stats)?;
            split.eval_x = scaler::transform(&split.eval_x, &stats)?;
            (stats, split)
        }
    };
    info!(
        scope = ?config.scaling_scope,
        train = split.train_y.len(),
        eval = split.eval_y.len(),
        eval_positives = split.eval_positives(),
        "rows split"
    );

    Ok(PreparedData {
        imputed,
        imputation,
        encoding,
        scaling,
        split,
        positives,
        masked_cells,
    })
}

/// Runs the whole flow and evaluates every registered classifier.
pub fn run(
    config: &PipelineConfig,
    raw: &Dataset,
    mut registry: ClassifierRegistry,
) -> Result<PipelineReport> {
    let prepared = prepare(config, raw)?;
    let correlation = correlation::correlation_matrix(&prepared.imputed, &config.correlation_columns)?;
    let metrics = if config.parallel {
        harness::compare_parallel(registry, &prepared.split)?
    } else {
        harness::compare(&mut registry, &prepared.split)?
    };

    let split = &prepared.split;
    let rows = prepared.imputed.len();
    Ok(PipelineReport {
        generated_at: Utc::now().to_rfc3339(),
        config: config.clone(),
        rows,
        masked_cells: prepared.masked_cells,
        feature_count: split.train_x.n_cols(),
        feature_names: split.train_x.names().to_vec(),
        positives: prepared.positives,
        negatives: rows - prepared.positives,
        train_rows: split.train_y.len(),
        eval_rows: split.eval_y.len(),
        eval_positives: split.eval_positives(),
        imputation: prepared.imputation,
        metrics,
        correlation,
    })
}

fn count_missing(dataset: &Dataset, columns: &[String]) -> usize {
    columns
        .iter()
        .filter_map(|c| dataset.missing_count(c))
        .sum()
}
