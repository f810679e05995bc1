use std::path::PathBuf;

use outcome_lab::dataset::{Cell, Dataset, load_dataset};
use outcome_lab::encoder;
use outcome_lab::features::{self, NumericTable};
use outcome_lab::imputer::{self, ImputeStrategy};
use outcome_lab::scaler;
use outcome_lab::splitter;
use outcome_lab::synthetic::synthetic_matches;

const NUMERIC: &[&str] = &["home_score", "away_score", "neutral"];
const CATEGORICAL: &[&str] = &["home_team", "away_team", "tournament", "country"];

fn fixture() -> Dataset {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("matches_small.csv");
    load_dataset(&path, Some("date")).expect("fixture should load")
}

#[test]
fn imputation_fills_gaps_and_is_idempotent() {
    let data = fixture();
    let stats = imputer::fit(&data, NUMERIC, ImputeStrategy::Mean).expect("fit");
    let once = imputer::transform(&data, &stats).expect("first pass");
    let twice = imputer::transform(&once, &stats).expect("second pass");
    assert_eq!(once.len(), data.len());
    assert_eq!(once, twice);
    assert_eq!(once.missing_count("home_score"), Some(0));

    let observed: Vec<f64> = data
        .numeric_column("home_score")
        .expect("numeric")
        .into_iter()
        .flatten()
        .collect();
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    assert!((stats.fill_for("home_score").expect("fitted") - mean).abs() < 1e-12);
    // Input is left untouched.
    assert_eq!(data.missing_count("home_score"), Some(1));
}

#[test]
fn imputer_rejects_text_and_absent_columns() {
    let data = fixture();
    assert!(imputer::fit(&data, &["home_team"], ImputeStrategy::Mean).is_err());
    let stats = imputer::fit(&data, NUMERIC, ImputeStrategy::Mean).expect("fit");
    let narrowed = data.drop_column("away_score");
    assert!(matches!(
        imputer::transform(&narrowed, &stats).unwrap_err(),
        outcome_lab::PipelineError::Schema(_)
    ));
}

#[test]
fn one_hot_rows_have_one_indicator_per_column() {
    let data = fixture();
    let schema = encoder::fit(&data, CATEGORICAL).expect("fit");
    assert_eq!(
        schema.categories("home_team"),
        vec!["England", "Northern Ireland", "Scotland", "Wales"]
    );
    let table = encoder::transform(&data, &schema).expect("transform");
    assert_eq!(table.len(), data.len());
    for row in &table.rows {
        for column in CATEGORICAL {
            let hot = schema
                .entries
                .iter()
                .zip(row)
                .filter(|(e, _)| e.column == *column)
                .map(|(_, v)| *v)
                .sum::<f64>();
            assert_eq!(hot, 1.0);
        }
    }
}

#[test]
fn unseen_category_encodes_to_zero_block() {
    let data = fixture();
    let schema = encoder::fit(&data, &["home_team"]).expect("fit");
    let probe = Dataset::new(
        vec!["home_team".to_string()],
        vec![vec![Cell::Text("Brazil".to_string())], vec![Cell::Missing]],
    )
    .expect("probe");
    let table = encoder::transform(&probe, &schema).expect("transform");
    assert!(table.rows.iter().all(|r| r.iter().all(|v| *v == 0.0)));
}

#[test]
fn scaled_columns_have_zero_mean_unit_std() {
    let data = synthetic_matches(120, 60, 11).expect("synthetic");
    let stats = imputer::fit(&data, NUMERIC, ImputeStrategy::Mean).expect("impute fit");
    let imputed = imputer::transform(&data, &stats).expect("impute");
    let schema = encoder::fit(&imputed, CATEGORICAL).expect("encode fit");
    let indicators = encoder::transform(&imputed, &schema).expect("encode");
    let numeric = NumericTable::from_dataset(&imputed, NUMERIC).expect("numeric");
    let (matrix, labels) =
        features::assemble(&numeric, &indicators, "home_score").expect("assemble");
    assert_eq!(labels.iter().filter(|y| **y == 1).count(), 60);

    let fitted = scaler::fit(&matrix).expect("scaler fit");
    let scaled = scaler::transform(&matrix, &fitted).expect("scale");
    assert_eq!(scaled.n_rows(), matrix.n_rows());
    for j in 0..scaled.n_cols() {
        let col = scaled.column(j);
        let n = col.len() as f64;
        let mean = col.iter().sum::<f64>() / n;
        let std = (col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        assert!(mean.abs() < 1e-9, "{} mean {mean}", scaled.names()[j]);
        if fitted.stds[j] >= scaler::STD_EPSILON {
            assert!((std - 1.0).abs() < 1e-9, "{} std {std}", scaled.names()[j]);
        }
    }
}

#[test]
fn split_is_complete_disjoint_and_seeded() {
    let data = synthetic_matches(100, 55, 3).expect("synthetic");
    let numeric = NumericTable::from_dataset(&data, NUMERIC).expect("numeric");
    let schema = encoder::fit(&data, CATEGORICAL).expect("encode fit");
    let indicators = encoder::transform(&data, &schema).expect("encode");
    let (matrix, labels) =
        features::assemble(&numeric, &indicators, "home_score").expect("assemble");

    let a = splitter::split(&matrix, &labels, 0.7, 42).expect("split");
    let b = splitter::split(&matrix, &labels, 0.7, 42).expect("split");
    assert_eq!(a, b);
    assert_eq!(a.train_indices.len(), 70);
    assert_eq!(a.eval_indices.len(), 30);

    let mut all: Vec<usize> = a.train_indices.iter().chain(&a.eval_indices).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..100).collect::<Vec<_>>());

    let c = splitter::split(&matrix, &labels, 0.7, 43).expect("split");
    assert_ne!(a.train_indices, c.train_indices);
}
