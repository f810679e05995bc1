use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::imputer::ImputeStrategy;
use crate::scaler::ScalingScope;
use crate::splitter;

pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;
pub const DEFAULT_SEED: u64 = 42;

/// Every knob of a pipeline run. Nothing is read implicitly at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub impute_strategy: ImputeStrategy,
    pub train_fraction: f64,
    pub seed: u64,
    pub target_column: String,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub correlation_columns: Vec<String>,
    pub scaling_scope: ScalingScope,
    /// Share of rows whose `mask_columns` are blanked before imputation.
    pub mask_fraction: f64,
    pub mask_columns: Vec<String>,
    /// Dropped on load when present.
    pub date_column: Option<String>,
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            impute_strategy: ImputeStrategy::Mean,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            seed: DEFAULT_SEED,
            target_column: "home_score".to_string(),
            numeric_columns: strings(&["home_score", "away_score", "neutral"]),
            categorical_columns: strings(&["home_team", "away_team", "tournament", "country"]),
            correlation_columns: strings(&["home_score", "away_score", "neutral"]),
            scaling_scope: ScalingScope::Global,
            mask_fraction: 0.0,
            mask_columns: strings(&["home_score", "away_score"]),
            date_column: Some("date".to_string()),
            parallel: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays `OUTCOME_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an explicit lookup.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = get("OUTCOME_TRAIN_FRACTION") {
            self.train_fraction = parse_number(&raw, "OUTCOME_TRAIN_FRACTION")?;
        }
        if let Some(raw) = get("OUTCOME_SEED") {
            self.seed = raw
                .parse()
                .map_err(|_| PipelineError::config(format!("OUTCOME_SEED: `{raw}` is not a u64")))?;
        }
        if let Some(raw) = get("OUTCOME_MASK_FRACTION") {
            self.mask_fraction = parse_number(&raw, "OUTCOME_MASK_FRACTION")?;
        }
        if let Some(raw) = get("OUTCOME_SCALING") {
            self.scaling_scope = parse_scope(&raw)?;
        }
        if let Some(raw) = get("OUTCOME_TARGET_COLUMN") {
            self.target_column = raw;
        }
        if let Some(raw) = get("OUTCOME_NUMERIC_COLUMNS") {
            self.numeric_columns = parse_list(&raw);
        }
        if let Some(raw) = get("OUTCOME_CATEGORICAL_COLUMNS") {
            self.categorical_columns = parse_list(&raw);
        }
        if let Some(raw) = get("OUTCOME_CORRELATION_COLUMNS") {
            self.correlation_columns = parse_list(&raw);
        }
        if let Some(raw) = get("OUTCOME_MASK_COLUMNS") {
            self.mask_columns = parse_list(&raw);
        }
        if let Some(raw) = lookup("OUTCOME_DATE_COLUMN") {
            let raw = raw.trim();
            self.date_column = (!raw.is_empty()).then(|| raw.to_string());
        }
        if let Some(raw) = get("OUTCOME_PARALLEL") {
            let t = raw.to_ascii_lowercase();
            self.parallel = !(t == "0" || t == "false" || t == "off" || t == "no");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        splitter::validate_fraction(self.train_fraction)?;
        if !(0.0..=1.0).contains(&self.mask_fraction) {
            return Err(PipelineError::config(format!(
                "mask_fraction must lie in [0, 1], got {}",
                self.mask_fraction
            )));
        }
        if self.numeric_columns.is_empty() {
            return Err(PipelineError::config("numeric_columns is empty"));
        }
        if !self.numeric_columns.contains(&self.target_column) {
            return Err(PipelineError::config(format!(
                "target column `{}` must be one of numeric_columns",
                self.target_column
            )));
        }

        let mut seen = HashSet::new();
        for name in self.numeric_columns.iter().chain(&self.categorical_columns) {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::config(format!(
                    "column `{name}` is listed more than once"
                )));
            }
        }
        if let Some(date) = &self.date_column
            && seen.contains(date.as_str())
        {
            return Err(PipelineError::config(format!(
                "date column `{date}` is also used as a feature"
            )));
        }
        Ok(())
    }
}

pub fn parse_scope(raw: &str) -> Result<ScalingScope> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "global" => Ok(ScalingScope::Global),
        "train_only" | "train" => Ok(ScalingScope::TrainOnly),
        other => Err(PipelineError::config(format!(
            "unknown scaling scope `{other}` (expected global or train_only)"
        ))),
    }
}

fn parse_number(raw: &str, key: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| PipelineError::config(format!("{key}: `{raw}` is not a number")))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.train_fraction, 0.7);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn env_overlay() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OUTCOME_TRAIN_FRACTION", "0.8"),
            ("OUTCOME_SCALING", "train-only"),
            ("OUTCOME_CATEGORICAL_COLUMNS", "home_team, away_team"),
            ("OUTCOME_DATE_COLUMN", ""),
            ("OUTCOME_PARALLEL", "yes"),
        ]);
        let mut config = PipelineConfig::default();
        config
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.train_fraction, 0.8);
        assert_eq!(config.scaling_scope, ScalingScope::TrainOnly);
        assert_eq!(config.categorical_columns, vec!["home_team", "away_team"]);
        assert_eq!(config.date_column, None);
        assert!(config.parallel);
    }

    #[test]
    fn bad_env_value_is_config_error() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_vars(|k| (k == "OUTCOME_SEED").then(|| "-1".to_string()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        for fraction in [0.0, 1.0, f64::NAN] {
            let config = PipelineConfig {
                train_fraction: fraction,
                ..PipelineConfig::default()
            };
            assert!(matches!(config.validate().unwrap_err(), PipelineError::Config(_)));
        }
        let config = PipelineConfig {
            target_column: "home_team".to_string(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"seed": 7, "scaling_scope": "train_only"}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.scaling_scope, ScalingScope::TrainOnly);
        assert_eq!(config.target_column, "home_score");
    }
}
