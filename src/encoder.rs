use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub column: String,
    pub value: String,
}

impl SchemaEntry {
    pub fn feature_name(&self) -> String {
        format!("{}_{}", self.column, self.value)
    }
}

/// One indicator column per (column, value) pair.
///
/// Columns keep their declaration order; values inside a column are sorted
/// byte-wise, so the layout only depends on the set of observed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSchema {
    pub columns: Vec<String>,
    pub entries: Vec<SchemaEntry>,
}

impl EncodingSchema {
    pub fn width(&self) -> usize {
        self.entries.len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.entries.iter().map(SchemaEntry::feature_name).collect()
    }

    pub fn categories(&self, column: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.column == column)
            .map(|e| e.value.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorTable {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl IndicatorTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn fit<S: AsRef<str>>(dataset: &Dataset, columns: &[S]) -> Result<EncodingSchema> {
    let indices = dataset.require_columns(columns)?;
    let mut entries = Vec::new();
    for (name, idx) in columns.iter().zip(indices) {
        let observed: BTreeSet<String> = dataset
            .rows()
            .iter()
            .filter_map(|row| row[idx].category())
            .collect();
        debug!(column = name.as_ref(), categories = observed.len(), "encoder fit");
        entries.extend(observed.into_iter().map(|value| SchemaEntry {
            column: name.as_ref().to_string(),
            value,
        }));
    }
    Ok(EncodingSchema {
        columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        entries,
    })
}

/// Unseen and missing categories encode to an all-zero block.
pub fn transform(dataset: &Dataset, schema: &EncodingSchema) -> Result<IndicatorTable> {
    let mut lookups: Vec<(usize, HashMap<&str, usize>)> = Vec::with_capacity(schema.columns.len());
    for column in &schema.columns {
        let idx = dataset.column_index(column).ok_or_else(|| {
            PipelineError::schema(format!(
                "categorical column `{column}` was fitted but is absent from the dataset"
            ))
        })?;
        let positions = schema
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| &e.column == column)
            .map(|(pos, e)| (e.value.as_str(), pos))
            .collect();
        lookups.push((idx, positions));
    }

    let width = schema.width();
    let rows = dataset
        .rows()
        .iter()
        .map(|row| {
            let mut out = vec![0.0; width];
            for (idx, positions) in &lookups {
                let hit = row[*idx]
                    .category()
                    .and_then(|value| positions.get(value.as_str()).copied());
                if let Some(pos) = hit {
                    out[pos] = 1.0;
                }
            }
            out
        })
        .collect();

    Ok(IndicatorTable {
        names: schema.feature_names(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cell;

    fn teams(home: &[&str]) -> Dataset {
        Dataset::new(
            vec!["home_team".to_string()],
            home.iter()
                .map(|t| vec![Cell::Text((*t).to_string())])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn categories_are_sorted() {
        let schema = fit(&teams(&["Wales", "England", "Wales", "Scotland"]), &["home_team"]).unwrap();
        assert_eq!(
            schema.categories("home_team"),
            vec!["England", "Scotland", "Wales"]
        );
        assert_eq!(schema.feature_names()[0], "home_team_England");
    }

    #[test]
    fn unseen_value_is_all_zero() {
        let schema = fit(&teams(&["England", "Scotland"]), &["home_team"]).unwrap();
        let table = transform(&teams(&["Scotland", "Ireland"]), &schema).unwrap();
        assert_eq!(table.rows[0], vec![0.0, 1.0]);
        assert_eq!(table.rows[1], vec![0.0, 0.0]);
    }

    #[test]
    fn missing_column_is_schema_error() {
        let schema = fit(&teams(&["England"]), &["home_team"]).unwrap();
        let other = Dataset::new(vec!["away_team".to_string()], vec![]).unwrap();
        assert!(matches!(
            transform(&other, &schema).unwrap_err(),
            PipelineError::Schema(_)
        ));
    }
}
