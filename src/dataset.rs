use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

const MISSING_MARKERS: &[&str] = &["", "na", "n/a", "nan", "null", "none"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Num(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Non-finite numbers are treated as gaps.
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Num(value)
        } else {
            Cell::Missing
        }
    }

    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        let lower = s.to_ascii_lowercase();
        if MISSING_MARKERS.contains(&lower.as_str()) {
            return Cell::Missing;
        }
        match lower.as_str() {
            "true" => return Cell::Num(1.0),
            "false" => return Cell::Num(0.0),
            _ => {}
        }
        match s.parse::<f64>() {
            Ok(v) => Cell::number(v),
            Err(_) => Cell::Text(s.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Num(v) => Some(*v),
            _ => None,
        }
    }

    /// Category label for encoding. Numbers are rendered without a trailing `.0`.
    pub fn category(&self) -> Option<String> {
        match self {
            Cell::Num(v) => Some(format!("{v}")),
            Cell::Text(s) => Some(s.clone()),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

/// Row-major table of cells with a fixed column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::data(format!("duplicate column `{name}`")));
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::data(format!(
                    "row {idx} has {} cells, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Resolves every name to its index, or reports all absent columns at once.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let mut out = Vec::with_capacity(names.len());
        let mut absent = Vec::new();
        for name in names {
            match self.column_index(name.as_ref()) {
                Some(idx) => out.push(idx),
                None => absent.push(name.as_ref().to_string()),
            }
        }
        if !absent.is_empty() {
            return Err(PipelineError::data(format!(
                "missing required columns: {}",
                absent.join(", ")
            )));
        }
        Ok(out)
    }

    /// Values of a numeric column; `None` marks a gap. Text cells are a data error.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| PipelineError::data(format!("missing column `{name}`")))?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| match &row[idx] {
                Cell::Num(v) => Ok(Some(*v)),
                Cell::Missing => Ok(None),
                Cell::Text(s) => Err(PipelineError::data(format!(
                    "column `{name}` row {row_idx}: expected a number, got `{s}`"
                ))),
            })
            .collect()
    }

    pub fn missing_count(&self, name: &str) -> Option<usize> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter(|row| row[idx].is_missing()).count())
    }

    pub fn drop_column(&self, name: &str) -> Self {
        let Some(idx) = self.column_index(name) else {
            return self.clone();
        };
        let mut columns = self.columns.clone();
        columns.remove(idx);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.remove(idx);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub(crate) fn with_rows(&self, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Reads a match file (`.csv` or `.parquet`) and drops the date column if present.
pub fn load_dataset(path: &Path, date_column: Option<&str>) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let dataset = match ext.as_str() {
        "csv" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => {
            return Err(PipelineError::data(format!(
                "unsupported input extension `{other}` for {}",
                path.display()
            )));
        }
    };
    info!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "loaded match dataset"
    );
    Ok(match date_column {
        Some(date) => dataset.drop_column(date),
        None => dataset,
    })
}

pub fn load_csv(path: &Path) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let columns = rdr
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::parse).collect());
    }
    Dataset::new(columns, rows)
}

pub fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let columns = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>();
    let positions: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let mut rows = Vec::new();
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let mut cells = vec![Cell::Missing; columns.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(idx) = positions.get(name.as_str()) {
                cells[*idx] = cell_from_field(field);
            }
        }
        rows.push(cells);
    }
    Dataset::new(columns, rows)
}

fn cell_from_field(field: &Field) -> Cell {
    match field {
        Field::Null => Cell::Missing,
        Field::Bool(b) => Cell::Num(if *b { 1.0 } else { 0.0 }),
        Field::Byte(v) => Cell::Num(*v as f64),
        Field::Short(v) => Cell::Num(*v as f64),
        Field::Int(v) => Cell::Num(*v as f64),
        Field::Long(v) => Cell::Num(*v as f64),
        Field::UByte(v) => Cell::Num(*v as f64),
        Field::UShort(v) => Cell::Num(*v as f64),
        Field::UInt(v) => Cell::Num(*v as f64),
        Field::ULong(v) => Cell::Num(*v as f64),
        Field::Float(v) => Cell::number(*v as f64),
        Field::Double(v) => Cell::number(*v),
        Field::Str(s) => Cell::parse(s),
        other => Cell::Text(other.to_string()),
    }
}

/// ChaCha stream used for masking, so a shared seed never reproduces the
/// row permutation of the train/eval split.
pub const MASK_STREAM: u64 = 1;

/// Blanks `columns` on a seeded random `fraction` of rows.
pub fn mask_missing<S: AsRef<str>>(
    dataset: &Dataset,
    columns: &[S],
    fraction: f64,
    seed: u64,
) -> Result<Dataset> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(PipelineError::config(format!(
            "mask fraction must lie in [0, 1], got {fraction}"
        )));
    }
    let targets = dataset.require_columns(columns)?;
    let n_masked = ((dataset.len() as f64) * fraction).round() as usize;

    let mut order: Vec<usize> = (0..dataset.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(MASK_STREAM);
    order.shuffle(&mut rng);

    let mut rows = dataset.rows().to_vec();
    for &row_idx in order.iter().take(n_masked) {
        for &col in &targets {
            rows[row_idx][col] = Cell::Missing;
        }
    }
    debug!(rows = n_masked, "masked score values");
    Ok(dataset.with_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Dataset {
        Dataset::new(
            vec!["home_score".to_string(), "home_team".to_string()],
            vec![
                vec![Cell::Num(1.0), Cell::Text("Scotland".to_string())],
                vec![Cell::Missing, Cell::Text("England".to_string())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn parse_cells() {
        assert_eq!(Cell::parse(" 3 "), Cell::Num(3.0));
        assert_eq!(Cell::parse("TRUE"), Cell::Num(1.0));
        assert_eq!(Cell::parse("false"), Cell::Num(0.0));
        assert_eq!(Cell::parse("NA"), Cell::Missing);
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("Wales"), Cell::Text("Wales".to_string()));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Dataset::new(vec!["a".to_string()], vec![vec![]]).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn require_columns_lists_all_absent() {
        let err = tiny()
            .require_columns(&["home_score", "away_score", "country"])
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("away_score") && msg.contains("country"));
    }

    #[test]
    fn numeric_column_rejects_text() {
        assert!(tiny().numeric_column("home_team").is_err());
        assert_eq!(
            tiny().numeric_column("home_score").unwrap(),
            vec![Some(1.0), None]
        );
    }

    #[test]
    fn mask_is_seeded() {
        let base = Dataset::new(
            vec!["home_score".to_string()],
            (0..50).map(|i| vec![Cell::Num(i as f64)]).collect(),
        )
        .unwrap();
        let a = mask_missing(&base, &["home_score"], 0.1, 7).unwrap();
        let b = mask_missing(&base, &["home_score"], 0.1, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.missing_count("home_score"), Some(5));
        assert!(mask_missing(&base, &["home_score"], 1.5, 7).is_err());
    }

    #[test]
    fn mask_order_differs_from_plain_seeded_shuffle() {
        let base = Dataset::new(
            vec!["home_score".to_string()],
            (0..40).map(|i| vec![Cell::Num(i as f64)]).collect(),
        )
        .unwrap();
        let masked = mask_missing(&base, &["home_score"], 0.25, 42).unwrap();
        let blanked: HashSet<usize> = masked
            .numeric_column("home_score")
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_none())
            .map(|(i, _)| i)
            .collect();

        let mut order: Vec<usize> = (0..40).collect();
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(42));
        let plain: HashSet<usize> = order.into_iter().take(10).collect();
        assert_eq!(blanked.len(), 10);
        assert_ne!(blanked, plain);
    }
}
