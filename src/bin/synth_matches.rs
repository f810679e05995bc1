use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use outcome_lab::dataset::Cell;
use outcome_lab::synthetic;

const DEFAULT_ROWS: usize = 1000;
const DEFAULT_SEED: u64 = 42;

fn main() -> Result<()> {
    let out = parse_out_arg().unwrap_or_else(|| PathBuf::from("synthetic_matches.csv"));
    let rows = parse_usize_arg("--rows").unwrap_or(DEFAULT_ROWS);
    if rows < 2 {
        return Err(anyhow!("--rows must be at least 2"));
    }
    let positives = parse_usize_arg("--positives").unwrap_or(rows * 55 / 100);
    let seed = parse_u64_arg("--seed").unwrap_or(DEFAULT_SEED);

    let data = synthetic::synthetic_matches(rows, positives, seed)?;
    let neutral = data.column_index("neutral");

    let mut writer = csv::Writer::from_path(&out)
        .with_context(|| format!("failed creating {}", out.display()))?;
    writer.write_record(data.columns())?;
    for row in data.rows() {
        let record = row
            .iter()
            .enumerate()
            .map(|(idx, cell)| match cell {
                Cell::Num(v) if Some(idx) == neutral => {
                    if *v > 0.0 { "TRUE".to_string() } else { "FALSE".to_string() }
                }
                Cell::Num(v) => format!("{v}"),
                Cell::Text(s) => s.clone(),
                Cell::Missing => String::new(),
            })
            .collect::<Vec<_>>();
        writer.write_record(&record)?;
    }
    writer.flush()?;

    println!("Synthetic matches written");
    println!("File: {}", out.display());
    println!("Rows: {rows} (home scored in {positives})");
    println!("Seed: {seed}");
    Ok(())
}

fn parse_out_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--out=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--out" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_u64_arg(name).and_then(|v| usize::try_from(v).ok())
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<u64>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<u64>()
        {
            return Some(v);
        }
    }
    None
}
