use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::dataset::{Cell, Dataset};
use crate::error::{PipelineError, Result};

const TEAMS: &[&str] = &[
    "Scotland",
    "England",
    "Wales",
    "Brazil",
    "Argentina",
    "Uruguay",
    "France",
    "Germany",
    "Japan",
    "Mexico",
];

const TOURNAMENTS: &[&str] = &["Friendly", "FIFA World Cup qualification", "Copa América"];

pub const COLUMNS: &[&str] = &[
    "date",
    "home_team",
    "away_team",
    "home_score",
    "away_score",
    "tournament",
    "country",
    "neutral",
];

/// Seeded match table in the raw input layout with exactly `positives` rows
/// where the home side scored.
pub fn synthetic_matches(rows: usize, positives: usize, seed: u64) -> Result<Dataset> {
    if positives > rows {
        return Err(PipelineError::config(format!(
            "{positives} positive rows requested out of {rows}"
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut scored: Vec<bool> = (0..rows).map(|i| i < positives).collect();
    scored.shuffle(&mut rng);

    let start = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default();
    let out = scored
        .into_iter()
        .enumerate()
        .map(|(idx, home_scored)| {
            let home = rng.gen_range(0..TEAMS.len());
            let mut away = rng.gen_range(0..TEAMS.len() - 1);
            if away >= home {
                away += 1;
            }
            let neutral = rng.gen_bool(0.2);
            let venue = if neutral {
                TEAMS[rng.gen_range(0..TEAMS.len())]
            } else {
                TEAMS[home]
            };
            let home_score: u8 = if home_scored { rng.gen_range(1..=4) } else { 0 };
            let date = start + Duration::days(idx as i64 * 7);
            vec![
                Cell::Text(date.format("%Y-%m-%d").to_string()),
                Cell::Text(TEAMS[home].to_string()),
                Cell::Text(TEAMS[away].to_string()),
                Cell::Num(f64::from(home_score)),
                Cell::Num(f64::from(rng.gen_range(0..=3u8))),
                Cell::Text(TOURNAMENTS[rng.gen_range(0..TOURNAMENTS.len())].to_string()),
                Cell::Text(venue.to_string()),
                Cell::Num(if neutral { 1.0 } else { 0.0 }),
            ]
        })
        .collect();

    Dataset::new(COLUMNS.iter().map(|c| c.to_string()).collect(), out)
}
