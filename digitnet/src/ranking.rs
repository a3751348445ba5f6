//! The score leaderboard: named records kept sorted by descending score,
//! persisted as a JSON file next to the application.
use std::fs;
use std::path::Path;

use log::warn;
use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub name: String,
    pub score: f64,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct RankingData {
    entries: Vec<RankingEntry>,
}

impl RankingData {
    /// Loads the leaderboard, starting empty if the file is missing or
    /// unreadable.
    pub fn load<P: AsRef<Path>>(path: P) -> RankingData {
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ranking file is not valid JSON, starting empty: {}", e);
                RankingData::default()
            }),
            Err(_) => RankingData::default(),
        }
    }

    pub fn insert(&mut self, name: &str, score: f64) {
        self.entries.push(RankingEntry {
            name: name.to_string(),
            score,
        });
        // total_cmp keeps the sort well-defined even for NaN scores, which
        // the CLI accepts ("NaN" parses as an f64).
        self.entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).expect("ranking data serializes to JSON");
        fs::write(path, json)
    }

    pub fn entries(&self) -> &[RankingEntry] {
        &self.entries
    }
}
