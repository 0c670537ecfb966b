//! Series ("All Maps") records.
//!
//! These are recomputed from a series' map list on every build and never
//! persisted as a source of truth.

use serde::{Deserialize, Serialize};

use super::{MatchRecord, Percent};

/// Series-level stats for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatLine {
    /// Mean of the per-map ratings, `None` if no map carried one.
    pub rating: Option<f64>,
    pub acs: u32,
    pub k: u32,
    pub d: u32,
    pub a: u32,
    pub diff: i64,
    pub kast: Percent,
    pub adr: u32,
    pub hs_percent: Percent,
    pub fk: u32,
    pub fd: u32,
    pub fkfd_diff: i64,
}

/// One player's row in the All Maps table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPlayerLine {
    pub name: String,
    pub nationality: String,
    /// Union of agents across maps, in first-played order.
    pub agents: Vec<String>,
    pub maps_played: u32,
    pub stats: SeriesStatLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTeam {
    pub team_name: String,
    /// Sorted by rating, descending.
    pub players: Vec<SeriesPlayerLine>,
}

/// The synthetic All Maps record for a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesAllMapsRecord {
    pub title: String,
    pub map: String,
    /// Maps won per team slot.
    pub series_score: [u32; 2],
    pub teams: Vec<SeriesTeam>,
}

impl SeriesAllMapsRecord {
    pub const TITLE: &'static str = "All Maps";
    pub const MAP_LABEL: &'static str = "Overall Stats";

    pub fn team(&self, name: &str) -> Option<&SeriesTeam> {
        self.teams.iter().find(|t| t.team_name == name)
    }
}

/// One map of a series with derived ratings filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// 1-based position within the series.
    pub number: usize,
    pub title: String,
    pub record: MatchRecord,
}

impl MapView {
    pub fn new(number: usize, record: MatchRecord) -> Self {
        Self {
            number,
            title: format!("{} {}", number, record.map),
            record,
        }
    }
}

/// Everything a series detail page needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesView {
    pub key: String,
    pub all_maps: SeriesAllMapsRecord,
    pub maps: Vec<MapView>,
}
