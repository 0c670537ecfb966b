//! Per-map match records.
//!
//! A `MatchRecord` is one map between two teams, exactly as it is stored in
//! a match JSON file. Records are immutable once loaded; derived values such
//! as estimated ratings are produced into copies, never written back.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_aux::field_attributes::deserialize_option_number_from_string;
use thiserror::Error;

use super::MatchId;

/// A match record that violates the structural invariants of a map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("{origin}: expected 2 teams, found {found}")]
    TeamCount { origin: String, found: usize },

    #[error("{origin}: team name is empty")]
    EmptyTeamName { origin: String },

    #[error("{origin}: both teams are named `{name}`")]
    DuplicateTeamName { origin: String, name: String },

    #[error("{origin}: player `{player}` is listed twice for `{team}`")]
    DuplicatePlayer {
        origin: String,
        team: String,
        player: String,
    },

    #[error("{origin}: player `{player}` appears on both teams")]
    PlayerOnBothTeams { origin: String, player: String },

    #[error("{origin}: teams {found:?} do not match series teams {expected:?}")]
    TeamMismatch {
        origin: String,
        expected: [String; 2],
        found: [String; 2],
    },
}

/// A required stat that is absent from a player's stats object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("missing required field `{0}`")]
pub struct MissingStat(pub &'static str);

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// A percentage such as KAST or HS%.
///
/// Accepts `72`, `72.5`, `"72"` or `"72%"` on input and always serializes as
/// a `"72%"` string, which is what the rendering layer prints.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Percent(pub f64);

impl Percent {
    pub fn value(self) -> f64 {
        self.0
    }

    fn parse(text: &str) -> Option<f64> {
        let trimmed = text.trim();
        let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        digits.parse().ok().filter(|v: &f64| v.is_finite())
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(n) => Ok(Percent(n)),
            NumberOrText::Text(s) => Percent::parse(&s)
                .map(Percent)
                .ok_or_else(|| de::Error::custom(format!("invalid percentage `{}`", s))),
        }
    }
}

/// Ratings show up both as numbers and as `"1.23"` strings depending on the
/// data era. An empty string means "not rated". `NaN` and infinities are
/// rejected.
fn deserialize_rating<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match deserialize_option_number_from_string::<f64, D>(deserializer)? {
        Some(rating) if !rating.is_finite() => Err(de::Error::custom(format!(
            "invalid rating `{}`",
            rating
        ))),
        rating => Ok(rating),
    }
}

/// Which team picked the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapPick {
    FirstTeam,
    SecondTeam,
    #[default]
    Unknown,
}

impl Serialize for MapPick {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MapPick::FirstTeam => serializer.serialize_bool(true),
            MapPick::SecondTeam => serializer.serialize_bool(false),
            MapPick::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for MapPick {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Bool(true) => MapPick::FirstTeam,
            serde_json::Value::Bool(false) => MapPick::SecondTeam,
            _ => MapPick::Unknown,
        })
    }
}

/// Outcome of one round, e.g. `elim`, `defuse`, `boom`, `time` or `none`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundEvent(pub String);

impl RoundEvent {
    pub fn is_none(&self) -> bool {
        self.0 == "none"
    }
}

/// Raw per-map stats as they appear in the match file.
///
/// Every field is optional at this layer so that a partially filled stats
/// object can be reported and skipped instead of failing the whole file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawStats {
    #[serde(
        default,
        deserialize_with = "deserialize_rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kast: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hs_percent: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fd: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fkfd_diff: Option<i64>,
}

/// Stats with every required field present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatLine {
    /// Externally supplied rating, if the record carried one.
    pub rating: Option<f64>,
    pub acs: u32,
    pub k: u32,
    pub d: u32,
    pub a: u32,
    pub fk: u32,
    pub fd: u32,
    pub kast: f64,
    pub adr: f64,
    pub hs_percent: f64,
}

impl RawStats {
    /// Check that every required stat is present.
    pub fn stat_line(&self) -> Result<StatLine, MissingStat> {
        Ok(StatLine {
            rating: self.rating,
            acs: self.acs.ok_or(MissingStat("acs"))?,
            k: self.k.ok_or(MissingStat("k"))?,
            d: self.d.ok_or(MissingStat("d"))?,
            a: self.a.ok_or(MissingStat("a"))?,
            fk: self.fk.ok_or(MissingStat("fk"))?,
            fd: self.fd.ok_or(MissingStat("fd"))?,
            kast: self.kast.ok_or(MissingStat("kast"))?.value(),
            adr: self.adr.ok_or(MissingStat("adr"))?,
            hs_percent: self.hs_percent.ok_or(MissingStat("hs_percent"))?.value(),
        })
    }
}

/// One player's line for one map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatchRecord {
    /// Global identity key. Player names are assumed to be unique across the
    /// whole data set.
    pub name: String,
    #[serde(default)]
    pub nationality: String,
    /// Agents piloted on this map, primary agent first.
    #[serde(default)]
    pub agents: Vec<String>,
    /// Required. An incomplete object is tolerated, a missing one is not.
    pub stats: RawStats,
}

impl PlayerMatchRecord {
    pub fn primary_agent(&self) -> Option<&str> {
        self.agents.first().map(String::as_str)
    }

    /// Validated stats for aggregation. A player without agents is treated
    /// the same as one with missing stats.
    pub fn stat_line(&self) -> Result<StatLine, MissingStat> {
        if self.agents.is_empty() {
            return Err(MissingStat("agents"));
        }
        self.stats.stat_line()
    }
}

/// One team's side of a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_name: String,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_history: Option<Vec<RoundEvent>>,
    #[serde(default)]
    pub players: Vec<PlayerMatchRecord>,
}

impl TeamRecord {
    pub fn player(&self, name: &str) -> Option<&PlayerMatchRecord> {
        self.players.iter().find(|p| p.name == name)
    }
}

/// One map between two teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub map: String,
    #[serde(default)]
    pub map_pick: MapPick,
    pub teams: Vec<TeamRecord>,
}

impl MatchRecord {
    /// Check the structural invariants: two distinct, named teams and no
    /// player listed twice.
    pub fn validate(&self, origin: &str) -> Result<(), MatchError> {
        if self.teams.len() != 2 {
            return Err(MatchError::TeamCount {
                origin: origin.to_string(),
                found: self.teams.len(),
            });
        }

        for team in &self.teams {
            if team.team_name.trim().is_empty() {
                return Err(MatchError::EmptyTeamName {
                    origin: origin.to_string(),
                });
            }
        }

        if self.teams[0].team_name == self.teams[1].team_name {
            return Err(MatchError::DuplicateTeamName {
                origin: origin.to_string(),
                name: self.teams[0].team_name.clone(),
            });
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for team in &self.teams {
            let mut on_team: HashSet<&str> = HashSet::new();
            for player in &team.players {
                if !on_team.insert(&player.name) {
                    return Err(MatchError::DuplicatePlayer {
                        origin: origin.to_string(),
                        team: team.team_name.clone(),
                        player: player.name.clone(),
                    });
                }
            }
            for name in on_team {
                if !seen.insert(name) {
                    return Err(MatchError::PlayerOnBothTeams {
                        origin: origin.to_string(),
                        player: name.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Rounds played on the map: the sum of both scores.
    pub fn total_rounds(&self) -> u32 {
        self.teams.iter().map(|t| t.score).sum()
    }

    pub fn team(&self, name: &str) -> Option<&TeamRecord> {
        self.teams.iter().find(|t| t.team_name == name)
    }

    /// Team names in slot order. Only meaningful on a validated record.
    pub fn team_names(&self) -> [String; 2] {
        [
            self.teams[0].team_name.clone(),
            self.teams[1].team_name.clone(),
        ]
    }

    /// Index of the team with the strictly higher score. A tied map has no
    /// winner, which every consumer counts as a loss for both sides.
    pub fn winner_index(&self) -> Option<usize> {
        match self.teams[0].score.cmp(&self.teams[1].score) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// A match record together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMatch {
    pub id: MatchId,
    /// Series/date grouping key, e.g. `20260213`.
    pub date: String,
    /// Human-readable origin used in error messages, usually the file path.
    pub origin: String,
    pub record: MatchRecord,
}

impl LoadedMatch {
    pub fn new(
        date: impl Into<String>,
        stem: &str,
        origin: impl Into<String>,
        record: MatchRecord,
    ) -> Self {
        let date = date.into();
        Self {
            id: MatchId::for_match_file(&date, stem),
            date,
            origin: origin.into(),
            record,
        }
    }

    /// Stable processing order: chronological by date key, then by origin.
    pub fn order_key(&self) -> (DateOrder, &str) {
        (DateOrder::of(&self.date), &self.origin)
    }
}

/// Sort key for date keys. Keys that parse as `YYYYMMDD` or `YYYY-MM-DD`
/// order by date; anything else sorts after them, by text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateOrder {
    Dated(NaiveDate, String),
    Undated(String),
}

impl DateOrder {
    pub fn of(key: &str) -> Self {
        NaiveDate::parse_from_str(key, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(key, "%Y-%m-%d"))
            .map(|date| DateOrder::Dated(date, key.to_string()))
            .unwrap_or_else(|_| DateOrder::Undated(key.to_string()))
    }
}
