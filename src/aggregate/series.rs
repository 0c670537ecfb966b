//! Series aggregation: the "All Maps" view of a best-of-N.
//!
//! Players are joined across maps by name, never by position. Rosters can
//! differ between maps (substitutes, a coach listed on one map only, a
//! different player order), and positional alignment would silently credit
//! one player's stats to another.

use tracing::{debug, warn};

use super::AggregateError;
use crate::calculate::{round2, round_whole, safe_div, RatingModel};
use crate::models::{
    LoadedMatch, MapView, MatchError, Percent, PlayerMatchRecord, SeriesAllMapsRecord,
    SeriesPlayerLine, SeriesStatLine, SeriesTeam, SeriesView, StatLine,
};

/// Sums for one player over the maps of a series.
#[derive(Debug, Default)]
struct SeriesAccumulator {
    maps: u32,
    rated_maps: u32,
    rating_sum: f64,
    acs_sum: f64,
    adr_sum: f64,
    kast_sum: f64,
    hs_sum: f64,
    k: u32,
    d: u32,
    a: u32,
    fk: u32,
    fd: u32,
    agents: Vec<String>,
    nationality: String,
}

impl SeriesAccumulator {
    fn add(&mut self, player: &PlayerMatchRecord, line: &StatLine, rating: Option<f64>) {
        self.maps += 1;
        if let Some(rating) = rating {
            self.rated_maps += 1;
            self.rating_sum += rating;
        }
        self.acs_sum += line.acs as f64;
        self.adr_sum += line.adr;
        self.kast_sum += line.kast;
        self.hs_sum += line.hs_percent;
        self.k += line.k;
        self.d += line.d;
        self.a += line.a;
        self.fk += line.fk;
        self.fd += line.fd;
        self.nationality = player.nationality.clone();

        for agent in &player.agents {
            if !self.agents.contains(agent) {
                self.agents.push(agent.clone());
            }
        }
    }

    /// `None` when no map contributed.
    fn finalize(self, name: &str) -> Option<SeriesPlayerLine> {
        if self.maps == 0 {
            return None;
        }
        let maps = self.maps as f64;

        let rating = if self.rated_maps > 0 {
            Some(round2(self.rating_sum / self.rated_maps as f64))
        } else {
            None
        };

        Some(SeriesPlayerLine {
            name: name.to_string(),
            nationality: self.nationality,
            agents: self.agents,
            maps_played: self.maps,
            stats: SeriesStatLine {
                rating,
                acs: round_whole(safe_div(self.acs_sum, maps)),
                k: self.k,
                d: self.d,
                a: self.a,
                diff: self.k as i64 - self.d as i64,
                kast: Percent(round_whole(safe_div(self.kast_sum, maps)) as f64),
                adr: round_whole(safe_div(self.adr_sum, maps)),
                hs_percent: Percent(round_whole(safe_div(self.hs_sum, maps)) as f64),
                fk: self.fk,
                fd: self.fd,
                fkfd_diff: self.fk as i64 - self.fd as i64,
            },
        })
    }
}

/// Build the All Maps record for one series.
///
/// `maps` must be non-empty and every map must be played between the same
/// two teams. Team slots follow the first map.
pub fn aggregate_series(
    key: &str,
    maps: &[LoadedMatch],
    model: &RatingModel,
) -> Result<SeriesAllMapsRecord, AggregateError> {
    let series_error = |error: MatchError| AggregateError::Series {
        series: key.to_string(),
        error,
    };

    let first = maps
        .first()
        .ok_or_else(|| AggregateError::EmptySeries(key.to_string()))?;

    for m in maps {
        m.record.validate(&m.origin).map_err(series_error)?;
    }

    let names = first.record.team_names();
    for m in &maps[1..] {
        let found = m.record.team_names();
        let same_teams = found == names || (found[0] == names[1] && found[1] == names[0]);
        if !same_teams {
            return Err(series_error(MatchError::TeamMismatch {
                origin: m.origin.clone(),
                expected: names.clone(),
                found,
            }));
        }
    }

    // Tallied by name so a map with swapped slots still credits the right
    // side. A tied map credits neither.
    let mut series_score = [0u32; 2];
    for m in maps {
        if let Some(winner) = m.record.winner_index() {
            let slot = if m.record.teams[winner].team_name == names[0] {
                0
            } else {
                1
            };
            series_score[slot] += 1;
        }
    }

    let teams = names
        .iter()
        .map(|team_name| SeriesTeam {
            team_name: team_name.clone(),
            players: join_team(key, team_name, maps, model),
        })
        .collect();

    debug!(series = %key, maps = maps.len(), ?series_score, "series aggregated");

    Ok(SeriesAllMapsRecord {
        title: SeriesAllMapsRecord::TITLE.to_string(),
        map: SeriesAllMapsRecord::MAP_LABEL.to_string(),
        series_score,
        teams,
    })
}

/// All Maps lines for one team, sorted by rating.
fn join_team(
    key: &str,
    team_name: &str,
    maps: &[LoadedMatch],
    model: &RatingModel,
) -> Vec<SeriesPlayerLine> {
    let mut roster: Vec<&str> = Vec::new();
    for m in maps {
        if let Some(team) = m.record.team(team_name) {
            for p in &team.players {
                if !roster.contains(&p.name.as_str()) {
                    roster.push(&p.name);
                }
            }
        }
    }

    let mut lines = Vec::with_capacity(roster.len());
    for name in roster {
        let mut acc = SeriesAccumulator::default();

        for m in maps {
            let player = match m.record.team(team_name).and_then(|t| t.player(name)) {
                Some(player) => player,
                None => continue,
            };

            match player.stat_line() {
                Ok(line) => {
                    let rating = model.effective_rating(&line, m.record.total_rounds());
                    acc.add(player, &line, rating);
                }
                Err(e) => warn!(
                    series = %key,
                    origin = %m.origin,
                    player = %name,
                    "skipping player for this map: {}",
                    e
                ),
            }
        }

        if let Some(line) = acc.finalize(name) {
            lines.push(line);
        }
    }

    // Stable: equal ratings keep roster discovery order. Unrated last.
    lines.sort_by(|a, b| {
        let ra = a.stats.rating.unwrap_or(f64::NEG_INFINITY);
        let rb = b.stats.rating.unwrap_or(f64::NEG_INFINITY);
        rb.total_cmp(&ra)
    });
    lines
}

/// The All Maps record followed by every map with derived ratings.
pub fn build_series_view(
    key: &str,
    maps: &[LoadedMatch],
    model: &RatingModel,
) -> Result<SeriesView, AggregateError> {
    let all_maps = aggregate_series(key, maps, model)?;
    let maps = maps
        .iter()
        .enumerate()
        .map(|(i, m)| MapView::new(i + 1, model.with_derived_ratings(&m.record)))
        .collect();

    Ok(SeriesView {
        key: key.to_string(),
        all_maps,
        maps,
    })
}
