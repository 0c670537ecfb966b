//! Career aggregation: one accumulator per player name across every map.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::AggregateError;
use crate::calculate::RatingModel;
use crate::models::{CareerSummary, LoadedMatch, MatchHistoryEntry, PlayerCareerAccumulator};

/// Per-player career accumulators keyed by player name.
///
/// The book is an explicit value: it is passed into and returned from
/// `aggregate_careers`, so a build can fold matches in several batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CareerBook {
    players: BTreeMap<String, PlayerCareerAccumulator>,
}

impl CareerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PlayerCareerAccumulator> {
        self.players.get(name)
    }

    /// Accumulators in name order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerCareerAccumulator> {
        self.players.values()
    }

    /// Fold one map into the book.
    ///
    /// A malformed record is rejected before anything is touched. Players
    /// whose stats are incomplete are logged and skipped.
    pub fn record_match(
        &mut self,
        loaded: &LoadedMatch,
        model: &RatingModel,
    ) -> Result<(), AggregateError> {
        let record = &loaded.record;
        record.validate(&loaded.origin)?;

        let total_rounds = record.total_rounds();
        if total_rounds == 0 {
            debug!(origin = %loaded.origin, "zero-round map, no rating contribution");
        }
        let winner = record.winner_index();
        let rounds = total_rounds as f64;

        for (idx, team) in record.teams.iter().enumerate() {
            let opponent = &record.teams[1 - idx];
            let is_win = winner == Some(idx);

            for player in &team.players {
                let line = match player.stat_line() {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(
                            origin = %loaded.origin,
                            player = %player.name,
                            "skipping player: {}",
                            e
                        );
                        continue;
                    }
                };
                let rating = model.effective_rating(&line, total_rounds);

                let acc = self
                    .players
                    .entry(player.name.clone())
                    .or_insert_with(|| PlayerCareerAccumulator::new(player.name.clone()));

                acc.last_seen.nationality = player.nationality.clone();
                acc.last_seen.current_team = team.team_name.clone();

                acc.history.push(MatchHistoryEntry {
                    match_id: loaded.id.clone(),
                    date: loaded.date.clone(),
                    map: record.map.clone(),
                    team: team.team_name.clone(),
                    opponent_team: opponent.team_name.clone(),
                    score: format!("{} : {}", team.score, opponent.score),
                    is_win,
                    agent: player.primary_agent().unwrap_or_default().to_string(),
                    stats: player.stats.clone(),
                });

                for agent in &player.agents {
                    let usage = acc.agent_mut(agent);
                    usage.use_count += 1;
                    if let Some(rating) = rating {
                        usage.rated_count += 1;
                        usage.rating_sum += rating;
                    }
                    usage.acs_sum += line.acs as f64;
                    usage.k_sum += line.k;
                    usage.d_sum += line.d;
                    usage.adr_sum += line.adr;
                }

                let totals = &mut acc.totals;
                totals.matches += 1;
                if is_win {
                    totals.wins += 1;
                }
                totals.rounds_played += total_rounds;
                if let Some(rating) = rating {
                    totals.rated_rounds += total_rounds;
                    totals.rating_weighted_sum += rating * rounds;
                }
                totals.acs_weighted_sum += line.acs as f64 * rounds;
                totals.adr_weighted_sum += line.adr * rounds;
                totals.kast_weighted_sum += line.kast * rounds;
                totals.hs_weighted_sum += line.hs_percent * rounds;
                totals.k += line.k;
                totals.d += line.d;
                totals.a += line.a;
                totals.fk += line.fk;
                totals.fd += line.fd;
            }
        }

        Ok(())
    }

    /// Finalized summaries for every player, in name order.
    pub fn summaries(&self, top_agents: usize) -> Vec<CareerSummary> {
        self.players().map(|p| p.finalize(top_agents)).collect()
    }
}

/// Fold `matches` into `book` in chronological order and hand it back.
pub fn aggregate_careers(
    mut book: CareerBook,
    matches: &[LoadedMatch],
    model: &RatingModel,
) -> Result<CareerBook, AggregateError> {
    let mut ordered: Vec<&LoadedMatch> = matches.iter().collect();
    ordered.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

    for loaded in ordered {
        book.record_match(loaded, model)?;
    }

    debug!(players = book.len(), maps = matches.len(), "career fold complete");
    Ok(book)
}
