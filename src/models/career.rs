//! Per-player career accumulators and their finalized summaries.
//!
//! The accumulator only ever stores sums and counts. Averages are computed
//! at read time by `finalize`, so folding matches in any order (or in any
//! partition) gives the same totals.

use serde::{Deserialize, Serialize};

use super::{MatchId, RawStats};
use crate::calculate::{kd_ratio, round2, round_whole, safe_div};

/// One map in a player's match history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchHistoryEntry {
    pub match_id: MatchId,
    pub date: String,
    pub map: String,
    pub team: String,
    pub opponent_team: String,
    /// Display score from the player's side, e.g. `13 : 11`.
    pub score: String,
    /// Strictly more rounds than the opponent. A tie counts as a loss.
    pub is_win: bool,
    /// First agent piloted on the map.
    pub agent: String,
    pub stats: RawStats,
}

/// Running totals for one agent. Averages over these are per map played,
/// not per round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentUsage {
    pub agent: String,
    pub use_count: u32,
    /// Maps that contributed to `rating_sum`.
    pub rated_count: u32,
    pub rating_sum: f64,
    pub acs_sum: f64,
    pub k_sum: u32,
    pub d_sum: u32,
    pub adr_sum: f64,
}

impl AgentUsage {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            use_count: 0,
            rated_count: 0,
            rating_sum: 0.0,
            acs_sum: 0.0,
            k_sum: 0,
            d_sum: 0,
            adr_sum: 0.0,
        }
    }

    pub fn finalize(&self) -> AgentSummary {
        let uses = self.use_count as f64;
        AgentSummary {
            agent: self.agent.clone(),
            use_count: self.use_count,
            rating: round2(safe_div(self.rating_sum, self.rated_count as f64)),
            acs: round_whole(safe_div(self.acs_sum, uses)),
            kd: round2(kd_ratio(self.k_sum, self.d_sum)),
            adr: round_whole(safe_div(self.adr_sum, uses)),
        }
    }
}

/// Finalized per-agent averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent: String,
    pub use_count: u32,
    pub rating: f64,
    pub acs: u32,
    pub kd: f64,
    pub adr: u32,
}

/// Round-weighted career totals.
///
/// Rate stats (acs, rating, adr, kast, hs%) are stored as
/// `value * rounds_in_match`; count stats are plain sums.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerTotals {
    pub matches: u32,
    pub wins: u32,
    pub rounds_played: u32,
    /// Rounds from maps that had a rating.
    pub rated_rounds: u32,
    pub acs_weighted_sum: f64,
    pub rating_weighted_sum: f64,
    pub adr_weighted_sum: f64,
    pub kast_weighted_sum: f64,
    pub hs_weighted_sum: f64,
    pub k: u32,
    pub d: u32,
    pub a: u32,
    pub fk: u32,
    pub fd: u32,
}

impl CareerTotals {
    /// Add another set of totals into this one.
    pub fn merge(&mut self, other: &CareerTotals) {
        self.matches += other.matches;
        self.wins += other.wins;
        self.rounds_played += other.rounds_played;
        self.rated_rounds += other.rated_rounds;
        self.acs_weighted_sum += other.acs_weighted_sum;
        self.rating_weighted_sum += other.rating_weighted_sum;
        self.adr_weighted_sum += other.adr_weighted_sum;
        self.kast_weighted_sum += other.kast_weighted_sum;
        self.hs_weighted_sum += other.hs_weighted_sum;
        self.k += other.k;
        self.d += other.d;
        self.a += other.a;
        self.fk += other.fk;
        self.fd += other.fd;
    }

    /// Compute the career averages. With no rounds played every rate is 0.
    pub fn finalize(&self) -> CareerRates {
        let rounds = self.rounds_played as f64;
        CareerRates {
            rating: round2(safe_div(self.rating_weighted_sum, self.rated_rounds as f64)),
            acs: round_whole(safe_div(self.acs_weighted_sum, rounds)),
            adr: round_whole(safe_div(self.adr_weighted_sum, rounds)),
            kast: round_whole(safe_div(self.kast_weighted_sum, rounds)),
            hs_percent: round_whole(safe_div(self.hs_weighted_sum, rounds)),
            kd: round2(kd_ratio(self.k, self.d)),
            kpr: round2(safe_div(self.k as f64, rounds)),
            apr: round2(safe_div(self.a as f64, rounds)),
            fkpr: round2(safe_div(self.fk as f64, rounds)),
            fdpr: round2(safe_div(self.fd as f64, rounds)),
            win_rate: round2(crate::calculate::calculate_win_rate(self.wins, self.matches)),
        }
    }
}

/// Finalized career averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerRates {
    pub rating: f64,
    pub acs: u32,
    pub adr: u32,
    pub kast: u32,
    pub hs_percent: u32,
    pub kd: f64,
    pub kpr: f64,
    pub apr: f64,
    pub fkpr: f64,
    pub fdpr: f64,
    pub win_rate: f64,
}

/// Fields where the most recent match wins. These depend on fold order,
/// unlike everything in `CareerTotals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastSeen {
    pub nationality: String,
    pub current_team: String,
}

/// Everything known about one player across the data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCareerAccumulator {
    pub name: String,
    pub last_seen: LastSeen,
    /// Append-only, in fold order.
    pub history: Vec<MatchHistoryEntry>,
    /// In order of first use.
    pub agent_usage: Vec<AgentUsage>,
    pub totals: CareerTotals,
}

impl PlayerCareerAccumulator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_seen: LastSeen::default(),
            history: Vec::new(),
            agent_usage: Vec::new(),
            totals: CareerTotals::default(),
        }
    }

    /// Usage entry for `agent`, created on first use.
    pub fn agent_mut(&mut self, agent: &str) -> &mut AgentUsage {
        let idx = match self.agent_usage.iter().position(|a| a.agent == agent) {
            Some(idx) => idx,
            None => {
                self.agent_usage.push(AgentUsage::new(agent));
                self.agent_usage.len() - 1
            }
        };
        &mut self.agent_usage[idx]
    }

    /// Most-used agents, ties kept in first-seen order.
    pub fn top_agents(&self, limit: usize) -> Vec<AgentSummary> {
        let mut agents: Vec<&AgentUsage> = self.agent_usage.iter().collect();
        agents.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        agents.into_iter().take(limit).map(AgentUsage::finalize).collect()
    }

    pub fn finalize(&self, top_agents: usize) -> CareerSummary {
        CareerSummary {
            name: self.name.clone(),
            nationality: self.last_seen.nationality.clone(),
            current_team: self.last_seen.current_team.clone(),
            matches: self.totals.matches,
            wins: self.totals.wins,
            rounds_played: self.totals.rounds_played,
            k: self.totals.k,
            d: self.totals.d,
            a: self.totals.a,
            fk: self.totals.fk,
            fd: self.totals.fd,
            rates: self.totals.finalize(),
            top_agents: self.top_agents(top_agents),
            history: self.history.iter().rev().cloned().collect(),
        }
    }
}

/// Read-time view of a player's career, as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerSummary {
    pub name: String,
    pub nationality: String,
    pub current_team: String,
    pub matches: u32,
    pub wins: u32,
    pub rounds_played: u32,
    pub k: u32,
    pub d: u32,
    pub a: u32,
    pub fk: u32,
    pub fd: u32,
    pub rates: CareerRates,
    pub top_agents: Vec<AgentSummary>,
    /// Newest first.
    pub history: Vec<MatchHistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_totals_finalize_to_zero() {
        let rates = CareerTotals::default().finalize();
        assert_eq!(rates, CareerRates::default());
        assert!(!rates.rating.is_nan());
        assert!(!rates.kpr.is_nan());
    }

    #[test]
    fn test_totals_finalize() {
        let totals = CareerTotals {
            matches: 2,
            wins: 1,
            rounds_played: 46,
            rated_rounds: 46,
            acs_weighted_sum: 250.0 * 24.0 + 210.0 * 22.0,
            rating_weighted_sum: 1.5 * 24.0 + 1.0 * 22.0,
            adr_weighted_sum: 160.0 * 24.0 + 140.0 * 22.0,
            kast_weighted_sum: 75.0 * 46.0,
            hs_weighted_sum: 25.0 * 46.0,
            k: 38,
            d: 31,
            a: 9,
            fk: 6,
            fd: 4,
        };
        let rates = totals.finalize();

        // (6000 + 4620) / 46 = 230.87
        assert_eq!(rates.acs, 231);
        // (36 + 22) / 46 = 1.26
        assert_eq!(rates.rating, 1.26);
        assert_eq!(rates.kast, 75);
        assert_eq!(rates.hs_percent, 25);
        assert_eq!(rates.kd, 1.23);
        assert_eq!(rates.kpr, 0.83);
        assert_eq!(rates.win_rate, 0.5);
    }

    #[test]
    fn test_rating_ignores_unrated_rounds() {
        let totals = CareerTotals {
            rounds_played: 40,
            rated_rounds: 20,
            rating_weighted_sum: 1.2 * 20.0,
            ..CareerTotals::default()
        };
        assert_eq!(totals.finalize().rating, 1.2);
    }

    #[test]
    fn test_totals_merge() {
        let mut a = CareerTotals {
            matches: 1,
            rounds_played: 24,
            k: 20,
            acs_weighted_sum: 6000.0,
            ..CareerTotals::default()
        };
        let b = CareerTotals {
            matches: 1,
            rounds_played: 22,
            k: 18,
            acs_weighted_sum: 4620.0,
            ..CareerTotals::default()
        };
        a.merge(&b);
        assert_eq!(a.matches, 2);
        assert_eq!(a.rounds_played, 46);
        assert_eq!(a.k, 38);
        assert_eq!(a.acs_weighted_sum, 10620.0);
    }

    #[test]
    fn test_agent_usage_finalize() {
        let usage = AgentUsage {
            agent: "jett".to_string(),
            use_count: 2,
            rated_count: 2,
            rating_sum: 2.5,
            acs_sum: 461.0,
            k_sum: 38,
            d_sum: 0,
            adr_sum: 300.0,
        };
        let summary = usage.finalize();
        assert_eq!(summary.rating, 1.25);
        assert_eq!(summary.acs, 231);
        assert_eq!(summary.kd, 38.0);
        assert_eq!(summary.adr, 150);
    }

    #[test]
    fn test_agent_usage_finalize_unused() {
        let summary = AgentUsage::new("sage").finalize();
        assert_eq!(summary.rating, 0.0);
        assert_eq!(summary.acs, 0);
    }

    #[test]
    fn test_top_agents_ties_keep_first_seen() {
        let mut acc = PlayerCareerAccumulator::new("Fox");
        for (agent, uses) in [("omen", 1), ("jett", 3), ("sova", 1), ("raze", 3), ("kayo", 1)] {
            acc.agent_mut(agent).use_count = uses;
        }

        let top: Vec<String> = acc.top_agents(3).into_iter().map(|a| a.agent).collect();
        assert_eq!(top, vec!["jett", "raze", "omen"]);
    }

    #[test]
    fn test_agent_mut_reuses_entry() {
        let mut acc = PlayerCareerAccumulator::new("Fox");
        acc.agent_mut("jett").use_count += 1;
        acc.agent_mut("jett").use_count += 1;
        assert_eq!(acc.agent_usage.len(), 1);
        assert_eq!(acc.agent_usage[0].use_count, 2);
    }

    #[test]
    fn test_finalize_reverses_history() {
        let mut acc = PlayerCareerAccumulator::new("Fox");
        for map in ["Ascent", "Bind"] {
            acc.history.push(MatchHistoryEntry {
                match_id: MatchId::from(map),
                date: "20260213".to_string(),
                map: map.to_string(),
                team: "Alpha".to_string(),
                opponent_team: "Beta".to_string(),
                score: "13 : 11".to_string(),
                is_win: true,
                agent: "jett".to_string(),
                stats: RawStats::default(),
            });
        }
        let summary = acc.finalize(3);
        assert_eq!(summary.history[0].map, "Bind");
        assert_eq!(summary.history[1].map, "Ascent");
    }
}
