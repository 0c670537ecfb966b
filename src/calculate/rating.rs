//! Per-map rating estimator.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::round2;
use crate::models::{MatchRecord, StatLine};

/// Coefficients of the rating estimate
/// `base + acs/acs_scale*acs_weight + k/rounds*kpr_weight + adr/adr_scale*adr_weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingModel {
    #[serde(default = "default_base")]
    pub base: f64,
    #[serde(default = "default_acs_scale")]
    pub acs_scale: f64,
    #[serde(default = "default_acs_weight")]
    pub acs_weight: f64,
    #[serde(default = "default_kpr_weight")]
    pub kpr_weight: f64,
    #[serde(default = "default_adr_scale")]
    pub adr_scale: f64,
    #[serde(default = "default_adr_weight")]
    pub adr_weight: f64,
}

fn default_base() -> f64 {
    0.3
}

fn default_acs_scale() -> f64 {
    200.0
}

fn default_acs_weight() -> f64 {
    0.5
}

fn default_kpr_weight() -> f64 {
    0.5
}

fn default_adr_scale() -> f64 {
    150.0
}

fn default_adr_weight() -> f64 {
    0.2
}

impl Default for RatingModel {
    fn default() -> Self {
        Self {
            base: default_base(),
            acs_scale: default_acs_scale(),
            acs_weight: default_acs_weight(),
            kpr_weight: default_kpr_weight(),
            adr_scale: default_adr_scale(),
            adr_weight: default_adr_weight(),
        }
    }
}

impl RatingModel {
    /// Estimate a single-map rating, rounded to two decimals.
    ///
    /// Returns `None` for a map with zero rounds; callers exclude such maps
    /// from rating averages rather than counting them as zero.
    pub fn estimate(&self, acs: f64, kills: u32, adr: f64, total_rounds: u32) -> Option<f64> {
        if total_rounds == 0 {
            return None;
        }

        let kpr = kills as f64 / total_rounds as f64;
        let rating = self.base
            + acs / self.acs_scale * self.acs_weight
            + kpr * self.kpr_weight
            + adr / self.adr_scale * self.adr_weight;

        Some(round2(rating))
    }

    /// The rating to aggregate for one player on one map: a rating carried by
    /// the record is trusted as-is, otherwise it is estimated.
    pub fn effective_rating(&self, stats: &StatLine, total_rounds: u32) -> Option<f64> {
        stats
            .rating
            .or_else(|| self.estimate(stats.acs as f64, stats.k, stats.adr, total_rounds))
    }

    /// Copy of `record` with every missing rating filled in where it can be
    /// estimated. Existing ratings are never overwritten.
    pub fn with_derived_ratings(&self, record: &MatchRecord) -> MatchRecord {
        let total_rounds = record.total_rounds();
        let mut derived = record.clone();

        if total_rounds == 0 {
            debug!(map = %record.map, "zero-round map, ratings left unset");
            return derived;
        }

        for team in &mut derived.teams {
            for player in &mut team.players {
                if player.stats.rating.is_some() {
                    continue;
                }
                if let (Some(acs), Some(k), Some(adr)) =
                    (player.stats.acs, player.stats.k, player.stats.adr)
                {
                    player.stats.rating = self.estimate(acs as f64, k, adr, total_rounds);
                }
            }
        }

        derived
    }

    /// Check that the scales are usable as divisors.
    pub fn validate(&self) -> Result<(), String> {
        if self.acs_scale <= 0.0 {
            return Err("rating.acs_scale must be greater than 0".to_string());
        }
        if self.adr_scale <= 0.0 {
            return Err("rating.adr_scale must be greater than 0".to_string());
        }
        Ok(())
    }
}
