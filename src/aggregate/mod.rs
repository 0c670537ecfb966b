//! Cross-match aggregation.
//!
//! - **career**: folds every map a player appears in into a per-player
//!   accumulator keyed by name
//! - **series**: joins a series' maps by player name into one All Maps
//!   record per team
//!
//! Both are pure in-memory folds over already-loaded records. Player names
//! are the identity key throughout; two different players sharing a name
//! would be merged.

mod career;
mod series;

pub use career::*;
pub use series::*;

use thiserror::Error;

use crate::models::MatchError;

/// Errors that abort an aggregation pass.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("series `{series}`: {error}")]
    Series { series: String, error: MatchError },

    #[error("series `{0}` has no maps")]
    EmptySeries(String),

    #[error(transparent)]
    Match(#[from] MatchError),
}
