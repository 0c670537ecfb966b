//! Statistics calculation helpers.
//!
//! Shared by both aggregators:
//! - Guarded division for every ratio
//! - Rounding to display precision
//! - The per-map rating estimator

mod rating;

pub use rating::*;

/// Divide, yielding 0.0 when the denominator is zero.
///
/// Every finalized ratio goes through here so that an empty accumulator
/// finalizes to zeros instead of NaN.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Round to two decimals, the precision ratings are shown with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to the nearest whole number, clamped at zero.
pub fn round_whole(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// Kills per death, counting zero deaths as one.
pub fn kd_ratio(kills: u32, deaths: u32) -> f64 {
    kills as f64 / deaths.max(1) as f64
}

/// Calculate win rate from wins and maps played.
pub fn calculate_win_rate(wins: u32, played: u32) -> f64 {
    safe_div(wins as f64, played as f64)
}
