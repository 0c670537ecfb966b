//! Core data models for match statistics.

mod career;
mod ids;
mod match_record;
mod series;

pub use career::*;
pub use ids::*;
pub use match_record::*;
pub use series::*;
