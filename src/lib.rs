//! # Valorant Stats
//!
//! Build pipeline core for a static Valorant statistics site.
//!
//! ## Architecture
//!
//! - **models**: Match records, career accumulators and series views
//! - **calculate**: Guarded ratios, rounding and the per-map rating estimate
//! - **aggregate**: Career and series ("All Maps") aggregation
//! - **storage**: Match file loading and JSON/JSONL outputs
//! - **convert**: Raw game-client captures to match records
//! - **pipeline**: One full generation pass
//! - **config**: Configuration loading and validation

pub mod aggregate;
pub mod calculate;
pub mod config;
pub mod convert;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use models::*;
