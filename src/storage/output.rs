//! Derived outputs consumed by the rendering layer.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::models::{CareerSummary, SeriesView};

/// Top-level listing of what a build produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteIndex {
    pub generated_at: DateTime<Utc>,
    /// Series key shown on the landing page.
    pub featured: Option<String>,
    /// Series keys, oldest first.
    pub series: Vec<String>,
    /// Player names in name order.
    pub players: Vec<String>,
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn write_players(
    config: &StorageConfig,
    summaries: &[CareerSummary],
) -> Result<usize, StorageError> {
    JsonlWriter::new(config.players_path()).write_all(summaries)
}

pub fn read_players(config: &StorageConfig) -> Result<Vec<CareerSummary>, StorageError> {
    JsonlReader::new(config.players_path()).read_all()
}

/// Look up one player's career by exact name.
pub fn read_player(
    config: &StorageConfig,
    name: &str,
) -> Result<Option<CareerSummary>, StorageError> {
    let found = JsonlReader::new(config.players_path())
        .read_where(|p: &CareerSummary| p.name == name)?;
    Ok(found.into_iter().next())
}

pub fn write_series(config: &StorageConfig, view: &SeriesView) -> Result<(), StorageError> {
    let path = config.series_path(&view.key);
    write_pretty(&path, view)?;
    info!("Wrote series {} ({} maps) to {:?}", view.key, view.maps.len(), path);
    Ok(())
}

pub fn write_index(config: &StorageConfig, index: &SiteIndex) -> Result<(), StorageError> {
    write_pretty(&config.index_path(), index)
}
