//! Filesystem input and output.
//!
//! - Match JSON files under `<matches_dir>/<date>/<name>.json`
//! - Derived JSONL/JSON outputs for the rendering layer

pub mod jsonl;
pub mod loader;
pub mod output;

pub use jsonl::{JsonlReader, JsonlWriter};
pub use loader::{discover_match_files, load_match_file, load_matches, partition_series};
pub use output::{read_player, read_players, write_index, write_players, write_series, SiteIndex};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse {path:?}: {error}")]
    Parse {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to read directory entry: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub matches_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(matches_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            matches_dir,
            output_dir,
        }
    }

    /// One finalized career summary per line.
    pub fn players_path(&self) -> PathBuf {
        self.output_dir.join("players.jsonl")
    }

    pub fn series_dir(&self) -> PathBuf {
        self.output_dir.join("series")
    }

    pub fn series_path(&self, key: &str) -> PathBuf {
        self.series_dir().join(format!("{}.json", key))
    }

    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join("index.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./matches"), PathBuf::from("./output"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/in"), PathBuf::from("/out"));

        assert_eq!(config.players_path(), PathBuf::from("/out/players.jsonl"));
        assert_eq!(config.series_dir(), PathBuf::from("/out/series"));
        assert_eq!(
            config.series_path("20260213"),
            PathBuf::from("/out/series/20260213.json")
        );
        assert_eq!(config.index_path(), PathBuf::from("/out/index.json"));
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.matches_dir, PathBuf::from("./matches"));
        assert_eq!(config.output_dir, PathBuf::from("./output"));
    }
}
