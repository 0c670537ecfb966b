//! Build orchestrator.
//!
//! One generation pass:
//! 1. Load every match file in processing order
//! 2. Fold all maps into career accumulators
//! 3. Aggregate each date key into a series view
//! 4. Write players, series and the index

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::{aggregate_careers, build_series_view, AggregateError, CareerBook};
use crate::calculate::RatingModel;
use crate::config::AppConfig;
use crate::models::{CareerSummary, DateOrder, LoadedMatch, SeriesView};
use crate::storage::{
    load_matches, partition_series, write_index, write_players, write_series, SiteIndex,
    StorageError,
};

/// Errors that can occur during a build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),
}

/// Everything one pass derives from the loaded matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Career summaries in name order.
    pub careers: Vec<CareerSummary>,
    /// Series views, oldest first.
    pub series: Vec<SeriesView>,
    pub featured: Option<String>,
}

/// Summary of a completed build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub files: usize,
    pub series: usize,
    pub players: usize,
    pub featured: Option<String>,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} maps, {} series, {} players",
            self.files, self.series, self.players
        )?;
        if let Some(featured) = &self.featured {
            write!(f, ", featured {}", featured)?;
        }
        Ok(())
    }
}

/// The requested key if it exists, otherwise the latest dated key, otherwise
/// the last key.
fn pick_featured(keys: &[String], requested: Option<&str>) -> Option<String> {
    if let Some(requested) = requested {
        if keys.iter().any(|k| k == requested) {
            return Some(requested.to_string());
        }
        warn!(featured = %requested, "featured series not found, using latest");
    }

    keys.iter()
        .rev()
        .find(|k| matches!(DateOrder::of(k), DateOrder::Dated(..)))
        .or_else(|| keys.last())
        .cloned()
}

/// Derive careers and series from `matches`. No I/O.
pub fn generate(
    matches: Vec<LoadedMatch>,
    model: &RatingModel,
    top_agents: usize,
    featured_date: Option<&str>,
) -> Result<Generation, AggregateError> {
    let book = aggregate_careers(CareerBook::new(), &matches, model)?;
    let careers = book.summaries(top_agents);

    let series = partition_series(matches)
        .into_iter()
        .map(|(key, maps)| build_series_view(&key, &maps, model))
        .collect::<Result<Vec<_>, _>>()?;

    let keys: Vec<String> = series.iter().map(|s| s.key.clone()).collect();
    let featured = pick_featured(&keys, featured_date);

    Ok(Generation {
        careers,
        series,
        featured,
    })
}

/// Players ordered by career rating, best first. Equal ratings keep their
/// input order.
pub fn rank_players(mut players: Vec<CareerSummary>, limit: usize) -> Vec<CareerSummary> {
    players.sort_by(|a, b| b.rates.rating.total_cmp(&a.rates.rating));
    players.truncate(limit);
    players
}

/// Run one full build from `config.matches_dir` into `config.output_dir`.
pub fn run_build(config: &AppConfig) -> Result<BuildReport, BuildError> {
    let storage = config.storage();
    info!("Building from {:?}", storage.matches_dir);

    let matches = load_matches(&storage.matches_dir)?;
    let files = matches.len();

    let generation = generate(
        matches,
        &config.rating,
        config.top_agents,
        config.featured_date.as_deref(),
    )?;

    write_players(&storage, &generation.careers)?;
    for view in &generation.series {
        write_series(&storage, view)?;
    }

    let index = SiteIndex {
        generated_at: Utc::now(),
        featured: generation.featured.clone(),
        series: generation.series.iter().map(|s| s.key.clone()).collect(),
        players: generation.careers.iter().map(|c| c.name.clone()).collect(),
    };
    write_index(&storage, &index)?;

    let report = BuildReport {
        files,
        series: generation.series.len(),
        players: generation.careers.len(),
        featured: generation.featured,
    };
    info!("Build complete: {}", report);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::fixtures::{loaded, map, player, team};
    use crate::storage::read_players;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const LINE: (u32, u32, u32, u32, u32, u32, f64, f64, f64) =
        (200, 16, 14, 5, 2, 2, 70.0, 130.0, 22.0);

    fn sample_map(date: &str, stem: &str, alpha_score: u32, bravo_score: u32) -> LoadedMatch {
        loaded(
            date,
            stem,
            map(
                "Ascent",
                team("Alpha", alpha_score, vec![player("Fox", &["jett"], LINE, Some(1.2))]),
                team("Bravo", bravo_score, vec![player("Owl", &["sova"], LINE, Some(0.9))]),
            ),
        )
    }

    fn sample() -> Vec<LoadedMatch> {
        vec![
            sample_map("20260213", "map1", 13, 9),
            sample_map("20260213", "map2", 10, 13),
            sample_map("20260213", "map3", 13, 11),
            sample_map("20260301", "map1", 13, 5),
        ]
    }

    #[test]
    fn test_generate() {
        let generation = generate(sample(), &RatingModel::default(), 3, None).unwrap();

        let names: Vec<_> = generation.careers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Fox", "Owl"]);
        assert_eq!(generation.careers[0].matches, 4);
        assert_eq!(generation.careers[0].wins, 3);

        let keys: Vec<_> = generation.series.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["20260213", "20260301"]);
        assert_eq!(generation.series[0].all_maps.series_score, [2, 1]);
        assert_eq!(generation.series[0].maps.len(), 3);
        assert_eq!(generation.featured.as_deref(), Some("20260301"));
    }

    #[test]
    fn test_generate_featured_override() {
        let generation =
            generate(sample(), &RatingModel::default(), 3, Some("20260213")).unwrap();
        assert_eq!(generation.featured.as_deref(), Some("20260213"));
    }

    #[test]
    fn test_generate_unknown_featured_falls_back_to_latest() {
        let generation =
            generate(sample(), &RatingModel::default(), 3, Some("19990101")).unwrap();
        assert_eq!(generation.featured.as_deref(), Some("20260301"));
    }

    #[test]
    fn test_generate_empty() {
        let generation = generate(Vec::new(), &RatingModel::default(), 3, None).unwrap();
        assert!(generation.careers.is_empty());
        assert!(generation.series.is_empty());
        assert_eq!(generation.featured, None);
    }

    #[test]
    fn test_pick_featured_prefers_dated_keys() {
        let keys = vec!["20260213".to_string(), "scrims".to_string()];
        assert_eq!(pick_featured(&keys, None).as_deref(), Some("20260213"));

        let undated = vec!["scrims".to_string()];
        assert_eq!(pick_featured(&undated, None).as_deref(), Some("scrims"));
    }

    #[test]
    fn test_generate_aborts_on_malformed_series() {
        let mut matches = sample();
        matches.push(loaded(
            "20260301",
            "map2",
            map(
                "Bind",
                team("Alpha", 13, vec![player("Fox", &["jett"], LINE, None)]),
                team("Charlie", 4, vec![player("Cat", &["sage"], LINE, None)]),
            ),
        ));

        let err = generate(matches, &RatingModel::default(), 3, None).unwrap_err();
        assert!(matches!(err, AggregateError::Series { .. }));
    }

    #[test]
    fn test_rank_players() {
        let generation = generate(sample(), &RatingModel::default(), 3, None).unwrap();

        let ranked = rank_players(generation.careers.clone(), 10);
        let names: Vec<_> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Fox", "Owl"]);

        assert_eq!(rank_players(generation.careers, 1).len(), 1);
    }

    #[test]
    fn test_run_build_writes_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let matches_dir = temp_dir.path().join("matches");
        let output_dir = temp_dir.path().join("output");

        for m in sample() {
            let dir = matches_dir.join(&m.date);
            fs::create_dir_all(&dir).unwrap();
            let stem = m.origin.trim_end_matches(".json").rsplit('/').next().unwrap().to_string();
            fs::write(
                dir.join(format!("{}.json", stem)),
                serde_json::to_string(&m.record).unwrap(),
            )
            .unwrap();
        }

        let config = AppConfig {
            matches_dir,
            output_dir: output_dir.clone(),
            ..AppConfig::default()
        };
        let report = run_build(&config).unwrap();

        assert_eq!(
            report,
            BuildReport {
                files: 4,
                series: 2,
                players: 2,
                featured: Some("20260301".to_string()),
            }
        );
        assert_eq!(
            report.to_string(),
            "4 maps, 2 series, 2 players, featured 20260301"
        );

        let storage = config.storage();
        let players = read_players(&storage).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Fox");
        assert_eq!(players[0].history.len(), 4);

        assert!(storage.series_path("20260213").exists());
        assert!(storage.series_path("20260301").exists());

        let index: SiteIndex =
            serde_json::from_str(&fs::read_to_string(storage.index_path()).unwrap()).unwrap();
        assert_eq!(index.featured.as_deref(), Some("20260301"));
        assert_eq!(index.series, vec!["20260213", "20260301"]);
        assert_eq!(index.players, vec!["Fox", "Owl"]);
    }

    #[test]
    fn test_run_build_missing_matches_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig {
            matches_dir: temp_dir.path().join("missing"),
            output_dir: temp_dir.path().join("output"),
            ..AppConfig::default()
        };

        assert!(matches!(
            run_build(&config),
            Err(BuildError::Storage(StorageError::PathNotFound(_)))
        ));
    }
}
