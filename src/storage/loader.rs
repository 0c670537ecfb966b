//! Discovery and loading of per-map match files.
//!
//! Layout: `<matches_dir>/<date>/<anything>.json`, one map per file. The
//! parent directory name is the date key that groups maps into a series.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::StorageError;
use crate::models::{DateOrder, LoadedMatch, MatchRecord};

/// Find every `.json` file below `dir`, sorted by path.
pub fn discover_match_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    if !dir.exists() {
        return Err(StorageError::PathNotFound(dir.to_path_buf()));
    }

    let root = dir
        .to_str()
        .ok_or_else(|| StorageError::InvalidPath(dir.display().to_string()))?;
    let pattern = format!("{}/**/*.json", root.trim_end_matches('/'));

    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    debug!("Discovered {} match files under {:?}", files.len(), dir);
    Ok(files)
}

/// Load one match file. The date key is the parent directory name and the
/// match id derives from the date key and the file stem.
pub fn load_match_file(path: &Path) -> Result<LoadedMatch, StorageError> {
    let date = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;

    let content = fs::read_to_string(path)?;
    let record: MatchRecord =
        serde_json::from_str(&content).map_err(|error| StorageError::Parse {
            path: path.to_path_buf(),
            error,
        })?;

    Ok(LoadedMatch::new(
        date,
        stem,
        path.display().to_string(),
        record,
    ))
}

/// Load every match file under `dir` in processing order.
pub fn load_matches(dir: &Path) -> Result<Vec<LoadedMatch>, StorageError> {
    let mut matches = discover_match_files(dir)?
        .iter()
        .map(|path| load_match_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    matches.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

    info!("Loaded {} maps from {:?}", matches.len(), dir);
    Ok(matches)
}

/// Group maps by date key. Groups come out chronologically; maps keep their
/// input order within a group.
pub fn partition_series(matches: Vec<LoadedMatch>) -> Vec<(String, Vec<LoadedMatch>)> {
    let mut groups: BTreeMap<DateOrder, (String, Vec<LoadedMatch>)> = BTreeMap::new();

    for m in matches {
        groups
            .entry(DateOrder::of(&m.date))
            .or_insert_with(|| (m.date.clone(), Vec::new()))
            .1
            .push(m);
    }

    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn match_json(map: &str) -> String {
        format!(
            r#"{{
                "map": "{map}",
                "map_pick": false,
                "teams": [
                    {{
                        "team_name": "Alpha",
                        "score": 13,
                        "players": [{{
                            "name": "Fox",
                            "agents": ["jett"],
                            "stats": {{
                                "rating": "", "acs": 240, "k": 20, "d": 14, "a": 5,
                                "kast": "72%", "adr": 150, "hs_percent": "25%",
                                "fk": 3, "fd": 2
                            }}
                        }}]
                    }},
                    {{
                        "team_name": "Bravo",
                        "score": 9,
                        "players": [{{
                            "name": "Owl",
                            "agents": ["sova"],
                            "stats": {{
                                "rating": 0.9, "acs": 180, "k": 14, "d": 20, "a": 7,
                                "kast": 64, "adr": 120, "hs_percent": 20,
                                "fk": 1, "fd": 3
                            }}
                        }}]
                    }}
                ]
            }}"#
        )
    }

    fn write_match(root: &Path, date: &str, name: &str, map: &str) -> PathBuf {
        let dir = root.join(date);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, match_json(map)).unwrap();
        path
    }

    #[test]
    fn test_discover_finds_nested_json_only() {
        let temp_dir = TempDir::new().unwrap();
        write_match(temp_dir.path(), "20260213", "b.json", "Bind");
        write_match(temp_dir.path(), "20260213", "a.json", "Ascent");
        fs::write(temp_dir.path().join("20260213").join("notes.txt"), "x").unwrap();

        let files = discover_match_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let result = discover_match_files(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(StorageError::PathNotFound(_))));
    }

    #[test]
    fn test_load_match_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_match(temp_dir.path(), "20260213", "map1.json", "Ascent");

        let loaded = load_match_file(&path).unwrap();
        assert_eq!(loaded.date, "20260213");
        assert_eq!(loaded.record.map, "Ascent");
        assert_eq!(loaded.record.teams.len(), 2);
        assert_eq!(loaded.origin, path.display().to_string());
        assert_eq!(
            loaded.id,
            crate::models::MatchId::for_match_file("20260213", "map1")
        );

        let fox = &loaded.record.teams[0].players[0];
        assert_eq!(fox.stats.rating, None);
        let owl = &loaded.record.teams[1].players[0];
        assert_eq!(owl.stats.rating, Some(0.9));
    }

    #[test]
    fn test_load_match_file_parse_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("20260213");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_match_file(&path).unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_load_match_file_rejects_non_finite_rating() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_match(temp_dir.path(), "20260213", "nan.json", "Ascent");
        let json = fs::read_to_string(&path)
            .unwrap()
            .replace(r#""rating": 0.9"#, r#""rating": "NaN""#);
        fs::write(&path, json).unwrap();

        let err = load_match_file(&path).unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
        assert!(err.to_string().contains("nan.json"));
    }

    #[test]
    fn test_load_match_file_rejects_player_without_stats() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("20260213");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("no_stats.json");
        fs::write(
            &path,
            r#"{
                "map": "Bind",
                "teams": [
                    {"team_name": "Alpha", "score": 13,
                     "players": [{"name": "Fox", "agents": ["jett"]}]},
                    {"team_name": "Bravo", "score": 9, "players": []}
                ]
            }"#,
        )
        .unwrap();

        let err = load_match_file(&path).unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
        assert!(err.to_string().contains("no_stats.json"));
    }

    #[test]
    fn test_load_matches_sorted_by_date_then_path() {
        let temp_dir = TempDir::new().unwrap();
        write_match(temp_dir.path(), "20260301", "a.json", "Lotus");
        write_match(temp_dir.path(), "20260213", "b.json", "Bind");
        write_match(temp_dir.path(), "20260213", "a.json", "Ascent");
        write_match(temp_dir.path(), "misc", "a.json", "Split");

        let loaded = load_matches(temp_dir.path()).unwrap();
        let maps: Vec<_> = loaded.iter().map(|m| m.record.map.as_str()).collect();
        assert_eq!(maps, vec!["Ascent", "Bind", "Lotus", "Split"]);
    }

    #[test]
    fn test_partition_series_groups_by_date() {
        let temp_dir = TempDir::new().unwrap();
        write_match(temp_dir.path(), "2026-03-01", "a.json", "Lotus");
        write_match(temp_dir.path(), "20260213", "a.json", "Ascent");
        write_match(temp_dir.path(), "20260213", "b.json", "Bind");

        let groups = partition_series(load_matches(temp_dir.path()).unwrap());
        let summary: Vec<_> = groups
            .iter()
            .map(|(key, maps)| {
                let names: Vec<_> = maps.iter().map(|m| m.record.map.clone()).collect();
                (key.clone(), names)
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                (
                    "20260213".to_string(),
                    vec!["Ascent".to_string(), "Bind".to_string()]
                ),
                ("2026-03-01".to_string(), vec!["Lotus".to_string()]),
            ]
        );
    }
}
