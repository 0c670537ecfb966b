//! Convert raw game-client match captures into match records.
//!
//! A capture describes one map from the point of view of the player who
//! recorded it. Teams come out as "Team A (Blue)" and "Team B (Red)" and
//! several stats the client does not report (KAST, first deaths, round
//! outcomes) are filled with placeholders.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculate::round2;
use crate::models::{
    MapPick, MatchRecord, Percent, PlayerMatchRecord, RawStats, RoundEvent, TeamRecord,
};

pub const TEAM_A: &str = "Team A (Blue)";
pub const TEAM_B: &str = "Team B (Red)";

const BLUE: &str = "Blue";
const DEFAULT_NATIONALITY: &str = "cn";
const UNKNOWN_AGENT: &str = "unknown";

const MAP_NAMES: &[(&str, &str)] = &[
    ("/Game/Maps/Ascent/Ascent", "Ascent"),
    ("/Game/Maps/Bind/Bind", "Bind"),
    ("/Game/Maps/Bonsai/Bonsai", "Split"),
    ("/Game/Maps/Canyon/Canyon", "Fracture"),
    ("/Game/Maps/Duality/Duality", "Bind"),
    ("/Game/Maps/Foxtrot/Foxtrot", "Breeze"),
    ("/Game/Maps/Haven/Haven", "Haven"),
    ("/Game/Maps/Icebox/Icebox", "Icebox"),
    ("/Game/Maps/Jam/Jam", "Lotus"),
    ("/Game/Maps/Juliett/Juliett", "Sunset"),
    ("/Game/Maps/Pitt/Pitt", "Pearl"),
    ("/Game/Maps/Port/Port", "Icebox"),
    ("/Game/Maps/Triad/Triad", "Haven"),
    ("/Game/Maps/Rook/Rook", "Bind"),
];

const AGENT_NAMES: &[(&str, &str)] = &[
    ("add6443a-41bd-e414-f6ad-e58d267f4e95", "jett"),
    ("320b2a48-4d9b-a075-30f1-1f93a9b638fa", "sova"),
    ("dade69b4-4f5a-8528-247b-219e5a1facd6", "fade"),
    ("117ed9e3-49f3-6512-3ccf-0cada7e3823b", "cypher"),
    ("707eab51-4836-f488-046a-cda6bf494859", "viper"),
    ("a3bfb853-43b2-7238-a4f1-ad90e9e46bcc", "reyna"),
    ("1e58de9c-4950-5125-93e9-a0aee9f98746", "killjoy"),
    ("bb2a4828-46eb-8cd1-e765-15848195d751", "neon"),
    ("41fb69c1-4189-7b37-f117-bcaf1e96f1bf", "astra"),
    ("1dbf2edd-4729-0984-3115-daa5eed44993", "clove"),
    ("efba5359-4016-a1e5-7626-b1ae76895940", "vyse"),
    ("7f94d92c-4234-0a36-9646-3a87eb8b5c89", "yoru"),
    ("8e253930-4c05-31dd-1b6c-968525494517", "omen"),
    ("5f8d3a7f-467b-97f3-062c-13acf203c006", "breach"),
    ("6f2a04ca-43e0-be17-7f36-b3908627744d", "skye"),
    ("f94c3b30-42be-e959-889c-5aa313dba261", "raze"),
    ("9f0d8ba9-4140-b941-57d3-a7ad57c6b417", "brimstone"),
    ("22697a3d-45bf-8dd7-4fec-84a9e28c69d7", "chamber"),
    ("0e38b510-41a8-5780-5e8f-568b2a4f2d6c", "iso"),
    ("569fdd95-4d10-43ab-ca70-79becc718b46", "sage"),
    ("601dbbe7-43ce-be57-2a40-4abd24953621", "kayo"),
    ("cc8b64c8-4b25-4ff9-6e7f-37b4da43d235", "deadlock"),
    ("df1cb487-4902-002e-5c17-d28e83e78588", "waylay"),
    ("e370fa57-4757-3604-3648-499e1f642d3f", "gekko"),
    ("95b78ed7-4637-86d9-7e41-71ba8c293152", "harbor"),
    ("b444168c-4e35-8076-db47-ef9bf368f384", "tejo"),
    ("eb93336a-449b-9c1b-0a54-a891f7921d69", "phoenix"),
    ("92eeef5d-43b5-1d4a-8d03-b3927a09034b", "veto"),
];

/// Unknown map ids pass through unchanged.
pub fn map_name(map_id: &str) -> &str {
    MAP_NAMES
        .iter()
        .find(|(id, _)| *id == map_id)
        .map(|(_, name)| *name)
        .unwrap_or(map_id)
}

pub fn agent_name(character_id: &str) -> &'static str {
    AGENT_NAMES
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(character_id))
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_AGENT)
}

/// Errors from converting captures.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to read directory entry: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("rounds won ({won}) exceeds rounds played ({played})")]
    RoundsWonExceedsPlayed { won: u32, played: u32 },

    #[error("two captured players share the name `{name}` once tags are stripped")]
    DuplicatePlayer { name: String },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Deserialize)]
pub struct Capture {
    pub battle_detail: BattleDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleDetail {
    pub player_game_view: PlayerGameView,
    #[serde(default)]
    pub players: Vec<CapturedPlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGameView {
    pub map_id: String,
    pub rounds_played: u32,
    pub rounds_won: u32,
    pub player_team_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedPlayer {
    pub name: String,
    pub team_id: String,
    pub character_id: String,
    /// Total combat score; some client versions send it as a string.
    #[serde(deserialize_with = "deserialize_score")]
    pub stats_score: f64,
    pub total_damage: f64,
    pub total_headshots: u32,
    pub total_bodyshots: u32,
    pub total_legshots: u32,
    pub stats_kills: u32,
    pub stats_deaths: u32,
    pub stats_assists: u32,
    pub first_kill_count: u32,
}

fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let score: f64 = deserialize_number_from_string(deserializer)?;
    if !score.is_finite() {
        return Err(de::Error::custom(format!("invalid score `{}`", score)));
    }
    Ok(score)
}

/// Parse a capture file. Proxy dumps sometimes carry headers or several
/// JSON documents; the first line that parses as a capture wins.
pub fn parse_capture(content: &str) -> Result<Capture, ConvertError> {
    let first_error = match serde_json::from_str(content) {
        Ok(capture) => return Ok(capture),
        Err(e) => e,
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| serde_json::from_str(line).ok())
        .ok_or(ConvertError::Json(first_error))
}

fn per_round(total: f64, rounds: u32) -> u32 {
    if rounds == 0 {
        return 0;
    }
    (total / rounds as f64).round().max(0.0) as u32
}

/// Rating formula used by the capture tool. Records that carry it are
/// trusted downstream, so it is kept stable.
pub fn legacy_rating(kills: u32, deaths: u32, acs: u32, adr: u32) -> f64 {
    let kd = kills as f64 / deaths.max(1) as f64;
    round2((kd * 0.5 + acs as f64 / 300.0 + adr as f64 / 150.0) / 3.0)
}

fn convert_player(player: &CapturedPlayer, rounds: u32) -> PlayerMatchRecord {
    let acs = per_round(player.stats_score, rounds);
    let adr = per_round(player.total_damage, rounds);

    let shots = player.total_headshots + player.total_bodyshots + player.total_legshots;
    let hs_percent = if shots > 0 {
        (player.total_headshots as f64 / shots as f64 * 100.0).round()
    } else {
        0.0
    };

    let k = player.stats_kills;
    let d = player.stats_deaths;
    let fk = player.first_kill_count;

    PlayerMatchRecord {
        name: player
            .name
            .split('#')
            .next()
            .unwrap_or_default()
            .to_string(),
        nationality: DEFAULT_NATIONALITY.to_string(),
        agents: vec![agent_name(&player.character_id).to_string()],
        stats: RawStats {
            rating: Some(legacy_rating(k, d, acs, adr)),
            acs: Some(acs),
            k: Some(k),
            d: Some(d),
            a: Some(player.stats_assists),
            diff: Some(k as i64 - d as i64),
            kast: Some(Percent(0.0)),
            adr: Some(adr as f64),
            hs_percent: Some(Percent(hs_percent)),
            fk: Some(fk),
            fd: Some(0),
            fkfd_diff: Some(fk as i64),
        },
    }
}

fn sort_by_rating(players: &mut [PlayerMatchRecord]) {
    players.sort_by(|a, b| {
        let ra = a.stats.rating.unwrap_or(0.0);
        let rb = b.stats.rating.unwrap_or(0.0);
        rb.total_cmp(&ra)
    });
}

/// Convert one capture into a match record.
pub fn convert_battle(capture: &Capture) -> Result<MatchRecord, ConvertError> {
    let view = &capture.battle_detail.player_game_view;
    let rounds = view.rounds_played;

    if view.rounds_won > rounds {
        return Err(ConvertError::RoundsWonExceedsPlayed {
            won: view.rounds_won,
            played: rounds,
        });
    }

    let mut seen = HashSet::new();
    let mut blue = Vec::new();
    let mut red = Vec::new();
    for player in &capture.battle_detail.players {
        let record = convert_player(player, rounds);
        if !seen.insert(record.name.clone()) {
            return Err(ConvertError::DuplicatePlayer { name: record.name });
        }
        if player.team_id == BLUE {
            blue.push(record);
        } else {
            red.push(record);
        }
    }
    sort_by_rating(&mut blue);
    sort_by_rating(&mut red);

    let (blue_score, red_score) = if view.player_team_id == BLUE {
        (view.rounds_won, rounds - view.rounds_won)
    } else {
        (rounds - view.rounds_won, view.rounds_won)
    };

    let round_history = || Some(vec![RoundEvent("none".to_string()); rounds as usize]);

    Ok(MatchRecord {
        map: map_name(&view.map_id).to_string(),
        map_pick: MapPick::Unknown,
        teams: vec![
            TeamRecord {
                team_name: TEAM_A.to_string(),
                score: blue_score,
                round_history: round_history(),
                players: blue,
            },
            TeamRecord {
                team_name: TEAM_B.to_string(),
                score: red_score,
                round_history: round_history(),
                players: red,
            },
        ],
    })
}

pub fn convert_str(content: &str) -> Result<MatchRecord, ConvertError> {
    convert_battle(&parse_capture(content)?)
}

/// Convert `input` and write the record to `output` as pretty JSON.
pub fn convert_file(input: &Path, output: &Path) -> Result<MatchRecord, ConvertError> {
    let content = fs::read_to_string(input)?;
    let record = convert_str(&content)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, serde_json::to_string_pretty(&record)?)?;

    debug!(map = %record.map, "Converted {:?} -> {:?}", input, output);
    Ok(record)
}

/// Outcome of a batch conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub converted: usize,
    pub failed: usize,
}

fn converted_name(input: &Path) -> Result<String, ConvertError> {
    input
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| format!("converted_{}", n))
        .ok_or_else(|| ConvertError::InvalidPath(input.display().to_string()))
}

/// Convert every `*.json` directly inside `input_dir` into
/// `output_dir/converted_<name>`. Failing files are logged and counted.
pub fn convert_dir(input_dir: &Path, output_dir: &Path) -> Result<ConvertSummary, ConvertError> {
    let root = input_dir
        .to_str()
        .ok_or_else(|| ConvertError::InvalidPath(input_dir.display().to_string()))?;
    let pattern = format!("{}/*.json", root.trim_end_matches('/'));

    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        files.push(entry?);
    }
    files.sort();

    fs::create_dir_all(output_dir)?;

    let mut summary = ConvertSummary::default();
    for input in &files {
        let output = output_dir.join(converted_name(input)?);
        match convert_file(input, &output) {
            Ok(_) => summary.converted += 1,
            Err(e) => {
                warn!("Failed to convert {:?}: {}", input, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        converted = summary.converted,
        failed = summary.failed,
        "Converted captures from {:?}",
        input_dir
    );
    Ok(summary)
}

/// Convert a single file or a whole directory. A single file written to an
/// existing directory is named `converted_<name>`; a failing single file is
/// an error.
pub fn convert_path(input: &Path, output: &Path) -> Result<ConvertSummary, ConvertError> {
    if input.is_dir() {
        return convert_dir(input, output);
    }
    if !input.is_file() {
        return Err(ConvertError::PathNotFound(input.to_path_buf()));
    }

    let target = if output.is_dir() {
        output.join(converted_name(input)?)
    } else {
        output.to_path_buf()
    };
    convert_file(input, &target)?;

    Ok(ConvertSummary {
        converted: 1,
        failed: 0,
    })
}
