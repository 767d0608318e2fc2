// Player data model shared by every crate: positions, team codes, raw adapter
// output, and the canonical reconciled record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Team codes
// ---------------------------------------------------------------------------

/// The 32 NFL franchise codes a reconciled record may carry.
pub const NFL_TEAMS: [&str; 32] = [
    "ARI", "ATL", "BAL", "BUF", "CAR", "CHI", "CIN", "CLE", "DAL", "DEN", "DET", "GB", "HOU",
    "IND", "JAX", "KC", "LV", "LAC", "LAR", "MIA", "MIN", "NE", "NO", "NYG", "NYJ", "PHI", "PIT",
    "SF", "SEA", "TB", "TEN", "WAS",
];

/// Placeholder team code for unsigned players. Never valid for a stored record.
pub const FREE_AGENT: &str = "FA";

pub fn is_valid_team(team: &str) -> bool {
    NFL_TEAMS.contains(&team)
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Fantasy-relevant football positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DEF,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::QB,
        Position::RB,
        Position::WR,
        Position::TE,
        Position::K,
        Position::DEF,
    ];

    /// Parse an already-canonical position code ("QB", "DEF", ...).
    ///
    /// Alias handling (D/ST, FLEX, ...) lives in the normalizer; this only
    /// accepts the six canonical spellings, case-insensitively.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            "K" => Some(Position::K),
            "DEF" => Some(Position::DEF),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DEF => "DEF",
        }
    }

    /// Deterministic ordering used by the final sort and reports.
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::QB => 1,
            Position::RB => 2,
            Position::WR => 3,
            Position::TE => 4,
            Position::K => 5,
            Position::DEF => 6,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Identity key
// ---------------------------------------------------------------------------

/// Reduce a display name to its matching form: lowercase, drop periods and
/// apostrophes, hyphens become spaces, whitespace collapsed.
///
/// `"A.J. Brown"` and `"AJ Brown"` both become `"aj brown"`.
pub fn key_name(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .filter(|c| *c != '.' && *c != '\'')
        .map(|c| if c == '-' { ' ' } else { c })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `key_name(name) + "_" + position + "_" + team`.
pub fn identity_key(name: &str, position: &str, team: &str) -> String {
    format!("{}_{}_{}", key_name(name), position, team)
}

// ---------------------------------------------------------------------------
// RawPlayer
// ---------------------------------------------------------------------------

/// Loosely-structured record produced by a source adapter before
/// normalization. Name, position and team are free text and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlayer {
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub adp: Option<f64>,
    #[serde(default)]
    pub projected_points: Option<f64>,
    #[serde(default)]
    pub avg_points: Option<f64>,
    #[serde(default)]
    pub drafted: bool,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub adp_data: BTreeMap<String, f64>,
    #[serde(default)]
    pub sleeper_id: Option<String>,
    #[serde(default)]
    pub espn_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub injury_status: Option<String>,
    #[serde(default)]
    pub years_exp: Option<u32>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

impl RawPlayer {
    pub fn new(name: &str, position: &str, team: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            position: position.to_string(),
            team: team.to_string(),
            source: source.to_string(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerRecord
// ---------------------------------------------------------------------------

/// A normalized, validated player as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub position: Position,
    pub team: String,
    #[serde(default)]
    pub adp: Option<f64>,
    #[serde(default)]
    pub projected_points: Option<f64>,
    #[serde(default)]
    pub avg_points: Option<f64>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub drafted: bool,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub adp_data: BTreeMap<String, f64>,
    #[serde(default)]
    pub sleeper_id: Option<String>,
    #[serde(default)]
    pub espn_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub injury_status: Option<String>,
    #[serde(default)]
    pub years_exp: Option<u32>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub overall_rank: Option<u32>,
    #[serde(default)]
    pub position_rank: Option<u32>,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

impl PlayerRecord {
    /// Minimal record with every optional attribute empty and `drafted = false`.
    pub fn new(name: &str, position: Position, team: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            position,
            team: team.to_string(),
            adp: None,
            projected_points: None,
            avg_points: None,
            rank: None,
            drafted: false,
            source: source.to_string(),
            adp_data: BTreeMap::new(),
            sleeper_id: None,
            espn_id: None,
            status: None,
            injury_status: None,
            years_exp: None,
            age: None,
            college: None,
            overall_rank: None,
            position_rank: None,
            stats: BTreeMap::new(),
        }
    }

    pub fn identity_key(&self) -> String {
        identity_key(&self.name, self.position.as_str(), &self.team)
    }

    /// `(position, team)` bucket used for fuzzy lookups.
    pub fn bucket(&self) -> (Position, String) {
        (self.position, self.team.clone())
    }
}

/// Feed a stored record back through the pipeline (the `clean` job).
/// Ranks are recomputed, so they are not carried over.
impl From<&PlayerRecord> for RawPlayer {
    fn from(r: &PlayerRecord) -> Self {
        Self {
            name: r.name.clone(),
            position: r.position.as_str().to_string(),
            team: r.team.clone(),
            rank: r.rank,
            adp: r.adp,
            projected_points: r.projected_points,
            avg_points: r.avg_points,
            drafted: r.drafted,
            source: r.source.clone(),
            adp_data: r.adp_data.clone(),
            sleeper_id: r.sleeper_id.clone(),
            espn_id: r.espn_id.clone(),
            status: r.status.clone(),
            injury_status: r.injury_status.clone(),
            years_exp: r.years_exp,
            age: r.age,
            college: r.college.clone(),
            stats: r.stats.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_name_strips_punctuation_and_case() {
        assert_eq!(key_name("A.J. Brown"), "aj brown");
        assert_eq!(key_name("Ja'Marr   Chase"), "jamarr chase");
        assert_eq!(key_name("Amon-Ra St. Brown"), "amon ra st brown");
    }

    #[test]
    fn identity_key_layout() {
        assert_eq!(identity_key("Josh Allen", "QB", "BUF"), "josh allen_QB_BUF");
        let rec = PlayerRecord::new("T.J. Hockenson", Position::TE, "MIN", "test");
        assert_eq!(rec.identity_key(), "tj hockenson_TE_MIN");
    }

    #[test]
    fn team_set_has_32_distinct_codes() {
        let mut teams = NFL_TEAMS.to_vec();
        teams.sort();
        teams.dedup();
        assert_eq!(teams.len(), 32);
        assert!(is_valid_team("WAS"));
        assert!(!is_valid_team("WSH"));
        assert!(!is_valid_team(FREE_AGENT));
    }

    #[test]
    fn position_parse_and_order() {
        assert_eq!(Position::from_str_pos("def"), Some(Position::DEF));
        assert_eq!(Position::from_str_pos("FLEX"), None);
        let orders: Vec<u8> = Position::ALL.iter().map(|p| p.sort_order()).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn record_serde_uses_position_code() {
        let rec = PlayerRecord::new("Josh Allen", Position::QB, "BUF", "espn");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["position"], "QB");
        assert_eq!(json["drafted"], false);
        let back: PlayerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn record_deserializes_with_missing_optionals() {
        let rec: PlayerRecord =
            serde_json::from_str(r#"{"name":"Tyreek Hill","position":"WR","team":"MIA"}"#)
                .unwrap();
        assert!(!rec.drafted);
        assert!(rec.adp.is_none());
        assert!(rec.adp_data.is_empty());
    }
}
