// Active NFL roster oracle and the validator that checks records against it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use gridiron_core::model::{is_valid_team, key_name, PlayerRecord, Position};

use crate::normalize::{clean_name, normalize_position, normalize_team};
use crate::similarity;

/// Default minimum similarity for a fuzzy roster match.
pub const ROSTER_MATCH_THRESHOLD: f64 = 0.85;

/// Catalog statuses that disqualify a player outright.
const INACTIVE_STATUSES: [&str; 3] = ["RETIRED", "SUSPENDED", "INACTIVE"];

/// Stats that count as evidence a zero-experience player is actually on a
/// roster.
const ROOKIE_ACTIVITY_STATS: [&str; 7] = [
    "rec_tds", "rush_tds", "pass_tds", "fgm", "rec", "rush_att", "pass_att",
];

// ---------------------------------------------------------------------------
// ActiveRosterSet
// ---------------------------------------------------------------------------

/// One rostered player as listed by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub position: Position,
    pub team: String,
}

/// Identity keys of players believed to hold a roster spot, indexed by
/// `(position, team)` for fuzzy lookups.
#[derive(Debug, Clone, Default)]
pub struct ActiveRosterSet {
    entries: Vec<RosterEntry>,
    keys: HashSet<String>,
    by_bucket: HashMap<(Position, String), Vec<String>>,
}

impl ActiveRosterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = RosterEntry>) -> Self {
        let mut set = Self::new();
        for e in entries {
            set.insert(e);
        }
        set
    }

    /// Add a catalog entry. Names go through the same cleaning as records so
    /// suffixes and initials line up. Duplicate keys are ignored.
    pub fn insert(&mut self, entry: RosterEntry) {
        let matching_name = key_name(&clean_name(&entry.name));
        let key = format!("{}_{}_{}", matching_name, entry.position, entry.team);
        if !self.keys.insert(key) {
            return;
        }
        self.by_bucket
            .entry((entry.position, entry.team.clone()))
            .or_default()
            .push(matching_name);
        self.entries.push(entry);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Matching-form names of every entry with this position and team.
    pub fn names_in(&self, position: Position, team: &str) -> &[String] {
        self.by_bucket
            .get(&(position, team.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Catalog parsers
// ---------------------------------------------------------------------------

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Canonical `(position, team)` for a catalog entry, if both are usable.
fn canonical_slot(position: Option<&str>, team: Option<&str>) -> Option<(Position, String)> {
    let team = team?;
    if matches!(team.to_uppercase().as_str(), "NONE" | "NULL") {
        return None;
    }
    let team = normalize_team(team);
    if !is_valid_team(&team) {
        return None;
    }
    let position = Position::from_str_pos(&normalize_position(position?))?;
    Some((position, team))
}

/// Sleeper `players/nfl` catalog: an object keyed by player id.
///
/// Skips retired/suspended/inactive players, entries without a valid team or
/// fantasy position, and zero-experience players with no rookie activity.
pub fn parse_sleeper_catalog(data: &Value) -> Vec<RosterEntry> {
    let Some(players) = data.as_object() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for info in players.values() {
        if !info.is_object() {
            continue;
        }
        let status = str_field(info, "status").unwrap_or("").to_uppercase();
        if INACTIVE_STATUSES.contains(&status.as_str()) {
            continue;
        }
        let Some((position, team)) =
            canonical_slot(str_field(info, "position"), str_field(info, "team"))
        else {
            continue;
        };
        let Some(name) = sleeper_display_name(info) else {
            continue;
        };
        if !has_rookie_activity(info) {
            continue;
        }
        out.push(RosterEntry {
            name,
            position,
            team,
        });
    }
    info!("Parsed {} active players from Sleeper catalog", out.len());
    out
}

/// `full_name`, or `"first last"` when the catalog omits it (team defenses).
pub fn sleeper_display_name(info: &Value) -> Option<String> {
    if let Some(full) = str_field(info, "full_name") {
        return Some(full.trim().to_string());
    }
    let first = str_field(info, "first_name").unwrap_or("");
    let last = str_field(info, "last_name").unwrap_or("");
    let joined = format!("{first} {last}").trim().to_string();
    (!joined.is_empty()).then_some(joined)
}

/// True unless the catalog reports zero years of experience and none of the
/// rookie activity stats is positive. Entries without `years_exp` (team
/// defenses) are not treated as rookies.
fn has_rookie_activity(info: &Value) -> bool {
    match info.get("years_exp").and_then(Value::as_u64) {
        Some(0) => ROOKIE_ACTIVITY_STATS
            .iter()
            .any(|k| info.get(*k).and_then(Value::as_f64).unwrap_or(0.0) > 0.0),
        _ => true,
    }
}

/// nflverse `players.json` backup catalog: a list of player objects. Only
/// players whose `last_season` is within a year of `current_year` count.
pub fn parse_nflverse_catalog(data: &Value, current_year: i32) -> Vec<RosterEntry> {
    let Some(players) = data.as_array() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for info in players {
        let last_season = info.get("last_season").and_then(Value::as_i64).unwrap_or(0);
        if last_season < i64::from(current_year - 1) {
            continue;
        }
        let Some(name) = str_field(info, "display_name").or_else(|| str_field(info, "full_name"))
        else {
            continue;
        };
        let Some((position, team)) =
            canonical_slot(str_field(info, "position"), str_field(info, "team"))
        else {
            continue;
        };
        out.push(RosterEntry {
            name: name.trim().to_string(),
            position,
            team,
        });
    }
    info!("Parsed {} active players from nflverse backup", out.len());
    out
}

// ---------------------------------------------------------------------------
// RosterValidator
// ---------------------------------------------------------------------------

/// Outcome of checking one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Exact,
    Fuzzy { matched: String, score: f64 },
    InvalidTeam,
    NoRoster,
    NotFound,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Exact | Verdict::Fuzzy { .. })
    }
}

/// Decides whether a normalized record is a real, rosterable NFL player.
///
/// Built without a roster (every catalog source failed and nothing was
/// cached), it rejects everything.
#[derive(Debug, Clone)]
pub struct RosterValidator {
    roster: Option<ActiveRosterSet>,
    threshold: f64,
}

impl RosterValidator {
    pub fn new(roster: ActiveRosterSet, threshold: f64) -> Self {
        Self {
            roster: Some(roster),
            threshold,
        }
    }

    /// Fail-closed validator.
    pub fn without_roster() -> Self {
        Self {
            roster: None,
            threshold: ROSTER_MATCH_THRESHOLD,
        }
    }

    pub fn roster_size(&self) -> usize {
        self.roster.as_ref().map_or(0, ActiveRosterSet::len)
    }

    pub fn has_roster(&self) -> bool {
        self.roster.is_some()
    }

    pub fn check(&self, player: &PlayerRecord) -> Verdict {
        if !is_valid_team(&player.team) {
            return Verdict::InvalidTeam;
        }
        let Some(roster) = &self.roster else {
            return Verdict::NoRoster;
        };

        if roster.contains_key(&player.identity_key()) {
            return Verdict::Exact;
        }

        let name = key_name(&player.name);
        for candidate in roster.names_in(player.position, &player.team) {
            let score = similarity::ratio(&name, candidate);
            if score >= self.threshold {
                debug!(
                    "Fuzzy roster match: {} -> {} ({:.3})",
                    player.name, candidate, score
                );
                return Verdict::Fuzzy {
                    matched: candidate.clone(),
                    score,
                };
            }
        }
        Verdict::NotFound
    }

    pub fn is_active(&self, player: &PlayerRecord) -> bool {
        self.check(player).is_accepted()
    }
}

// ---------------------------------------------------------------------------
// Validation report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_players: usize,
    pub valid_players: usize,
    pub invalid_players: usize,
    /// Percentage of valid players, 0 when the input is empty.
    pub validation_rate: f64,
    /// Up to ten rejected players as "Name (POS - TEAM)".
    pub sample_invalid: Vec<String>,
    /// Up to ten rejected players whose team is missing or a free agent.
    pub team_issues: Vec<String>,
    pub active_nfl_count: usize,
}

pub fn validation_report(validator: &RosterValidator, players: &[PlayerRecord]) -> ValidationReport {
    let mut valid = 0;
    let mut sample_invalid = Vec::new();
    let mut team_issues = Vec::new();

    for p in players {
        if validator.is_active(p) {
            valid += 1;
            continue;
        }
        if sample_invalid.len() < 10 {
            sample_invalid.push(format!("{} ({} - {})", p.name, p.position, p.team));
        }
        if !is_valid_team(&p.team) && team_issues.len() < 10 {
            team_issues.push(format!("{} - No team", p.name));
        }
    }

    let total = players.len();
    ValidationReport {
        total_players: total,
        valid_players: valid,
        invalid_players: total - valid,
        validation_rate: if total > 0 {
            valid as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        sample_invalid,
        team_issues,
        active_nfl_count: validator.roster_size(),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
