// Canonical forms for player names, positions and team codes.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use gridiron_core::model::{PlayerRecord, Position, RawPlayer, FREE_AGENT};

/// Two-letter first-name initials expanded to dotted form ("AJ" -> "A.J.").
const INITIALS: [&str; 9] = ["AJ", "BJ", "CJ", "DJ", "JJ", "MJ", "PJ", "RJ", "TJ"];

/// Why a raw record could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("name {raw:?} is shorter than two characters after cleaning")]
    NameTooShort { raw: String },

    #[error("position {raw:?} is not a fantasy position")]
    UnknownPosition { raw: String },
}

fn suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+(jr\.?|sr\.?|iii|iv|v)$").expect("suffix regex"))
}

fn initials_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = INITIALS.join("|");
        Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("initials regex")
    })
}

/// Uppercase the first letter of every alphabetic run and lowercase the rest,
/// so `"ja'marr CHASE"` becomes `"Ja'Marr Chase"`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a display name.
///
/// Steps, in order: collapse whitespace, title-case, drop a trailing
/// generational suffix, expand two-letter initials, strip characters other
/// than ASCII letters, whitespace, periods and apostrophes.
pub fn clean_name(raw: &str) -> String {
    let name = title_case(&collapse_whitespace(raw));
    let name = suffix_re().replace(&name, "");
    let name = initials_re().replace_all(&name, |caps: &regex::Captures| {
        let upper = caps[1].to_uppercase();
        let mut chars = upper.chars();
        match (chars.next(), chars.next()) {
            (Some(a), Some(b)) => format!("{a}.{b}."),
            _ => upper,
        }
    });
    let stripped: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace() || *c == '.' || *c == '\'')
        .collect();
    collapse_whitespace(&stripped)
}

/// Uppercase and map position aliases. Lineup slots that are not positions
/// (FLEX, SUPERFLEX, BN) become the empty string.
pub fn normalize_position(raw: &str) -> String {
    let pos = raw.trim().to_uppercase();
    match pos.as_str() {
        "D/ST" | "DST" => "DEF".to_string(),
        "FLEX" | "SUPERFLEX" | "BN" => String::new(),
        _ => pos,
    }
}

/// Uppercase and map legacy or alternate franchise codes. Empty input means
/// the player is unsigned.
pub fn normalize_team(raw: &str) -> String {
    let team = raw.trim().to_uppercase();
    match team.as_str() {
        "" => FREE_AGENT.to_string(),
        "LAS" | "LVRD" => "LV".to_string(),
        "WSH" | "WFT" => "WAS".to_string(),
        "JAC" => "JAX".to_string(),
        "LA" => "LAR".to_string(),
        _ => team,
    }
}

/// Normalize a raw adapter record into a `PlayerRecord`.
///
/// Team validity is not checked here: an unknown or free-agent team survives
/// normalization and is rejected by the roster validator.
pub fn normalize_player(raw: &RawPlayer) -> Result<PlayerRecord, RejectReason> {
    let name = clean_name(&raw.name);
    if name.chars().count() < 2 {
        return Err(RejectReason::NameTooShort {
            raw: raw.name.clone(),
        });
    }

    let position = Position::from_str_pos(&normalize_position(&raw.position)).ok_or_else(|| {
        RejectReason::UnknownPosition {
            raw: raw.position.clone(),
        }
    })?;

    let mut record = PlayerRecord::new(&name, position, &normalize_team(&raw.team), &raw.source);
    record.rank = raw.rank;
    record.adp = raw.adp;
    record.projected_points = raw.projected_points;
    record.avg_points = raw.avg_points;
    record.drafted = raw.drafted;
    record.adp_data = raw.adp_data.clone();
    record.sleeper_id = raw.sleeper_id.clone();
    record.espn_id = raw.espn_id.clone();
    record.status = raw.status.clone();
    record.injury_status = raw.injury_status.clone();
    record.years_exp = raw.years_exp;
    record.age = raw.age;
    record.college = raw.college.clone();
    record.stats = raw.stats.clone();
    Ok(record)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
