// Season stat lines: mapping Sleeper stat keys to readable names, career
// totals, averages and simple projections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gridiron_core::model::Position;

/// Games assumed for a projected season.
pub const PROJECTED_GAMES: f64 = 16.0;

pub type StatLine = BTreeMap<String, f64>;

// Sleeper key -> stored key.

const COMMON_CATALOG_STATS: &[(&str, &str)] = &[
    ("gp", "games_played"),
    ("pts_ppr", "fantasy_points_ppr"),
    ("pts_std", "fantasy_points_std"),
    ("pts_half_ppr", "fantasy_points_half_ppr"),
];

const QB_STATS: &[(&str, &str)] = &[
    ("pass_yd", "passing_yards"),
    ("pass_td", "passing_tds"),
    ("pass_int", "interceptions"),
    ("rush_yd", "rushing_yards"),
    ("rush_td", "rushing_tds"),
];

const RB_STATS: &[(&str, &str)] = &[
    ("rush_yd", "rushing_yards"),
    ("rush_td", "rushing_tds"),
    ("rec", "receptions"),
    ("rec_yd", "receiving_yards"),
    ("rec_td", "receiving_tds"),
];

const RECEIVER_STATS: &[(&str, &str)] = &[
    ("rec", "receptions"),
    ("rec_yd", "receiving_yards"),
    ("rec_td", "receiving_tds"),
    ("rush_yd", "rushing_yards"),
    ("rush_td", "rushing_tds"),
];

const K_STATS: &[(&str, &str)] = &[
    ("fgm", "field_goals_made"),
    ("fga", "field_goals_attempted"),
    ("xpm", "extra_points_made"),
    ("xpa", "extra_points_attempted"),
];

fn position_stats(position: Position) -> &'static [(&'static str, &'static str)] {
    match position {
        Position::QB => QB_STATS,
        Position::RB => RB_STATS,
        Position::WR | Position::TE => RECEIVER_STATS,
        Position::K => K_STATS,
        Position::DEF => &[],
    }
}

fn number(obj: &Value, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

/// Positive stat values carried on a Sleeper catalog entry, under stored
/// names. Zero and missing values are left out.
pub fn catalog_stats(position: Position, info: &Value) -> StatLine {
    COMMON_CATALOG_STATS
        .iter()
        .chain(position_stats(position))
        .filter_map(|(from, to)| {
            number(info, from)
                .filter(|v| *v > 0.0)
                .map(|v| (to.to_string(), v))
        })
        .collect()
}

/// One season's Sleeper stat object reduced to the position's stat line.
///
/// Every key is present (missing values become 0). Fantasy points use PPR
/// scoring except for kickers, which use standard.
pub fn season_line(position: Position, raw: &Value) -> StatLine {
    let mut line = StatLine::new();
    line.insert("games_played".into(), number(raw, "gp").unwrap_or(0.0));
    for (from, to) in position_stats(position) {
        // Kicker attempts at extra points are not part of the season line.
        if *from == "xpa" {
            continue;
        }
        line.insert(to.to_string(), number(raw, from).unwrap_or(0.0));
    }
    let points_key = if position == Position::K { "pts_std" } else { "pts_ppr" };
    line.insert("fantasy_points".into(), number(raw, points_key).unwrap_or(0.0));
    line
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Multi-season view of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerStats {
    pub player_name: String,
    pub position: Position,
    pub seasons: BTreeMap<i32, StatLine>,
    pub career_totals: StatLine,
    pub averages: StatLine,
    pub projections: StatLine,
}

impl CareerStats {
    pub fn from_seasons(player_name: &str, position: Position, seasons: BTreeMap<i32, StatLine>) -> Self {
        let career_totals = career_totals(&seasons);
        let averages = averages(&seasons);
        let projections = projections(&averages);
        Self {
            player_name: player_name.to_string(),
            position,
            seasons,
            career_totals,
            averages,
            projections,
        }
    }

    /// Career stats with no seasons on record.
    pub fn empty(player_name: &str, position: Position) -> Self {
        Self::from_seasons(player_name, position, BTreeMap::new())
    }
}

/// Sum of every stat across seasons.
pub fn career_totals(seasons: &BTreeMap<i32, StatLine>) -> StatLine {
    let mut totals = StatLine::new();
    for line in seasons.values() {
        for (stat, v) in line {
            *totals.entry(stat.clone()).or_insert(0.0) += v;
        }
    }
    totals
}

/// `{stat}_per_season` over all seasons and `{stat}_per_game` over games
/// played, both rounded to one decimal. Games played itself is not averaged.
pub fn averages(seasons: &BTreeMap<i32, StatLine>) -> StatLine {
    let mut out = StatLine::new();
    if seasons.is_empty() {
        return out;
    }

    let mut totals = career_totals(seasons);
    let games = totals.remove("games_played").unwrap_or(0.0);
    let season_count = seasons.len() as f64;

    for (stat, total) in &totals {
        out.insert(format!("{stat}_per_season"), round1(total / season_count));
        if games > 0.0 {
            out.insert(format!("{stat}_per_game"), round1(total / games));
        }
    }
    out
}

/// `projected_{stat}` from averages: per-game rate over a full season when
/// available, otherwise the per-season average.
pub fn projections(averages: &StatLine) -> StatLine {
    let mut out = StatLine::new();
    for (stat, v) in averages {
        if let Some(base) = stat.strip_suffix("_per_season") {
            out.entry(format!("projected_{base}")).or_insert(round1(*v));
        }
    }
    for (stat, v) in averages {
        if let Some(base) = stat.strip_suffix("_per_game") {
            out.insert(format!("projected_{base}"), round1(v * PROJECTED_GAMES));
        }
    }
    out
}

fn match_form(name: &str) -> String {
    name.to_lowercase().replace(['.', '\''], "")
}

/// Find a Sleeper player id by name and position in the player catalog.
/// Matches either `full_name` or `first_name last_name`, ignoring case,
/// periods and apostrophes.
pub fn find_player_id(catalog: &Value, name: &str, position: Position) -> Option<String> {
    let wanted = match_form(name);
    let players = catalog.as_object()?;
    players.iter().find_map(|(id, info)| {
        if info.get("position").and_then(Value::as_str) != Some(position.as_str()) {
            return None;
        }
        let full = info.get("full_name").and_then(Value::as_str).unwrap_or("");
        let first = info.get("first_name").and_then(Value::as_str).unwrap_or("");
        let last = info.get("last_name").and_then(Value::as_str).unwrap_or("");
        let matches = match_form(full) == wanted || match_form(&format!("{first} {last}")) == wanted;
        matches.then(|| id.clone())
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_stats_keep_positive_values() {
        let info = json!({ "gp": 17, "pts_ppr": 0.0, "rec": 90, "pass_yd": 12 });
        let stats = catalog_stats(Position::WR, &info);
        assert_eq!(stats.get("games_played"), Some(&17.0));
        assert_eq!(stats.get("receptions"), Some(&90.0));
        assert!(!stats.contains_key("fantasy_points_ppr"));
        // passing yards are not a receiver stat
        assert!(!stats.contains_key("passing_yards"));
    }

    #[test]
    fn season_line_fills_missing_and_uses_kicker_scoring() {
        let qb = season_line(Position::QB, &json!({ "gp": 17, "pass_yd": 4300, "pts_ppr": 390.2 }));
        assert_eq!(qb["passing_yards"], 4300.0);
        assert_eq!(qb["interceptions"], 0.0);
        assert_eq!(qb["fantasy_points"], 390.2);

        let k = season_line(Position::K, &json!({ "gp": 17, "fgm": 30, "pts_std": 140.0, "pts_ppr": 1.0 }));
        assert_eq!(k["field_goals_made"], 30.0);
        assert_eq!(k["fantasy_points"], 140.0);
        assert!(!k.contains_key("extra_points_attempted"));
    }

    #[test]
    fn career_averages_and_projections() {
        let mut seasons = BTreeMap::new();
        seasons.insert(
            2023,
            StatLine::from([("games_played".to_string(), 16.0), ("rushing_yards".to_string(), 1000.0)]),
        );
        seasons.insert(
            2024,
            StatLine::from([("games_played".to_string(), 4.0), ("rushing_yards".to_string(), 300.0)]),
        );

        let career = CareerStats::from_seasons("Some Back", Position::RB, seasons);
        assert_eq!(career.career_totals["rushing_yards"], 1300.0);
        assert_eq!(career.career_totals["games_played"], 20.0);
        assert_eq!(career.averages["rushing_yards_per_season"], 650.0);
        assert_eq!(career.averages["rushing_yards_per_game"], 65.0);
        assert!(!career.averages.contains_key("games_played_per_season"));
        assert_eq!(career.projections["projected_rushing_yards"], 1040.0);
    }

    #[test]
    fn projections_fall_back_to_season_average_without_games() {
        let mut seasons = BTreeMap::new();
        seasons.insert(2024, StatLine::from([("receptions".to_string(), 41.0)]));
        let career = CareerStats::from_seasons("No Games", Position::TE, seasons);
        assert!(!career.averages.contains_key("receptions_per_game"));
        assert_eq!(career.projections["projected_receptions"], 41.0);
    }

    #[test]
    fn empty_career() {
        let career = CareerStats::empty("Nobody", Position::QB);
        assert!(career.averages.is_empty());
        assert!(career.projections.is_empty());
    }

    #[test]
    fn finds_player_ids_by_either_name_form() {
        let catalog = json!({
            "4984": { "full_name": "Josh Allen", "position": "QB" },
            "1111": { "full_name": "Josh Allen", "position": "LB" },
            "5859": { "first_name": "A.J.", "last_name": "Brown", "position": "WR" },
            "7777": { "full_name": "Ja'Marr Chase", "position": "WR" }
        });
        assert_eq!(find_player_id(&catalog, "josh allen", Position::QB).as_deref(), Some("4984"));
        assert_eq!(find_player_id(&catalog, "AJ Brown", Position::WR).as_deref(), Some("5859"));
        assert_eq!(find_player_id(&catalog, "JaMarr Chase", Position::WR).as_deref(), Some("7777"));
        assert_eq!(find_player_id(&catalog, "Josh Allen", Position::TE), None);
    }
}
