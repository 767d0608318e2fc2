// In-memory queries over a snapshot of stored players: name search, filters,
// sorting, pagination and the draft-day helper lists.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use gridiron_core::model::{PlayerRecord, Position};

pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Characters of the query that must appear in the name for a typo match.
const FUZZY_CONTAINMENT: f64 = 0.7;

const SLEEPER_LIMIT: usize = 20;
const HANDCUFF_LIMIT: usize = 5;
const VALUE_LIMIT: usize = 15;
const SIMILAR_LIMIT: usize = 5;

/// A player plus the score that placed it in a result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPlayer {
    #[serde(flatten)]
    pub player: PlayerRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl ScoredPlayer {
    fn plain(player: &PlayerRecord) -> Self {
        Self {
            player: player.clone(),
            score: None,
        }
    }

    fn scored(player: &PlayerRecord, score: f64) -> Self {
        Self {
            player: player.clone(),
            score: Some(score),
        }
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    ProjectedPoints,
    AvgPoints,
    Adp,
    Rank,
    Age,
    YearsExp,
    Name,
    Team,
    Position,
}

impl SortField {
    /// Parse a query-string value; unknown fields fall back to projected points.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "avg_points" => Self::AvgPoints,
            "adp" => Self::Adp,
            "rank" => Self::Rank,
            "age" => Self::Age,
            "years_exp" => Self::YearsExp,
            "name" => Self::Name,
            "team" => Self::Team,
            "position" => Self::Position,
            _ => Self::ProjectedPoints,
        }
    }

    /// Rank and ADP always sort best-first regardless of the direction flag.
    fn always_ascending(self) -> bool {
        matches!(self, Self::Rank | Self::Adp)
    }

    fn compare(self, a: &PlayerRecord, b: &PlayerRecord) -> Ordering {
        fn num(v: Option<f64>) -> f64 {
            v.unwrap_or(0.0)
        }
        match self {
            Self::ProjectedPoints => num(a.projected_points).total_cmp(&num(b.projected_points)),
            Self::AvgPoints => num(a.avg_points).total_cmp(&num(b.avg_points)),
            Self::Adp => a.adp.unwrap_or(999.0).total_cmp(&b.adp.unwrap_or(999.0)),
            Self::Rank => rank_or_default(a).cmp(&rank_or_default(b)),
            Self::Age => a.age.unwrap_or(0).cmp(&b.age.unwrap_or(0)),
            Self::YearsExp => a.years_exp.unwrap_or(0).cmp(&b.years_exp.unwrap_or(0)),
            Self::Name => a.name.cmp(&b.name),
            Self::Team => a.team.cmp(&b.team),
            Self::Position => a.position.as_str().cmp(b.position.as_str()),
        }
    }

    fn ordering(self, a: &PlayerRecord, b: &PlayerRecord, descending: bool) -> Ordering {
        let ord = self.compare(a, b);
        if descending && !self.always_ascending() {
            ord.reverse()
        } else {
            ord
        }
    }
}

fn rank_or_default(p: &PlayerRecord) -> u32 {
    match p.rank {
        Some(r) if r > 0 => r,
        _ => 999,
    }
}

fn proj(p: &PlayerRecord) -> f64 {
    p.projected_points.unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub position: Option<Position>,
    pub team: Option<String>,
    pub drafted: Option<bool>,
    pub available_only: bool,
    pub sort_by: SortField,
    pub sort_desc: bool,
    pub max_results: Option<usize>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            position: None,
            team: None,
            drafted: None,
            available_only: true,
            sort_by: SortField::ProjectedPoints,
            sort_desc: true,
            max_results: Some(DEFAULT_MAX_RESULTS),
        }
    }
}

/// Score a lowercased, trimmed query against a name: exact 100, prefix 90,
/// substring 70, typo match 50.
pub fn name_score(query: &str, name: &str) -> Option<f64> {
    let name = name.to_lowercase();
    if query == name {
        Some(100.0)
    } else if name.starts_with(query) {
        Some(90.0)
    } else if name.contains(query) {
        Some(70.0)
    } else if fuzzy_contains(query, &name) {
        Some(50.0)
    } else {
        None
    }
}

/// Share of the query's characters (whitespace ignored) present anywhere in
/// the name.
fn fuzzy_contains(query: &str, name: &str) -> bool {
    let q: Vec<char> = query.chars().filter(|c| !c.is_whitespace()).collect();
    let n: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    if q.is_empty() || n.is_empty() {
        return false;
    }
    let hits = q.iter().filter(|c| n.contains(**c)).count();
    hits as f64 / q.len() as f64 >= FUZZY_CONTAINMENT
}

/// Filter, score and order `players`.
///
/// With a name query, results sort by match score first and the chosen field
/// second. `max_results = None` returns everything (the caller paginates).
pub fn search(players: &[PlayerRecord], params: &SearchParams) -> Vec<ScoredPlayer> {
    let query = params.query.trim().to_lowercase();
    let team = params.team.as_deref().map(str::to_uppercase);

    let mut results: Vec<ScoredPlayer> = players
        .iter()
        .filter(|p| !(params.available_only && p.drafted))
        .filter(|p| params.drafted.map_or(true, |d| p.drafted == d))
        .filter(|p| params.position.map_or(true, |pos| p.position == pos))
        .filter(|p| team.as_deref().map_or(true, |t| p.team == t))
        .filter_map(|p| {
            if query.is_empty() {
                Some(ScoredPlayer::plain(p))
            } else {
                name_score(&query, &p.name).map(|s| ScoredPlayer::scored(p, s))
            }
        })
        .collect();

    results.sort_by(|a, b| {
        let by_score = b
            .score
            .unwrap_or(0.0)
            .total_cmp(&a.score.unwrap_or(0.0));
        by_score.then_with(|| params.sort_by.ordering(&a.player, &b.player, params.sort_desc))
    });

    if let Some(limit) = params.max_results {
        results.truncate(limit);
    }
    results
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice one 1-based page out of `items`. Page 0 is treated as page 1; a page
/// past the end is empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> (Vec<T>, Pagination) {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    (
        items[start..end].to_vec(),
        Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    )
}

// ---------------------------------------------------------------------------
// Draft helpers
// ---------------------------------------------------------------------------

/// Best available players at one position by projection.
pub fn top_by_position(players: &[PlayerRecord], position: Position, limit: usize) -> Vec<ScoredPlayer> {
    search(
        players,
        &SearchParams {
            position: Some(position),
            max_results: Some(limit),
            ..Default::default()
        },
    )
}

/// Young, lower-ranked players with solid projections.
///
/// Eligible: undrafted, projection over 100, rank over 50, age under 28
/// (missing age counts as 30, missing rank as 999).
/// Score: `proj + (30 - age) * 5 - rank * 0.5`, rounded to one decimal.
pub fn sleeper_picks(players: &[PlayerRecord]) -> Vec<ScoredPlayer> {
    let mut out: Vec<ScoredPlayer> = players
        .iter()
        .filter(|p| !p.drafted)
        .filter_map(|p| {
            let proj = proj(p);
            let rank = rank_or_default(p) as f64;
            let age = p.age.filter(|a| *a > 0).unwrap_or(30) as f64;
            if proj > 100.0 && rank > 50.0 && age < 28.0 {
                let score = proj + (30.0 - age) * 5.0 - rank * 0.5;
                Some(ScoredPlayer::scored(p, round1(score)))
            } else {
                None
            }
        })
        .collect();
    sort_by_score_desc(&mut out);
    out.truncate(SLEEPER_LIMIT);
    out
}

/// Undrafted running backs on the same team as the named running back.
/// Empty when the name is unknown or the player is not an RB.
pub fn handcuffs(players: &[PlayerRecord], name: &str) -> Vec<PlayerRecord> {
    let Some(target) = find_by_name(players, name) else {
        return Vec::new();
    };
    if target.position != Position::RB || target.team.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<PlayerRecord> = players
        .iter()
        .filter(|p| {
            p.position == Position::RB
                && p.team == target.team
                && p.name != target.name
                && !p.drafted
        })
        .cloned()
        .collect();
    out.sort_by(|a, b| proj(b).total_cmp(&proj(a)));
    out.truncate(HANDCUFF_LIMIT);
    out
}

/// Undrafted players whose projection beats a simple rank-based expectation,
/// `max(50, 300 - rank * 2)`, by more than 20 points.
pub fn value_picks(players: &[PlayerRecord]) -> Vec<ScoredPlayer> {
    let mut out: Vec<ScoredPlayer> = players
        .iter()
        .filter(|p| !p.drafted)
        .filter_map(|p| {
            let proj = proj(p);
            let rank = rank_or_default(p) as f64;
            if proj <= 0.0 {
                return None;
            }
            let expected = (300.0 - rank * 2.0).max(50.0);
            let value = proj - expected;
            (value > 20.0).then(|| ScoredPlayer::scored(p, round1(value)))
        })
        .collect();
    sort_by_score_desc(&mut out);
    out.truncate(VALUE_LIMIT);
    out
}

/// Same-position players closest in projection to the named one.
pub fn similar_players(players: &[PlayerRecord], name: &str) -> Vec<PlayerRecord> {
    let Some(target) = find_by_name(players, name) else {
        return Vec::new();
    };
    let target_proj = proj(target);

    let mut out: Vec<PlayerRecord> = players
        .iter()
        .filter(|p| p.position == target.position && p.name != target.name)
        .cloned()
        .collect();
    out.sort_by(|a, b| {
        (proj(a) - target_proj)
            .abs()
            .total_cmp(&(proj(b) - target_proj).abs())
    });
    out.truncate(SIMILAR_LIMIT);
    out
}

fn find_by_name<'a>(players: &'a [PlayerRecord], name: &str) -> Option<&'a PlayerRecord> {
    let wanted = name.trim().to_lowercase();
    players.iter().find(|p| p.name.to_lowercase() == wanted)
}

fn sort_by_score_desc(items: &mut [ScoredPlayer]) {
    items.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Team needs
// ---------------------------------------------------------------------------

/// Starting-roster targets used to rank positional needs.
pub const POSITION_TARGETS: [(Position, u32); 6] = [
    (Position::QB, 2),
    (Position::RB, 6),
    (Position::WR, 6),
    (Position::TE, 2),
    (Position::K, 1),
    (Position::DEF, 2),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn for_need(need: u32) -> Self {
        match need {
            0 => Self::Low,
            1 => Self::Medium,
            _ => Self::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionNeed {
    pub current: u32,
    pub target: u32,
    pub need: u32,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityEntry {
    pub position: Position,
    pub need: u32,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamNeeds {
    pub position_counts: BTreeMap<Position, u32>,
    pub needs: BTreeMap<Position, PositionNeed>,
    pub priorities: Vec<PriorityEntry>,
}

/// Count the user's drafted players by position and rank what is missing.
/// Names that are not in `players` are ignored.
pub fn team_needs(players: &[PlayerRecord], drafted_names: &[String]) -> TeamNeeds {
    let mut counts: BTreeMap<Position, u32> = Position::ALL.iter().map(|p| (*p, 0)).collect();
    for name in drafted_names {
        if let Some(p) = find_by_name(players, name) {
            *counts.entry(p.position).or_default() += 1;
        }
    }

    let mut needs = BTreeMap::new();
    let mut priorities = Vec::new();
    for (position, target) in POSITION_TARGETS {
        let current = counts.get(&position).copied().unwrap_or(0);
        let need = target.saturating_sub(current);
        let priority = Priority::for_need(need);
        needs.insert(
            position,
            PositionNeed {
                current,
                target,
                need,
                priority,
            },
        );
        if need > 0 {
            priorities.push(PriorityEntry {
                position,
                need,
                priority,
            });
        }
    }
    // stable: equal needs keep target order
    priorities.sort_by(|a, b| b.need.cmp(&a.need));

    TeamNeeds {
        position_counts: counts,
        needs,
        priorities,
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    pub total_players: usize,
    pub available_players: usize,
    pub drafted_players: usize,
    pub position_counts: BTreeMap<Position, usize>,
    pub available_by_position: BTreeMap<Position, usize>,
}

pub fn summary(players: &[PlayerRecord]) -> SearchSummary {
    let mut position_counts = BTreeMap::new();
    let mut available_by_position = BTreeMap::new();
    let mut available = 0;
    for p in players {
        *position_counts.entry(p.position).or_insert(0) += 1;
        if !p.drafted {
            available += 1;
            *available_by_position.entry(p.position).or_insert(0) += 1;
        }
    }
    SearchSummary {
        total_players: players.len(),
        available_players: available,
        drafted_players: players.len() - available,
        position_counts,
        available_by_position,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, position: Position, team: &str, proj: f64) -> PlayerRecord {
        let mut p = PlayerRecord::new(name, position, team, "test");
        p.projected_points = Some(proj);
        p
    }

    fn roster() -> Vec<PlayerRecord> {
        let mut drafted = player("Bijan Robinson", Position::RB, "ATL", 300.0);
        drafted.drafted = true;
        vec![
            player("Josh Allen", Position::QB, "BUF", 380.0),
            player("Josh Jacobs", Position::RB, "GB", 250.0),
            player("Joshua Palmer", Position::WR, "LAC", 120.0),
            player("Lamar Jackson", Position::QB, "BAL", 370.0),
            drafted,
            player("Tyler Allgeier", Position::RB, "ATL", 110.0),
            player("Jase McClellan", Position::RB, "ATL", 40.0),
        ]
    }

    #[test]
    fn name_scores() {
        assert_eq!(name_score("josh allen", "Josh Allen"), Some(100.0));
        assert_eq!(name_score("josh", "Josh Allen"), Some(90.0));
        assert_eq!(name_score("allen", "Josh Allen"), Some(70.0));
        // every query letter appears in the name
        assert_eq!(name_score("jsoh", "Josh Allen"), Some(50.0));
        assert_eq!(name_score("zzzz", "Josh Allen"), None);
    }

    #[test]
    fn search_orders_by_score_then_field() {
        let players = roster();
        let params = SearchParams {
            query: "josh".into(),
            ..Default::default()
        };
        let names: Vec<String> = search(&players, &params)
            .into_iter()
            .map(|s| s.player.name)
            .collect();
        // three prefix matches ordered by projection, then a typo-level match
        assert_eq!(
            names,
            vec!["Josh Allen", "Josh Jacobs", "Joshua Palmer", "Lamar Jackson"]
        );
    }

    #[test]
    fn search_filters_and_available_only() {
        let players = roster();
        let atl = search(
            &players,
            &SearchParams {
                team: Some("atl".into()),
                ..Default::default()
            },
        );
        assert_eq!(atl.len(), 2);
        assert!(atl.iter().all(|s| !s.player.drafted));

        let with_drafted = search(
            &players,
            &SearchParams {
                team: Some("ATL".into()),
                available_only: false,
                ..Default::default()
            },
        );
        assert_eq!(with_drafted[0].player.name, "Bijan Robinson");
    }

    #[test]
    fn rank_sorts_ascending_even_when_descending_requested() {
        let mut players = roster();
        players[0].rank = Some(3);
        players[1].rank = Some(1);
        let out = search(
            &players,
            &SearchParams {
                sort_by: SortField::Rank,
                sort_desc: true,
                ..Default::default()
            },
        );
        assert_eq!(out[0].player.name, "Josh Jacobs");
        assert_eq!(out[1].player.name, "Josh Allen");
    }

    #[test]
    fn paginate_slices_pages() {
        let items: Vec<u32> = (1..=7).collect();
        let (page, info) = paginate(&items, 2, 3);
        assert_eq!(page, vec![4, 5, 6]);
        assert_eq!(info.total, 7);
        assert_eq!(info.total_pages, 3);

        let (last, _) = paginate(&items, 3, 3);
        assert_eq!(last, vec![7]);
        let (past, _) = paginate(&items, 9, 3);
        assert!(past.is_empty());
        let (first, info) = paginate(&items, 0, 3);
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(info.page, 1);
    }

    #[test]
    fn paginate_huge_page_size_does_not_overflow() {
        let items = [1, 2, 3];
        let (page, info) = paginate(&items, 2, usize::MAX);
        assert!(page.is_empty());
        assert_eq!(info.total_pages, 1);

        let (all, _) = paginate(&items, 1, usize::MAX);
        assert_eq!(all, vec![1, 2, 3]);
        let (far, _) = paginate(&items, usize::MAX, usize::MAX);
        assert!(far.is_empty());
    }

    #[test]
    fn sleepers_require_youth_rank_and_projection() {
        let mut young = player("Young Guy", Position::WR, "DET", 150.0);
        young.age = Some(24);
        young.rank = Some(80);
        let mut old = player("Old Guy", Position::WR, "DET", 150.0);
        old.age = Some(31);
        old.rank = Some(80);
        let mut unranked = player("Unranked Guy", Position::WR, "DET", 120.0);
        unranked.age = Some(22);

        let out = sleeper_picks(&[young, old, unranked]);
        assert_eq!(out.len(), 2);
        // 150 + 30 - 40
        assert_eq!(out[0].player.name, "Young Guy");
        assert_eq!(out[0].score, Some(140.0));
        // 120 + 40 - 499.5
        assert_eq!(out[1].score, Some(-339.5));
    }

    #[test]
    fn handcuffs_are_same_team_undrafted_rbs() {
        let players = roster();
        let names: Vec<String> = handcuffs(&players, "bijan robinson")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Tyler Allgeier", "Jase McClellan"]);
        assert!(handcuffs(&players, "Josh Allen").is_empty());
        assert!(handcuffs(&players, "Nobody").is_empty());
    }

    #[test]
    fn value_picks_beat_rank_expectation() {
        let mut value = player("Value Guy", Position::RB, "NYJ", 200.0);
        value.rank = Some(100);
        let mut fair = player("Fair Guy", Position::RB, "NYJ", 200.0);
        fair.rank = Some(50);
        let out = value_picks(&[value, fair]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].player.name, "Value Guy");
        assert_eq!(out[0].score, Some(100.0));
    }

    #[test]
    fn team_needs_ranks_missing_positions() {
        let players = roster();
        let needs = team_needs(
            &players,
            &["Josh Allen".to_string(), "Lamar Jackson".into(), "Unknown".into()],
        );
        assert_eq!(needs.position_counts[&Position::QB], 2);
        assert_eq!(needs.needs[&Position::QB].priority, Priority::Low);
        assert_eq!(needs.needs[&Position::K].priority, Priority::Medium);
        assert_eq!(needs.needs[&Position::RB].priority, Priority::High);
        let order: Vec<Position> = needs.priorities.iter().map(|p| p.position).collect();
        assert_eq!(
            order,
            vec![Position::RB, Position::WR, Position::TE, Position::DEF, Position::K]
        );
    }

    #[test]
    fn summary_counts_availability() {
        let s = summary(&roster());
        assert_eq!(s.total_players, 7);
        assert_eq!(s.drafted_players, 1);
        assert_eq!(s.position_counts[&Position::RB], 4);
        assert_eq!(s.available_by_position[&Position::RB], 3);
    }

    #[test]
    fn similar_players_by_projection_gap() {
        let names: Vec<String> = similar_players(&roster(), "Josh Allen")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Lamar Jackson"]);
    }
}
