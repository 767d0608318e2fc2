// Sleeper public API: the NFL player catalog, a user's drafts and the picks
// of one draft. The catalog doubles as the primary roster oracle and as the
// base player list for a fresh load.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use gridiron_core::cache::FileCache;
use gridiron_core::model::{is_valid_team, Position, RawPlayer};
use gridiron_football::normalize::{normalize_position, normalize_team};
use gridiron_football::roster::sleeper_display_name;
use gridiron_football::stats::catalog_stats;

use super::{cached_fetch, get_json, http_client, log_fetched, PlayerSource, SourceError};

/// Source label stored on records built from the catalog.
pub const SOURCE: &str = "sleeper_api";
const ORIGIN: &str = "sleeper";

/// Cache key for the full `players/nfl` catalog.
pub const CATALOG_CACHE_KEY: &str = "sleeper_players_nfl";

const INACTIVE_STATUSES: [&str; 3] = ["RETIRED", "SUSPENDED", "INACTIVE"];

/// Players kept per team and position in a fresh load.
pub fn depth_limit(position: Position) -> usize {
    match position {
        Position::QB => 4,
        Position::RB => 5,
        Position::WR => 6,
        Position::TE => 4,
        Position::K => 2,
        Position::DEF => 1,
    }
}

// ---------------------------------------------------------------------------
// Catalog -> RawPlayer
// ---------------------------------------------------------------------------

fn str_field<'a>(info: &'a Value, key: &str) -> Option<&'a str> {
    info.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn u32_field(info: &Value, key: &str) -> Option<u32> {
    info.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// One catalog entry as a raw player, or `None` when it has no usable
/// position, team or name, or is retired/suspended/inactive.
pub fn catalog_player(id: &str, info: &Value) -> Option<RawPlayer> {
    let position = Position::from_str_pos(&normalize_position(str_field(info, "position")?))?;
    let team = normalize_team(str_field(info, "team")?);
    if !is_valid_team(&team) {
        return None;
    }
    let name = sleeper_display_name(info).filter(|n| n.chars().count() >= 2)?;

    let status = str_field(info, "status").map(str::to_uppercase);
    if status
        .as_deref()
        .is_some_and(|s| INACTIVE_STATUSES.contains(&s))
    {
        return None;
    }

    let mut raw = RawPlayer::new(&name, position.as_str(), &team, SOURCE);
    raw.sleeper_id = Some(id.to_string());
    raw.status = Some(status.unwrap_or_else(|| "Active".to_string()));
    raw.injury_status = str_field(info, "injury_status").map(str::to_string);
    raw.years_exp = u32_field(info, "years_exp");
    raw.age = u32_field(info, "age");
    raw.college = str_field(info, "college").map(str::to_string);
    raw.stats = catalog_stats(position, info);
    Some(raw)
}

/// Age within 20..=40, at most 20 years of experience, and rookies need
/// either recorded production or a known college.
pub fn passes_quality_filters(raw: &RawPlayer) -> bool {
    if raw.age.is_some_and(|age| !(20..=40).contains(&age)) {
        debug!("Age filter: {} age {:?}", raw.name, raw.age);
        return false;
    }
    match raw.years_exp {
        Some(0) => {
            let has_stats = ["fantasy_points_ppr", "games_played"]
                .iter()
                .any(|k| raw.stats.get(*k).is_some_and(|v| *v > 0.0));
            if !has_stats && raw.college.is_none() {
                debug!("Rookie filter: {} has no stats or college", raw.name);
                return false;
            }
        }
        Some(exp) if exp > 20 => {
            debug!("Experience filter: {} has {exp} years", raw.name);
            return false;
        }
        _ => {}
    }
    true
}

/// Build the base player list from the catalog: quality filters, then the
/// per-team depth limits in catalog id order.
pub fn fresh_players(catalog: &Value) -> Vec<RawPlayer> {
    let Some(players) = catalog.as_object() else {
        return Vec::new();
    };

    let mut depth: HashMap<(Position, String), usize> = HashMap::new();
    let mut out = Vec::new();
    for (id, info) in players {
        let Some(raw) = catalog_player(id, info) else {
            continue;
        };
        if !passes_quality_filters(&raw) {
            continue;
        }
        let Some(position) = Position::from_str_pos(&raw.position) else {
            continue;
        };
        let count = depth.entry((position, raw.team.clone())).or_insert(0);
        *count += 1;
        if *count > depth_limit(position) {
            debug!("Skipping {}: depth limit reached for {} on {}", raw.name, position, raw.team);
            continue;
        }
        out.push(raw);
    }
    info!("Processed {} players from Sleeper catalog", out.len());
    out
}

// ---------------------------------------------------------------------------
// Draft picks
// ---------------------------------------------------------------------------

/// One made pick of a Sleeper draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftPick {
    pub pick_no: Option<u32>,
    pub round: Option<u32>,
    pub player_id: Option<String>,
    pub name: String,
    pub position: String,
    pub team: String,
}

/// Parse `/draft/{id}/picks`. Picks without a player name in their metadata
/// are skipped.
pub fn parse_draft_picks(data: &Value) -> Result<Vec<DraftPick>, SourceError> {
    let picks = data
        .as_array()
        .ok_or_else(|| SourceError::malformed(ORIGIN, "draft picks response is not a list"))?;

    Ok(picks
        .iter()
        .filter_map(|pick| {
            let meta = pick.get("metadata")?;
            let name = sleeper_display_name(meta)?;
            Some(DraftPick {
                pick_no: u32_field(pick, "pick_no"),
                round: u32_field(pick, "round"),
                player_id: str_field(pick, "player_id").map(str::to_string),
                name,
                position: str_field(meta, "position").unwrap_or("").to_string(),
                team: str_field(meta, "team").unwrap_or("").to_string(),
            })
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SleeperClient {
    client: reqwest::Client,
    base_url: String,
}

impl SleeperClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The full `players/nfl` catalog, an object keyed by player id.
    pub async fn players(&self) -> Result<Value, SourceError> {
        let data = get_json(&self.client, ORIGIN, &format!("{}/players/nfl", self.base_url)).await?;
        if !data.is_object() {
            return Err(SourceError::malformed(ORIGIN, "player catalog is not an object"));
        }
        Ok(data)
    }

    /// Drafts a user took part in for `season`.
    pub async fn drafts_by_user(&self, username: &str, season: i32) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}/user/{username}/drafts/nfl/{season}", self.base_url);
        match get_json(&self.client, ORIGIN, &url).await? {
            Value::Array(drafts) => Ok(drafts),
            _ => Err(SourceError::malformed(ORIGIN, "expected a list of drafts")),
        }
    }

    pub async fn draft_picks(&self, draft_id: &str) -> Result<Vec<DraftPick>, SourceError> {
        let url = format!("{}/draft/{draft_id}/picks", self.base_url);
        let data = get_json(&self.client, ORIGIN, &url).await?;
        parse_draft_picks(&data)
    }

    /// Regular-season stats for every player in `year`, keyed by player id.
    pub async fn season_stats(&self, year: i32) -> Result<Value, SourceError> {
        let url = format!("{}/stats/nfl/regular/{year}", self.base_url);
        get_json(&self.client, ORIGIN, &url).await
    }
}

// ---------------------------------------------------------------------------
// PlayerSource
// ---------------------------------------------------------------------------

/// Fresh player list built from the (cached) catalog.
pub struct SleeperSource {
    client: SleeperClient,
    cache: FileCache,
    ttl: chrono::Duration,
}

impl SleeperSource {
    pub fn new(client: SleeperClient, cache: FileCache, ttl: chrono::Duration) -> Self {
        Self { client, cache, ttl }
    }
}

#[async_trait]
impl PlayerSource for SleeperSource {
    fn name(&self) -> &str {
        ORIGIN
    }

    async fn fetch(&self) -> Result<Vec<RawPlayer>, SourceError> {
        let catalog = cached_fetch(&self.cache, CATALOG_CACHE_KEY, self.ttl, || {
            self.client.players()
        })
        .await?;
        let players = fresh_players(&catalog);
        log_fetched(ORIGIN, players.len());
        Ok(players)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
