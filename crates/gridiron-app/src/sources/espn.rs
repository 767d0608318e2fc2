// ESPN fantasy league: rostered players (drafted) plus the top free agents
// (available), read from the league endpoint's `mRoster` and
// `kona_player_info` views.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use gridiron_core::config::{CredentialsConfig, EspnConfig, SourcesConfig};
use gridiron_core::model::{RawPlayer, FREE_AGENT};

use super::{http_client, log_fetched, send_json, PlayerSource, SourceError};

pub const SOURCE: &str = "espn";

/// Stats entry holding season projections.
const STAT_SOURCE_PROJECTED: u64 = 1;
/// Stats entry holding actual season results.
const STAT_SOURCE_ACTUAL: u64 = 0;
/// `scoringPeriodId` of full-season stat entries.
const SEASON_PERIOD: u64 = 0;

/// ESPN `defaultPositionId` to position code.
pub fn position_for_id(id: u64) -> Option<&'static str> {
    match id {
        1 => Some("QB"),
        2 => Some("RB"),
        3 => Some("WR"),
        4 => Some("TE"),
        5 => Some("K"),
        16 => Some("D/ST"),
        _ => None,
    }
}

/// ESPN `proTeamId` to team code. 0 is a free agent.
pub fn team_for_id(id: u64) -> Option<&'static str> {
    let code = match id {
        0 => FREE_AGENT,
        1 => "ATL",
        2 => "BUF",
        3 => "CHI",
        4 => "CIN",
        5 => "CLE",
        6 => "DAL",
        7 => "DEN",
        8 => "DET",
        9 => "GB",
        10 => "TEN",
        11 => "IND",
        12 => "KC",
        13 => "LV",
        14 => "LAR",
        15 => "MIA",
        16 => "MIN",
        17 => "NE",
        18 => "NO",
        19 => "NYG",
        20 => "NYJ",
        21 => "PHI",
        22 => "ARI",
        23 => "PIT",
        24 => "LAC",
        25 => "SF",
        26 => "SEA",
        27 => "TB",
        28 => "WSH",
        29 => "CAR",
        30 => "JAX",
        33 => "BAL",
        34 => "HOU",
        _ => return None,
    };
    Some(code)
}

fn season_stat(player: &Value, stat_source: u64, field: &str) -> Option<f64> {
    player
        .get("stats")?
        .as_array()?
        .iter()
        .find(|s| {
            s.get("statSourceId").and_then(Value::as_u64) == Some(stat_source)
                && s.get("scoringPeriodId").and_then(Value::as_u64) == Some(SEASON_PERIOD)
        })?
        .get(field)?
        .as_f64()
}

/// Convert one ESPN `player` object. Unknown positions are dropped here;
/// unknown team ids become empty and are rejected downstream.
pub fn player_to_raw(player: &Value, drafted: bool) -> Option<RawPlayer> {
    let name = player.get("fullName").and_then(Value::as_str)?;
    let position = player
        .get("defaultPositionId")
        .and_then(Value::as_u64)
        .and_then(position_for_id)?;
    let team = player
        .get("proTeamId")
        .and_then(Value::as_u64)
        .and_then(team_for_id)
        .unwrap_or("");

    let mut raw = RawPlayer::new(name, position, team, SOURCE);
    raw.drafted = drafted;
    raw.espn_id = player.get("id").and_then(Value::as_u64).map(|id| id.to_string());
    raw.projected_points = season_stat(player, STAT_SOURCE_PROJECTED, "appliedTotal");
    raw.avg_points = season_stat(player, STAT_SOURCE_ACTUAL, "appliedAverage");
    raw.injury_status = player
        .get("injuryStatus")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(raw)
}

/// Every rostered player in an `mRoster` league response, marked drafted.
pub fn parse_roster(data: &Value) -> Result<Vec<RawPlayer>, SourceError> {
    let teams = data
        .get("teams")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::malformed(SOURCE, "league response has no teams"))?;

    Ok(teams
        .iter()
        .filter_map(|t| t.get("roster")?.get("entries")?.as_array())
        .flatten()
        .filter_map(|entry| entry.get("playerPoolEntry")?.get("player"))
        .filter_map(|player| player_to_raw(player, true))
        .collect())
}

/// Players in a `kona_player_info` response, marked available.
pub fn parse_free_agents(data: &Value) -> Vec<RawPlayer> {
    data.get("players")
        .and_then(Value::as_array)
        .map(|players| {
            players
                .iter()
                .filter_map(|p| p.get("player"))
                .filter_map(|player| player_to_raw(player, false))
                .collect()
        })
        .unwrap_or_default()
}

fn free_agent_filter(limit: usize) -> String {
    serde_json::json!({
        "players": {
            "filterStatus": { "value": ["FREEAGENT", "WAIVERS"] },
            "limit": limit,
            "sortPercOwned": { "sortPriority": 1, "sortAsc": false }
        }
    })
    .to_string()
}

pub struct EspnSource {
    client: reqwest::Client,
    league_url: String,
    cookie: Option<String>,
    free_agent_limit: usize,
}

impl EspnSource {
    pub fn new(
        sources: &SourcesConfig,
        espn: &EspnConfig,
        credentials: &CredentialsConfig,
        league_id: &str,
        season: i32,
    ) -> Result<Self, SourceError> {
        let cookie = match (&credentials.espn_s2, &credentials.swid) {
            (Some(s2), Some(swid)) if !s2.is_empty() && !swid.is_empty() => {
                Some(format!("espn_s2={s2}; SWID={swid}"))
            }
            _ => None,
        };
        Ok(Self {
            client: http_client(sources.espn_timeout_secs)?,
            league_url: format!(
                "{}/seasons/{season}/segments/0/leagues/{league_id}",
                sources.espn_base_url.trim_end_matches('/')
            ),
            cookie,
            free_agent_limit: espn.free_agent_limit,
        })
    }

    fn request(&self, view: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(&self.league_url).query(&[("view", view)]);
        match &self.cookie {
            Some(cookie) => req.header(reqwest::header::COOKIE, cookie),
            None => req,
        }
    }

    async fn fetch_free_agents(&self) -> Result<Vec<RawPlayer>, SourceError> {
        if self.free_agent_limit == 0 {
            return Ok(Vec::new());
        }
        let request = self
            .request("kona_player_info")
            .header("x-fantasy-filter", free_agent_filter(self.free_agent_limit));
        let data = send_json(SOURCE, request).await?;
        let mut players = parse_free_agents(&data);
        players.truncate(self.free_agent_limit);
        Ok(players)
    }
}

#[async_trait]
impl PlayerSource for EspnSource {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self) -> Result<Vec<RawPlayer>, SourceError> {
        if self.cookie.is_none() {
            debug!("no ESPN cookies configured; only public leagues will load");
        }
        let league = send_json(SOURCE, self.request("mRoster")).await?;
        let mut players = parse_roster(&league)?;
        let rostered = players.len();

        match self.fetch_free_agents().await {
            Ok(free_agents) => players.extend(free_agents),
            Err(e) => warn!("Could not fetch ESPN free agents: {e}"),
        }

        debug!(rostered, total = players.len(), "ESPN league parsed");
        log_fetched(SOURCE, players.len());
        Ok(players)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn espn_player(id: u64, name: &str, pos: u64, team: u64) -> Value {
        json!({
            "id": id,
            "fullName": name,
            "defaultPositionId": pos,
            "proTeamId": team,
            "stats": [
                { "statSourceId": 1, "scoringPeriodId": 0, "appliedTotal": 312.8 },
                { "statSourceId": 0, "scoringPeriodId": 0, "appliedTotal": 390.0, "appliedAverage": 23.1 },
                { "statSourceId": 0, "scoringPeriodId": 3, "appliedTotal": 31.0, "appliedAverage": 31.0 }
            ]
        })
    }

    #[test]
    fn id_maps() {
        assert_eq!(position_for_id(16), Some("D/ST"));
        assert_eq!(position_for_id(9), None);
        assert_eq!(team_for_id(28), Some("WSH"));
        assert_eq!(team_for_id(34), Some("HOU"));
        assert_eq!(team_for_id(0), Some("FA"));
        assert_eq!(team_for_id(31), None);
    }

    #[test]
    fn player_conversion_reads_season_stats() {
        let raw = player_to_raw(&espn_player(3918298, "Josh Allen", 1, 2), true).unwrap();
        assert_eq!(raw.name, "Josh Allen");
        assert_eq!(raw.position, "QB");
        assert_eq!(raw.team, "BUF");
        assert_eq!(raw.espn_id.as_deref(), Some("3918298"));
        assert_eq!(raw.projected_points, Some(312.8));
        assert_eq!(raw.avg_points, Some(23.1));
        assert!(raw.drafted);
    }

    #[test]
    fn roster_walks_every_team() {
        let data = json!({
            "teams": [
                { "roster": { "entries": [
                    { "playerPoolEntry": { "player": espn_player(1, "Josh Allen", 1, 2) } },
                    { "playerPoolEntry": { "player": espn_player(2, "Bad Slot", 7, 2) } }
                ] } },
                { "roster": { "entries": [
                    { "playerPoolEntry": { "player": espn_player(3, "Bills D/ST", 16, 2) } }
                ] } },
                { "id": 3 }
            ]
        });
        let players = parse_roster(&data).unwrap();
        assert_eq!(players.len(), 2);
        assert!(players.iter().all(|p| p.drafted));
        assert_eq!(players[1].position, "D/ST");
    }

    #[test]
    fn roster_without_teams_is_malformed() {
        match parse_roster(&json!({ "id": 1 })) {
            Err(SourceError::Malformed { .. }) => {}
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn free_agents_are_available() {
        let data = json!({ "players": [ { "player": espn_player(9, "Free Guy", 3, 0) } ] });
        let players = parse_free_agents(&data);
        assert_eq!(players.len(), 1);
        assert!(!players[0].drafted);
        assert_eq!(players[0].team, "FA");
    }
}
