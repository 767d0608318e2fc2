// Fantasy Football Calculator ADP feed, one request per scoring format.
// Responses are cached per (format, teams, year) with the ADP TTL.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use gridiron_core::cache::FileCache;
use gridiron_core::model::RawPlayer;

use super::{cached_fetch, send_json, http_client, SourceError};

pub const SOURCE: &str = "fantasyfootballcalculator";

/// Cache key for one ADP dataset.
pub fn cache_key(format: &str, teams: u32, year: i32) -> String {
    format!("{format}_{teams}_{year}")
}

fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// ADP values arrive as numbers or numeric strings. Zero means none.
fn first_number(item: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| match item.get(*k)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|v| *v > 0.0)
}

fn ffc_player(item: &Value, format: &str) -> Option<RawPlayer> {
    let name = first_str(item, &["name", "player_name"])?;
    let position = first_str(item, &["position", "pos"])?;
    let team = first_str(item, &["team", "team_abbr"]).unwrap_or("");

    let mut raw = RawPlayer::new(name, &position.to_uppercase(), &team.to_uppercase(), SOURCE);
    raw.adp = first_number(item, &["adp", "avg_pick"]);
    if let Some(adp) = raw.adp {
        raw.adp_data.insert(format.to_string(), adp);
    }
    Some(raw)
}

/// Parse an ADP response. The player list may sit under `players` or be the
/// body itself, and may be a list or an object of player objects.
pub fn parse_adp(data: &Value, format: &str) -> Vec<RawPlayer> {
    let players = data.get("players").unwrap_or(data);
    let items: Vec<&Value> = match players {
        Value::Array(list) => list.iter().collect(),
        Value::Object(map) => map.values().filter(|v| v.is_object()).collect(),
        _ => Vec::new(),
    };
    items.into_iter().filter_map(|item| ffc_player(item, format)).collect()
}

pub struct AdpClient {
    client: reqwest::Client,
    base_url: String,
    cache: FileCache,
    ttl: chrono::Duration,
    teams: u32,
    year: i32,
}

impl AdpClient {
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        cache: FileCache,
        ttl: chrono::Duration,
        teams: u32,
        year: i32,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            ttl,
            teams,
            year,
        })
    }

    /// ADP rows for one scoring format, served from cache when fresh.
    pub async fn fetch_format(&self, format: &str) -> Result<Vec<RawPlayer>, SourceError> {
        let key = cache_key(format, self.teams, self.year);
        let data = cached_fetch(&self.cache, &key, self.ttl, || {
            let request = self
                .client
                .get(format!("{}/adp/{format}", self.base_url))
                .query(&[("teams", self.teams.to_string()), ("year", self.year.to_string())]);
            send_json(SOURCE, request)
        })
        .await?;
        let players = parse_adp(&data, format);
        info!("Retrieved {} ADP rows for {format}", players.len());
        Ok(players)
    }

    /// Every format that could be loaded, keyed by format name. A format that
    /// fails with no cached copy is left out.
    pub async fn fetch_all(&self, formats: &[String]) -> BTreeMap<String, Vec<RawPlayer>> {
        let mut out = BTreeMap::new();
        for format in formats {
            match self.fetch_format(format).await {
                Ok(players) if !players.is_empty() => {
                    out.insert(format.clone(), players);
                }
                Ok(_) => warn!("ADP feed for {format} returned no players"),
                Err(e) => warn!("Skipping ADP format {format}: {e}"),
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wrapped_list() {
        let data = json!({
            "status": "Success",
            "players": [
                { "name": "Christian McCaffrey", "position": "RB", "team": "SF", "adp": 1.3 },
                { "name": "CeeDee Lamb", "position": "wr", "team": "dal", "adp": "2.8" },
                { "name": "", "position": "QB", "team": "BUF", "adp": 3.0 }
            ]
        });
        let players = parse_adp(&data, "ppr");
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].adp, Some(1.3));
        assert_eq!(players[0].adp_data.get("ppr"), Some(&1.3));
        assert_eq!(players[1].position, "WR");
        assert_eq!(players[1].team, "DAL");
        assert_eq!(players[1].adp, Some(2.8));
    }

    #[test]
    fn parses_bare_object_with_aliases() {
        let data = json!({
            "a": { "player_name": "Josh Allen", "pos": "QB", "team_abbr": "BUF", "avg_pick": 24.0 },
            "b": { "player_name": "No Pick", "pos": "TE", "avg_pick": 0 }
        });
        let players = parse_adp(&data, "standard");
        assert_eq!(players.len(), 2);
        let allen = players.iter().find(|p| p.name == "Josh Allen").unwrap();
        assert_eq!(allen.adp, Some(24.0));
        let none = players.iter().find(|p| p.name == "No Pick").unwrap();
        assert_eq!(none.adp, None);
        assert!(none.adp_data.is_empty());
    }

    #[test]
    fn cache_key_shape() {
        assert_eq!(cache_key("half-ppr", 12, 2025), "half-ppr_12_2025");
    }
}
