// Career stats from Sleeper's regular-season stat dumps. The catalog maps a
// name to a Sleeper id; each requested season contributes one stat line.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde_json::Value;
use tracing::{debug, info, warn};

use gridiron_core::cache::FileCache;
use gridiron_core::model::Position;
use gridiron_football::stats::{find_player_id, season_line, CareerStats};

use super::sleeper::{SleeperClient, CATALOG_CACHE_KEY};
use super::{cached_fetch, SourceError};

/// First season included when no explicit range is requested.
pub const FIRST_STATS_SEASON: i32 = 2020;

/// `FIRST_STATS_SEASON` through the current calendar year.
pub fn default_seasons() -> Vec<i32> {
    (FIRST_STATS_SEASON..=chrono::Local::now().year()).collect()
}

fn career_cache_key(name: &str, position: Position) -> String {
    format!("{name}_{position}_career")
}

pub struct StatsService {
    sleeper: SleeperClient,
    catalog_cache: FileCache,
    catalog_ttl: chrono::Duration,
    stats_cache: FileCache,
    stats_ttl: chrono::Duration,
}

impl StatsService {
    pub fn new(
        sleeper: SleeperClient,
        catalog_cache: FileCache,
        catalog_ttl: chrono::Duration,
        stats_cache: FileCache,
        stats_ttl: chrono::Duration,
    ) -> Self {
        Self {
            sleeper,
            catalog_cache,
            catalog_ttl,
            stats_cache,
            stats_ttl,
        }
    }

    /// Career view of one player over `years`.
    ///
    /// Never fails: an unknown player or an unreachable catalog yields an
    /// empty `CareerStats`, and seasons that cannot be fetched are left out.
    pub async fn career_stats(&self, name: &str, position: Position, years: &[i32]) -> CareerStats {
        let key = career_cache_key(name, position);
        if let Some(cached) = self.stats_cache.get_fresh_as::<CareerStats>(&key, self.stats_ttl) {
            debug!("Using cached stats for {name}");
            return cached;
        }

        let catalog = match cached_fetch(&self.catalog_cache, CATALOG_CACHE_KEY, self.catalog_ttl, || {
            self.sleeper.players()
        })
        .await
        {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Player catalog unavailable for stats lookup: {e}");
                return CareerStats::empty(name, position);
            }
        };

        let Some(player_id) = find_player_id(&catalog, name, position) else {
            warn!("Could not find player id for {name}");
            return CareerStats::empty(name, position);
        };

        let mut seasons = BTreeMap::new();
        for &year in years {
            match self.season_stats_for(&player_id, year).await {
                Ok(Some(raw)) => {
                    seasons.insert(year, season_line(position, &raw));
                }
                Ok(None) => {}
                Err(e) => debug!("No {year} stats for {name}: {e}"),
            }
        }

        let career = CareerStats::from_seasons(name, position, seasons);
        match serde_json::to_value(&career) {
            Ok(value) => {
                if let Err(e) = self.stats_cache.put(&key, &value) {
                    warn!("Could not cache stats for {name}: {e}");
                }
            }
            Err(e) => warn!("Could not serialize stats for {name}: {e}"),
        }
        info!("Retrieved career stats for {name} ({} seasons)", career.seasons.len());
        career
    }

    async fn season_stats_for(&self, player_id: &str, year: i32) -> Result<Option<Value>, SourceError> {
        let all = self.sleeper.season_stats(year).await?;
        Ok(all
            .get(player_id)
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seasons_start_in_2020() {
        let seasons = default_seasons();
        assert_eq!(seasons.first(), Some(&FIRST_STATS_SEASON));
        assert_eq!(seasons.last(), Some(&chrono::Local::now().year()));
    }

    #[test]
    fn cache_key_names_player_and_position() {
        assert_eq!(career_cache_key("Josh Allen", Position::QB), "Josh Allen_QB_career");
    }
}
