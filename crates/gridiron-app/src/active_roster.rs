// Builds the roster validator for a run: Sleeper catalog first, nflverse as
// backup, each through the roster cache. With neither available the
// validator fails closed.

use tracing::{info, warn};

use gridiron_core::cache::FileCache;
use gridiron_football::roster::{
    parse_nflverse_catalog, parse_sleeper_catalog, ActiveRosterSet, RosterValidator,
};

use crate::sources::nflverse::{self, NflverseClient};
use crate::sources::sleeper::{self, SleeperClient};
use crate::sources::cached_fetch;

/// Everything needed to produce an `ActiveRosterSet`.
pub struct RosterLoader<'a> {
    pub sleeper: &'a SleeperClient,
    pub nflverse: &'a NflverseClient,
    pub cache: &'a FileCache,
    pub ttl: chrono::Duration,
    pub season: i32,
}

impl RosterLoader<'_> {
    /// The active roster, or `None` when no catalog could be loaded from the
    /// network or the cache.
    pub async fn load(&self) -> Option<ActiveRosterSet> {
        match cached_fetch(self.cache, sleeper::CATALOG_CACHE_KEY, self.ttl, || {
            self.sleeper.players()
        })
        .await
        {
            Ok(catalog) => {
                let entries = parse_sleeper_catalog(&catalog);
                if !entries.is_empty() {
                    return Some(ActiveRosterSet::from_entries(entries));
                }
                warn!("Sleeper catalog had no active players; trying nflverse");
            }
            Err(e) => warn!("Sleeper roster unavailable ({e}); trying nflverse"),
        }

        match cached_fetch(self.cache, nflverse::CATALOG_CACHE_KEY, self.ttl, || {
            self.nflverse.players()
        })
        .await
        {
            Ok(catalog) => {
                let entries = parse_nflverse_catalog(&catalog, self.season);
                if !entries.is_empty() {
                    return Some(ActiveRosterSet::from_entries(entries));
                }
                warn!("nflverse catalog had no current players");
            }
            Err(e) => warn!("nflverse roster unavailable: {e}"),
        }
        None
    }

    /// Validator over the loaded roster; rejects everything when no roster
    /// is available.
    pub async fn validator(&self, threshold: f64) -> RosterValidator {
        match self.load().await {
            Some(roster) => {
                info!("Active roster loaded: {} players", roster.len());
                RosterValidator::new(roster, threshold)
            }
            None => {
                warn!("No roster data available; every record will be rejected");
                RosterValidator::without_roster()
            }
        }
    }
}
