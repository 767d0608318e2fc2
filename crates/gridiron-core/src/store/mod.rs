// Record store interface and backend selection.
//
// The pipeline and the web layer receive an `Arc<dyn PlayerStore>` chosen
// once at startup; neither knows which backend sits behind it.

pub mod json_file;
pub mod sqlite;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::model::{Position, PlayerRecord};

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

/// Equality filter over stored records. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerFilter {
    pub name: Option<String>,
    pub position: Option<Position>,
    pub team: Option<String>,
    pub drafted: Option<bool>,
}

impl PlayerFilter {
    pub fn by_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, player: &PlayerRecord) -> bool {
        self.name.as_deref().map_or(true, |n| player.name == n)
            && self.position.map_or(true, |p| player.position == p)
            && self.team.as_deref().map_or(true, |t| player.team == t)
            && self.drafted.map_or(true, |d| player.drafted == d)
    }
}

/// Persistence for reconciled player records, keyed by identity key.
///
/// Write failures are returned to the caller and abort the current operation.
pub trait PlayerStore: Send + Sync {
    /// Insert or update records by identity key. A stored `drafted = true` is
    /// never reset by an upsert; only `set_drafted` clears it.
    fn upsert_players(&self, players: &[PlayerRecord]) -> Result<usize>;

    /// Atomically replace the whole record set.
    fn replace_all(&self, players: &[PlayerRecord]) -> Result<()>;

    fn find(&self, filter: &PlayerFilter) -> Result<Vec<PlayerRecord>>;

    fn find_all(&self) -> Result<Vec<PlayerRecord>> {
        self.find(&PlayerFilter::default())
    }

    /// Mark every record with exactly this name. Returns whether any matched.
    fn set_drafted(&self, name: &str, drafted: bool) -> Result<bool>;

    fn clear(&self) -> Result<()>;

    fn count(&self) -> Result<usize> {
        Ok(self.find_all()?.len())
    }

    /// Short backend label for logs and reports.
    fn backend_name(&self) -> &'static str;
}

/// Open the configured backend.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn PlayerStore>> {
    let store: Arc<dyn PlayerStore> = match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.sqlite_path)?),
        StorageBackend::Json => Arc::new(JsonFileStore::open(&config.json_path)?),
    };
    info!("Record store opened: {}", store.backend_name());
    Ok(store)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn sample(name: &str, position: Position, team: &str) -> PlayerRecord {
        let mut p = PlayerRecord::new(name, position, team, "test");
        p.projected_points = Some(200.0);
        p
    }

    /// Behaviour every backend must share.
    pub fn exercise_store(store: &dyn PlayerStore) {
        store.clear().unwrap();
        let allen = sample("Josh Allen", Position::QB, "BUF");
        let diggs = sample("Stefon Diggs", Position::WR, "HOU");
        assert_eq!(store.upsert_players(&[allen.clone(), diggs.clone()]).unwrap(), 2);
        assert_eq!(store.count().unwrap(), 2);

        // Upsert by identity replaces fields.
        let mut updated = allen.clone();
        updated.adp = Some(3.5);
        store.upsert_players(&[updated]).unwrap();
        let found = store.find(&PlayerFilter::by_name("Josh Allen")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].adp, Some(3.5));

        // Draft flag survives a later upsert that carries drafted = false.
        assert!(store.set_drafted("Josh Allen", true).unwrap());
        assert!(!store.set_drafted("Nobody", true).unwrap());
        store.upsert_players(&[allen.clone()]).unwrap();
        let drafted = store
            .find(&PlayerFilter {
                drafted: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(drafted.len(), 1);
        assert_eq!(drafted[0].name, "Josh Allen");

        let wrs = store
            .find(&PlayerFilter {
                position: Some(Position::WR),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(wrs, vec![diggs.clone()]);

        // Undraft
        assert!(store.set_drafted("Josh Allen", false).unwrap());
        assert!(store.find_all().unwrap().iter().all(|p| !p.drafted));

        store.replace_all(&[diggs.clone()]).unwrap();
        assert_eq!(store.find_all().unwrap(), vec![diggs]);

        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
