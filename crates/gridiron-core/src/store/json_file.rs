// Local JSON file record store, for running without a database file.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing::debug;

use super::{PlayerFilter, PlayerStore};
use crate::model::PlayerRecord;

/// Keeps the record list in memory and rewrites the whole file after every
/// mutation.
pub struct JsonFileStore {
    path: PathBuf,
    players: Mutex<Vec<PlayerRecord>>,
}

impl JsonFileStore {
    /// Load `path` if it exists, otherwise start empty. The file is created on
    /// the first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let players = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if text.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), count = players.len(), "json store loaded");

        Ok(Self {
            path,
            players: Mutex::new(players),
        })
    }

    fn players(&self) -> MutexGuard<'_, Vec<PlayerRecord>> {
        self.players.lock().expect("json store mutex poisoned")
    }

    fn flush(&self, players: &[PlayerRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let text = serde_json::to_string_pretty(players).context("failed to serialize players")?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn upsert_into(players: &mut Vec<PlayerRecord>, incoming: &PlayerRecord) {
        let key = incoming.identity_key();
        match players.iter_mut().find(|p| p.identity_key() == key) {
            Some(existing) => {
                let drafted = existing.drafted || incoming.drafted;
                *existing = incoming.clone();
                existing.drafted = drafted;
            }
            None => players.push(incoming.clone()),
        }
    }
}

impl PlayerStore for JsonFileStore {
    fn upsert_players(&self, incoming: &[PlayerRecord]) -> Result<usize> {
        let mut players = self.players();
        let mut next = players.clone();
        for p in incoming {
            Self::upsert_into(&mut next, p);
        }
        self.flush(&next)?;
        *players = next;
        Ok(incoming.len())
    }

    fn replace_all(&self, incoming: &[PlayerRecord]) -> Result<()> {
        let mut players = self.players();
        let mut next = Vec::with_capacity(incoming.len());
        for p in incoming {
            Self::upsert_into(&mut next, p);
        }
        self.flush(&next)?;
        *players = next;
        Ok(())
    }

    fn find(&self, filter: &PlayerFilter) -> Result<Vec<PlayerRecord>> {
        Ok(self
            .players()
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    fn set_drafted(&self, name: &str, drafted: bool) -> Result<bool> {
        let mut players = self.players();
        let mut next = players.clone();
        let mut matched = false;
        for p in next.iter_mut().filter(|p| p.name == name) {
            p.drafted = drafted;
            matched = true;
        }
        if matched {
            self.flush(&next)?;
            *players = next;
        }
        Ok(matched)
    }

    fn clear(&self) -> Result<()> {
        let mut players = self.players();
        self.flush(&[])?;
        players.clear();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "json"
    }
}
