// SQLite-backed record store.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};

use super::{PlayerFilter, PlayerStore};
use crate::model::PlayerRecord;

/// One row per identity key. Indexed columns hold what `find` filters on;
/// the full record rides along as a JSON payload so new optional attributes
/// need no migration.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                identity_key TEXT PRIMARY KEY,
                name         TEXT NOT NULL,
                position     TEXT NOT NULL,
                team         TEXT NOT NULL,
                drafted      INTEGER NOT NULL DEFAULT 0,
                payload      TEXT NOT NULL,
                updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_players_name ON players(name);
            CREATE INDEX IF NOT EXISTS idx_players_position ON players(position);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    fn upsert_with(conn: &Connection, player: &PlayerRecord) -> Result<()> {
        let payload =
            serde_json::to_string(player).context("failed to serialize player record")?;
        conn.execute(
            "INSERT INTO players (identity_key, name, position, team, drafted, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(identity_key) DO UPDATE SET
                name       = excluded.name,
                position   = excluded.position,
                team       = excluded.team,
                drafted    = MAX(players.drafted, excluded.drafted),
                payload    = excluded.payload,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            params![
                player.identity_key(),
                player.name,
                player.position.as_str(),
                player.team,
                player.drafted as i64,
                payload,
            ],
        )
        .with_context(|| format!("failed to upsert player {}", player.name))?;
        Ok(())
    }
}

impl PlayerStore for SqliteStore {
    fn upsert_players(&self, players: &[PlayerRecord]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        for player in players {
            Self::upsert_with(&tx, player)?;
        }
        tx.commit().context("failed to commit upsert")?;
        Ok(players.len())
    }

    fn replace_all(&self, players: &[PlayerRecord]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM players", [])
            .context("failed to clear players")?;
        for player in players {
            Self::upsert_with(&tx, player)?;
        }
        tx.commit().context("failed to commit replace")?;
        Ok(())
    }

    fn find(&self, filter: &PlayerFilter) -> Result<Vec<PlayerRecord>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(name) = &filter.name {
            clauses.push("name = ?");
            args.push(SqlValue::Text(name.clone()));
        }
        if let Some(pos) = filter.position {
            clauses.push("position = ?");
            args.push(SqlValue::Text(pos.as_str().to_string()));
        }
        if let Some(team) = &filter.team {
            clauses.push("team = ?");
            args.push(SqlValue::Text(team.clone()));
        }
        if let Some(drafted) = filter.drafted {
            clauses.push("drafted = ?");
            args.push(SqlValue::Integer(drafted as i64));
        }

        let mut sql = String::from("SELECT payload, drafted FROM players");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY rowid");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).context("failed to prepare player query")?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .context("failed to query players")?;

        let mut out = Vec::new();
        for row in rows {
            let (payload, drafted) = row.context("failed to read player row")?;
            let mut player: PlayerRecord = serde_json::from_str(&payload)
                .context("stored player payload is not a valid record")?;
            player.drafted = drafted != 0;
            out.push(player);
        }
        Ok(out)
    }

    fn set_drafted(&self, name: &str, drafted: bool) -> Result<bool> {
        let conn = self.conn();
        let changed = conn
            .execute(
                "UPDATE players SET drafted = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE name = ?2",
                params![drafted as i64, name],
            )
            .with_context(|| format!("failed to update drafted flag for {name}"))?;
        Ok(changed > 0)
    }

    fn clear(&self) -> Result<()> {
        self.conn()
            .execute("DELETE FROM players", [])
            .context("failed to clear players")?;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("failed to count players")?;
        Ok(n as usize)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
