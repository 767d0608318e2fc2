// Batch jobs behind the CLI subcommands and the populate-espn endpoint.
//
// Each job runs sequentially: gather sources, reconcile, write the store.
// Source failures are logged and skipped; store failures abort the job.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use gridiron_core::model::{PlayerRecord, Position};
use gridiron_football::consensus::{calculate_consensus, ConsensusEntry};
use gridiron_football::normalize::clean_name;
use gridiron_football::report::{CleanReport, LoadReport};
use gridiron_football::roster::{validation_report, ValidationReport};

use crate::context::AppContext;
use crate::pipeline::{reconcile_with, records_as_batch, ReconcileCounts, SourceBatch};
use crate::sources::csv_rankings::CsvRankingsSource;
use crate::sources::pdf::PdfSource;
use crate::sources::{PlayerSource, SourceError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum JobError {
    #[error("no ESPN league id given and none configured")]
    MissingLeagueId,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("nothing survived reconciliation; store left unchanged")]
    EmptyResult,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Shared steps
// ---------------------------------------------------------------------------

async fn fetch_batch(source: &dyn PlayerSource) -> Option<SourceBatch> {
    match source.fetch().await {
        Ok(players) => Some(SourceBatch::new(source.name(), players)),
        Err(e) => {
            warn!("Skipping source {}: {e}", source.name());
            None
        }
    }
}

/// Consensus ADP over the configured formats. Empty when every format fails.
pub async fn load_consensus(ctx: &AppContext) -> Vec<ConsensusEntry> {
    let client = match ctx.adp_client() {
        Ok(client) => client,
        Err(e) => {
            warn!("ADP client unavailable: {e}");
            return Vec::new();
        }
    };
    let by_format = client.fetch_all(&ctx.config.adp.formats).await;
    let consensus = calculate_consensus(&by_format);
    info!("Generated consensus ADP for {} players", consensus.len());
    consensus
}

// ---------------------------------------------------------------------------
// populate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PopulateOptions {
    /// Start from an empty store instead of merging into existing records.
    pub fresh: bool,
    pub include_sleeper: bool,
    pub espn_league_id: Option<String>,
    pub pdf: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    /// Send PDF text to the model for extraction.
    pub use_llm: bool,
    pub with_adp: bool,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        Self {
            fresh: false,
            include_sleeper: true,
            espn_league_id: None,
            pdf: None,
            csv: None,
            use_llm: false,
            with_adp: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulateSummary {
    pub before: usize,
    pub counts: ReconcileCounts,
    pub report: LoadReport,
}

/// Rebuild the store from every configured source.
///
/// Batch order is the merge priority: existing store records, Sleeper,
/// ESPN, then the PDF and CSV rankings.
pub async fn populate(ctx: &AppContext, opts: &PopulateOptions) -> Result<PopulateSummary, JobError> {
    let existing = ctx.store.find_all().context("failed to read existing records")?;
    let before = existing.len();

    let validator = ctx.roster_validator().await?;
    let mut batches = Vec::new();
    if !opts.fresh && !existing.is_empty() {
        batches.push(records_as_batch("store", &existing));
    }
    if opts.include_sleeper {
        batches.extend(fetch_batch(&ctx.sleeper_source()?).await);
    }
    let league = opts
        .espn_league_id
        .clone()
        .or_else(|| ctx.config.espn.league_id.clone());
    if let Some(league) = league {
        batches.extend(fetch_batch(&ctx.espn_source(&league)?).await);
    }
    if let Some(path) = &opts.pdf {
        let mut source = PdfSource::new(path);
        if opts.use_llm {
            source = source.with_llm(ctx.llm.clone());
        }
        batches.extend(fetch_batch(&source).await);
    }
    if let Some(path) = &opts.csv {
        batches.extend(fetch_batch(&CsvRankingsSource::new(path)).await);
    }

    let consensus = if opts.with_adp { load_consensus(ctx).await } else { Vec::new() };
    let out = reconcile_with(&batches, &validator, &consensus, ctx.config.matching.merge_threshold);
    if out.players.is_empty() {
        return Err(JobError::EmptyResult);
    }

    ctx.store
        .replace_all(&out.players)
        .context("failed to write reconciled players")?;
    info!("Store now holds {} players (was {before})", out.players.len());

    Ok(PopulateSummary {
        before,
        report: LoadReport::new(out.counts.raw, &out.players),
        counts: out.counts,
    })
}

// ---------------------------------------------------------------------------
// populate-espn
// ---------------------------------------------------------------------------

/// Load one ESPN league and upsert its players. Drafted flags from the
/// league are added; existing drafted flags are never cleared.
pub async fn populate_espn(ctx: &AppContext, league_id: Option<&str>) -> Result<usize, JobError> {
    let league = league_id
        .map(str::to_string)
        .filter(|l| !l.trim().is_empty())
        .or_else(|| ctx.config.espn.league_id.clone())
        .ok_or(JobError::MissingLeagueId)?;

    let source = ctx.espn_source(&league)?;
    let players = source.fetch().await?;
    let validator = ctx.roster_validator().await?;
    let batches = [SourceBatch::new(source.name(), players)];
    let out = reconcile_with(&batches, &validator, &[], ctx.config.matching.merge_threshold);

    let written = ctx
        .store
        .upsert_players(&out.players)
        .context("failed to upsert ESPN players")?;
    info!("Upserted {written} players from ESPN league {league}");
    Ok(written)
}

// ---------------------------------------------------------------------------
// clean
// ---------------------------------------------------------------------------

/// Re-run reconciliation over the stored records. The store is replaced
/// only when something survives.
pub async fn clean(ctx: &AppContext, with_adp: bool) -> Result<CleanReport, JobError> {
    let original = ctx.store.find_all().context("failed to read records")?;
    let validator = ctx.roster_validator().await?;
    let consensus = if with_adp { load_consensus(ctx).await } else { Vec::new() };

    let out = reconcile_with(
        &[records_as_batch("store", &original)],
        &validator,
        &consensus,
        ctx.config.matching.merge_threshold,
    );
    let report = CleanReport::new(&original, &out.players);

    if out.players.is_empty() {
        warn!("Cleaning removed every player; store left unchanged");
    } else {
        ctx.store
            .replace_all(&out.players)
            .context("failed to write cleaned players")?;
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// sync-draft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub picks: usize,
    pub marked: usize,
    pub unmatched: Vec<String>,
}

/// Mark every player picked in a Sleeper draft as drafted.
pub async fn sync_draft(ctx: &AppContext, draft_id: &str) -> Result<SyncSummary, JobError> {
    let picks = ctx.sleeper_client()?.draft_picks(draft_id).await?;
    let mut summary = SyncSummary {
        picks: picks.len(),
        ..Default::default()
    };
    for pick in &picks {
        let name = clean_name(&pick.name);
        if ctx.store.set_drafted(&name, true).context("failed to mark pick")? {
            summary.marked += 1;
        } else {
            summary.unmatched.push(pick.name.clone());
        }
    }
    info!("Synced draft {draft_id}: {}/{} picks matched", summary.marked, summary.picks);
    Ok(summary)
}

/// Drafts a Sleeper user took part in this season, as `(draft_id, status)`.
pub async fn user_drafts(ctx: &AppContext, username: &str) -> Result<Vec<(String, String)>, JobError> {
    let drafts = ctx
        .sleeper_client()?
        .drafts_by_user(username, ctx.config.season())
        .await?;
    Ok(drafts
        .iter()
        .filter_map(|d| {
            let id = d.get("draft_id").and_then(Value::as_str)?;
            let status = d.get("status").and_then(Value::as_str).unwrap_or("unknown");
            Some((id.to_string(), status.to_string()))
        })
        .collect())
}

// ---------------------------------------------------------------------------
// stats / report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseStats {
    pub backend: String,
    pub total: usize,
    pub drafted: usize,
    pub available: usize,
    pub with_adp: usize,
    pub by_position: BTreeMap<Position, usize>,
}

impl DatabaseStats {
    pub fn from_records(backend: &str, records: &[PlayerRecord]) -> Self {
        let mut by_position = BTreeMap::new();
        for r in records {
            *by_position.entry(r.position).or_insert(0) += 1;
        }
        let drafted = records.iter().filter(|r| r.drafted).count();
        Self {
            backend: backend.to_string(),
            total: records.len(),
            drafted,
            available: records.len() - drafted,
            with_adp: records.iter().filter(|r| r.adp.is_some()).count(),
            by_position,
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Backend: {}\nPlayers: {} ({} drafted, {} available, {} with ADP)\n",
            self.backend, self.total, self.drafted, self.available, self.with_adp
        );
        for (pos, n) in &self.by_position {
            out.push_str(&format!("  {:<3} {:>5}\n", pos.as_str(), n));
        }
        out
    }
}

pub fn database_stats(ctx: &AppContext) -> Result<DatabaseStats, JobError> {
    let records = ctx.store.find_all().context("failed to read records")?;
    Ok(DatabaseStats::from_records(ctx.store.backend_name(), &records))
}

/// Load report for the current store plus a validation pass against the
/// active roster.
pub async fn report(ctx: &AppContext) -> Result<(LoadReport, ValidationReport), JobError> {
    let records = ctx.store.find_all().context("failed to read records")?;
    let validator = ctx.roster_validator().await?;
    Ok((
        LoadReport::new(records.len(), &records),
        validation_report(&validator, &records),
    ))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_stats_counts() {
        let mut a = PlayerRecord::new("Josh Allen", Position::QB, "BUF", "test");
        a.drafted = true;
        a.adp = Some(20.0);
        let b = PlayerRecord::new("James Cook", Position::RB, "BUF", "test");
        let stats = DatabaseStats::from_records("json", &[a, b]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.drafted, 1);
        assert_eq!(stats.available, 1);
        assert_eq!(stats.with_adp, 1);
        assert_eq!(stats.by_position.get(&Position::RB), Some(&1));
        assert!(stats.render().contains("1 drafted"));
    }

    #[test]
    fn populate_defaults() {
        let opts = PopulateOptions::default();
        assert!(opts.include_sleeper);
        assert!(opts.with_adp);
        assert!(!opts.fresh);
        assert!(!opts.use_llm);
    }
}
