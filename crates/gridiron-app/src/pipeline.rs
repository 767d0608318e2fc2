// Reconciliation: raw adapter batches in priority order -> normalized,
// roster-validated, deduplicated, ADP-annotated and ranked records.
//
// Pure over its inputs. Given the same batches, roster and consensus the
// output is identical, and feeding the output back in reproduces it.

use serde::Serialize;
use tracing::{debug, info};

use gridiron_core::model::{PlayerRecord, RawPlayer};
use gridiron_football::consensus::{apply_consensus, ConsensusEntry};
use gridiron_football::merge::{Deduplicator, MERGE_MATCH_THRESHOLD};
use gridiron_football::normalize::normalize_player;
use gridiron_football::report::{is_fantasy_relevant, rank_players};
use gridiron_football::roster::RosterValidator;

/// Raw rows from one source. Batches earlier in the list take precedence
/// when records collide during merging.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: String,
    pub players: Vec<RawPlayer>,
}

impl SourceBatch {
    pub fn new(source: &str, players: Vec<RawPlayer>) -> Self {
        Self {
            source: source.to_string(),
            players,
        }
    }
}

/// What happened to the input rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounts {
    pub raw: usize,
    /// Failed normalization (bad name or position).
    pub malformed: usize,
    /// Not on an active roster, or no valid team.
    pub rejected: usize,
    /// Dropped as carrying no fantasy signal.
    pub irrelevant: usize,
    pub merged_exact: usize,
    pub merged_fuzzy: usize,
    pub consensus_applied: usize,
    pub output: usize,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutput {
    pub players: Vec<PlayerRecord>,
    pub counts: ReconcileCounts,
}

/// `reconcile_with` at the default merge threshold.
pub fn reconcile(
    batches: &[SourceBatch],
    validator: &RosterValidator,
    consensus: &[ConsensusEntry],
) -> ReconcileOutput {
    reconcile_with(batches, validator, consensus, MERGE_MATCH_THRESHOLD)
}

pub fn reconcile_with(
    batches: &[SourceBatch],
    validator: &RosterValidator,
    consensus: &[ConsensusEntry],
    merge_threshold: f64,
) -> ReconcileOutput {
    let mut counts = ReconcileCounts::default();
    let mut dedup = Deduplicator::new(merge_threshold);

    for batch in batches {
        let mut accepted = 0;
        for raw in &batch.players {
            counts.raw += 1;
            let record = match normalize_player(raw) {
                Ok(record) => record,
                Err(reason) => {
                    debug!("Dropping {} row: {reason}", batch.source);
                    counts.malformed += 1;
                    continue;
                }
            };
            let verdict = validator.check(&record);
            if !verdict.is_accepted() {
                debug!(
                    "Rejected {} ({} - {}): {:?}",
                    record.name, record.position, record.team, verdict
                );
                counts.rejected += 1;
                continue;
            }
            if !is_fantasy_relevant(&record) {
                debug!("Not fantasy relevant: {}", record.name);
                counts.irrelevant += 1;
                continue;
            }
            dedup.push(record);
            accepted += 1;
        }
        debug!(source = %batch.source, accepted, "batch reconciled");
    }

    let stats = dedup.stats();
    counts.merged_exact = stats.merged_exact;
    counts.merged_fuzzy = stats.merged_fuzzy;

    let mut players = dedup.finish();
    counts.consensus_applied = apply_consensus(&mut players, consensus);
    rank_players(&mut players);
    counts.output = players.len();

    info!(
        "Reconciled {} raw rows into {} players ({} malformed, {} rejected, {} merged)",
        counts.raw,
        counts.output,
        counts.malformed,
        counts.rejected,
        counts.merged_exact + counts.merged_fuzzy
    );
    ReconcileOutput { players, counts }
}

/// Stored records as a single batch, for re-running reconciliation.
pub fn records_as_batch(source: &str, records: &[PlayerRecord]) -> SourceBatch {
    SourceBatch::new(source, records.iter().map(RawPlayer::from).collect())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use gridiron_core::model::Position;
    use gridiron_football::consensus::calculate_consensus;
    use gridiron_football::roster::{ActiveRosterSet, RosterEntry, ROSTER_MATCH_THRESHOLD};

    fn entry(name: &str, position: Position, team: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            position,
            team: team.to_string(),
        }
    }

    fn validator() -> RosterValidator {
        let roster = ActiveRosterSet::from_entries([
            entry("Josh Allen", Position::QB, "BUF"),
            entry("James Cook", Position::RB, "BUF"),
            entry("Bijan Robinson", Position::RB, "ATL"),
            entry("A.J. Brown", Position::WR, "PHI"),
            entry("Marquise Brown", Position::WR, "KC"),
        ]);
        RosterValidator::new(roster, ROSTER_MATCH_THRESHOLD)
    }

    fn raw(name: &str, position: &str, team: &str, source: &str) -> RawPlayer {
        RawPlayer::new(name, position, team, source)
    }

    fn adp_row(name: &str, position: &str, team: &str, adp: f64) -> RawPlayer {
        let mut r = RawPlayer::new(name, position, team, "fantasyfootballcalculator");
        r.adp = Some(adp);
        r
    }

    #[test]
    fn josh_allen_end_to_end() {
        let batches = vec![SourceBatch::new("pdf", vec![raw("josh allen", "qb", "buf", "pdf")])];

        let mut formats = BTreeMap::new();
        formats.insert("standard".to_string(), vec![adp_row("Josh Allen", "QB", "BUF", 20.0)]);
        formats.insert("ppr".to_string(), vec![adp_row("Josh Allen", "QB", "BUF", 22.0)]);
        let consensus = calculate_consensus(&formats);

        let out = reconcile(&batches, &validator(), &consensus);
        assert_eq!(out.players.len(), 1);
        let allen = &out.players[0];
        assert_eq!(allen.name, "Josh Allen");
        assert_eq!(allen.position, Position::QB);
        assert_eq!(allen.team, "BUF");
        assert_eq!(allen.adp, Some(21.0));
        assert_eq!(allen.adp_data.len(), 2);
        assert_eq!(allen.overall_rank, Some(1));
        assert_eq!(allen.position_rank, Some(1));
        assert_eq!(out.counts.consensus_applied, 1);
    }

    #[test]
    fn bare_single_source_record_survives() {
        let batches = vec![SourceBatch::new(
            "pdf",
            vec![RawPlayer::new("josh allen", "qb", "buf", "pdf")],
        )];
        let out = reconcile(&batches, &validator(), &[]);
        assert_eq!(out.players.len(), 1);
        assert_eq!(out.counts.irrelevant, 0);
        assert_eq!(out.counts.output, 1);
        let allen = &out.players[0];
        assert_eq!(allen.identity_key(), "josh allen_QB_BUF");
        assert_eq!(allen.adp, None);
        assert!(!allen.drafted);
    }

    #[test]
    fn counts_every_kind_of_drop() {
        let batches = vec![
            SourceBatch::new(
                "sleeper",
                vec![
                    raw("Josh Allen", "QB", "BUF", "sleeper"),
                    raw("X", "QB", "BUF", "sleeper"),
                    raw("Some Tackle", "OT", "BUF", "sleeper"),
                    raw("Nobody Real", "WR", "XX", "sleeper"),
                    raw("Practice Squad", "RB", "BUF", "sleeper"),
                ],
            ),
            SourceBatch::new("espn", vec![raw("Josh Allen", "QB", "BUF", "espn")]),
        ];
        let out = reconcile(&batches, &validator(), &[]);
        assert_eq!(out.counts.raw, 6);
        assert_eq!(out.counts.malformed, 2);
        assert_eq!(out.counts.rejected, 2);
        assert_eq!(out.counts.merged_exact, 1);
        assert_eq!(out.counts.output, 1);
        // First source wins the source label.
        assert_eq!(out.players[0].source, "sleeper");
    }

    #[test]
    fn irrelevant_players_are_dropped() {
        let mut retired = RawPlayer::new("James Cook", "RB", "BUF", "sleeper");
        retired.status = Some("Retired".into());
        let out = reconcile(&[SourceBatch::new("sleeper", vec![retired])], &validator(), &[]);
        assert!(out.players.is_empty());
        assert_eq!(out.counts.irrelevant, 1);
    }

    #[test]
    fn no_roster_rejects_everything() {
        let batches = vec![SourceBatch::new("pdf", vec![raw("Josh Allen", "QB", "BUF", "pdf")])];
        let out = reconcile(&batches, &RosterValidator::without_roster(), &[]);
        assert!(out.players.is_empty());
        assert_eq!(out.counts.rejected, 1);
    }

    #[test]
    fn drafted_survives_merging() {
        let mut taken = raw("Bijan Robinson", "RB", "ATL", "espn");
        taken.drafted = true;
        let batches = vec![
            SourceBatch::new("sleeper", vec![raw("Bijan Robinson", "RB", "ATL", "sleeper")]),
            SourceBatch::new("espn", vec![taken]),
        ];
        let out = reconcile(&batches, &validator(), &[]);
        assert_eq!(out.players.len(), 1);
        assert!(out.players[0].drafted);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut formats = BTreeMap::new();
        formats.insert("ppr".to_string(), vec![adp_row("AJ Brown", "WR", "PHI", 14.0)]);
        let consensus = calculate_consensus(&formats);
        let batches = vec![
            SourceBatch::new(
                "pdf",
                vec![
                    raw("AJ Brown", "WR", "PHI", "pdf"),
                    raw("Bijan Robinson", "RB", "ATL", "pdf"),
                    raw("Josh Allen", "QB", "BUF", "pdf"),
                    raw("Marquise Brown", "WR", "KC", "pdf"),
                ],
            ),
            SourceBatch::new("csv", vec![raw("Josh  Allen Jr.", "QB", "BUF", "csv")]),
        ];
        let v = validator();
        let first = reconcile(&batches, &v, &consensus);
        let second = reconcile(&[records_as_batch("store", &first.players)], &v, &consensus);

        assert_eq!(first.players.len(), 4);
        assert_eq!(first.players, second.players);
    }

    #[test]
    fn output_keys_are_unique() {
        let batches = vec![SourceBatch::new(
            "pdf",
            vec![
                raw("Josh Allen", "QB", "BUF", "pdf"),
                raw("josh allen", "QB", "BUF", "pdf"),
                raw("JOSH ALLEN", "qb", "buf", "pdf"),
            ],
        )];
        let out = reconcile(&batches, &validator(), &[]);
        let mut keys: Vec<String> = out.players.iter().map(PlayerRecord::identity_key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), out.players.len());
        assert_eq!(out.players.len(), 1);
    }
}
