// Intra-batch deduplication and the field-by-field merge policy.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use gridiron_core::model::{key_name, PlayerRecord, Position};

use crate::similarity;

/// Default minimum similarity for collapsing two records in one batch.
pub const MERGE_MATCH_THRESHOLD: f64 = 0.90;

// ---------------------------------------------------------------------------
// Merge policy
// ---------------------------------------------------------------------------

// An incoming value overwrites the existing one when the existing value is
// absent or empty, when both are strings and the incoming one is strictly
// longer, or when both are numbers and the incoming one is strictly greater.
// Empty incoming values never overwrite. Zero counts as empty.

fn merge_string(existing: &mut String, incoming: &str) {
    if incoming.is_empty() {
        return;
    }
    if existing.is_empty() || incoming.chars().count() > existing.chars().count() {
        *existing = incoming.to_string();
    }
}

fn merge_opt_string(existing: &mut Option<String>, incoming: &Option<String>) {
    let Some(new) = incoming.as_deref().filter(|s| !s.is_empty()) else {
        return;
    };
    match existing {
        Some(old) if !old.is_empty() => merge_string(old, new),
        _ => *existing = Some(new.to_string()),
    }
}

fn merge_f64(existing: &mut Option<f64>, incoming: Option<f64>) {
    let Some(new) = incoming else {
        return;
    };
    match *existing {
        Some(old) if old != 0.0 && new <= old => {}
        _ => *existing = Some(new),
    }
}

fn merge_u32(existing: &mut Option<u32>, incoming: Option<u32>) {
    let Some(new) = incoming else {
        return;
    };
    match *existing {
        Some(old) if old != 0 && new <= old => {}
        _ => *existing = Some(new),
    }
}

fn merge_map(existing: &mut BTreeMap<String, f64>, incoming: &BTreeMap<String, f64>) {
    for (k, v) in incoming {
        let mut slot = existing.get(k).copied();
        merge_f64(&mut slot, Some(*v));
        if let Some(v) = slot {
            existing.insert(k.clone(), v);
        }
    }
}

/// Fold `incoming` into `existing` field by field.
///
/// Position and team are not touched; callers only merge records from the
/// same `(position, team)` bucket. `drafted` merges as logical OR.
pub fn merge_into(existing: &mut PlayerRecord, incoming: &PlayerRecord) {
    merge_string(&mut existing.name, &incoming.name);
    merge_string(&mut existing.source, &incoming.source);
    merge_f64(&mut existing.adp, incoming.adp);
    merge_f64(&mut existing.projected_points, incoming.projected_points);
    merge_f64(&mut existing.avg_points, incoming.avg_points);
    merge_u32(&mut existing.rank, incoming.rank);
    existing.drafted |= incoming.drafted;
    merge_map(&mut existing.adp_data, &incoming.adp_data);
    merge_opt_string(&mut existing.sleeper_id, &incoming.sleeper_id);
    merge_opt_string(&mut existing.espn_id, &incoming.espn_id);
    merge_opt_string(&mut existing.status, &incoming.status);
    merge_opt_string(&mut existing.injury_status, &incoming.injury_status);
    merge_u32(&mut existing.years_exp, incoming.years_exp);
    merge_u32(&mut existing.age, incoming.age);
    merge_opt_string(&mut existing.college, &incoming.college);
    merge_u32(&mut existing.overall_rank, incoming.overall_rank);
    merge_u32(&mut existing.position_rank, incoming.position_rank);
    merge_map(&mut existing.stats, &incoming.stats);
}

// ---------------------------------------------------------------------------
// Deduplicator
// ---------------------------------------------------------------------------

/// What happened to one pushed record.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Inserted,
    MergedExact,
    MergedFuzzy { into: String, score: f64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub inserted: usize,
    pub merged_exact: usize,
    pub merged_fuzzy: usize,
}

/// Single-pass, insertion-ordered collapse of a batch to one record per
/// identity key.
///
/// A record merges into an exact key match if there is one, otherwise into
/// the first earlier record in the same `(position, team)` bucket whose name
/// similarity reaches the threshold. Input order therefore matters: the
/// first-seen record absorbs later near-duplicates.
#[derive(Debug)]
pub struct Deduplicator {
    threshold: f64,
    entries: Vec<PlayerRecord>,
    index: HashMap<String, usize>,
    buckets: HashMap<(Position, String), Vec<usize>>,
    stats: DedupStats,
}

impl Deduplicator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            entries: Vec::new(),
            index: HashMap::new(),
            buckets: HashMap::new(),
            stats: DedupStats::default(),
        }
    }

    pub fn push(&mut self, record: PlayerRecord) -> MergeOutcome {
        let key = record.identity_key();

        if let Some(&idx) = self.index.get(&key) {
            self.merge_at(idx, &record);
            self.stats.merged_exact += 1;
            return MergeOutcome::MergedExact;
        }

        let name = key_name(&record.name);
        let candidates = self
            .buckets
            .get(&record.bucket())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let fuzzy = candidates.iter().find_map(|&idx| {
            let score = similarity::ratio(&name, &key_name(&self.entries[idx].name));
            (score >= self.threshold).then_some((idx, score))
        });

        if let Some((idx, score)) = fuzzy {
            let into = self.entries[idx].name.clone();
            debug!("Merging {} into {} ({:.3})", record.name, into, score);
            self.merge_at(idx, &record);
            self.stats.merged_fuzzy += 1;
            return MergeOutcome::MergedFuzzy { into, score };
        }

        let idx = self.entries.len();
        self.index.insert(key, idx);
        self.buckets.entry(record.bucket()).or_default().push(idx);
        self.entries.push(record);
        self.stats.inserted += 1;
        MergeOutcome::Inserted
    }

    /// Merge and, if the surviving name changed, make the new key resolve to
    /// the same entry.
    fn merge_at(&mut self, idx: usize, record: &PlayerRecord) {
        merge_into(&mut self.entries[idx], record);
        let new_key = self.entries[idx].identity_key();
        self.index.entry(new_key).or_insert(idx);
    }

    pub fn stats(&self) -> DedupStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The collapsed batch in first-seen order.
    ///
    /// A merge can lengthen a name so that two entries end up with the same
    /// identity key; a final pass folds any such pair together.
    pub fn finish(self) -> Vec<PlayerRecord> {
        let mut out: Vec<PlayerRecord> = Vec::with_capacity(self.entries.len());
        let mut seen: HashMap<String, usize> = HashMap::new();
        for record in self.entries {
            let key = record.identity_key();
            match seen.get(&key) {
                Some(&idx) => merge_into(&mut out[idx], &record),
                None => {
                    seen.insert(key, out.len());
                    out.push(record);
                }
            }
        }
        out
    }
}

/// Collapse `records` in order with the given threshold.
pub fn dedupe(records: Vec<PlayerRecord>, threshold: f64) -> (Vec<PlayerRecord>, DedupStats) {
    let mut dedup = Deduplicator::new(threshold);
    for r in records {
        dedup.push(r);
    }
    let stats = dedup.stats();
    (dedup.finish(), stats)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
