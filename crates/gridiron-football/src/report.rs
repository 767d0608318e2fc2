// Final ordering, ranking and the before/after reports printed by the jobs.

use std::collections::BTreeMap;

use serde::Serialize;

use gridiron_core::model::{PlayerRecord, Position};

/// ADP used for ordering when a player has none.
const MISSING_ADP: f64 = 999.0;

// ---------------------------------------------------------------------------
// Ordering and ranks
// ---------------------------------------------------------------------------

/// Sort by position (QB, RB, WR, TE, K, DEF), then ADP ascending, then PPR
/// points descending, then name. Assigns `overall_rank` (1-based across the
/// list) and `position_rank` (1-based within each position).
pub fn rank_players(records: &mut [PlayerRecord]) {
    records.sort_by(|a, b| {
        a.position
            .sort_order()
            .cmp(&b.position.sort_order())
            .then_with(|| {
                a.adp
                    .unwrap_or(MISSING_ADP)
                    .total_cmp(&b.adp.unwrap_or(MISSING_ADP))
            })
            .then_with(|| ppr_points(b).total_cmp(&ppr_points(a)))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut per_position: BTreeMap<Position, u32> = BTreeMap::new();
    for (i, record) in records.iter_mut().enumerate() {
        let pos_rank = per_position.entry(record.position).or_insert(0);
        *pos_rank += 1;
        record.overall_rank = Some(i as u32 + 1);
        record.position_rank = Some(*pos_rank);
    }
}

fn ppr_points(record: &PlayerRecord) -> f64 {
    record.stats.get("fantasy_points_ppr").copied().unwrap_or(0.0)
}

/// Roster statuses that take a player out of the draft pool.
const INACTIVE_STATUSES: [&str; 2] = ["inactive", "retired"];

/// Whether a player belongs in the draft pool. Everyone is relevant unless a
/// source marked them inactive or retired; projections and stats are not
/// required.
pub fn is_fantasy_relevant(record: &PlayerRecord) -> bool {
    match record.status.as_deref() {
        Some(status) => !INACTIVE_STATUSES.contains(&status.trim().to_lowercase().as_str()),
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn counts_by_position(records: &[PlayerRecord]) -> BTreeMap<Position, usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry(r.position).or_insert(0) += 1;
    }
    counts
}

/// Before/after comparison for a cleaning run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanReport {
    pub original_count: usize,
    pub cleaned_count: usize,
    pub removed_count: usize,
    pub removal_percentage: f64,
    pub original_by_position: BTreeMap<Position, usize>,
    pub cleaned_by_position: BTreeMap<Position, usize>,
}

impl CleanReport {
    pub fn new(original: &[PlayerRecord], cleaned: &[PlayerRecord]) -> Self {
        let removed = original.len().saturating_sub(cleaned.len());
        let removal_percentage = if original.is_empty() {
            0.0
        } else {
            round2(removed as f64 / original.len() as f64 * 100.0)
        };
        Self {
            original_count: original.len(),
            cleaned_count: cleaned.len(),
            removed_count: removed,
            removal_percentage,
            original_by_position: counts_by_position(original),
            cleaned_by_position: counts_by_position(cleaned),
        }
    }

    /// Plain-text rendering for the CLI.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Players: {} -> {} ({} removed, {:.2}%)\n",
            self.original_count, self.cleaned_count, self.removed_count, self.removal_percentage
        ));
        for pos in Position::ALL {
            let before = self.original_by_position.get(&pos).copied().unwrap_or(0);
            let after = self.cleaned_by_position.get(&pos).copied().unwrap_or(0);
            out.push_str(&format!("  {:<3} {:>5} -> {:>5}\n", pos.as_str(), before, after));
        }
        out
    }
}

/// Summary of one load into the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub raw_count: usize,
    pub final_count: usize,
    pub quality_rate: f64,
    pub players_with_adp: usize,
    pub players_with_stats: usize,
    pub by_position: BTreeMap<Position, usize>,
    /// Teams ordered by player count descending, then code.
    pub by_team: Vec<(String, usize)>,
}

impl LoadReport {
    pub fn new(raw_count: usize, records: &[PlayerRecord]) -> Self {
        let quality_rate = if raw_count == 0 {
            0.0
        } else {
            round2(records.len() as f64 / raw_count as f64 * 100.0)
        };

        let mut teams: BTreeMap<&str, usize> = BTreeMap::new();
        for r in records {
            *teams.entry(r.team.as_str()).or_insert(0) += 1;
        }
        let mut by_team: Vec<(String, usize)> =
            teams.into_iter().map(|(t, n)| (t.to_string(), n)).collect();
        by_team.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            raw_count,
            final_count: records.len(),
            quality_rate,
            players_with_adp: records.iter().filter(|r| r.adp.is_some()).count(),
            players_with_stats: records.iter().filter(|r| !r.stats.is_empty()).count(),
            by_position: counts_by_position(records),
            by_team,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Loaded {} of {} raw players ({:.2}%)\n",
            self.final_count, self.raw_count, self.quality_rate
        ));
        out.push_str(&format!(
            "  with ADP: {}  with stats: {}\n",
            self.players_with_adp, self.players_with_stats
        ));
        for (pos, n) in &self.by_position {
            out.push_str(&format!("  {:<3} {:>5}\n", pos.as_str(), n));
        }
        for (team, n) in &self.by_team {
            out.push_str(&format!("  {:<3} {:>5}\n", team, n));
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

    fn rec(name: &str, position: Position, adp: Option<f64>) -> PlayerRecord {
        let mut r = PlayerRecord::new(name, position, "BUF", "test");
        r.adp = adp;
        r
    }

    #[test]
    fn ranks_follow_position_then_adp_then_name() {
        let mut records = vec![
            rec("Kicker", Position::K, Some(150.0)),
            rec("Zed Back", Position::RB, None),
            rec("Abe Back", Position::RB, None),
            rec("Top Back", Position::RB, Some(3.0)),
            rec("Quarterback", Position::QB, Some(40.0)),
        ];
        rank_players(&mut records);

        let order: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            order,
            vec!["Quarterback", "Top Back", "Abe Back", "Zed Back", "Kicker"]
        );
        assert_eq!(records[0].overall_rank, Some(1));
        assert_eq!(records[0].position_rank, Some(1));
        assert_eq!(records[3].overall_rank, Some(4));
        assert_eq!(records[3].position_rank, Some(3));
        assert_eq!(records[4].position_rank, Some(1));
    }

    #[test]
    fn relevance_rules() {
        assert!(is_fantasy_relevant(&rec("Kicker", Position::K, None)));
        assert!(is_fantasy_relevant(&rec("Ranked", Position::WR, Some(80.0))));

        // a bare record with no projections, stats or experience still counts
        let mut bare = rec("Bare Record", Position::QB, None);
        assert!(is_fantasy_relevant(&bare));

        bare.status = Some("Active".into());
        assert!(is_fantasy_relevant(&bare));
        bare.status = Some("Injured Reserve".into());
        assert!(is_fantasy_relevant(&bare));
        bare.status = Some("Retired".into());
        assert!(!is_fantasy_relevant(&bare));
        bare.status = Some(" INACTIVE ".into());
        assert!(!is_fantasy_relevant(&bare));
    }

    #[test]
    fn clean_report_percentages() {
        let original = vec![
            rec("A Guy", Position::QB, None),
            rec("B Guy", Position::QB, None),
            rec("C Guy", Position::WR, None),
        ];
        let cleaned = vec![original[0].clone()];
        let report = CleanReport::new(&original, &cleaned);
        assert_eq!(report.removed_count, 2);
        assert_eq!(report.removal_percentage, 66.67);
        assert_eq!(report.original_by_position[&Position::QB], 2);
        assert_eq!(report.cleaned_by_position.get(&Position::WR), None);
        assert!(report.render().contains("66.67%"));

        assert_eq!(CleanReport::new(&[], &[]).removal_percentage, 0.0);
    }

    #[test]
    fn load_report_breakdowns() {
        let mut a = rec("A Guy", Position::QB, Some(1.0));
        a.stats.insert("games_played".into(), 17.0);
        let mut b = rec("B Guy", Position::WR, None);
        b.team = "DAL".into();
        let c = rec("C Guy", Position::WR, None);

        let report = LoadReport::new(4, &[a, b, c]);
        assert_eq!(report.final_count, 3);
        assert_eq!(report.quality_rate, 75.0);
        assert_eq!(report.players_with_adp, 1);
        assert_eq!(report.players_with_stats, 1);
        assert_eq!(report.by_position[&Position::WR], 2);
        assert_eq!(
            report.by_team,
            vec![("BUF".to_string(), 2), ("DAL".to_string(), 1)]
        );
    }
}
