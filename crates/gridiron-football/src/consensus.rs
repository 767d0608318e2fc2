// Consensus ADP: average each player's draft position across scoring formats.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use gridiron_core::model::{PlayerRecord, RawPlayer};

use crate::normalize::normalize_player;

/// One player's averaged ADP and the per-format values behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusEntry {
    pub identity_key: String,
    pub name: String,
    pub position: String,
    pub team: String,
    pub consensus_adp: f64,
    pub adp_data: BTreeMap<String, f64>,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Average ADP per player across formats.
///
/// Input maps a format name ("ppr", "standard", ...) to that format's raw
/// ADP rows. Rows that fail normalization or carry no ADP are skipped.
/// Output is sorted by consensus ADP ascending, then identity key.
pub fn calculate_consensus(by_format: &BTreeMap<String, Vec<RawPlayer>>) -> Vec<ConsensusEntry> {
    let mut entries: HashMap<String, ConsensusEntry> = HashMap::new();

    for (format, rows) in by_format {
        for raw in rows {
            let Some(adp) = raw.adp else { continue };
            let Ok(record) = normalize_player(raw) else { continue };
            let key = record.identity_key();
            let entry = entries.entry(key.clone()).or_insert_with(|| ConsensusEntry {
                identity_key: key,
                name: record.name.clone(),
                position: record.position.as_str().to_string(),
                team: record.team.clone(),
                consensus_adp: 0.0,
                adp_data: BTreeMap::new(),
            });
            entry.adp_data.insert(format.clone(), adp);
        }
    }

    let mut out: Vec<ConsensusEntry> = entries
        .into_values()
        .map(|mut e| {
            let sum: f64 = e.adp_data.values().sum();
            e.consensus_adp = round1(sum / e.adp_data.len() as f64);
            e
        })
        .collect();
    out.sort_by(|a, b| {
        a.consensus_adp
            .total_cmp(&b.consensus_adp)
            .then_with(|| a.identity_key.cmp(&b.identity_key))
    });
    out
}

/// Write consensus ADP onto records whose identity key matches exactly.
/// Returns the number of records annotated.
pub fn apply_consensus(records: &mut [PlayerRecord], consensus: &[ConsensusEntry]) -> usize {
    let by_key: HashMap<&str, &ConsensusEntry> = consensus
        .iter()
        .map(|e| (e.identity_key.as_str(), e))
        .collect();

    let mut applied = 0;
    for record in records.iter_mut() {
        if let Some(entry) = by_key.get(record.identity_key().as_str()) {
            record.adp = Some(entry.consensus_adp);
            record.adp_data = entry.adp_data.clone();
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridiron_core::model::Position;

    fn adp_row(name: &str, position: &str, team: &str, adp: f64) -> RawPlayer {
        let mut raw = RawPlayer::new(name, position, team, "ffc");
        raw.adp = Some(adp);
        raw
    }

    fn formats(rows: Vec<(&str, Vec<RawPlayer>)>) -> BTreeMap<String, Vec<RawPlayer>> {
        rows.into_iter().map(|(f, r)| (f.to_string(), r)).collect()
    }

    #[test]
    fn averages_across_formats() {
        let input = formats(vec![
            ("ppr", vec![adp_row("Josh Allen", "QB", "BUF", 5.0)]),
            ("standard", vec![adp_row("Josh Allen", "QB", "BUF", 7.0)]),
        ]);
        let out = calculate_consensus(&input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].identity_key, "josh allen_QB_BUF");
        assert_eq!(out[0].consensus_adp, 6.0);
        assert_eq!(out[0].adp_data.get("ppr"), Some(&5.0));
        assert_eq!(out[0].adp_data.get("standard"), Some(&7.0));
    }

    #[test]
    fn single_format_player_keeps_its_value() {
        let input = formats(vec![
            ("ppr", vec![adp_row("Josh Allen", "QB", "BUF", 5.0)]),
            ("half-ppr", vec![adp_row("Bijan Robinson", "RB", "ATL", 7.0)]),
        ]);
        let out = calculate_consensus(&input);
        let bijan = out.iter().find(|e| e.name == "Bijan Robinson").unwrap();
        assert_eq!(bijan.consensus_adp, 7.0);
        assert_eq!(bijan.adp_data.len(), 1);
    }

    #[test]
    fn rounds_to_one_decimal_and_sorts() {
        let input = formats(vec![
            (
                "ppr",
                vec![
                    adp_row("Late Guy", "WR", "DAL", 100.0),
                    adp_row("Early Guy", "RB", "SF", 1.0),
                ],
            ),
            ("standard", vec![adp_row("Early Guy", "RB", "SF", 2.33)]),
            ("half-ppr", vec![adp_row("Early Guy", "RB", "SF", 1.0)]),
        ]);
        let out = calculate_consensus(&input);
        assert_eq!(out[0].name, "Early Guy");
        assert_eq!(out[0].consensus_adp, 1.4);
        assert_eq!(out[1].name, "Late Guy");
    }

    #[test]
    fn ties_break_on_identity_key() {
        let input = formats(vec![(
            "ppr",
            vec![
                adp_row("Zed Player", "WR", "DAL", 10.0),
                adp_row("Abe Player", "WR", "DAL", 10.0),
            ],
        )]);
        let out = calculate_consensus(&input);
        assert_eq!(out[0].name, "Abe Player");
        assert_eq!(out[1].name, "Zed Player");
    }

    #[test]
    fn skips_rows_without_adp_or_that_fail_normalization() {
        let mut no_adp = RawPlayer::new("Josh Allen", "QB", "BUF", "ffc");
        no_adp.adp = None;
        let input = formats(vec![(
            "ppr",
            vec![no_adp, adp_row("X", "QB", "BUF", 1.0), adp_row("Flex Guy", "FLEX", "BUF", 2.0)],
        )]);
        assert!(calculate_consensus(&input).is_empty());
    }

    #[test]
    fn apply_matches_exact_identity_key_only() {
        let consensus = calculate_consensus(&formats(vec![
            ("ppr", vec![adp_row("Josh Allen", "QB", "BUF", 5.0)]),
            ("standard", vec![adp_row("Josh Allen", "QB", "BUF", 9.0)]),
        ]));
        let mut records = vec![
            PlayerRecord::new("Josh Allen", Position::QB, "BUF", "sleeper_api"),
            PlayerRecord::new("Josh Allen", Position::QB, "MIA", "sleeper_api"),
            PlayerRecord::new("Josh Alen", Position::QB, "BUF", "sleeper_api"),
        ];

        assert_eq!(apply_consensus(&mut records, &consensus), 1);
        assert_eq!(records[0].adp, Some(7.0));
        assert_eq!(records[0].adp_data.len(), 2);
        assert_eq!(records[1].adp, None);
        assert_eq!(records[2].adp, None);
    }
}
