// Rankings export in CSV form (Rank, Player/Name, Pos/Position, Team, ADP,
// Proj/FPTS). The common header spellings are accepted; malformed rows are
// skipped with a warning.

use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use gridiron_core::model::RawPlayer;

use super::{log_fetched, PlayerSource, SourceError};

pub const SOURCE: &str = "csv";

/// Accepts the common header spellings via aliases. Extra columns (Bye, Tier,
/// ...) are ignored.
#[derive(Debug, Deserialize)]
struct RawRankingRow {
    #[serde(alias = "Rank", alias = "RK", alias = "Rk", default)]
    rank: Option<String>,
    #[serde(alias = "Player", alias = "player", alias = "Name")]
    name: String,
    #[serde(alias = "Pos", alias = "pos", alias = "Position", default)]
    position: String,
    #[serde(alias = "Team", alias = "Tm", default)]
    team: String,
    #[serde(alias = "ADP", alias = "Adp", default)]
    adp: Option<String>,
    #[serde(alias = "Proj", alias = "proj", alias = "FPTS", alias = "fpts", default)]
    projected_points: Option<String>,
}

fn number(field: &Option<String>) -> Option<f64> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Some exports fuse position and positional rank ("RB1", "WR12").
fn strip_position_rank(pos: &str) -> String {
    pos.trim().trim_end_matches(|c: char| c.is_ascii_digit()).to_string()
}

fn load_rankings_from_reader<R: Read>(rdr: R) -> Result<Vec<RawPlayer>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawRankingRow>() {
        match result {
            Ok(row) => {
                if row.name.trim().is_empty() {
                    warn!("skipping ranking row with empty player name");
                    continue;
                }
                let mut raw = RawPlayer::new(
                    row.name.trim(),
                    &strip_position_rank(&row.position),
                    row.team.trim(),
                    SOURCE,
                );
                raw.rank = number(&row.rank).filter(|r| *r >= 1.0).map(|r| r as u32);
                raw.adp = number(&row.adp);
                raw.projected_points = number(&row.projected_points);
                players.push(raw);
            }
            Err(e) => {
                warn!("skipping malformed ranking row: {}", e);
            }
        }
    }
    Ok(players)
}

pub struct CsvRankingsSource {
    path: PathBuf,
}

impl CsvRankingsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Vec<RawPlayer>, SourceError> {
        let file = std::fs::File::open(&self.path).map_err(|e| SourceError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        load_rankings_from_reader(file).map_err(|e| SourceError::malformed(SOURCE, e))
    }
}

#[async_trait]
impl PlayerSource for CsvRankingsSource {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self) -> Result<Vec<RawPlayer>, SourceError> {
        let players = self.load()?;
        log_fetched(SOURCE, players.len());
        Ok(players)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_common_headers() {
        let csv = "\
Rank,Player,Pos,Team,ADP,Proj,Bye
1,Christian McCaffrey,RB1,SF,1.2,310.5,9
2,CeeDee Lamb,WR,DAL,,290,7
";
        let players = load_rankings_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Christian McCaffrey");
        assert_eq!(players[0].position, "RB");
        assert_eq!(players[0].rank, Some(1));
        assert_eq!(players[0].adp, Some(1.2));
        assert_eq!(players[0].projected_points, Some(310.5));
        assert_eq!(players[1].adp, None);
        assert_eq!(players[1].projected_points, Some(290.0));
    }

    #[test]
    fn alternate_header_names() {
        let csv = "name,position,team,FPTS\nJosh Allen,QB,BUF,380.1\n";
        let players = load_rankings_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].rank, None);
        assert_eq!(players[0].projected_points, Some(380.1));
    }

    #[test]
    fn skips_rows_without_a_name() {
        let csv = "Rank,Player,Pos,Team\n1,,QB,BUF\n2,Josh Allen,QB,BUF\n";
        let players = load_rankings_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].rank, Some(2));
    }

    #[test]
    fn missing_file_is_io_error() {
        let src = CsvRankingsSource::new(std::env::temp_dir().join("gridiron_csv_missing/none.csv"));
        match src.load() {
            Err(SourceError::Io { .. }) => {}
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
