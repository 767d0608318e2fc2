// Rankings-table extraction: prompt construction and parsing of the model's
// JSON reply into raw player rows.

use serde_json::{Map, Value};
use tracing::{debug, info};

use gridiron_core::model::RawPlayer;

use crate::client::{LlmClient, LlmError};

/// Columns requested from the model for a rankings sheet.
pub const RANKING_COLUMNS: [&str; 6] = ["rank", "name", "position", "team", "adp", "projected_points"];

/// Source tag for rows produced by model extraction.
pub const SOURCE: &str = "pdf_openai";

pub fn build_prompt(text: &str, columns: &[&str]) -> String {
    format!(
        "Extract the following fantasy football rankings into a JSON array of objects with columns: {}. \
         If a value is missing, use an empty string. Data:\n{}",
        columns.join(", "),
        text
    )
}

/// Drop a leading ```` ```json ```` / ```` ``` ```` fence and a trailing fence.
pub fn strip_code_fences(content: &str) -> &str {
    let mut s = content.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest.trim();
    }
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim();
    }
    s
}

/// Parse the span from the first `[` to the last `]` as an array of objects.
/// Non-object elements are skipped.
pub fn parse_json_array(content: &str) -> Result<Vec<Map<String, Value>>, LlmError> {
    let body = strip_code_fences(content);
    let parse_err = |message: String| LlmError::Parse {
        message,
        response: content.to_string(),
    };

    let (Some(start), Some(end)) = (body.find('['), body.rfind(']')) else {
        return Err(parse_err("no JSON array in response".into()));
    };
    if end < start {
        return Err(parse_err("no JSON array in response".into()));
    }

    let value: Value = serde_json::from_str(&body[start..=end]).map_err(|e| parse_err(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        _ => Err(parse_err("top-level value is not an array".into())),
    }
}

/// First present field among `keys`, compared case-insensitively.
fn field<'a>(row: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    row.iter()
        .find(|(k, _)| keys.iter().any(|want| k.eq_ignore_ascii_case(want)))
        .map(|(_, v)| v)
}

fn text_field(row: &Map<String, Value>, keys: &[&str]) -> String {
    match field(row, keys) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numbers may arrive as JSON numbers or as strings ("12", "12.5", "").
fn number_field(row: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    match field(row, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('.').parse().ok(),
        _ => None,
    }
}

/// Map model rows onto raw players. Rows without a name are dropped.
pub fn rows_to_players(rows: &[Map<String, Value>]) -> Vec<RawPlayer> {
    rows.iter()
        .filter_map(|row| {
            let name = text_field(row, &["name", "player", "player_name"]);
            if name.is_empty() {
                return None;
            }
            let position = text_field(row, &["position", "pos"]);
            let team = text_field(row, &["team", "team_abbr"]);
            let mut raw = RawPlayer::new(&name, &position, &team, SOURCE);
            raw.rank = number_field(row, &["rank"])
                .filter(|r| *r >= 1.0)
                .map(|r| r as u32);
            raw.adp = number_field(row, &["adp"]);
            raw.projected_points = number_field(row, &["projected_points", "proj", "fpts"]);
            Some(raw)
        })
        .collect()
}

/// Ask the model to turn extracted sheet text into ranking rows.
pub async fn extract_rankings(client: &LlmClient, text: &str) -> Result<Vec<RawPlayer>, LlmError> {
    let prompt = build_prompt(text, &RANKING_COLUMNS);
    debug!(chars = prompt.len(), "sending rankings extraction prompt");
    let completion = client.complete(&prompt).await?;
    let rows = parse_json_array(&completion.text)?;
    let players = rows_to_players(&rows);
    info!("Model extracted {} ranking rows ({} usable)", rows.len(), players.len());
    Ok(players)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_columns_then_data() {
        let prompt = build_prompt("1. Josh Allen QB BUF", &["player", "position"]);
        assert!(prompt.starts_with("Extract the following fantasy football rankings"));
        assert!(prompt.contains("columns: player, position."));
        assert!(prompt.ends_with("Data:\n1. Josh Allen QB BUF"));
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn parses_array_inside_prose() {
        let rows = parse_json_array(r#"Here you go: [{"player":"A","position":"QB"}] Enjoy"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["player"], "A");
    }

    #[test]
    fn parse_failure_keeps_response() {
        match parse_json_array("I could not find any rankings.") {
            Err(LlmError::Parse { response, .. }) => {
                assert_eq!(response, "I could not find any rankings.")
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
        assert!(matches!(
            parse_json_array("] backwards ["),
            Err(LlmError::Parse { .. })
        ));
        assert!(matches!(
            parse_json_array("[{\"a\": }]"),
            Err(LlmError::Parse { .. })
        ));
    }

    #[test]
    fn rows_map_to_players() {
        let rows = parse_json_array(
            r#"```json
            [
              {"rank": "1", "Player": "Christian McCaffrey", "Pos": "RB", "Team": "SF", "projected_points": 310.5},
              {"rank": 2, "name": "CeeDee Lamb", "position": "WR", "team": "DAL", "adp": ""},
              {"rank": "", "name": "", "position": "QB", "team": "BUF"},
              "stray"
            ]
            ```"#,
        )
        .unwrap();
        let players = rows_to_players(&rows);
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Christian McCaffrey");
        assert_eq!(players[0].position, "RB");
        assert_eq!(players[0].rank, Some(1));
        assert_eq!(players[0].projected_points, Some(310.5));
        assert_eq!(players[0].source, SOURCE);
        assert_eq!(players[1].rank, Some(2));
        assert_eq!(players[1].adp, None);
    }
}
