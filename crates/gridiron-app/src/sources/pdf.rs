// Rankings sheet from a PDF: text via `pdftotext -layout`, then either the
// line pattern "1. Christian McCaffrey RB SF" or model-assisted extraction.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use gridiron_core::model::RawPlayer;
use gridiron_llm::extract::extract_rankings;
use gridiron_llm::LlmClient;

use super::{log_fetched, PlayerSource, SourceError};

pub const SOURCE: &str = "pdf";

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // rank, name (one or more words), position, team
    RE.get_or_init(|| Regex::new(r"^(\d+)\.?\s+(\S.*?)\s+(\S+)\s+(\S+)$").expect("pdf line regex"))
}

/// Run `pdftotext -layout <file> -` and capture stdout.
pub async fn extract_text(file: &Path) -> Result<String, SourceError> {
    which::which("pdftotext").map_err(|_| SourceError::Io {
        path: file.display().to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "pdftotext not installed (poppler-utils)",
        ),
    })?;

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(file)
        .arg("-")
        .output()
        .await
        .map_err(|e| SourceError::Io {
            path: file.display().to_string(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SourceError::malformed(
            SOURCE,
            format!(
                "pdftotext failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ),
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout).to_string();
    if text.trim().is_empty() {
        return Err(SourceError::malformed(
            SOURCE,
            "PDF appears scanned/image-only, no text extracted",
        ));
    }
    Ok(text)
}

/// Parse ranking lines. Lines that do not start with a rank are ignored.
pub fn parse_ranking_lines(text: &str) -> Vec<RawPlayer> {
    text.lines()
        .filter_map(|line| {
            let caps = line_re().captures(line.trim())?;
            let rank: u32 = caps[1].parse().ok()?;
            let mut raw = RawPlayer::new(&caps[2], &caps[3], &caps[4], SOURCE);
            raw.rank = Some(rank);
            Some(raw)
        })
        .collect()
}

/// PDF rankings sheet. With an enabled model client the sheet text is sent
/// for structured extraction; otherwise the line pattern is used.
pub struct PdfSource {
    path: PathBuf,
    llm: Option<Arc<LlmClient>>,
}

impl PdfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            llm: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }
}

#[async_trait]
impl PlayerSource for PdfSource {
    fn name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self) -> Result<Vec<RawPlayer>, SourceError> {
        let text = extract_text(&self.path).await?;
        debug!(chars = text.len(), "extracted PDF text");

        let players = match self.llm.as_deref() {
            Some(llm) if llm.is_enabled() => match extract_rankings(llm, &text).await {
                Ok(players) => players,
                Err(e) => {
                    warn!("Model extraction failed ({e}); falling back to line parsing");
                    parse_ranking_lines(&text)
                }
            },
            _ => parse_ranking_lines(&text),
        };
        log_fetched(SOURCE, players.len());
        Ok(players)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
