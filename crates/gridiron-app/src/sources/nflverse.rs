// nflverse `players.json` release asset, the backup roster catalog used when
// Sleeper cannot be reached.

use serde_json::Value;

use super::{get_json, http_client, SourceError};

const ORIGIN: &str = "nflverse";

/// Cache key for the backup catalog.
pub const CATALOG_CACHE_KEY: &str = "nflverse_players";

#[derive(Debug, Clone)]
pub struct NflverseClient {
    client: reqwest::Client,
    url: String,
}

impl NflverseClient {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            url: url.to_string(),
        })
    }

    /// The player list. Anything other than a JSON array is malformed.
    pub async fn players(&self) -> Result<Value, SourceError> {
        let data = get_json(&self.client, ORIGIN, &self.url).await?;
        if !data.is_array() {
            return Err(SourceError::malformed(ORIGIN, "players.json is not a list"));
        }
        Ok(data)
    }
}
