// Source adapters: everything that talks to a file or a third-party API and
// turns the result into `RawPlayer` rows.
//
// Adapters never decide fallback policy. They return `SourceError` and the
// pipeline chooses whether to use a cached copy, skip the source, or fail.

pub mod csv_rankings;
pub mod espn;
pub mod ffc;
pub mod nflverse;
pub mod pdf;
pub mod sleeper;
pub mod stats;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use gridiron_core::cache::FileCache;
use gridiron_core::model::RawPlayer;

const USER_AGENT: &str = concat!("gridiron/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{origin} unavailable: {message}")]
    Unavailable { origin: String, message: String },

    #[error("{origin} returned malformed data: {message}")]
    Malformed { origin: String, message: String },

    #[error("{origin} rejected the request: {message}")]
    Unauthorized { origin: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn unavailable(origin: &str, message: impl ToString) -> Self {
        Self::Unavailable {
            origin: origin.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed(origin: &str, message: impl ToString) -> Self {
        Self::Malformed {
            origin: origin.to_string(),
            message: message.to_string(),
        }
    }

    pub fn unauthorized(origin: &str, message: impl ToString) -> Self {
        Self::Unauthorized {
            origin: origin.to_string(),
            message: message.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerSource
// ---------------------------------------------------------------------------

/// One origin of player rows. Implementations are run in the pipeline's
/// priority order; earlier sources win ties during merging.
#[async_trait]
pub trait PlayerSource: Send + Sync {
    /// Short label used in logs and reports.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<RawPlayer>, SourceError>;
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Client with a fixed per-request timeout.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SourceError::unavailable("http", e))
}

/// Send a prepared request and decode the JSON body.
///
/// 401/403 map to `Unauthorized`, any other non-success status or transport
/// failure to `Unavailable`, an undecodable body to `Malformed`.
pub async fn send_json(origin: &str, request: reqwest::RequestBuilder) -> Result<Value, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::unavailable(origin, e))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SourceError::unauthorized(origin, format!("status {status}")));
    }
    if !status.is_success() {
        return Err(SourceError::unavailable(origin, format!("status {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SourceError::unavailable(origin, e))?;
    serde_json::from_str(&body).map_err(|e| SourceError::malformed(origin, e))
}

pub async fn get_json(client: &reqwest::Client, origin: &str, url: &str) -> Result<Value, SourceError> {
    debug!(origin, url, "GET");
    send_json(origin, client.get(url)).await
}

// ---------------------------------------------------------------------------
// Cached fetch
// ---------------------------------------------------------------------------

/// Serve `key` from the cache when fresh, otherwise run `fetch`.
///
/// A successful fetch overwrites the cache entry. A failed fetch falls back to
/// the stale entry when one exists and only errors when there is nothing
/// cached at all.
pub async fn cached_fetch<F, Fut>(
    cache: &FileCache,
    key: &str,
    ttl: chrono::Duration,
    fetch: F,
) -> Result<Value, SourceError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, SourceError>>,
{
    if let Some(hit) = cache.get_fresh(key, ttl) {
        return Ok(hit);
    }

    match fetch().await {
        Ok(value) => {
            if let Err(e) = cache.put(key, &value) {
                warn!("Could not write cache entry {key}: {e}");
            }
            Ok(value)
        }
        Err(err) => match cache.get_stale(key) {
            Some((value, cached_at)) => {
                warn!("{err}; using cached copy of {key} from {cached_at}");
                Ok(value)
            }
            None => Err(err),
        },
    }
}

pub(crate) fn log_fetched(origin: &str, count: usize) {
    info!("Fetched {count} players from {origin}");
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
