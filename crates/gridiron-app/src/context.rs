// Shared handles for jobs and the web layer: config, the record store chosen
// at startup, the model client, and constructors for the source clients.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use gridiron_core::cache::FileCache;
use gridiron_core::config::Config;
use gridiron_core::store::{open_store, PlayerStore};
use gridiron_football::roster::RosterValidator;
use gridiron_llm::LlmClient;

use crate::active_roster::RosterLoader;
use crate::sources::espn::EspnSource;
use crate::sources::ffc::AdpClient;
use crate::sources::nflverse::NflverseClient;
use crate::sources::sleeper::{SleeperClient, SleeperSource};
use crate::sources::stats::StatsService;
use crate::sources::SourceError;

const ROSTER_CACHE_FILE: &str = "roster_cache.json";
const ADP_CACHE_FILE: &str = "adp_cache.json";
const STATS_CACHE_FILE: &str = "stats_cache.json";

fn hours(h: u32) -> chrono::Duration {
    chrono::Duration::hours(i64::from(h))
}

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn PlayerStore>,
    pub llm: Arc<LlmClient>,
}

impl AppContext {
    pub fn new(config: Config, store: Arc<dyn PlayerStore>) -> Self {
        let llm = Arc::new(LlmClient::from_config(&config));
        Self { config, store, llm }
    }

    /// Open the configured store and build the context around it.
    pub fn open(config: Config) -> Result<Self> {
        let store = open_store(&config.storage).context("failed to open record store")?;
        let ctx = Self::new(config, store);
        match ctx.llm.as_ref() {
            LlmClient::Active(_) => info!("LLM client initialized (API key configured)"),
            LlmClient::Disabled => info!("LLM client disabled (no API key)"),
        }
        Ok(ctx)
    }

    fn cache_file(&self, name: &str) -> FileCache {
        FileCache::in_dir(&self.config.cache_dir(), name)
    }

    pub fn roster_cache(&self) -> FileCache {
        self.cache_file(ROSTER_CACHE_FILE)
    }

    pub fn adp_cache(&self) -> FileCache {
        self.cache_file(ADP_CACHE_FILE)
    }

    pub fn stats_cache(&self) -> FileCache {
        self.cache_file(STATS_CACHE_FILE)
    }

    pub fn sleeper_client(&self) -> Result<SleeperClient, SourceError> {
        let s = &self.config.sources;
        SleeperClient::new(&s.sleeper_base_url, s.roster_timeout_secs)
    }

    pub fn sleeper_source(&self) -> Result<SleeperSource, SourceError> {
        Ok(SleeperSource::new(
            self.sleeper_client()?,
            self.roster_cache(),
            hours(self.config.cache.roster_ttl_hours),
        ))
    }

    pub fn espn_source(&self, league_id: &str) -> Result<EspnSource, SourceError> {
        let season = self.config.espn.season.unwrap_or_else(|| self.config.season());
        EspnSource::new(
            &self.config.sources,
            &self.config.espn,
            &self.config.credentials,
            league_id,
            season,
        )
    }

    pub fn adp_client(&self) -> Result<AdpClient, SourceError> {
        let s = &self.config.sources;
        AdpClient::new(
            &s.ffc_base_url,
            s.adp_timeout_secs,
            self.adp_cache(),
            hours(self.config.cache.adp_ttl_hours),
            self.config.adp.teams,
            self.config.season(),
        )
    }

    pub fn stats_service(&self) -> Result<StatsService, SourceError> {
        let s = &self.config.sources;
        Ok(StatsService::new(
            SleeperClient::new(&s.sleeper_base_url, s.stats_timeout_secs)?,
            self.roster_cache(),
            hours(self.config.cache.roster_ttl_hours),
            self.stats_cache(),
            hours(self.config.cache.stats_ttl_hours),
        ))
    }

    /// Roster validator for this run, at the configured threshold.
    pub async fn roster_validator(&self) -> Result<RosterValidator, SourceError> {
        let s = &self.config.sources;
        let sleeper = self.sleeper_client()?;
        let nflverse = NflverseClient::new(&s.nflverse_players_url, s.roster_timeout_secs)?;
        let cache = self.roster_cache();
        let loader = RosterLoader {
            sleeper: &sleeper,
            nflverse: &nflverse,
            cache: &cache,
            ttl: hours(self.config.cache.roster_ttl_hours),
            season: self.config.season(),
        };
        Ok(loader.validator(self.config.matching.roster_threshold).await)
    }
}
