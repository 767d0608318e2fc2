// Configuration loading and parsing (gridiron.toml, credentials.toml, env overrides).

use chrono::Datelike;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const MAIN_FILE: &str = "gridiron.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to prepare {path}: {message}")]
    BootstrapError { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub matching: MatchingConfig,
    pub adp: AdpConfig,
    pub espn: EspnConfig,
    pub sources: SourcesConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Season used for ADP and roster lookups: `adp.year` if set, else the
    /// current calendar year.
    pub fn season(&self) -> i32 {
        self.adp.year.unwrap_or_else(|| chrono::Local::now().year())
    }

    /// Directory holding the timestamped JSON cache files.
    ///
    /// An empty `cache.dir` resolves to the platform cache directory, falling
    /// back to `./cache` when no home directory can be determined.
    pub fn cache_dir(&self) -> PathBuf {
        if !self.cache.dir.trim().is_empty() {
            return PathBuf::from(&self.cache.dir);
        }
        directories::ProjectDirs::from("", "", "gridiron")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("cache"))
    }
}

// ---------------------------------------------------------------------------
// gridiron.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire gridiron.toml file.
#[derive(Debug, Clone, Deserialize)]
struct GridironFile {
    storage: StorageConfig,
    cache: CacheConfig,
    matching: MatchingConfig,
    adp: AdpConfig,
    #[serde(default)]
    espn: EspnConfig,
    sources: SourcesConfig,
    llm: LlmConfig,
    server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub sqlite_path: String,
    pub json_path: String,
}

impl StorageConfig {
    /// Field name and path of the file the selected backend writes.
    pub fn active_path(&self) -> (&'static str, &str) {
        match self.backend {
            StorageBackend::Sqlite => ("storage.sqlite_path", &self.sqlite_path),
            StorageBackend::Json => ("storage.json_path", &self.json_path),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub dir: String,
    pub adp_ttl_hours: u32,
    pub roster_ttl_hours: u32,
    pub stats_ttl_hours: u32,
}

/// Name-similarity thresholds. The roster threshold tolerates more drift than
/// the merge threshold: a false roster accept costs less than merging two
/// distinct real players.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub roster_threshold: f64,
    pub merge_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdpConfig {
    pub formats: Vec<String>,
    pub teams: u32,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspnConfig {
    #[serde(default)]
    pub league_id: Option<String>,
    #[serde(default)]
    pub season: Option<i32>,
    #[serde(default = "default_free_agent_limit")]
    pub free_agent_limit: usize,
}

impl Default for EspnConfig {
    fn default() -> Self {
        Self {
            league_id: None,
            season: None,
            free_agent_limit: default_free_agent_limit(),
        }
    }
}

fn default_free_agent_limit() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub sleeper_base_url: String,
    pub nflverse_players_url: String,
    pub ffc_base_url: String,
    pub espn_base_url: String,
    pub roster_timeout_secs: u64,
    pub adp_timeout_secs: u64,
    pub stats_timeout_secs: u64,
    pub espn_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub per_page: usize,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub openai_api_key: Option<String>,
    pub espn_s2: Option<String>,
    pub swid: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/gridiron.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Environment overrides are not applied here; see `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- gridiron.toml (required) ---
    let main_path = config_dir.join("gridiron.toml");
    let main_text = read_file(&main_path)?;
    let file: GridironFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        storage: file.storage,
        cache: file.cache,
        matching: file.matching,
        adp: file.adp,
        espn: file.espn,
        sources: file.sources,
        llm: file.llm,
        server: file.server,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/gridiron.toml` from `defaults/gridiron.toml` when it is
/// missing. Returns whether a copy was made. `credentials.toml` is never
/// seeded; secrets stay opt-in.
pub fn seed_config_file(base_dir: &Path) -> Result<bool, ConfigError> {
    let target = base_dir.join("config").join(MAIN_FILE);
    if target.exists() {
        return Ok(false);
    }
    let source = base_dir.join("defaults").join(MAIN_FILE);
    if !source.is_file() {
        return Err(ConfigError::BootstrapError {
            path: target,
            message: format!("missing, and no {} to seed it from", source.display()),
        });
    }

    let bootstrap_err = |e: std::io::Error| ConfigError::BootstrapError {
        path: target.clone(),
        message: e.to_string(),
    };
    std::fs::create_dir_all(base_dir.join("config")).map_err(bootstrap_err)?;
    std::fs::copy(&source, &target).map_err(bootstrap_err)?;
    info!("Seeded {} from defaults", target.display());
    Ok(true)
}

/// Create the directories the loaded config writes into: the cache
/// directory and the parent of the selected store file. SQLite will not
/// create a missing parent on its own. Returns the directories created.
pub fn prepare_dirs(config: &Config) -> Result<Vec<PathBuf>, ConfigError> {
    let mut wanted = vec![config.cache_dir()];
    if let Some(parent) = Path::new(config.storage.active_path().1).parent() {
        if !parent.as_os_str().is_empty() {
            wanted.push(parent.to_path_buf());
        }
    }

    let mut created = Vec::new();
    for dir in wanted {
        if dir.is_dir() {
            continue;
        }
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::BootstrapError {
            path: dir.clone(),
            message: e.to_string(),
        })?;
        created.push(dir);
    }
    Ok(created)
}

/// Loads config relative to the current working directory, copying defaults
/// first and then applying environment overrides.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    seed_config_file(&cwd)?;
    let mut config = load_config_from(&cwd)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    for dir in prepare_dirs(&config)? {
        info!("Created {}", dir.display());
    }
    Ok(config)
}

/// Overlay secrets and the ESPN league id from the environment.
///
/// `lookup` abstracts `std::env::var` so tests do not touch process state.
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get("OPENAI_API_KEY") {
        config.credentials.openai_api_key = Some(key);
    }
    if let Some(s2) = get("ESPN_S2") {
        config.credentials.espn_s2 = Some(s2);
    }
    if let Some(swid) = get("SWID") {
        config.credentials.swid = Some(swid);
    }
    if let Some(league) = get("ESPN_LEAGUE_ID") {
        config.espn.league_id = Some(league);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let thresholds: &[(&str, f64)] = &[
        ("matching.roster_threshold", config.matching.roster_threshold),
        ("matching.merge_threshold", config.matching.merge_threshold),
    ];
    for (name, val) in thresholds {
        if !(*val > 0.0 && *val <= 1.0) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be in (0.0, 1.0], got {val}"),
            });
        }
    }

    let ttls: &[(&str, u32)] = &[
        ("cache.adp_ttl_hours", config.cache.adp_ttl_hours),
        ("cache.roster_ttl_hours", config.cache.roster_ttl_hours),
        ("cache.stats_ttl_hours", config.cache.stats_ttl_hours),
    ];
    for (name, val) in ttls {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    if config.adp.formats.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "adp.formats".into(),
            message: "must list at least one scoring format".into(),
        });
    }

    if config.adp.teams == 0 {
        return Err(ConfigError::ValidationError {
            field: "adp.teams".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.server.per_page == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.per_page".into(),
            message: "must be greater than 0".into(),
        });
    }

    let (field, path) = config.storage.active_path();
    if path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: field.into(),
            message: "must not be empty for the selected backend".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
