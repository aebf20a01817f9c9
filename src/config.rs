use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Minimum relevance score a suggestion needs to be surfaced by default.
    #[serde(default = "default_threshold")]
    pub suggestion_threshold: f64,
    /// Hard cap on the number of suggestions returned per analysis.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// TTL for cached (subject, fingerprint) suggestion results.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// TTL for the per-subject live-context entry.
    #[serde(default = "default_live_context_ttl")]
    pub live_context_ttl_secs: u64,
    /// Upper bound on one oracle query; past it ranking degrades to
    /// rule-based suggestions only.
    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_secs: u64,
    /// Capacity of the background ranking queue. Submissions past this
    /// are dropped rather than queued unboundedly.
    #[serde(default = "default_rank_queue")]
    pub rank_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suggestion_threshold: default_threshold(),
            max_suggestions: default_max_suggestions(),
            cache_ttl_secs: default_cache_ttl(),
            live_context_ttl_secs: default_live_context_ttl(),
            oracle_timeout_secs: default_oracle_timeout(),
            rank_queue_capacity: default_rank_queue(),
        }
    }
}

fn default_threshold() -> f64 {
    0.7
}
fn default_max_suggestions() -> usize {
    10
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_live_context_ttl() -> u64 {
    300
}
fn default_oracle_timeout() -> u64 {
    5
}
fn default_rank_queue() -> usize {
    256
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// When true (the default), `new-context` events are delivered only to
    /// other sessions of the originating subject. When false, they are
    /// broadcast to every other connected session.
    #[serde(default = "default_scope_events")]
    pub scope_events_to_subject: bool,
    /// Broadcast channel capacity; lagged subscribers drop events.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            scope_events_to_subject: default_scope_events(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8420".to_string()
}
fn default_scope_events() -> bool {
    true
}
fn default_channel_capacity() -> usize {
    1024
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !(0.0..=1.0).contains(&config.engine.suggestion_threshold) {
        anyhow::bail!("engine.suggestion_threshold must be in [0.0, 1.0]");
    }
    if config.engine.max_suggestions == 0 {
        anyhow::bail!("engine.max_suggestions must be >= 1");
    }
    if config.engine.cache_ttl_secs == 0 {
        anyhow::bail!("engine.cache_ttl_secs must be >= 1");
    }
    if config.engine.rank_queue_capacity == 0 {
        anyhow::bail!("engine.rank_queue_capacity must be >= 1");
    }
    Ok(())
}

impl Config {
    /// Config with all defaults and the given database path. Used by tests
    /// and one-shot CLI commands.
    pub fn with_db_path(path: PathBuf) -> Self {
        Self {
            db: DbConfig { path },
            engine: EngineConfig::default(),
            server: ServerConfig::default(),
        }
    }
}
