use crate::rules::SiteRule;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, time::Duration};

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_CACHE_MAX_ENTRIES: usize = 500;
const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_REDIRECTS: usize = 5;
const MAX_REDIRECTS_LIMIT: usize = 10;
const DEFAULT_BATCH_CONCURRENCY: usize = 4;

pub const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Outbound HTTP settings shared by the oEmbed, page and search clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Many video sites refuse clients without a browser-like user agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Refuse to fetch hosts that resolve to loopback/private addresses.
    #[serde(default = "default_true")]
    pub block_private_ips: bool,

    #[serde(default)]
    pub blocked_hosts: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: USER_AGENT_DEFAULT.to_string(),
            proxy: None,
            block_private_ips: true,
            blocked_hosts: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Hostname of the page embedding the players. Twitch refuses to play
    /// without it; when unset the `parent` parameter is left out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_parent: Option<String>,

    /// Query oEmbed/page metadata for providers whose embed URL is already known.
    #[serde(default = "default_true")]
    pub fetch_metadata: bool,

    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_api_key: Option<String>,

    #[serde(default = "SiteRule::builtin")]
    pub site_rules: Vec<SiteRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
            embed_parent: None,
            fetch_metadata: true,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            youtube_api_key: None,
            site_rules: SiteRule::builtin(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

fn default_user_agent() -> String {
    USER_AGENT_DEFAULT.to_string()
}

fn default_batch_concurrency() -> usize {
    DEFAULT_BATCH_CONCURRENCY
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be greater than 0".into(),
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.http.max_redirects > MAX_REDIRECTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "http.max_redirects must be at most {MAX_REDIRECTS_LIMIT}, got {}",
                self.http.max_redirects
            )));
        }

        if self.batch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "batch_concurrency must be greater than 0".into(),
            ));
        }

        for (idx, rule) in self.site_rules.iter().enumerate() {
            if let Err(err) = rule.compile() {
                let idx = idx + 1;
                return Err(ConfigError::Invalid(format!(
                    "site rule #{idx} has a malformed host regex: {err}"
                )));
            }
        }

        Ok(())
    }

    /// Load config from `path`. A missing file is created with defaults; no path means defaults.
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let config_str = fs::read_to_string(path)?;
                serde_yml::from_str(&config_str)?
            }
            Some(path) => {
                let config = Self::default();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, serde_yml::to_string(&config)?)?;
                log::info!("wrote default config to {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;

        Ok(config)
    }

    fn apply_env(&mut self) {
        if self.youtube_api_key.is_none() {
            self.youtube_api_key = env::var("YOUTUBE_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if self.http.proxy.is_none() {
            self.http.proxy = env::var("OPT_PROXY").ok().filter(|p| !p.is_empty());
        }
    }
}
