use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// File backing the persisted session (access token, refresh token, user record).
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "learnhub-session.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Learnhub.toml (if present)
    /// 3. Environment variables prefixed with LEARNHUB_ (nested keys split on `__`,
    ///    e.g. LEARNHUB_API__TIMEOUT_SECONDS)
    /// 4. LEARNHUB_API_URL, the single base-URL override
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("Learnhub.toml"))
            .merge(Env::prefixed("LEARNHUB_").ignore(&["API_URL"]).split("__"))
            .merge(Env::raw().only(&["LEARNHUB_API_URL"]).map(|_| "api.base_url".into()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        let mut config: Config = figment.extract()?;
        config.api.base_url = normalize_base_url(&config.api.base_url);
        Ok(config)
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_API_BASE_URL.to_string();
    }

    let mut normalized = trimmed.to_string();
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');
    format!("{}/{}", base, suffix)
}
