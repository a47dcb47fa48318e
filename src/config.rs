use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable pointing at an alternative config file.
pub const CONFIG_ENV: &str = "TICKETING_GATEWAY_CONFIG";

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub crm: CrmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CrmConfig {
    /// Inbound webhook base URL, e.g. `https://acme.bitrix24.com/rest/1/<token>`.
    pub webhook_url: String,
    pub tickets_entity_type_id: u32,
    /// Defaults to the tickets entity type when unset.
    pub bugs_entity_type_id: Option<u32>,
    #[serde(default = "default_crm_timeout")]
    pub request_timeout_secs: u64,
}

impl CrmConfig {
    pub fn bug_entity_type(&self) -> u32 {
        self.bugs_entity_type_id.unwrap_or(self.tickets_entity_type_id)
    }

    /// Tickets and bugs live in the same CRM entity, so each kind's reads
    /// also see the other's writes.
    pub fn shares_entity(&self) -> bool {
        self.bug_entity_type() == self.tickets_entity_type_id
    }
}

fn default_crm_timeout() -> u64 {
    20
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub expiry_secs: u64,
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::File,
            expiry_secs: 300,
            dir: None,
        }
    }
}

impl CacheConfig {
    pub fn cache_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    pub max_concurrent_lookups: usize,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ticketing-gateway")
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("config.toml"))
}

/// Load the config from `path`, or from the default location when `None`.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents)?;
    Ok(config)
}
