//! Daemon configuration
//!
//! Layering: built-in defaults, then the TOML file (`HIRELOOP_CONFIG` or
//! `<config dir>/hireloop.toml`), then `HIRELOOP__SECTION__KEY` variables.

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use directories::ProjectDirs;
use hireloop_api_rpc::RpcServerConfig;
use hireloop_core::application::worker::constants::{
    DEFAULT_MAINTENANCE_INTERVAL_HOURS, DEFAULT_RETRY_BASE_DELAY_MS,
};
use hireloop_core::application::RateLimitConfig;
use hireloop_core::port::MaintenanceConfig;
use hireloop_infra_http::OAuthClientConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "HIRELOOP_CONFIG";
const ENV_PREFIX: &str = "HIRELOOP";
const FALLBACK_DATA_DIR: &str = "~/.hireloop";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub database: DatabaseSection,
    pub rpc: RpcServerConfig,
    pub rate_limit: RateLimitSection,
    pub worker: WorkerSection,
    pub sync: SyncSection,
    pub maintenance: MaintenanceSection,
    pub oauth: OAuthSection,
    pub notifier: NotifierSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let path = data_dir().join("hireloop.db");
        Self {
            url: format!("sqlite://{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub limit: u64,
    pub window_ms: i64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            limit: defaults.limit,
            window_ms: defaults.window_ms,
        }
    }
}

impl From<&RateLimitSection> for RateLimitConfig {
    fn from(section: &RateLimitSection) -> Self {
        RateLimitConfig {
            limit: section.limit,
            window_ms: section.window_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub retry_base_delay_ms: i64,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub interval_minutes: u64,
    pub horizon_days: i64,
}

impl Default for SyncSection {
    fn default() -> Self {
        use hireloop_core::application::calendar::sync::{
            DEFAULT_SYNC_HORIZON_DAYS, DEFAULT_SYNC_INTERVAL_MINUTES,
        };
        Self {
            interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
            horizon_days: DEFAULT_SYNC_HORIZON_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceSection {
    pub interval_hours: u64,
    pub job_retention_days: i64,
    pub busy_block_retention_days: i64,
    pub max_db_size_mb: f64,
}

impl Default for MaintenanceSection {
    fn default() -> Self {
        let defaults = MaintenanceConfig::default();
        Self {
            interval_hours: DEFAULT_MAINTENANCE_INTERVAL_HOURS,
            job_retention_days: defaults.finished_job_retention_days,
            busy_block_retention_days: defaults.busy_block_retention_days,
            max_db_size_mb: defaults.max_db_size_mb,
        }
    }
}

impl From<&MaintenanceSection> for MaintenanceConfig {
    fn from(section: &MaintenanceSection) -> Self {
        MaintenanceConfig {
            finished_job_retention_days: section.job_retention_days,
            busy_block_retention_days: section.busy_block_retention_days,
            max_db_size_mb: section.max_db_size_mb,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    pub google: OAuthClientConfig,
    pub microsoft: OAuthClientConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifierSection {
    /// Unset: notifications are only logged
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub format: LogFormat,
    /// Also write daily-rolling files here when set
    pub directory: Option<String>,
}

/// Per-user data directory
pub fn data_dir() -> PathBuf {
    ProjectDirs::from("dev", "hireloop", "hireloop")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(shellexpand::tilde(FALLBACK_DATA_DIR).into_owned()))
}

fn default_config_path() -> PathBuf {
    ProjectDirs::from("dev", "hireloop", "hireloop")
        .map(|dirs| dirs.config_dir().join("hireloop.toml"))
        .unwrap_or_else(|| data_dir().join("hireloop.toml"))
}

impl DaemonConfig {
    /// Load from the default file location and the process environment
    pub fn load() -> Result<Self> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) => PathBuf::from(shellexpand::tilde(&p).into_owned()),
            Err(_) => default_config_path(),
        };

        let builder = config::Config::builder()
            .add_source(File::from(path.as_path()).required(false))
            .add_source(env_source());

        Self::from_builder(builder)
            .with_context(|| format!("Failed to load configuration ({})", path.display()))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let mut cfg: DaemonConfig = builder
            .build()
            .context("Invalid configuration sources")?
            .try_deserialize()
            .context("Invalid configuration values")?;
        cfg.expand_paths();
        Ok(cfg)
    }

    fn expand_paths(&mut self) {
        self.database.url = expand_sqlite_url(&self.database.url);
        if let Some(dir) = &self.log.directory {
            self.log.directory = Some(shellexpand::tilde(dir).into_owned());
        }
    }

    /// Filesystem path of the database, if it is file backed
    pub fn database_path(&self) -> Option<&Path> {
        let path = self.database.url.strip_prefix("sqlite://")?;
        if path.contains(":memory:") {
            return None;
        }
        Some(Path::new(path.split('?').next().unwrap_or(path)))
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

/// `sqlite://~/x.db` -> `sqlite:///home/me/x.db`
fn expand_sqlite_url(url: &str) -> String {
    match url.strip_prefix("sqlite://") {
        Some(rest) => format!("sqlite://{}", shellexpand::tilde(rest)),
        None => url.to_string(),
    }
}
