//! Configuration for the wallet monitoring service

mod template;

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alerts::{RetriggerPolicy, DEFAULT_MAX_NOTIFICATIONS};
use crate::analysis::classification::{ClassificationTables, DEFAULT_ILLIQUID_FLOOR_USD};
use crate::analysis::RiskEngine;
use crate::provider::CachePolicy;
use crate::utils::error::{Error, Result};

pub use template::{generate_commented_config_template, generate_config_template};

pub const CONFIG_DIR_NAME: &str = "walletwatch";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration file version
    pub version: String,

    /// Wallet/market data API
    pub provider: ProviderConfig,

    /// Ephemeral cache TTLs and sweep period
    #[serde(default)]
    pub cache: CacheConfig,

    /// Alert evaluation
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Risk scoring tables
    #[serde(default)]
    pub risk: RiskConfig,

    /// Health and metrics endpoint
    #[serde(default)]
    pub server: ServerConfig,
}

/// Data provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the REST data API
    pub base_url: String,

    /// Optional bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Timeout for each request in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Period of the expired-entry sweep
    pub sweep_interval_secs: u64,
    /// TTL for wallet balances (<= 0 never expires)
    pub balances_ttl_secs: i64,
    pub transactions_ttl_secs: i64,
    pub price_ttl_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Period of the evaluation pass
    pub evaluation_interval_secs: u64,
    pub retrigger_policy: RetriggerPolicy,
    /// Size of the in-memory notification log
    pub max_notifications: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Holdings valued below this (USD) count as illiquid; so does any token outside the liquid set
    pub illiquid_floor_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address for `/healthz` and `/metrics`
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            alerts: AlertsConfig::default(),
            risk: RiskConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/v1".to_string(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let policy = CachePolicy::default();
        Self {
            sweep_interval_secs: 300, // 5 minutes
            balances_ttl_secs: policy.balances_ttl_secs,
            transactions_ttl_secs: policy.transactions_ttl_secs,
            price_ttl_secs: policy.price_ttl_secs,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: 30,
            retrigger_policy: RetriggerPolicy::Never,
            max_notifications: DEFAULT_MAX_NOTIFICATIONS,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self { illiquid_floor_usd: DEFAULT_ILLIQUID_FLOOR_USD }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8899".to_string() }
    }
}

fn default_timeout_seconds() -> u64 {
    10
}

impl CacheConfig {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            balances_ttl_secs: self.balances_ttl_secs,
            transactions_ttl_secs: self.transactions_ttl_secs,
            price_ttl_secs: self.price_ttl_secs,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl AlertsConfig {
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluation_interval_secs)
    }
}

impl RiskConfig {
    pub fn engine(&self) -> RiskEngine {
        RiskEngine::with_tables(ClassificationTables::default().with_illiquid_floor(self.illiquid_floor_usd))
    }
}

impl Config {
    /// Serialize the default config to a TOML string
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Load configuration from a specific file path, then apply env overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;
        let mut cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Save the configuration to a file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Reject empty endpoints, zero periods and negative floors
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::ConfigError("Config version must be set (e.g., '0.1.0')".to_string()));
        }
        if self.provider.base_url.trim().is_empty() {
            return Err(Error::ConfigError("provider.base_url must be set".to_string()));
        }
        if self.provider.timeout_seconds == 0 {
            return Err(Error::ConfigError("provider.timeout_seconds must be > 0".to_string()));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(Error::ConfigError("cache.sweep_interval_secs must be > 0".to_string()));
        }
        if self.alerts.evaluation_interval_secs == 0 {
            return Err(Error::ConfigError("alerts.evaluation_interval_secs must be > 0".to_string()));
        }
        if self.alerts.max_notifications == 0 {
            return Err(Error::ConfigError("alerts.max_notifications must be > 0".to_string()));
        }
        if !self.risk.illiquid_floor_usd.is_finite() || self.risk.illiquid_floor_usd < 0.0 {
            return Err(Error::ConfigError("risk.illiquid_floor_usd must be >= 0".to_string()));
        }
        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::ConfigError(format!(
                "server.bind_addr '{}' is not a socket address",
                self.server.bind_addr
            )));
        }
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE_NAME).exists() {
            return Self::from_file(CONFIG_FILE_NAME);
        }

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// `<config dir>/walletwatch/config.toml`
    pub fn user_config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("WALLETWATCH_PROVIDER_URL") {
            self.provider.base_url = url;
        }

        if let Ok(key) = env::var("WALLETWATCH_API_KEY") {
            self.provider.api_key = Some(key).filter(|k| !k.is_empty());
        }

        if let Ok(addr) = env::var("WALLETWATCH_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        Ok(())
    }
}
