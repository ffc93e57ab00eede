//! Configuration template generation

use crate::config::Config;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

const COMMENTED_TEMPLATE: &str = r#"# WalletWatch Configuration
# Every section except [provider] may be omitted; missing values use the defaults shown.

version = "0.1.0"

[provider]
# Base URL of the wallet/market data API
# (override with WALLETWATCH_PROVIDER_URL)
base_url = "http://127.0.0.1:8080/api/v1"

# Bearer token sent with every request (override with WALLETWATCH_API_KEY)
# api_key = ""

# Timeout for each request in seconds
timeout_seconds = 10

[cache]
# How often expired entries are swept from the cache (seconds)
sweep_interval_secs = 300

# Time-to-live per data kind in seconds (0 or negative = never expires)
balances_ttl_secs = 60
transactions_ttl_secs = 30
price_ttl_secs = 30

[alerts]
# How often ACTIVE alerts are evaluated (seconds)
evaluation_interval_secs = 30

# What happens to a triggered alert once its condition clears:
#   "never" - it stays triggered until deleted
#   "rearm" - it returns to ACTIVE and may fire again
retrigger_policy = "never"

# Number of notifications kept in memory
max_notifications = 1000

[risk]
# Holdings worth less than this (USD) count as illiquid, as does any token that is
# not widely traded regardless of value
illiquid_floor_usd = 100.0

[server]
# Address for /healthz and /metrics (override with WALLETWATCH_BIND_ADDR)
bind_addr = "127.0.0.1:8899"
"#;

/// Write the default configuration (no comments) to `path`
pub fn generate_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    Config::default().save(path)
}

/// Write a configuration file with comments explaining each field
pub fn generate_commented_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, COMMENTED_TEMPLATE)?;
    Ok(())
}
