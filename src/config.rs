//! Configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::refresh::DEFAULT_COOLDOWN_SECS;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file holding the wallet list
    pub wallets_file: PathBuf,
    /// Seconds reported as remaining cooldown for a rate-limited chain
    pub cooldown_secs: u64,
    /// Outbound HTTP behaviour
    pub http: HttpConfig,
    /// Upstream balance and price endpoints
    pub providers: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wallets_file: PathBuf::from("wallets.json"),
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            http: HttpConfig::default(),
            providers: ProviderConfig::default(),
        }
    }
}

/// Timeout and retry settings shared by every provider call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Attempts against one provider before falling through
    pub retry_attempts: u32,
    /// Delay unit between attempts; attempt `n` waits `n * base`
    pub retry_base_delay_ms: u64,
    /// User-Agent sent upstream
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            user_agent: concat!("crypto-watcher/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Provider base URLs. All overridable so tests can point at a mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Esplora-style BTC indexer (primary)
    pub blockstream_url: String,
    /// BlockCypher API root (BTC fallback, ETH last resort)
    pub blockcypher_url: String,
    /// Ethereum JSON-RPC endpoints, tried in order
    pub eth_rpc_urls: Vec<String>,
    /// TronGrid API root (primary for TRX and TRC-20)
    pub trongrid_url: String,
    /// Tronscan API root (fallback for TRX and TRC-20)
    pub tronscan_url: String,
    /// Optional key sent as `TRON-PRO-API-KEY`
    pub tron_api_key: Option<String>,
    /// CoinGecko API root
    pub coingecko_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            blockstream_url: "https://blockstream.info/api".to_string(),
            blockcypher_url: "https://api.blockcypher.com".to_string(),
            eth_rpc_urls: vec![
                "https://cloudflare-eth.com".to_string(),
                "https://ethereum-rpc.publicnode.com".to_string(),
                "https://eth.llamarpc.com".to_string(),
                "https://rpc.ankr.com/eth".to_string(),
            ],
            trongrid_url: "https://api.trongrid.io".to_string(),
            tronscan_url: "https://apilist.tronscanapi.com".to_string(),
            tron_api_key: None,
            coingecko_url: "https://api.coingecko.com/api/v3".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then optional YAML file, then
    /// `CRYPTO_WATCHER_` environment variables (`__` separates nested keys).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("CRYPTO_WATCHER_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.http.retry_attempts == 0 {
            return Err(Error::Config("http.retry_attempts must be at least 1".into()));
        }
        if self.providers.eth_rpc_urls.is_empty() {
            return Err(Error::Config("providers.eth_rpc_urls cannot be empty".into()));
        }
        Ok(())
    }
}
