//! USD price lookup via CoinGecko

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::warn;

use crate::chain::Chain;
use crate::config::ProviderConfig;
use crate::http::HttpClient;

/// (price symbol, CoinGecko id, fallback price)
const COINS: &[(&str, &str, f64)] = &[
    ("BTC", "bitcoin", 0.0),
    ("ETH", "ethereum", 0.0),
    ("TRX", "tron", 0.0),
    ("USDT", "tether", 1.0),
    ("USDC", "usd-coin", 1.0),
];

/// USD price per price symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Prices(BTreeMap<String, f64>);

impl Prices {
    /// Prices used when the feed is unreachable: native coins 0, stablecoins 1
    #[must_use]
    pub fn defaults() -> Self {
        Self(
            COINS
                .iter()
                .map(|(symbol, _, fallback)| ((*symbol).to_string(), *fallback))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.0.get(symbol).copied()
    }

    /// USD price for one coin of `chain`
    #[must_use]
    pub fn for_chain(&self, chain: Chain) -> f64 {
        self.get(chain.price_symbol())
            .unwrap_or(if chain.is_stablecoin() { 1.0 } else { 0.0 })
    }

    pub fn set(&mut self, symbol: impl Into<String>, usd: f64) {
        self.0.insert(symbol.into(), usd);
    }
}

impl Default for Prices {
    fn default() -> Self {
        Self::defaults()
    }
}

/// CoinGecko `simple/price` client
pub struct PriceFeed {
    http: HttpClient,
    base_url: String,
}

impl PriceFeed {
    pub fn new(http: HttpClient, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.coingecko_url.clone(),
        }
    }

    /// Current USD prices. Never fails: any problem yields the defaults.
    pub async fn fetch_usd_prices(&self) -> Prices {
        let ids = COINS.iter().map(|(_, id, _)| *id).collect::<Vec<_>>().join(",");
        let url = format!("{}/simple/price", self.base_url);
        let request = self
            .http
            .get(&url)
            .query(&[("ids", ids.as_str()), ("vs_currencies", "usd")]);

        let data: HashMap<String, HashMap<String, f64>> = match self.http.send_json(request).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Price lookup failed, using defaults");
                return Prices::defaults();
            }
        };

        let mut prices = Prices::defaults();
        for (symbol, id, _) in COINS {
            if let Some(usd) = data.get(*id).and_then(|p| p.get("usd")) {
                prices.set(*symbol, *usd);
            }
        }
        prices
    }
}
