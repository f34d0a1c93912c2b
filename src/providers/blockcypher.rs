//! BlockCypher address balances (BTC fallback, ETH last resort)

use async_trait::async_trait;
use serde::Deserialize;

use crate::amount::RawAmount;
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::providers::BalanceSource;

#[derive(Debug, Deserialize)]
struct BlockcypherBalance {
    /// Confirmed balance in the chain's base unit
    balance: RawAmount,
}

/// BlockCypher's confirmed balance for one coin
pub struct Blockcypher {
    http: HttpClient,
    base_url: String,
    coin: &'static str,
}

impl Blockcypher {
    pub fn bitcoin(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            coin: "btc",
        }
    }

    pub fn ethereum(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            coin: "eth",
        }
    }
}

#[async_trait]
impl BalanceSource for Blockcypher {
    fn name(&self) -> &str {
        "blockcypher"
    }

    async fn fetch(&self, address: &str) -> Result<u128, FetchError> {
        let url = format!("{}/v1/{}/main/addrs/{}/balance", self.base_url, self.coin, address);
        let data: BlockcypherBalance = self.http.send_json(self.http.get(&url)).await?;
        Ok(data.balance.0)
    }
}
