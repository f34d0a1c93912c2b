//! Bitcoin balance providers

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::providers::BalanceSource;

/// Response structure from an Esplora `/address/{address}` endpoint
#[derive(Debug, Deserialize)]
struct EsploraAddress {
    chain_stats: TxoStats,
    #[serde(default)]
    mempool_stats: TxoStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TxoStats {
    funded_txo_sum: u64, // Total received (in satoshis)
    spent_txo_sum: u64,  // Total spent (in satoshis)
}

impl EsploraAddress {
    /// Confirmed plus mempool, funded minus spent, floored at zero
    fn balance(&self) -> u128 {
        let funded = i128::from(self.chain_stats.funded_txo_sum) + i128::from(self.mempool_stats.funded_txo_sum);
        let spent = i128::from(self.chain_stats.spent_txo_sum) + i128::from(self.mempool_stats.spent_txo_sum);
        u128::try_from(funded - spent).unwrap_or(0)
    }
}

/// Primary: Blockstream's Esplora indexer
pub struct Blockstream {
    http: HttpClient,
    base_url: String,
}

impl Blockstream {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BalanceSource for Blockstream {
    fn name(&self) -> &str {
        "blockstream"
    }

    async fn fetch(&self, address: &str) -> Result<u128, FetchError> {
        let url = format!("{}/address/{}", self.base_url, address);
        let data: EsploraAddress = self.http.send_json(self.http.get(&url)).await?;
        Ok(data.balance())
    }
}
