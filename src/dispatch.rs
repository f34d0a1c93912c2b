//! Routing from canonical chain to its provider chain

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::chain::{Chain, ETH_USDC_CONTRACT, ETH_USDT_CONTRACT, TRX_USDT_CONTRACT};
use crate::config::Config;
use crate::error::Result;
use crate::http::HttpClient;
use crate::providers::blockcypher::Blockcypher;
use crate::providers::btc::Blockstream;
use crate::providers::eth::{Erc20Balance, RpcBalance};
use crate::providers::tron::{TronAsset, TronGrid, Tronscan};
use crate::providers::{BalanceFetcher, FetchResult, ProviderChain};
use crate::retry::RetryPolicy;

/// One fetcher per canonical chain
pub struct Dispatcher {
    fetchers: BTreeMap<Chain, Arc<dyn BalanceFetcher>>,
}

impl Dispatcher {
    /// Build the production provider chains for every supported chain
    pub fn new(config: &Config) -> Result<Self> {
        let http = HttpClient::new(&config.http)?;
        Ok(Self::with_client(config, &http))
    }

    /// Same as [`Dispatcher::new`] but reusing an existing client
    pub fn with_client(config: &Config, http: &HttpClient) -> Self {
        let retry = RetryPolicy::new(&config.http);
        let fetchers = Chain::ALL
            .into_iter()
            .map(|chain| {
                let fetcher: Arc<dyn BalanceFetcher> =
                    Arc::new(provider_chain(chain, config, http, retry));
                (chain, fetcher)
            })
            .collect();
        Self { fetchers }
    }

    /// Dispatcher with no routes; every chain is a no-op until registered
    #[must_use]
    pub fn empty() -> Self {
        Self {
            fetchers: BTreeMap::new(),
        }
    }

    /// Replace the fetcher used for `chain`
    #[must_use]
    pub fn with_fetcher(mut self, chain: Chain, fetcher: Arc<dyn BalanceFetcher>) -> Self {
        self.fetchers.insert(chain, fetcher);
        self
    }

    /// Fetch the raw balance of `address` on `chain`.
    ///
    /// A chain without a registered fetcher returns `previous` untouched.
    pub async fn dispatch(&self, chain: Chain, address: &str, previous: u128) -> FetchResult {
        match self.fetchers.get(&chain) {
            Some(fetcher) => fetcher.fetch_raw(address, previous).await,
            None => FetchResult::unchanged(previous),
        }
    }

    /// [`Dispatcher::dispatch`] keyed by a chain code string.
    ///
    /// Codes outside the canonical set are a no-op rather than an error.
    pub async fn dispatch_code(&self, code: &str, address: &str, previous: u128) -> FetchResult {
        match code.parse::<Chain>() {
            Ok(chain) => self.dispatch(chain, address, previous).await,
            Err(_) => {
                warn!(chain = code, address, "Unknown chain code, balance left unchanged");
                FetchResult::unchanged(previous)
            }
        }
    }
}

fn provider_chain(chain: Chain, config: &Config, http: &HttpClient, retry: RetryPolicy) -> ProviderChain {
    let urls = &config.providers;
    let tron_key = urls.tron_api_key.clone();

    match chain {
        Chain::Btc => ProviderChain::new(chain, retry)
            .primary(Blockstream::new(http.clone(), &urls.blockstream_url))
            .fallback(Blockcypher::bitcoin(http.clone(), &urls.blockcypher_url)),

        Chain::Eth => urls
            .eth_rpc_urls
            .iter()
            .fold(ProviderChain::new(chain, retry), |c, url| {
                c.primary(RpcBalance::new(http.clone(), url))
            })
            .fallback(Blockcypher::ethereum(http.clone(), &urls.blockcypher_url))
            .stop_on_rate_limit()
            .probe_until_changed(),

        Chain::UsdtEth | Chain::UsdcEth => {
            let contract = if chain == Chain::UsdtEth {
                ETH_USDT_CONTRACT
            } else {
                ETH_USDC_CONTRACT
            };
            urls.eth_rpc_urls
                .iter()
                .fold(ProviderChain::new(chain, retry), |c, url| {
                    c.primary(Erc20Balance::new(http.clone(), url, contract))
                })
                .stop_on_rate_limit()
                .probe_until_changed()
        }

        Chain::Trx => ProviderChain::new(chain, retry)
            .primary(TronGrid::new(http.clone(), &urls.trongrid_url, tron_key.clone(), TronAsset::Native))
            .fallback(Tronscan::new(http.clone(), &urls.tronscan_url, tron_key, TronAsset::Native)),

        Chain::UsdtTrx => {
            let asset = TronAsset::Trc20(TRX_USDT_CONTRACT.to_string());
            ProviderChain::new(chain, retry)
                .primary(TronGrid::new(http.clone(), &urls.trongrid_url, tron_key.clone(), asset.clone()))
                .fallback(Tronscan::new(http.clone(), &urls.tronscan_url, tron_key, asset))
        }
    }
}
