//! Shared helpers for integration tests

#![allow(dead_code)]

use crypto_watcher::Config;

/// Config whose every provider points at `base`, with near-zero backoff
pub fn config_for(base: &str) -> Config {
    let mut config = Config::default();
    config.http.timeout_ms = 2_000;
    config.http.retry_base_delay_ms = 1;
    config.providers.blockstream_url = base.to_string();
    config.providers.blockcypher_url = base.to_string();
    config.providers.eth_rpc_urls = vec![format!("{base}/rpc1"), format!("{base}/rpc2")];
    config.providers.trongrid_url = base.to_string();
    config.providers.tronscan_url = base.to_string();
    config.providers.coingecko_url = base.to_string();
    config
}

pub const BTC_ADDRESS: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";
pub const ETH_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";
pub const TRX_ADDRESS: &str = "TQ5Siy2Pq7p4LK2G3i7peoNwKq6N9GQaeV";
