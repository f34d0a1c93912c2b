//! Priced view of the wallet list

use serde::Serialize;

use crate::amount::raw_balance;
use crate::price::Prices;
use crate::units::{format_balance, to_coin};
use crate::wallet::Wallet;

/// One wallet with its balance in coins and USD
#[derive(Debug, Clone, Serialize)]
pub struct WalletValuation {
    #[serde(flatten)]
    pub wallet: Wallet,
    #[serde(serialize_with = "raw_balance::serialize")]
    pub raw_balance: u128,
    pub coin_balance: f64,
    /// Exact decimal form of `coin_balance`
    pub coin_display: String,
    pub usd_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub wallets: Vec<WalletValuation>,
    pub total_usd: f64,
    pub usd_prices: Prices,
}

/// Price every wallet at its last known raw balance
#[must_use]
pub fn value_wallets(wallets: &[Wallet], prices: &Prices) -> Portfolio {
    let wallets: Vec<WalletValuation> = wallets
        .iter()
        .map(|wallet| {
            let raw = wallet.last_raw_balance;
            let coin = to_coin(wallet.chain, raw);
            WalletValuation {
                wallet: wallet.clone(),
                raw_balance: raw,
                coin_balance: coin,
                coin_display: format_balance(wallet.chain, raw),
                usd_balance: coin * prices.for_chain(wallet.chain),
            }
        })
        .collect();

    let total_usd = wallets.iter().map(|w| w.usd_balance).sum();

    Portfolio {
        wallets,
        total_usd,
        usd_prices: prices.clone(),
    }
}
