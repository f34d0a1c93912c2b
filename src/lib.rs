//! Crypto Watcher Library
//!
//! Tracks wallets on BTC, ETH and TRX plus the USDT/USDC tokens on top of
//! them, refreshing raw on-chain balances from public indexers with retry,
//! fallback providers and explicit rate-limit handling.

mod amount;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod portfolio;
pub mod price;
pub mod providers;
pub mod refresh;
pub mod retry;
pub mod store;
pub mod units;
pub mod wallet;

pub use chain::{normalize, parse_chain, validate, validate_address, Chain};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{Error, FetchError, Result};
pub use providers::FetchResult;
pub use refresh::{ChainState, ChainStatus, RefreshOutcome, Refresher};
pub use store::WalletStore;
pub use wallet::Wallet;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. `format` selects `json` or
/// plain text output.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber.with(fmt::layer().json().with_writer(std::io::stderr)).try_init(),
        _ => subscriber.with(fmt::layer().with_writer(std::io::stderr)).try_init(),
    };

    installed.map_err(|e| Error::Config(format!("failed to install tracing subscriber: {e}")))
}
