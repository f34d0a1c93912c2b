//! Balance refresh cycle: concurrent fan-out, deposit detection, cooldowns

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::chain::Chain;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::providers::FetchResult;
use crate::store::WalletStore;
use crate::wallet::Wallet;

/// Default seconds reported for a chain that hit a rate limit this cycle
pub const DEFAULT_COOLDOWN_SECS: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainState {
    Ok,
    Cooldown,
}

/// Per-chain status derived from one refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainStatus {
    pub status: ChainState,
    pub cooldown_remaining: u64,
}

impl ChainStatus {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: ChainState::Ok,
            cooldown_remaining: 0,
        }
    }

    #[must_use]
    pub fn cooldown(secs: u64) -> Self {
        Self {
            status: ChainState::Cooldown,
            cooldown_remaining: secs,
        }
    }
}

/// Result of one refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    /// Wallets with `last_raw_balance` updated, in input order
    pub wallets: Vec<Wallet>,
    /// Ids whose raw balance went strictly up
    pub deposits: BTreeSet<u64>,
    /// One entry for every canonical chain
    pub chain_status: BTreeMap<Chain, ChainStatus>,
}

impl RefreshOutcome {
    /// Chains currently reported as cooling down
    pub fn cooled_down(&self) -> impl Iterator<Item = Chain> + '_ {
        self.chain_status
            .iter()
            .filter(|(_, s)| s.status == ChainState::Cooldown)
            .map(|(c, _)| *c)
    }
}

/// Runs refresh cycles against a [`Dispatcher`]
#[derive(Clone)]
pub struct Refresher {
    dispatcher: Arc<Dispatcher>,
    cooldown_secs: u64,
}

impl Refresher {
    pub fn new(dispatcher: Arc<Dispatcher>, cooldown_secs: u64) -> Self {
        Self {
            dispatcher,
            cooldown_secs,
        }
    }

    /// Fetch every wallet's balance concurrently and fold the results.
    ///
    /// One task per wallet. A task that panics counts as "no change" for its
    /// wallet and does not affect the others. Completion order is irrelevant:
    /// results are matched back to wallets by position.
    pub async fn refresh(&self, wallets: Vec<Wallet>) -> RefreshOutcome {
        if wallets.is_empty() {
            return RefreshOutcome {
                wallets,
                deposits: BTreeSet::new(),
                chain_status: self.chain_status(&BTreeSet::new()),
            };
        }

        let handles: Vec<_> = wallets
            .iter()
            .map(|wallet| {
                let dispatcher = self.dispatcher.clone();
                let chain = wallet.chain;
                let address = wallet.address.clone();
                let previous = wallet.last_raw_balance;
                tokio::spawn(async move { dispatcher.dispatch(chain, &address, previous).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (handle, wallet) in handles.into_iter().zip(&wallets) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(wallet_id = wallet.id, chain = %wallet.chain, error = %e, "Balance task failed");
                    FetchResult::unchanged(wallet.last_raw_balance)
                }
            };
            results.push(result);
        }

        let mut deposits = BTreeSet::new();
        let mut limited = BTreeSet::new();
        let wallets: Vec<Wallet> = wallets
            .into_iter()
            .zip(results)
            .map(|(mut wallet, result)| {
                if result.raw_balance > wallet.last_raw_balance {
                    deposits.insert(wallet.id);
                }
                if result.rate_limited {
                    limited.insert(wallet.chain);
                }
                wallet.last_raw_balance = result.raw_balance;
                wallet
            })
            .collect();

        info!(
            wallets = wallets.len(),
            deposits = deposits.len(),
            cooldown = ?limited,
            "Refresh cycle complete"
        );

        RefreshOutcome {
            wallets,
            deposits,
            chain_status: self.chain_status(&limited),
        }
    }

    /// Refresh everything in `store` and persist the new balances.
    ///
    /// The store lock is held while loading and again while writing back, not
    /// across the network phase. Write-back goes onto a fresh load and only
    /// touches rows whose id, chain and address still match what was fetched.
    /// Ids can be reused after a removal, so a row that was replaced mid-cycle
    /// keeps its own balance and never inherits a deposit.
    pub async fn refresh_store(&self, store: &WalletStore) -> Result<RefreshOutcome> {
        let wallets = store.lock().await.load().await?;
        let mut outcome = self.refresh(wallets).await;

        let fetched: HashMap<u64, Wallet> = outcome
            .wallets
            .drain(..)
            .map(|w| (w.id, w))
            .collect();

        let guard = store.lock().await;
        let mut current = guard.load().await?;
        for wallet in &mut current {
            if let Some(seen) = fetched.get(&wallet.id).filter(|seen| same_wallet(seen, wallet)) {
                wallet.last_raw_balance = seen.last_raw_balance;
            }
        }
        guard.save(&current).await?;

        outcome.deposits.retain(|id| {
            current
                .iter()
                .any(|w| w.id == *id && fetched.get(id).is_some_and(|seen| same_wallet(seen, w)))
        });
        outcome.wallets = current;
        Ok(outcome)
    }

    fn chain_status(&self, limited: &BTreeSet<Chain>) -> BTreeMap<Chain, ChainStatus> {
        Chain::ALL
            .into_iter()
            .map(|chain| {
                let status = if limited.contains(&chain) {
                    ChainStatus::cooldown(self.cooldown_secs)
                } else {
                    ChainStatus::ok()
                };
                (chain, status)
            })
            .collect()
    }
}

/// Same stored row as far as balances are concerned
fn same_wallet(a: &Wallet, b: &Wallet) -> bool {
    a.chain == b.chain && a.address == b.address
}
