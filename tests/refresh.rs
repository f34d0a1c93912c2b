//! Refresh cycle behaviour with scripted fetchers

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{BTC_ADDRESS, ETH_ADDRESS, TRX_ADDRESS};
use crypto_watcher::providers::BalanceFetcher;
use crypto_watcher::{Chain, ChainState, ChainStatus, Dispatcher, FetchResult, Refresher, Wallet, WalletStore};
use tokio::sync::Barrier;

/// Answers from a fixed address -> result table, counting calls
#[derive(Default)]
struct Table {
    answers: HashMap<String, FetchResult>,
    calls: AtomicUsize,
}

impl Table {
    fn with(mut self, address: &str, result: FetchResult) -> Self {
        self.answers.insert(address.to_string(), result);
        self
    }
}

#[async_trait]
impl BalanceFetcher for Table {
    async fn fetch_raw(&self, address: &str, previous: u128) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(address)
            .copied()
            .unwrap_or(FetchResult::unchanged(previous))
    }
}

struct Panics;

#[async_trait]
impl BalanceFetcher for Panics {
    async fn fetch_raw(&self, _address: &str, _previous: u128) -> FetchResult {
        panic!("provider bug");
    }
}

/// Every call waits until `n` calls are in flight at once
struct Rendezvous(Barrier);

#[async_trait]
impl BalanceFetcher for Rendezvous {
    async fn fetch_raw(&self, _address: &str, previous: u128) -> FetchResult {
        self.0.wait().await;
        FetchResult::fresh(previous + 1)
    }
}

fn refresher(dispatcher: Dispatcher) -> Refresher {
    Refresher::new(Arc::new(dispatcher), 8)
}

fn eth_address(n: u8) -> String {
    format!("0x{:040x}", n)
}

#[tokio::test]
async fn empty_wallet_set_makes_no_calls() {
    let table = Arc::new(Table::default());
    let refresher = refresher(Dispatcher::empty().with_fetcher(Chain::Eth, table.clone()));

    let outcome = refresher.refresh(Vec::new()).await;

    assert!(outcome.wallets.is_empty());
    assert!(outcome.deposits.is_empty());
    assert_eq!(outcome.chain_status.len(), Chain::ALL.len());
    assert!(outcome.chain_status.values().all(|s| *s == ChainStatus::ok()));
    assert_eq!(table.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deposits_only_on_strict_increase() {
    let (a, b, c) = (eth_address(1), eth_address(2), eth_address(3));
    let table = Table::default()
        .with(&a, FetchResult::fresh(1500))
        .with(&b, FetchResult::fresh(1000))
        .with(&c, FetchResult::fresh(900));
    let refresher = refresher(Dispatcher::empty().with_fetcher(Chain::Eth, Arc::new(table)));

    let wallets = vec![
        Wallet::new(1, Chain::Eth, &a).with_raw_balance(1000),
        Wallet::new(2, Chain::Eth, &b).with_raw_balance(1000),
        Wallet::new(3, Chain::Eth, &c).with_raw_balance(1000),
    ];
    let outcome = refresher.refresh(wallets).await;

    assert_eq!(outcome.deposits.into_iter().collect::<Vec<_>>(), vec![1]);
    let balances: Vec<u128> = outcome.wallets.iter().map(|w| w.last_raw_balance).collect();
    assert_eq!(balances, vec![1500, 1000, 900]);
}

#[tokio::test]
async fn first_funding_from_zero_is_a_deposit() {
    let table = Table::default().with(TRX_ADDRESS, FetchResult::fresh(2_000_000));
    let refresher = refresher(Dispatcher::empty().with_fetcher(Chain::Trx, Arc::new(table)));

    let outcome = refresher.refresh(vec![Wallet::new(7, Chain::Trx, TRX_ADDRESS)]).await;

    assert!(outcome.deposits.contains(&7));
}

#[tokio::test]
async fn rate_limit_puts_chain_in_cooldown() {
    let eth = Table::default().with(ETH_ADDRESS, FetchResult::rate_limited(42));
    let btc = Table::default().with(BTC_ADDRESS, FetchResult::fresh(10));
    let refresher = refresher(
        Dispatcher::empty()
            .with_fetcher(Chain::Eth, Arc::new(eth))
            .with_fetcher(Chain::Btc, Arc::new(btc)),
    );

    let wallets = vec![
        Wallet::new(1, Chain::Eth, ETH_ADDRESS).with_raw_balance(42),
        Wallet::new(2, Chain::Btc, BTC_ADDRESS),
    ];
    let outcome = refresher.refresh(wallets).await;

    assert_eq!(outcome.chain_status[&Chain::Eth], ChainStatus::cooldown(8));
    assert_eq!(outcome.chain_status[&Chain::Btc].status, ChainState::Ok);
    assert_eq!(outcome.chain_status[&Chain::Btc].cooldown_remaining, 0);
    assert_eq!(outcome.cooled_down().collect::<Vec<_>>(), vec![Chain::Eth]);
    assert_eq!(outcome.wallets[0].last_raw_balance, 42);
}

#[tokio::test]
async fn cooldown_length_is_configurable() {
    let eth = Table::default().with(ETH_ADDRESS, FetchResult::rate_limited(0));
    let refresher = Refresher::new(
        Arc::new(Dispatcher::empty().with_fetcher(Chain::Eth, Arc::new(eth))),
        30,
    );

    let outcome = refresher.refresh(vec![Wallet::new(1, Chain::Eth, ETH_ADDRESS)]).await;

    assert_eq!(outcome.chain_status[&Chain::Eth], ChainStatus::cooldown(30));
}

#[tokio::test]
async fn panicking_fetch_keeps_previous_and_spares_others() {
    let btc = Table::default().with(BTC_ADDRESS, FetchResult::fresh(500));
    let refresher = refresher(
        Dispatcher::empty()
            .with_fetcher(Chain::Eth, Arc::new(Panics))
            .with_fetcher(Chain::Btc, Arc::new(btc)),
    );

    let wallets = vec![
        Wallet::new(1, Chain::Eth, ETH_ADDRESS).with_raw_balance(123),
        Wallet::new(2, Chain::Btc, BTC_ADDRESS).with_raw_balance(100),
    ];
    let outcome = refresher.refresh(wallets).await;

    assert_eq!(outcome.wallets[0].last_raw_balance, 123);
    assert_eq!(outcome.wallets[1].last_raw_balance, 500);
    assert_eq!(outcome.deposits.into_iter().collect::<Vec<_>>(), vec![2]);
    assert_eq!(outcome.chain_status[&Chain::Eth].status, ChainState::Ok);
}

#[tokio::test]
async fn wallets_are_fetched_concurrently() {
    let count = 5;
    let fetcher = Arc::new(Rendezvous(Barrier::new(count)));
    let refresher = refresher(Dispatcher::empty().with_fetcher(Chain::Eth, fetcher));

    let wallets: Vec<Wallet> = (1..=count as u8)
        .map(|n| Wallet::new(u64::from(n), Chain::Eth, eth_address(n)).with_raw_balance(u128::from(n)))
        .collect();

    // Sequential fetching would never get past the barrier
    let outcome = tokio::time::timeout(Duration::from_secs(5), refresher.refresh(wallets))
        .await
        .expect("refresh did not run wallets concurrently");

    assert_eq!(outcome.deposits.len(), count);
    for wallet in &outcome.wallets {
        assert_eq!(wallet.last_raw_balance, u128::from(wallet.id) + 1);
    }
}

#[tokio::test]
async fn wallet_without_fetcher_is_unchanged() {
    let refresher = refresher(Dispatcher::empty());

    let outcome = refresher
        .refresh(vec![Wallet::new(1, Chain::UsdtTrx, TRX_ADDRESS).with_raw_balance(55)])
        .await;

    assert_eq!(outcome.wallets[0].last_raw_balance, 55);
    assert!(outcome.deposits.is_empty());
}

#[tokio::test]
async fn refresh_store_persists_balances() {
    let dir = tempfile::tempdir().unwrap();
    let store = WalletStore::new(dir.path().join("wallets.json"));
    let wallet = store.add("eth", ETH_ADDRESS, "main", "").await.unwrap();

    let table = Table::default().with(ETH_ADDRESS, FetchResult::fresh(1_000_000_000_000_000_000));
    let refresher = refresher(Dispatcher::empty().with_fetcher(Chain::Eth, Arc::new(table)));

    let outcome = refresher.refresh_store(&store).await.unwrap();
    assert!(outcome.deposits.contains(&wallet.id));

    let stored = store.list().await.unwrap();
    assert_eq!(stored[0].last_raw_balance, 1_000_000_000_000_000_000);
    assert_eq!(stored[0].label, "main");
}

/// Adds a wallet to the store while the fetch is in flight
struct AddsDuringFetch {
    store: Arc<WalletStore>,
}

#[async_trait]
impl BalanceFetcher for AddsDuringFetch {
    async fn fetch_raw(&self, _address: &str, _previous: u128) -> FetchResult {
        self.store.add("trx", TRX_ADDRESS, "late", "").await.unwrap();
        FetchResult::fresh(77)
    }
}

#[tokio::test]
async fn refresh_store_keeps_wallets_added_mid_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(WalletStore::new(dir.path().join("wallets.json")));
    store.add("btc", BTC_ADDRESS, "", "").await.unwrap();

    let fetcher = Arc::new(AddsDuringFetch { store: store.clone() });
    let refresher = refresher(Dispatcher::empty().with_fetcher(Chain::Btc, fetcher));

    let outcome = refresher.refresh_store(&store).await.unwrap();

    let stored = store.list().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].last_raw_balance, 77);
    assert_eq!(stored[1].label, "late");
    assert_eq!(stored[1].last_raw_balance, 0);
    assert_eq!(outcome.wallets.len(), 2);
}

/// Replaces the wallet being fetched with a new one that reuses its id
struct ReplacesDuringFetch {
    store: Arc<WalletStore>,
}

#[async_trait]
impl BalanceFetcher for ReplacesDuringFetch {
    async fn fetch_raw(&self, _address: &str, _previous: u128) -> FetchResult {
        assert!(self.store.remove(1).await.unwrap());
        let replacement = self.store.add("trx", TRX_ADDRESS, "new", "").await.unwrap();
        assert_eq!(replacement.id, 1);
        FetchResult::fresh(5_000_000_000)
    }
}

#[tokio::test]
async fn refresh_store_ignores_reused_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(WalletStore::new(dir.path().join("wallets.json")));
    store.add("btc", BTC_ADDRESS, "old", "").await.unwrap();

    let fetcher = Arc::new(ReplacesDuringFetch { store: store.clone() });
    let refresher = refresher(Dispatcher::empty().with_fetcher(Chain::Btc, fetcher));

    let outcome = refresher.refresh_store(&store).await.unwrap();

    let stored = store.list().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].chain, Chain::Trx);
    assert_eq!(stored[0].label, "new");
    assert_eq!(stored[0].last_raw_balance, 0);
    assert!(outcome.deposits.is_empty());
    assert_eq!(outcome.wallets, stored);
}
