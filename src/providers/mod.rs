//! Balance providers and the ordered fallback chains built from them
//!
//! A [`BalanceSource`] is one upstream API answering "what is the raw balance
//! of this address". A [`ProviderChain`] owns an ordered list of sources for
//! one canonical chain, runs each through [`with_retry`], and collapses every
//! outcome into a [`FetchResult`]. Nothing fallible escapes a chain: the worst
//! case is the previous balance coming back unchanged.

pub mod blockcypher;
pub mod btc;
pub mod eth;
pub mod tron;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::chain::Chain;
use crate::error::FetchError;
use crate::retry::{with_retry, RetryPolicy};

/// Raw balance observed for one wallet in one refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    pub raw_balance: u128,
    /// Set only together with `raw_balance == previous`
    pub rate_limited: bool,
}

impl FetchResult {
    /// A balance read from an upstream provider
    #[must_use]
    pub fn fresh(raw_balance: u128) -> Self {
        Self {
            raw_balance,
            rate_limited: false,
        }
    }

    /// Nothing usable came back; keep the last known value
    #[must_use]
    pub fn unchanged(previous: u128) -> Self {
        Self {
            raw_balance: previous,
            rate_limited: false,
        }
    }

    /// Throttled upstream; keep the last known value and raise the flag
    #[must_use]
    pub fn rate_limited(previous: u128) -> Self {
        Self {
            raw_balance: previous,
            rate_limited: true,
        }
    }
}

/// One upstream API able to report a raw balance
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Single request, no retries
    async fn fetch(&self, address: &str) -> Result<u128, FetchError>;
}

/// Anything that turns `(address, previous)` into a [`FetchResult`]
/// without failing
#[async_trait]
pub trait BalanceFetcher: Send + Sync {
    async fn fetch_raw(&self, address: &str, previous: u128) -> FetchResult;
}

/// Ordered provider sequence for one canonical chain.
///
/// Primaries are tried first, in order. Fallbacks are only consulted when no
/// primary produced a balance.
pub struct ProviderChain {
    chain: Chain,
    primaries: Vec<Box<dyn BalanceSource>>,
    fallbacks: Vec<Box<dyn BalanceSource>>,
    retry: RetryPolicy,
    stop_on_rate_limit: bool,
    probe_until_changed: bool,
}

impl ProviderChain {
    pub fn new(chain: Chain, retry: RetryPolicy) -> Self {
        Self {
            chain,
            primaries: Vec::new(),
            fallbacks: Vec::new(),
            retry,
            stop_on_rate_limit: false,
            probe_until_changed: false,
        }
    }

    #[must_use]
    pub fn primary(mut self, source: impl BalanceSource + 'static) -> Self {
        self.primaries.push(Box::new(source));
        self
    }

    #[must_use]
    pub fn fallback(mut self, source: impl BalanceSource + 'static) -> Self {
        self.fallbacks.push(Box::new(source));
        self
    }

    /// A 429 from any provider ends the sequence immediately.
    ///
    /// Used where all providers sit behind the same upstream throttle.
    #[must_use]
    pub fn stop_on_rate_limit(mut self) -> Self {
        self.stop_on_rate_limit = true;
        self
    }

    /// Keep asking primaries while they agree with the previous value.
    ///
    /// Public RPC nodes lag each other; a second opinion is cheap when the
    /// first answer shows no movement.
    #[must_use]
    pub fn probe_until_changed(mut self) -> Self {
        self.probe_until_changed = true;
        self
    }

    #[must_use]
    pub fn chain(&self) -> Chain {
        self.chain
    }

    async fn attempt(&self, source: &dyn BalanceSource, address: &str) -> Result<u128, FetchError> {
        with_retry(&self.retry, source.name(), || source.fetch(address)).await
    }
}

#[async_trait]
impl BalanceFetcher for ProviderChain {
    async fn fetch_raw(&self, address: &str, previous: u128) -> FetchResult {
        let mut rate_limited = false;
        let mut settled = None;

        for source in &self.primaries {
            match self.attempt(source.as_ref(), address).await {
                Ok(raw) if self.probe_until_changed && raw == previous => {
                    debug!(chain = %self.chain, provider = source.name(), address, "No change, probing next provider");
                    settled = Some(raw);
                }
                Ok(raw) => return FetchResult::fresh(raw),
                Err(FetchError::RateLimited) => {
                    warn!(chain = %self.chain, provider = source.name(), address, "Rate limited");
                    if self.stop_on_rate_limit {
                        return FetchResult::rate_limited(previous);
                    }
                    rate_limited = true;
                }
                Err(e) => {
                    warn!(chain = %self.chain, provider = source.name(), address, error = %e, "Provider failed");
                }
            }
        }

        if let Some(raw) = settled {
            return FetchResult::fresh(raw);
        }

        for source in &self.fallbacks {
            debug!(chain = %self.chain, provider = source.name(), address, "Trying fallback provider");
            match self.attempt(source.as_ref(), address).await {
                Ok(raw) => return FetchResult::fresh(raw),
                Err(FetchError::RateLimited) => {
                    warn!(chain = %self.chain, provider = source.name(), address, "Rate limited");
                    if self.stop_on_rate_limit {
                        return FetchResult::rate_limited(previous);
                    }
                    rate_limited = true;
                }
                Err(e) => {
                    warn!(chain = %self.chain, provider = source.name(), address, error = %e, "Fallback provider failed");
                }
            }
        }

        if rate_limited {
            FetchResult::rate_limited(previous)
        } else {
            warn!(chain = %self.chain, address, "All providers exhausted, keeping previous balance");
            FetchResult::unchanged(previous)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Scripted {
        name: &'static str,
        outcome: fn() -> Result<u128, FetchError>,
        calls: Arc<AtomicU32>,
    }

    impl Scripted {
        fn new(name: &'static str, outcome: fn() -> Result<u128, FetchError>) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    name,
                    outcome,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl BalanceSource for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _address: &str) -> Result<u128, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn rate_limit_falls_through_to_fallback() {
        let (primary, primary_calls) = Scripted::new("p", || Err(FetchError::RateLimited));
        let (fallback, fallback_calls) = Scripted::new("f", || Err(FetchError::decode("bad")));
        let chain = ProviderChain::new(Chain::Btc, retry()).primary(primary).fallback(fallback);

        assert_eq!(chain.fetch_raw("addr", 999).await, FetchResult::rate_limited(999));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stop_on_rate_limit_skips_remaining() {
        let (first, _) = Scripted::new("rpc1", || Err(FetchError::RateLimited));
        let (second, second_calls) = Scripted::new("rpc2", || Ok(5));
        let chain = ProviderChain::new(Chain::Eth, retry())
            .primary(first)
            .primary(second)
            .stop_on_rate_limit();

        assert_eq!(chain.fetch_raw("addr", 42).await, FetchResult::rate_limited(42));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn probing_stops_at_first_changed_value() {
        let (first, _) = Scripted::new("rpc1", || Ok(10));
        let (second, _) = Scripted::new("rpc2", || Ok(25));
        let (third, third_calls) = Scripted::new("rpc3", || Ok(30));
        let chain = ProviderChain::new(Chain::Eth, retry())
            .primary(first)
            .primary(second)
            .primary(third)
            .probe_until_changed();

        assert_eq!(chain.fetch_raw("addr", 10).await, FetchResult::fresh(25));
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn agreeing_primaries_skip_last_resort() {
        let (first, _) = Scripted::new("rpc1", || Ok(10));
        let (explorer, explorer_calls) = Scripted::new("explorer", || Ok(99));
        let chain = ProviderChain::new(Chain::Eth, retry())
            .primary(first)
            .fallback(explorer)
            .probe_until_changed();

        assert_eq!(chain.fetch_raw("addr", 10).await, FetchResult::fresh(10));
        assert_eq!(explorer_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_keeps_previous() {
        let (primary, _) = Scripted::new("p", || Err(FetchError::decode("bad")));
        let chain = ProviderChain::new(Chain::UsdtEth, retry()).primary(primary);

        assert_eq!(chain.fetch_raw("addr", 1234).await, FetchResult::unchanged(1234));
    }
}
