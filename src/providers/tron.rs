//! Tron balance providers (native TRX and TRC-20 tokens)
//!
//! Both providers answer from an account record. An address that was never
//! funded has no record at all, which reads as a zero balance.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;

use crate::amount::RawAmount;
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::providers::BalanceSource;

const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// What to read out of the account record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TronAsset {
    /// Native balance in sun
    Native,
    /// TRC-20 token matched by contract address
    Trc20(String),
}

fn with_api_key(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.header(API_KEY_HEADER, key),
        None => request,
    }
}

/// TronGrid `/v1/accounts/{address}` response
#[derive(Debug, Deserialize)]
struct TronGridAccounts {
    data: Vec<TronGridAccount>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TronGridAccount {
    balance: Option<RawAmount>,
    /// Each entry is a single `{contract: balance}` pair
    trc20: Vec<HashMap<String, RawAmount>>,
}

impl TronGridAccounts {
    fn balance_of(&self, asset: &TronAsset) -> u128 {
        let Some(account) = self.data.first() else {
            return 0;
        };
        match asset {
            TronAsset::Native => account.balance.map_or(0, |b| b.0),
            TronAsset::Trc20(contract) => account
                .trc20
                .iter()
                .find_map(|entry| entry.get(contract))
                .map_or(0, |b| b.0),
        }
    }
}

/// Primary: TronGrid account lookup
pub struct TronGrid {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    asset: TronAsset,
}

impl TronGrid {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        api_key: Option<String>,
        asset: TronAsset,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            asset,
        }
    }
}

#[async_trait]
impl BalanceSource for TronGrid {
    fn name(&self) -> &str {
        "trongrid"
    }

    async fn fetch(&self, address: &str) -> Result<u128, FetchError> {
        let url = format!("{}/v1/accounts/{}", self.base_url, address);
        let request = with_api_key(self.http.get(&url), self.api_key.as_deref());
        let accounts: TronGridAccounts = self.http.send_json(request).await?;
        Ok(accounts.balance_of(&self.asset))
    }
}

/// Tronscan `/api/accountv2` response.
///
/// Seen both flat and wrapped in a `data` list depending on deployment. A
/// flat record must carry `address` or `balance` to count as an account;
/// error bodies like `{"Error": "..."}` are not balances.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TronscanAccount {
    address: Option<String>,
    balance: Option<RawAmount>,
    data: Option<Vec<TronscanAccount>>,
    #[serde(rename = "withPriceTokens", alias = "trc20token_balances")]
    tokens: Vec<TronscanToken>,
}

#[derive(Debug, Deserialize)]
struct TronscanToken {
    #[serde(rename = "tokenId")]
    token_id: String,
    #[serde(default)]
    balance: Option<RawAmount>,
}

impl TronscanAccount {
    fn is_account(&self) -> bool {
        self.address.is_some() || self.balance.is_some()
    }

    fn balance_of(&self, asset: &TronAsset) -> Result<u128, FetchError> {
        let account = match &self.data {
            // An empty `data` list is the never-funded account
            Some(records) => match records.first() {
                Some(record) => record,
                None => return Ok(0),
            },
            None => self,
        };
        if !account.is_account() {
            return Err(FetchError::decode("tronscan response is not an account record"));
        }

        let raw = match asset {
            TronAsset::Native => account.balance.map_or(0, |b| b.0),
            TronAsset::Trc20(contract) => account
                .tokens
                .iter()
                .find(|t| &t.token_id == contract)
                .and_then(|t| t.balance)
                .map_or(0, |b| b.0),
        };
        Ok(raw)
    }
}

/// Fallback: Tronscan account lookup with its own token list shape
pub struct Tronscan {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    asset: TronAsset,
}

impl Tronscan {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        api_key: Option<String>,
        asset: TronAsset,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            asset,
        }
    }
}

#[async_trait]
impl BalanceSource for Tronscan {
    fn name(&self) -> &str {
        "tronscan"
    }

    async fn fetch(&self, address: &str) -> Result<u128, FetchError> {
        let url = format!("{}/api/accountv2", self.base_url);
        let request = self.http.get(&url).query(&[("address", address)]);
        let request = with_api_key(request, self.api_key.as_deref());
        let account: TronscanAccount = self.http.send_json(request).await?;
        account.balance_of(&self.asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    #[test]
    fn trongrid_empty_data_is_zero() {
        let accounts: TronGridAccounts = serde_json::from_str(r#"{"data":[],"success":true}"#).unwrap();
        assert_eq!(accounts.balance_of(&TronAsset::Native), 0);
        assert_eq!(accounts.balance_of(&TronAsset::Trc20(USDT.into())), 0);
    }

    #[test]
    fn trongrid_missing_data_is_malformed() {
        assert!(serde_json::from_str::<TronGridAccounts>(r#"{"err":"x"}"#).is_err());
    }

    #[test]
    fn trongrid_reads_trc20_map() {
        let accounts: TronGridAccounts = serde_json::from_str(&format!(
            r#"{{"data":[{{"balance":5,"trc20":[{{"TOther":"1"}},{{"{USDT}":"2500000"}}]}}]}}"#
        ))
        .unwrap();
        assert_eq!(accounts.balance_of(&TronAsset::Native), 5);
        assert_eq!(accounts.balance_of(&TronAsset::Trc20(USDT.into())), 2_500_000);
    }

    #[test]
    fn tronscan_accepts_flat_and_wrapped() {
        let flat: TronscanAccount = serde_json::from_str(&format!(
            r#"{{"balance":700,"withPriceTokens":[{{"tokenId":"_","balance":"700"}},{{"tokenId":"{USDT}","balance":"42"}}]}}"#
        ))
        .unwrap();
        assert_eq!(flat.balance_of(&TronAsset::Native).unwrap(), 700);
        assert_eq!(flat.balance_of(&TronAsset::Trc20(USDT.into())).unwrap(), 42);

        let wrapped: TronscanAccount = serde_json::from_str(r#"{"data":[{"balance":1500000}]}"#).unwrap();
        assert_eq!(wrapped.balance_of(&TronAsset::Native).unwrap(), 1_500_000);
    }

    #[test]
    fn tronscan_empty_account_is_zero() {
        let unfunded: TronscanAccount = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert_eq!(unfunded.balance_of(&TronAsset::Native).unwrap(), 0);

        let inactive: TronscanAccount =
            serde_json::from_str(r#"{"address":"TQ5Siy2Pq7p4LK2G3i7peoNwKq6N9GQaeV"}"#).unwrap();
        assert_eq!(inactive.balance_of(&TronAsset::Trc20(USDT.into())).unwrap(), 0);
    }

    #[test]
    fn tronscan_rejects_non_account_bodies() {
        for body in ["{}", r#"{"Error":"request rate exceeded"}"#, "[]", r#"{"data":[{}]}"#] {
            let decoded = serde_json::from_str::<TronscanAccount>(body)
                .map_err(|e| FetchError::decode(e.to_string()))
                .and_then(|account| account.balance_of(&TronAsset::Native));
            assert!(decoded.is_err(), "{body} should not decode as a balance");
        }
    }
}
