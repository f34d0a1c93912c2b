//! Ethereum balance providers over public JSON-RPC endpoints

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::amount::parse_hex_quantity;
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::providers::BalanceSource;

/// `balanceOf(address)` selector
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: &'static str,
    params: Vec<serde_json::Value>,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<String>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

async fn rpc_call(
    http: &HttpClient,
    url: &str,
    method: &'static str,
    params: Vec<serde_json::Value>,
) -> Result<String, FetchError> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0",
        method,
        params,
        id: 1,
    };

    let response: JsonRpcResponse = http.send_json(http.post(url).json(&request)).await?;

    if let Some(error) = response.error {
        return Err(FetchError::decode(format!(
            "RPC error {}: {}",
            error.code, error.message
        )));
    }

    response
        .result
        .ok_or_else(|| FetchError::decode("No result in RPC response"))
}

/// Native ETH via `eth_getBalance` on one RPC endpoint
pub struct RpcBalance {
    http: HttpClient,
    url: String,
}

impl RpcBalance {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl BalanceSource for RpcBalance {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, address: &str) -> Result<u128, FetchError> {
        let result = rpc_call(
            &self.http,
            &self.url,
            "eth_getBalance",
            vec![json!(address), json!("latest")],
        )
        .await?;
        parse_quantity(&result)
    }
}

/// ERC-20 balance via a simulated `balanceOf` call on one RPC endpoint
pub struct Erc20Balance {
    http: HttpClient,
    url: String,
    contract: String,
}

impl Erc20Balance {
    pub fn new(http: HttpClient, url: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            contract: contract.into(),
        }
    }
}

#[async_trait]
impl BalanceSource for Erc20Balance {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, address: &str) -> Result<u128, FetchError> {
        let data = balance_of_calldata(address)?;
        let result = rpc_call(
            &self.http,
            &self.url,
            "eth_call",
            vec![json!({ "to": self.contract, "data": data }), json!("latest")],
        )
        .await?;
        parse_word(&result)
    }
}

/// `0x`-prefixed quantity (`eth_getBalance` result) to `u128`
fn parse_quantity(value: &str) -> Result<u128, FetchError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| FetchError::decode(format!("not a hex quantity: {value}")))?;
    parse_hex_quantity(digits).ok_or_else(|| FetchError::decode(format!("bad hex quantity: {value}")))
}

/// ABI-encoded `uint256` return word to `u128`
fn parse_word(value: &str) -> Result<u128, FetchError> {
    let bytes = hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| FetchError::decode(format!("bad call result: {e}")))?;
    if bytes.len() != 32 {
        return Err(FetchError::decode(format!(
            "expected 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    let (high, low) = bytes.split_at(16);
    if high.iter().any(|b| *b != 0) {
        return Err(FetchError::decode("token balance exceeds u128"));
    }
    let mut word = [0u8; 16];
    word.copy_from_slice(low);
    Ok(u128::from_be_bytes(word))
}

/// `balanceOf(holder)` call data: selector followed by the address left-padded to 32 bytes
fn balance_of_calldata(holder: &str) -> Result<String, FetchError> {
    let address = hex::decode(holder.trim_start_matches("0x"))
        .map_err(|e| FetchError::decode(format!("bad holder address: {e}")))?;
    if address.len() != 20 {
        return Err(FetchError::decode("holder address must be 20 bytes"));
    }

    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&address);
    Ok(format!("0x{}", hex::encode(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_parses_hex() {
        assert_eq!(parse_quantity("0x16345785d8a0000").unwrap(), 100_000_000_000_000_000);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("1234").is_err());
        assert!(parse_quantity("0x").is_err());
    }

    #[test]
    fn calldata_pads_holder() {
        let data = balance_of_calldata("0x000000000000000000000000000000000000dEaD").unwrap();
        assert_eq!(
            data,
            "0x70a08231000000000000000000000000000000000000000000000000000000000000dead"
        );
    }

    #[test]
    fn word_decodes_low_half() {
        let word = format!("0x{:064x}", 2_500_000u64);
        assert_eq!(parse_word(&word).unwrap(), 2_500_000);
        assert!(parse_word("0x").is_err());
        assert!(parse_word(&format!("0x1{}", "0".repeat(63))).is_err());
    }
}
