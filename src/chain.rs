//! Canonical chain codes, chain-token normalization and address format checks
//!
//! User input names chains loosely ("usdc", "ERC20-USDT", "tron"). Everything
//! past this module works with [`Chain`], so a wallet's chain is always one of
//! the six supported codes and its address has already passed
//! [`validate_address`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// USDT (ERC-20) contract on Ethereum mainnet
pub const ETH_USDT_CONTRACT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
/// USDC (ERC-20) contract on Ethereum mainnet
pub const ETH_USDC_CONTRACT: &str = "0xA0b86991C6218b36c1d19D4a2e9Eb0cE3606EB48";
/// USDT (TRC-20) contract on Tron mainnet
pub const TRX_USDT_CONTRACT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// Canonical chain codes tracked by the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "TRX")]
    Trx,
    #[serde(rename = "USDT_TRX")]
    UsdtTrx,
    #[serde(rename = "USDT_ETH")]
    UsdtEth,
    #[serde(rename = "USDC_ETH")]
    UsdcEth,
}

impl Chain {
    /// Every supported chain, in display order
    pub const ALL: [Chain; 6] = [
        Chain::Btc,
        Chain::Eth,
        Chain::Trx,
        Chain::UsdtTrx,
        Chain::UsdtEth,
        Chain::UsdcEth,
    ];

    /// Canonical code, e.g. `USDT_TRX`
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Chain::Btc => "BTC",
            Chain::Eth => "ETH",
            Chain::Trx => "TRX",
            Chain::UsdtTrx => "USDT_TRX",
            Chain::UsdtEth => "USDT_ETH",
            Chain::UsdcEth => "USDC_ETH",
        }
    }

    /// Number of decimals between the raw on-chain unit and one coin
    #[must_use]
    pub fn decimals(self) -> u32 {
        match self {
            Chain::Btc => 8,
            Chain::Eth => 18,
            Chain::Trx | Chain::UsdtTrx | Chain::UsdtEth | Chain::UsdcEth => 6,
        }
    }

    /// Token contract for token chains, `None` for native coins
    #[must_use]
    pub fn contract(self) -> Option<&'static str> {
        match self {
            Chain::UsdtTrx => Some(TRX_USDT_CONTRACT),
            Chain::UsdtEth => Some(ETH_USDT_CONTRACT),
            Chain::UsdcEth => Some(ETH_USDC_CONTRACT),
            Chain::Btc | Chain::Eth | Chain::Trx => None,
        }
    }

    /// Symbol used to look up the USD price
    #[must_use]
    pub fn price_symbol(self) -> &'static str {
        match self {
            Chain::Btc => "BTC",
            Chain::Eth => "ETH",
            Chain::Trx => "TRX",
            Chain::UsdtTrx | Chain::UsdtEth => "USDT",
            Chain::UsdcEth => "USDC",
        }
    }

    /// Stablecoins are priced at 1.0 when the feed is unavailable
    #[must_use]
    pub fn is_stablecoin(self) -> bool {
        self.contract().is_some()
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Strict membership check against the canonical codes.
///
/// Use [`parse_chain`] for free-form user input.
impl FromStr for Chain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Chain::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| Error::UnsupportedChain(s.to_string()))
    }
}

/// Shorthand tokens and their canonical code.
///
/// A bare `USDT` resolves to the Ethereum-network token, not Tron. This is a
/// product decision kept as-is; users holding TRC-20 USDT must say so
/// (`USDT_TRX`, `TRC20_USDT`, ...).
const ALIASES: &[(&str, &str)] = &[
    ("BITCOIN", "BTC"),
    ("XBT", "BTC"),
    ("ETHEREUM", "ETH"),
    ("TRON", "TRX"),
    ("USDT", "USDT_ETH"),
    ("USDC", "USDC_ETH"),
    ("ERC20_USDT", "USDT_ETH"),
    ("USDT_ERC20", "USDT_ETH"),
    ("ERC20_USDC", "USDC_ETH"),
    ("USDC_ERC20", "USDC_ETH"),
    ("TRC20_USDT", "USDT_TRX"),
    ("USDT_TRC20", "USDT_TRX"),
    ("USDT_TRON", "USDT_TRX"),
];

/// Map a free-form chain token onto a canonical code.
///
/// Uppercases the token and collapses runs of spaces, hyphens and underscores
/// into a single `_`. Known aliases resolve to their canonical code; anything
/// else comes back in that cleaned-up form so callers can still display it.
/// The result is not guaranteed to be a supported chain: follow up with
/// [`Chain::from_str`] or use [`parse_chain`].
#[must_use]
pub fn normalize(token: &str) -> String {
    let mut cleaned = String::with_capacity(token.len());
    let mut pending_sep = false;
    for ch in token.trim().chars() {
        if matches!(ch, ' ' | '-' | '_') || ch.is_whitespace() {
            pending_sep = !cleaned.is_empty();
            continue;
        }
        if pending_sep {
            cleaned.push('_');
            pending_sep = false;
        }
        cleaned.extend(ch.to_uppercase());
    }

    ALIASES
        .iter()
        .find(|(alias, _)| *alias == cleaned)
        .map_or(cleaned, |(_, code)| (*code).to_string())
}

/// Normalize a chain token and require it to be a supported chain
pub fn parse_chain(token: &str) -> Result<Chain> {
    normalize(token)
        .parse()
        .map_err(|_| Error::UnsupportedChain(token.trim().to_string()))
}

/// Check that an address has the shape expected for `chain`.
///
/// Format only: nothing here touches the network or proves the address exists.
pub fn validate_address(chain: Chain, address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(Error::invalid_address(chain, "address cannot be empty"));
    }

    match chain {
        Chain::Btc => validate_btc(address),
        Chain::Eth | Chain::UsdtEth | Chain::UsdcEth => validate_evm(chain, address),
        Chain::Trx | Chain::UsdtTrx => validate_tron(chain, address),
    }
}

/// Parse a chain token, trim the address and validate both.
///
/// This is the creation-time gate: it returns the canonical chain and the
/// address exactly as it should be stored.
pub fn validate(token: &str, address: &str) -> Result<(Chain, String)> {
    let chain = parse_chain(token)?;
    let address = address.trim();
    validate_address(chain, address)?;
    Ok((chain, address.to_string()))
}

fn validate_btc(address: &str) -> Result<()> {
    if address.len() < 26 || address.len() > 62 {
        return Err(Error::invalid_address(
            Chain::Btc,
            "length must be between 26 and 62 characters",
        ));
    }

    if !address.starts_with('1') && !address.starts_with('3') && !address.starts_with("bc1") {
        return Err(Error::invalid_address(
            Chain::Btc,
            "must start with 1, 3, or bc1",
        ));
    }

    Ok(())
}

fn validate_evm(chain: Chain, address: &str) -> Result<()> {
    if !address.starts_with("0x") {
        return Err(Error::invalid_address(chain, "must start with 0x"));
    }

    if address.len() != 42 {
        return Err(Error::invalid_address(
            chain,
            "expected 42 characters (0x + 40 hex)",
        ));
    }

    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::invalid_address(chain, "contains non-hex characters"));
    }

    Ok(())
}

fn validate_tron(chain: Chain, address: &str) -> Result<()> {
    if !address.starts_with('T') {
        return Err(Error::invalid_address(chain, "must start with T"));
    }

    if address.len() < 26 || address.len() > 36 {
        return Err(Error::invalid_address(
            chain,
            "length must be between 26 and 36 characters",
        ));
    }

    Ok(())
}
