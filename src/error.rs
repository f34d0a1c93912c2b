//! Error types for the watcher

use std::io;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the library
#[derive(Error, Debug)]
pub enum Error {
    /// Chain token does not normalize to a supported chain
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Address does not match the chain's format
    #[error("Invalid {chain} address: {reason}")]
    InvalidAddress {
        /// Canonical chain code
        chain: String,
        /// Human readable reason
        reason: String,
    },

    /// No wallet with this id
    #[error("Wallet not found: {0}")]
    WalletNotFound(u64),

    /// Bulk import line rejected
    #[error("Import line {line}: {source}")]
    InvalidImportLine {
        /// 1-based line number
        line: usize,
        /// Underlying format error
        #[source]
        source: Box<Error>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_address(chain: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            chain: chain.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this is a format error (bad chain or address)
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        match self {
            Self::UnsupportedChain(_) | Self::InvalidAddress { .. } => true,
            Self::InvalidImportLine { source, .. } => source.is_format_error(),
            _ => false,
        }
    }
}

/// Outcome of a single failed provider call.
///
/// Never leaves the fetcher layer: provider chains fold it into a `FetchResult`.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Upstream answered 429 Too Many Requests
    #[error("rate limited")]
    RateLimited,

    /// Non-2xx status other than 429
    #[error("unexpected status {0}")]
    Status(StatusCode),

    /// Connection failure, timeout, unreadable body
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body could not be decoded into a balance
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Rate limits are a signal, not a fault; everything else is retried
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::RateLimited)
    }
}
