//! JSON-file wallet store
//!
//! The whole list is loaded and saved in one piece. Every read-modify-write
//! happens under [`WalletStore::lock`], so concurrent edits and refresh
//! cycles never lose each other's updates.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::chain;
use crate::error::{Error, Result};
use crate::wallet::Wallet;

/// Wallet list persisted as a pretty-printed JSON array
pub struct WalletStore {
    path: PathBuf,
    lock: Mutex<()>,
}

/// Exclusive access to the store; released on drop
pub struct StoreGuard<'a> {
    path: &'a Path,
    _guard: MutexGuard<'a, ()>,
}

impl WalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire exclusive access for a load-modify-save sequence
    pub async fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            path: &self.path,
            _guard: self.lock.lock().await,
        }
    }

    pub async fn list(&self) -> Result<Vec<Wallet>> {
        self.lock().await.load().await
    }

    /// Validate and append a new wallet with the next free id
    pub async fn add(&self, chain_token: &str, address: &str, label: &str, notes: &str) -> Result<Wallet> {
        let (chain, address) = chain::validate(chain_token, address)?;

        let guard = self.lock().await;
        let mut wallets = guard.load().await?;
        let wallet = Wallet::new(next_id(&wallets), chain, address)
            .with_label(label.trim())
            .with_notes(notes.trim());
        wallets.push(wallet.clone());
        guard.save(&wallets).await?;

        debug!(wallet_id = wallet.id, chain = %wallet.chain, "Wallet added");
        Ok(wallet)
    }

    /// Bulk import, one `address[,label]` per line.
    ///
    /// Blank lines are skipped. One bad address rejects the whole batch.
    pub async fn import(&self, chain_token: &str, lines: &str) -> Result<Vec<Wallet>> {
        let chain = chain::parse_chain(chain_token)?;

        let mut parsed = Vec::new();
        for (idx, line) in lines.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (address, label) = match line.split_once(',') {
                Some((address, label)) => (address.trim(), label.trim()),
                None => (line, ""),
            };
            if address.is_empty() {
                continue;
            }
            chain::validate_address(chain, address).map_err(|e| Error::InvalidImportLine {
                line: idx + 1,
                source: Box::new(e),
            })?;
            parsed.push((address.to_string(), label.to_string()));
        }

        let guard = self.lock().await;
        let mut wallets = guard.load().await?;
        let mut id = next_id(&wallets);
        let mut created = Vec::with_capacity(parsed.len());
        for (address, label) in parsed {
            let wallet = Wallet::new(id, chain, address).with_label(label);
            id += 1;
            wallets.push(wallet.clone());
            created.push(wallet);
        }
        guard.save(&wallets).await?;

        debug!(count = created.len(), chain = %chain, "Wallets imported");
        Ok(created)
    }

    /// Change label and/or notes; chain and address are immutable
    pub async fn update(&self, id: u64, label: Option<&str>, notes: Option<&str>) -> Result<Wallet> {
        let guard = self.lock().await;
        let mut wallets = guard.load().await?;
        let wallet = wallets
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(Error::WalletNotFound(id))?;

        if let Some(label) = label {
            wallet.label = label.to_string();
        }
        if let Some(notes) = notes {
            wallet.notes = notes.to_string();
        }
        let updated = wallet.clone();
        guard.save(&wallets).await?;
        Ok(updated)
    }

    /// Delete one wallet. Returns whether it existed.
    pub async fn remove(&self, id: u64) -> Result<bool> {
        let guard = self.lock().await;
        let mut wallets = guard.load().await?;
        let before = wallets.len();
        wallets.retain(|w| w.id != id);
        let removed = wallets.len() != before;
        guard.save(&wallets).await?;
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        self.lock().await.save(&[]).await
    }
}

impl StoreGuard<'_> {
    /// Read the full wallet list.
    ///
    /// A missing or blank file is an empty list. Rows that no longer parse
    /// (for example an unknown chain code) are skipped with a warning.
    pub async fn load(&self) -> Result<Vec<Wallet>> {
        let raw = match fs::read_to_string(self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Value> = serde_json::from_str(&raw)?;
        let wallets = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Wallet>(row) {
                Ok(wallet) => Some(wallet),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping unreadable wallet row");
                    None
                }
            })
            .collect();
        Ok(wallets)
    }

    /// Replace the full wallet list on disk
    pub async fn save(&self, wallets: &[Wallet]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(wallets)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, self.path).await?;
        Ok(())
    }
}

fn next_id(wallets: &[Wallet]) -> u64 {
    wallets.iter().map(|w| w.id).max().unwrap_or(0) + 1
}
