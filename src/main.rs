//! Crypto Watcher CLI
//!
//! Command-line tool to track wallet balances across BTC, ETH, TRX and their stablecoins

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crypto_watcher::{
    chain, normalize, parse_chain,
    portfolio::{value_wallets, Portfolio},
    price::{PriceFeed, Prices},
    http::HttpClient,
    setup_tracing, Config, Dispatcher, RefreshOutcome, Refresher, WalletStore,
};

#[derive(Parser)]
#[command(name = "crypto-watcher")]
#[command(version, about = "Track cryptocurrency wallet balances", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CRYPTO_WATCHER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Wallet list file (overrides config)
    #[arg(short, long, env = "CRYPTO_WATCHER_WALLETS", global = true)]
    wallets: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "CRYPTO_WATCHER_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CRYPTO_WATCHER_LOG_FORMAT", global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a wallet
    Add {
        /// Chain or token (btc, eth, trx, usdt_trx, usdt_eth, usdc_eth, ...)
        #[arg(short = 'n', long)]
        chain: String,
        #[arg(short, long)]
        address: String,
        #[arg(short, long, default_value = "")]
        label: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Import wallets from a file with one `address[,label]` per line
    Import {
        #[arg(short = 'n', long)]
        chain: String,
        file: PathBuf,
    },
    /// List wallets with their last known balances
    List {
        /// Fetch USD prices for the listing
        #[arg(long)]
        prices: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Change a wallet's label or notes
    Edit {
        id: u64,
        #[arg(short, long)]
        label: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove a wallet
    Remove { id: u64 },
    /// Remove every wallet
    Clear,
    /// Refresh all balances once
    Check {
        #[arg(long)]
        json: bool,
    },
    /// Refresh balances periodically until interrupted
    Watch {
        /// Seconds between refresh cycles
        #[arg(short, long, default_value_t = 60)]
        interval: u64,
    },
    /// Check an address format without touching the network
    Validate {
        #[arg(short = 'n', long)]
        chain: String,
        #[arg(short, long)]
        address: String,
    },
    /// Show the canonical code for a chain token
    Normalize { token: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        config: config_path,
        wallets: wallets_path,
        command,
        ..
    } = cli;
    let open = || open_store(config_path.as_deref(), wallets_path.clone());

    match command {
        Command::Validate { chain, address } => return Ok(run_validate(&chain, &address)),
        Command::Normalize { token } => run_normalize(&token),
        Command::Add { chain, address, label, notes } => {
            let (_, store) = open()?;
            let wallet = store.add(&chain, &address, &label, &notes).await?;
            println!("✅ Added wallet #{} ({} {})", wallet.id, wallet.chain, wallet.address);
        }
        Command::Import { chain, file } => {
            let (_, store) = open()?;
            let lines = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let created = store.import(&chain, &lines).await?;
            println!("✅ Imported {} wallet(s)", created.len());
        }
        Command::List { prices, json } => {
            let (config, store) = open()?;
            let wallets = store.list().await?;
            let usd = if prices {
                price_feed(&config)?.fetch_usd_prices().await
            } else {
                Prices::defaults()
            };
            let portfolio = value_wallets(&wallets, &usd);
            if json {
                println!("{}", serde_json::to_string_pretty(&portfolio)?);
            } else {
                print_portfolio(&portfolio);
            }
        }
        Command::Edit { id, label, notes } => {
            let (_, store) = open()?;
            let wallet = store.update(id, label.as_deref(), notes.as_deref()).await?;
            println!("✅ Updated wallet #{}", wallet.id);
        }
        Command::Remove { id } => {
            let (_, store) = open()?;
            if store.remove(id).await? {
                println!("✅ Removed wallet #{id}");
            } else {
                println!("Wallet #{id} not found");
            }
        }
        Command::Clear => {
            let (_, store) = open()?;
            store.clear().await?;
            println!("✅ All wallets removed");
        }
        Command::Check { json } => {
            let (config, store) = open()?;
            let (refresher, feed) = services(&config)?;
            let outcome = refresher.refresh_store(&store).await?;
            let prices = feed.fetch_usd_prices().await;
            let portfolio = value_wallets(&outcome.wallets, &prices);
            if json {
                let report = serde_json::json!({
                    "wallets": portfolio.wallets,
                    "total_usd": portfolio.total_usd,
                    "usd_prices": portfolio.usd_prices,
                    "deposits": outcome.deposits,
                    "chain_status": outcome.chain_status,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_portfolio(&portfolio);
                print_cycle(&outcome);
            }
        }
        Command::Watch { interval } => {
            let (config, store) = open()?;
            let (refresher, feed) = services(&config)?;
            run_watch(&refresher, &feed, &store, Duration::from_secs(interval.max(1))).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open_store(config_path: Option<&Path>, wallets_path: Option<PathBuf>) -> Result<(Config, WalletStore)> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    if let Some(path) = wallets_path {
        config.wallets_file = path;
    }
    let store = WalletStore::new(&config.wallets_file);
    Ok((config, store))
}

fn run_validate(chain_token: &str, address: &str) -> ExitCode {
    match chain::validate(chain_token, address) {
        Ok((chain, address)) => {
            println!("✅ Valid {chain} address: {address}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_normalize(token: &str) {
    let code = normalize(token);
    match parse_chain(token) {
        Ok(chain) => println!("{chain}"),
        Err(_) => println!("{code} (unsupported)"),
    }
}

fn services(config: &Config) -> Result<(Refresher, PriceFeed)> {
    let http = HttpClient::new(&config.http)?;
    let dispatcher = Arc::new(Dispatcher::with_client(config, &http));
    Ok((
        Refresher::new(dispatcher, config.cooldown_secs),
        PriceFeed::new(http, &config.providers),
    ))
}

fn price_feed(config: &Config) -> Result<PriceFeed> {
    Ok(PriceFeed::new(HttpClient::new(&config.http)?, &config.providers))
}

async fn run_watch(refresher: &Refresher, feed: &PriceFeed, store: &WalletStore, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Watching wallets");
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match refresher.refresh_store(store).await {
                    Ok(outcome) => {
                        let prices = feed.fetch_usd_prices().await;
                        let portfolio = value_wallets(&outcome.wallets, &prices);
                        println!("Total: ${:.2}", portfolio.total_usd);
                        print_cycle(&outcome);
                    }
                    Err(e) => error!(error = %e, "Refresh cycle failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                break;
            }
        }
    }
}

fn print_portfolio(portfolio: &Portfolio) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if portfolio.wallets.is_empty() {
        println!("No wallets tracked.");
    }
    for entry in &portfolio.wallets {
        let w = &entry.wallet;
        let label = if w.label.is_empty() { "-" } else { w.label.as_str() };
        println!(
            "#{:<4} {:<9} {:<12} {} {} (${:.2})",
            w.id, w.chain, label, w.address, entry.coin_display, entry.usd_balance
        );
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total:    ${:.2}", portfolio.total_usd);
}

fn print_cycle(outcome: &RefreshOutcome) {
    for id in &outcome.deposits {
        println!("💰 Deposit detected on wallet #{id}");
    }
    for chain in outcome.cooled_down() {
        let secs = outcome.chain_status[&chain].cooldown_remaining;
        println!("⏳ {chain} rate limited, cooldown {secs}s");
    }
}
