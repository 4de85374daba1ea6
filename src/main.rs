//! Stockbook main entry point

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stockbook_api::{start_server, AppState};
use stockbook_config::{Config, SettingsStore};
use stockbook_core::{BalanceEngine, CheckpointStore, Ledger};
use tokio::runtime::Runtime;
use tokio::sync::RwLock;

#[derive(Parser, Debug)]
#[command(name = "stockbook")]
#[command(version = "0.1.0")]
#[command(about = "A lightweight warehouse stock-movement ledger with cached balance reports", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let rt = Runtime::new()?;

    rt.block_on(async {
        let config = if args.config.exists() {
            Config::load(args.config.clone())?
        } else {
            eprintln!(
                "[WARN] Config file not found: {}, using defaults",
                args.config.display()
            );
            Config::default()
        };

        eprintln!(
            "[INFO] Config loaded: checkpoint={}, settings={}",
            config.data.checkpoint_file.display(),
            config.data.settings_file.display()
        );

        let settings = SettingsStore::open(config.data.settings_file.clone());
        if let Some(blocking) = settings.blocking_date() {
            eprintln!("[INFO] Blocking date: {}", blocking);
        } else {
            eprintln!("[INFO] No blocking date set, balance queries use full replay");
        }

        let ledger = if config.data.seed_demo_data {
            eprintln!("[INFO] Seeding demo reference data");
            Ledger::seeded()
        } else {
            Ledger::new()
        };

        let balances = BalanceEngine::new(CheckpointStore::new(config.data.checkpoint_file.clone()));

        let state = AppState {
            ledger: Arc::new(RwLock::new(ledger)),
            settings: Arc::new(RwLock::new(settings)),
            balances: Arc::new(balances),
            config,
        };

        start_server(state).await
    })
}
