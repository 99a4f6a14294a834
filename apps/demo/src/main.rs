use wallet_demo::error::DemoError;
use wallet_demo::logger::initialize as LoggerInitialize;
use wallet_demo::runner::{DemoOptions, run_demo};
use wallet_demo::scenarios::ScenarioBook;

use wallet_sdk::WalletConfig;

use std::fs::create_dir_all;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use tokio::task::LocalSet;

const APP_DIR_NAME: &str = "liquidroute-wallet-demo";

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(std::env::temp_dir).join(APP_DIR_NAME)
}

fn main() -> Result<(), DemoError> {
    let log_dir = app_dir(dirs::data_local_dir());
    create_dir_all(&log_dir)
        .map_err(|e| DemoError::demo(format!("Failed to create log directory: {e}")))?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("LiquidRoute wallet demo starting");
    info!("Log directory: {}", log_dir.display());

    let options = DemoOptions::parse();
    let config = WalletConfig::load(&app_dir(dirs::config_dir()))?;
    let book = ScenarioBook::built_in()?;

    // The bridge is single-threaded: one current-thread runtime, local tasks only
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| DemoError::demo(format!("Failed to build runtime: {e}")))?;
    let local = LocalSet::new();
    let reports = local.block_on(&runtime, run_demo(config, &book, &options))?;

    let summary = serde_json::to_string_pretty(&reports)
        .map_err(|e| DemoError::demo(format!("Failed to render summary: {e}")))?;
    println!("{summary}");

    let failed = reports.iter().filter(|r| !r.outcome.is_success()).count();
    if failed > 0 {
        error!("{failed} scenario(s) failed");
        return Err(DemoError::demo(format!("{failed} scenario(s) failed")));
    }
    Ok(())
}
