// Raffle Engine - Scheduled winner sweep
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use raffle_engine::clock::SystemClock;
use raffle_engine::entropy::OsEntropy;
use raffle_engine::memory_store::MemoryStore;
use raffle_engine::selector::WinnerSelector;
use raffle_engine::timeout::TimedStore;
use raffle_engine::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "sweep failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let path = config.snapshot_path.as_path();

    let store = if tokio::fs::try_exists(path).await? {
        MemoryStore::load_from(path).await?
    } else {
        info!(path = %path.display(), "no snapshot yet, starting empty");
        MemoryStore::new()
    };
    let store = Arc::new(TimedStore::new(store, config.storage_timeout));

    let selector = WinnerSelector::new(
        store.clone(),
        &config,
        Arc::new(SystemClock),
        Arc::new(OsEntropy),
    );
    let report = selector.sweep_ended_raffles().await?;

    store.inner().save_to(path).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
