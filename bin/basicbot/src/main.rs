mod logging;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing::info;

use common::Config;
use console::Console;
use engine::{BinanceConnector, OrderExecutor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("Failed to start the bot. Check your .env file")?;

    // ── Logging ──────────────────────────────────────────────────────────────
    let _log_guard = logging::init_file_logging(&cfg.log_file)?;
    info!(
        base_url = %cfg.base_url,
        testnet = cfg.testnet,
        recv_window_ms = cfg.recv_window_ms,
        "BasicBot starting"
    );

    // ── Exchange ─────────────────────────────────────────────────────────────
    let connector = Arc::new(BinanceConnector::new(cfg.recv_window_ms));
    let executor = OrderExecutor::new(connector, cfg.credentials());

    // ── Console ──────────────────────────────────────────────────────────────
    let mut console = Console::new(
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
        executor,
        cfg.log_file.clone(),
    );
    console.run().await.context("console I/O failed")?;

    info!("BasicBot exiting");
    Ok(())
}
