//! `metrix-agent` 진입점.

use anyhow::Result;
use clap::Parser;
use metrix_app::agent::run_agent;
use metrix_app::cli::AgentArgs;
use metrix_app::init_tracing;
use metrix_app::lifecycle::LifecycleManager;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = AgentArgs::parse();
    init_tracing(&args.log_level);
    info!("metrix-agent v{}", env!("CARGO_PKG_VERSION"));

    let lifecycle = Arc::new(LifecycleManager::new());
    let shutdown_rx = lifecycle.subscribe();
    let signal = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.wait_for_signal().await })
    };

    let result = run_agent(args.config(), shutdown_rx).await;
    signal.abort();
    result
}
