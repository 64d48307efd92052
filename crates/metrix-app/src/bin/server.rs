//! `metrix-server` 진입점.

use anyhow::Result;
use clap::Parser;
use metrix_app::cli::ServerArgs;
use metrix_app::init_tracing;
use metrix_app::lifecycle::LifecycleManager;
use metrix_app::server::run_server;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    init_tracing(&args.log_level);
    info!("metrix-server v{}", env!("CARGO_PKG_VERSION"));

    let lifecycle = Arc::new(LifecycleManager::new());
    let shutdown_rx = lifecycle.subscribe();
    let signal = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.wait_for_signal().await })
    };

    let result = run_server(args.config(), shutdown_rx).await;
    signal.abort();
    result
}
