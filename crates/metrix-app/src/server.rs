//! 서버 와이어링.
//!
//! 저장소 선택 → HTTP 서버 → graceful 종료 → 저장소 닫기 (최종 스냅샷).

use anyhow::{Context, Result};
use metrix_core::config::ServerConfig;
use metrix_storage::open_storage;
use metrix_web::MetricsServer;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// 설정된 주소에 바인드 후 서버 실행
pub async fn run_server(config: ServerConfig, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
    let listener = TcpListener::bind(&config.address)
        .await
        .with_context(|| format!("주소 바인드 실패: {}", config.address))?;
    serve(config, listener, shutdown_rx).await
}

/// 주어진 리스너로 서버 실행 (shutdown 신호 시 반환)
pub async fn serve(
    config: ServerConfig,
    listener: TcpListener,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let storage = open_storage(&config.storage, shutdown_rx.clone()).context("저장소 열기 실패")?;

    let served = MetricsServer::new(storage.clone(), &config)
        .serve(listener, shutdown_rx)
        .await;
    if let Err(e) = &served {
        error!("HTTP 서버 에러: {e}");
    }

    storage.close().await.context("저장소 닫기 실패")?;
    info!("저장소 닫힘");

    served.context("HTTP 서버 실행 실패")
}
