//! 에이전트 와이어링.
//!
//! 샘플러 → 수집 루프 → 전송 큐 → 전송기 → HTTP 클라이언트.

use anyhow::{Context, Result};
use metrix_core::config::AgentConfig;
use metrix_core::ports::monitor::MetricCollector;
use metrix_monitor::collector::{snapshot_queue, Collector};
use metrix_monitor::system::SysInfoSampler;
use metrix_network::http_client::{HttpMetricsClient, DEFAULT_TIMEOUT};
use metrix_network::sender::Sender;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// sysinfo 샘플러로 에이전트 실행
pub async fn run_agent(config: AgentConfig, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
    run_agent_with(config, Arc::new(SysInfoSampler::new()), shutdown_rx).await
}

/// 주어진 샘플러로 에이전트 실행 (shutdown 신호 시 반환)
pub async fn run_agent_with(
    config: AgentConfig,
    sampler: Arc<dyn MetricCollector>,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    config.validate().context("에이전트 설정 오류")?;

    let client = HttpMetricsClient::new(&config.address, config.key.clone(), DEFAULT_TIMEOUT)
        .context("HTTP 클라이언트 생성 실패")?;
    info!(
        "에이전트 시작: {} (서명={}, 워커 {}개)",
        client.updates_url(),
        config.key.is_some(),
        config.workers()
    );

    let collector = Collector::new(sampler, config.poll_interval());
    let sender = Sender::new(
        Arc::new(client),
        config.report_interval(),
        config.workers(),
    );
    let (tx, rx) = snapshot_queue();

    tokio::join!(
        collector.run(tx, shutdown_rx.clone()),
        sender.run(rx, shutdown_rx),
    );

    info!("에이전트 종료");
    Ok(())
}
