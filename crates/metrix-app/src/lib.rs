//! # metrix-app
//!
//! Metrix 바이너리 공용 모듈.
//! CLI 설정 파싱, tracing 초기화, 에이전트/서버 와이어링, 라이프사이클 관리.

pub mod agent;
pub mod cli;
pub mod lifecycle;
pub mod server;

use tracing_subscriber::EnvFilter;

/// tracing 초기화 (`RUST_LOG` 우선, 없으면 `log_level`)
pub fn init_tracing(log_level: &str) {
    let log_filter = format!("{log_level},hyper=warn,reqwest=warn");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();
}
