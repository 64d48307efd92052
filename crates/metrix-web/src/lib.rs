//! # metrix-web
//!
//! 메트릭 수신 HTTP 서버.
//! Axum 기반 갱신/조회/배치 API.
//!
//! ## 기능
//! - 경로 인코딩/JSON 단일 갱신, JSON 배치 갱신
//! - 단일 값 조회 (plain text / JSON), 전체 목록 (HTML)
//! - 저장소 상태 확인
//! - gzip 요청 해제 / 응답 압축
//! - HMAC-SHA256 요청 서명 검증 (키 설정 시)

pub mod error;
pub mod handlers;
pub mod routes;
pub mod signature;

use axum::{middleware, Router};
use metrix_core::config::ServerConfig;
use metrix_core::ports::storage::MetricStorage;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 서버 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    /// 메트릭 저장소
    pub storage: Arc<dyn MetricStorage>,
    /// 서명 키 (None이면 검증하지 않음)
    pub key: Option<Arc<str>>,
}

/// 메트릭 수신 서버
pub struct MetricsServer {
    address: String,
    state: AppState,
}

impl MetricsServer {
    /// 새 서버 생성
    pub fn new(storage: Arc<dyn MetricStorage>, config: &ServerConfig) -> Self {
        let key = config
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(Arc::from);
        Self {
            address: config.address.clone(),
            state: AppState { storage, key },
        }
    }

    /// 라우터 구성
    ///
    /// 요청 순서: Trace → 응답 압축 → 요청 해제 → 서명 검증 → 핸들러
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::metric_routes())
            .fallback(handlers::health::not_found)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                signature::verify_signature,
            ))
            .layer(RequestDecompressionLayer::new())
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// 설정된 주소에 바인드 후 실행
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(&self.address).await?;
        self.serve(listener, shutdown_rx).await
    }

    /// 주어진 리스너로 실행 (shutdown 신호 시 graceful 종료)
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let signed = self.state.key.is_some();
        info!("메트릭 서버 시작: http://{addr} (서명 검증={signed})");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                loop {
                    if *shutdown_rx.borrow() {
                        info!("메트릭 서버 종료 신호 수신");
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        info!("메트릭 서버 종료");
        Ok(())
    }
}
