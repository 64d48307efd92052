//! 서버 전송 포트.
//!
//! 구현: `metrix-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::metric::Metric;

/// 메트릭 배치 전송 클라이언트
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// 배치 한 번 전송 (재시도는 호출자 책임)
    ///
    /// 연결 실패와 5xx는 `Transport`, 4xx는 `ServerRejected`.
    async fn send_batch(&self, metrics: &[Metric]) -> Result<(), CoreError>;
}
