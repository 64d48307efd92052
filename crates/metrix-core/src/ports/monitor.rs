//! 런타임/호스트 메트릭 수집 포트.
//!
//! 구현: `metrix-monitor` crate (sysinfo)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::metric::Metric;

/// 메트릭 샘플러
#[async_trait]
pub trait MetricCollector: Send + Sync {
    /// 현재 값 샘플링
    async fn sample(&self) -> Result<Vec<Metric>, CoreError>;
}
