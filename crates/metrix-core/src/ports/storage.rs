//! 메트릭 저장소 포트.
//!
//! 구현: `metrix-storage` crate (인메모리, 파일 스냅샷, rusqlite)

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::CoreError;
use crate::models::metric::Metric;

/// 메트릭 저장소
///
/// 게이지는 덮어쓰고 카운터는 누적한다. 한 id의 종류는 최초 기록 시 고정된다.
#[async_trait]
pub trait MetricStorage: Send + Sync {
    /// 단일 메트릭 병합 후 병합된 값을 반환
    async fn update_metric(&self, metric: Metric) -> Result<Metric, CoreError>;

    /// 배치 병합 (원자적: 전부 반영되거나 전부 미반영)
    ///
    /// 이 배치가 반영된 직후의 값을 id 첫 등장 순으로 반환한다.
    async fn update_metric_batch(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, CoreError>;

    /// id로 조회 (없으면 `NotFound`)
    async fn get_metric(&self, id: &str) -> Result<Metric, CoreError>;

    /// 전체 메트릭 조회
    async fn get_all_metrics(&self) -> Result<HashMap<String, Metric>, CoreError>;

    /// 연결 상태 확인
    async fn ping(&self) -> Result<(), CoreError>;

    /// 종료 처리 (스냅샷 저장, 연결 해제)
    async fn close(&self) -> Result<(), CoreError>;
}
