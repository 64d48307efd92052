//! 인메모리 저장소.
//!
//! 단일 뮤텍스로 보호되는 맵. 읽기-병합-쓰기 전체를 잠금 안에서 수행한다.

use async_trait::async_trait;
use metrix_core::error::CoreError;
use metrix_core::models::batch::coalesce;
use metrix_core::models::metric::Metric;
use metrix_core::ports::storage::MetricStorage;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use tracing::debug;

/// 메트릭 맵 (id → 현재 값)
pub type MetricMap = HashMap<String, Metric>;

/// 인메모리 저장소 — `MetricStorage` 포트 구현
#[derive(Debug, Default)]
pub struct MemoryStorage {
    metrics: Mutex<MetricMap>,
}

impl MemoryStorage {
    /// 빈 저장소 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 맵으로 생성
    pub fn from_metrics(metrics: MetricMap) -> Self {
        Self {
            metrics: Mutex::new(metrics),
        }
    }

    /// 맵 잠금 (파일 스냅샷이 갱신과 같은 잠금을 공유)
    pub(crate) fn lock(&self) -> MutexGuard<'_, MetricMap> {
        self.metrics.lock()
    }
}

/// 단일 메트릭 병합 후 저장, 병합된 값 반환
pub(crate) fn apply_update(map: &mut MetricMap, metric: Metric) -> Result<Metric, CoreError> {
    metric.validate()?;
    let merged = match map.get(&metric.id) {
        Some(existing) => existing.merge(&metric)?,
        None => metric,
    };
    map.insert(merged.id.clone(), merged.clone());
    Ok(merged)
}

/// 배치 병합 후 저장, 병합된 값 반환 (id 첫 등장 순)
///
/// 모든 항목을 먼저 검증/병합한 뒤 한꺼번에 반영한다. 하나라도 실패하면 맵은 그대로다.
pub(crate) fn apply_batch(
    map: &mut MetricMap,
    metrics: Vec<Metric>,
) -> Result<Vec<Metric>, CoreError> {
    let coalesced = coalesce(metrics)?;
    let merged = coalesced
        .iter()
        .map(|metric| match map.get(&metric.id) {
            Some(existing) => existing.merge(metric),
            None => Ok(metric.clone()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    for metric in &merged {
        map.insert(metric.id.clone(), metric.clone());
    }
    Ok(merged)
}

#[async_trait]
impl MetricStorage for MemoryStorage {
    async fn update_metric(&self, metric: Metric) -> Result<Metric, CoreError> {
        let merged = apply_update(&mut self.lock(), metric)?;
        debug!("메트릭 갱신: {} = {}", merged.id, merged.render());
        Ok(merged)
    }

    async fn update_metric_batch(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, CoreError> {
        let merged = apply_batch(&mut self.lock(), metrics)?;
        debug!("메트릭 배치 반영: {}건", merged.len());
        Ok(merged)
    }

    async fn get_metric(&self, id: &str) -> Result<Metric, CoreError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::metric_not_found(id))
    }

    async fn get_all_metrics(&self) -> Result<MetricMap, CoreError> {
        Ok(self.lock().clone())
    }

    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    #[tokio::test]
    async fn counter_updates_accumulate() {
        let storage = MemoryStorage::new();
        storage.update_metric(Metric::counter("PollCount", 1)).await.unwrap();
        let merged = storage.update_metric(Metric::counter("PollCount", 1)).await.unwrap();

        assert_eq!(merged.counter_delta(), Some(2));
        assert_eq!(
            storage.get_metric("PollCount").await.unwrap().counter_delta(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn gauge_updates_replace() {
        let storage = MemoryStorage::new();
        storage.update_metric(Metric::gauge("Alloc", 100.5)).await.unwrap();
        storage.update_metric(Metric::gauge("Alloc", 200.25)).await.unwrap();

        assert_eq!(
            storage.get_metric("Alloc").await.unwrap().gauge_value(),
            Some(200.25)
        );
    }

    #[tokio::test]
    async fn unknown_id_not_found() {
        let storage = MemoryStorage::new();
        assert_matches!(
            storage.get_metric("missing").await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn batch_duplicates_become_one_entry() {
        let storage = MemoryStorage::new();
        storage
            .update_metric_batch(vec![Metric::counter("x", 3), Metric::counter("x", 4)])
            .await
            .unwrap();

        let all = storage.get_all_metrics().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["x"].counter_delta(), Some(7));
    }

    #[tokio::test]
    async fn batch_adds_to_stored_counter() {
        let storage = MemoryStorage::new();
        storage.update_metric(Metric::counter("x", 10)).await.unwrap();
        let merged = storage
            .update_metric_batch(vec![Metric::counter("x", 3), Metric::counter("x", 4)])
            .await
            .unwrap();

        assert_eq!(merged, vec![Metric::counter("x", 17)]);
        assert_eq!(storage.get_metric("x").await.unwrap().counter_delta(), Some(17));
    }

    #[tokio::test]
    async fn batch_kind_conflict_leaves_store_untouched() {
        let storage = MemoryStorage::new();
        storage.update_metric(Metric::gauge("x", 1.0)).await.unwrap();

        let result = storage
            .update_metric_batch(vec![Metric::counter("y", 1), Metric::counter("x", 1)])
            .await;

        assert_matches!(result, Err(CoreError::Validation { .. }));
        assert_matches!(storage.get_metric("y").await, Err(CoreError::NotFound { .. }));
        assert_eq!(storage.get_metric("x").await.unwrap().gauge_value(), Some(1.0));
    }

    #[tokio::test]
    async fn snapshot_is_independent_copy() {
        let storage = MemoryStorage::new();
        storage.update_metric(Metric::gauge("g", 1.0)).await.unwrap();

        let mut snapshot = storage.get_all_metrics().await.unwrap();
        storage.update_metric(Metric::gauge("g", 2.0)).await.unwrap();
        snapshot.insert("other".to_string(), Metric::counter("other", 1));

        assert_eq!(snapshot["g"].gauge_value(), Some(1.0));
        assert_matches!(storage.get_metric("other").await, Err(CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_id_rejected() {
        let storage = MemoryStorage::new();
        assert_matches!(
            storage.update_metric(Metric::gauge("", 1.0)).await,
            Err(CoreError::Validation { .. })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_counter_updates_are_not_lost() {
        let storage = Arc::new(MemoryStorage::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage.update_metric(Metric::counter("c", 2)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(storage.get_metric("c").await.unwrap().counter_delta(), Some(100));
    }
}
