//! 배치 트랜잭션.
//!
//! 1. 같은 id를 하나로 병합 (저장소에 닿기 전)
//! 2. 단일 IMMEDIATE 트랜잭션에서 저장값과 병합 후 upsert
//! 3. 잠금 경합/열기 실패는 트랜잭션 전체를 재시도 (1s → 3s → 5s)

use metrix_core::error::CoreError;
use metrix_core::models::batch::coalesce;
use metrix_core::models::metric::Metric;
use metrix_core::retry::{retry_with_backoff, RetryError};
use rusqlite::TransactionBehavior;
use tracing::debug;

use super::{classify, closed, merge_with_stored, upsert, SqliteStorage};

impl SqliteStorage {
    /// 배치 반영 (재시도 포함), 병합된 값 반환 (id 첫 등장 순)
    pub(super) async fn apply_batch(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, CoreError> {
        let coalesced = coalesce(metrics)?;
        if coalesced.is_empty() {
            return Ok(Vec::new());
        }

        let coalesced = &coalesced;
        let merged = retry_with_backoff(
            &self.retry,
            "메트릭 배치 트랜잭션",
            |e: &CoreError| matches!(e, CoreError::TransientStorage(_)),
            move || async move { self.write_batch(coalesced) },
        )
        .await
        .map_err(|e| match e {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { attempts, last } => {
                CoreError::TransientStorage(format!("{attempts}회 시도 후 실패: {last}"))
            }
        })?;

        debug!("메트릭 배치 커밋: {}건", merged.len());
        Ok(merged)
    }

    /// 한 번의 트랜잭션 시도 (실패 시 롤백)
    fn write_batch(&self, metrics: &[Metric]) -> Result<Vec<Metric>, CoreError> {
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or_else(closed)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| classify("트랜잭션 시작", e))?;

        let mut merged = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let stored = merge_with_stored(&tx, metric)?;
            upsert(&tx, &stored)?;
            merged.push(stored);
        }

        tx.commit().map_err(|e| classify("커밋", e))?;
        Ok(merged)
    }
}
