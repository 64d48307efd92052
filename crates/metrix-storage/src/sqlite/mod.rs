//! SQLite 저장소 어댑터.
//!
//! `MetricStorage` 포트 구현.
//!
//! # 모듈 구조
//! - `batch`: 배치 트랜잭션 (병합 → 단일 트랜잭션 upsert → 재시도)
//!
//! 모든 쓰기는 IMMEDIATE 트랜잭션으로 읽기-병합-쓰기를 직렬화한다.
//! busy timeout은 0으로 두고 잠금 대기는 재시도 정책이 담당한다.

mod batch;

use async_trait::async_trait;
use metrix_core::error::CoreError;
use metrix_core::models::metric::{Metric, MetricKind, MetricRecord};
use metrix_core::ports::storage::MetricStorage;
use metrix_core::retry::RetryPolicy;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use crate::migration;

/// SQLite 저장소 — `MetricStorage` 포트 구현
#[derive(Debug)]
pub struct SqliteStorage {
    /// `close` 이후 None
    conn: Mutex<Option<Connection>>,
    retry: RetryPolicy,
}

impl SqliteStorage {
    /// DSN(파일 경로, SQLite URI, `:memory:`)으로 저장소 생성
    pub fn open(dsn: &str) -> Result<Self, CoreError> {
        let conn = Connection::open(dsn).map_err(|e| classify("SQLite 열기", e))?;

        conn.busy_timeout(Duration::ZERO)
            .map_err(|e| classify("busy timeout 설정", e))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            ",
        )
        .map_err(|e| classify("PRAGMA 설정", e))?;

        migration::run_migrations(&conn).map_err(|e| classify("마이그레이션", e))?;

        info!("SQLite 저장소 초기화: {dsn}");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            retry: RetryPolicy::default(),
        })
    }

    /// 인메모리 SQLite 저장소 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::open(":memory:")
    }

    /// 배치 재시도 정책 교체
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))
    }
}

/// rusqlite 에러 분류
///
/// 잠금 경합/열기 실패는 재시도 대상, 그 외(제약 조건, 구문 오류 등)는 치명적.
pub(crate) fn classify(context: &str, e: rusqlite::Error) -> CoreError {
    let transient = matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen)
    );
    if transient {
        CoreError::TransientStorage(format!("{context}: {e}"))
    } else {
        CoreError::FatalStorage(format!("{context}: {e}"))
    }
}

fn closed() -> CoreError {
    CoreError::Internal("SQLite 저장소가 이미 닫힘".to_string())
}

/// 저장된 값 조회
fn read_metric(conn: &Connection, id: &str) -> Result<Option<Metric>, CoreError> {
    let row = conn
        .query_row(
            "SELECT id, kind, value, delta FROM metrics WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            },
        )
        .optional()
        .map_err(|e| classify("메트릭 조회", e))?;

    row.map(|(id, kind, value, delta)| row_to_metric(id, &kind, value, delta))
        .transpose()
}

fn row_to_metric(
    id: String,
    kind: &str,
    value: Option<f64>,
    delta: Option<i64>,
) -> Result<Metric, CoreError> {
    let record = MetricRecord {
        id,
        kind: kind.parse::<MetricKind>()?,
        value,
        delta,
    };
    Metric::try_from(record)
}

/// 저장된 값과 병합
fn merge_with_stored(conn: &Connection, metric: &Metric) -> Result<Metric, CoreError> {
    match read_metric(conn, &metric.id)? {
        Some(existing) => existing.merge(metric),
        None => Ok(metric.clone()),
    }
}

/// id 충돌 시 갱신
fn upsert(conn: &Connection, metric: &Metric) -> Result<(), CoreError> {
    let record = MetricRecord::from(metric.clone());
    conn.execute(
        "INSERT INTO metrics (id, kind, value, delta) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             kind = excluded.kind,
             value = excluded.value,
             delta = excluded.delta",
        params![record.id, record.kind.as_str(), record.value, record.delta],
    )
    .map_err(|e| classify("메트릭 upsert", e))?;
    Ok(())
}

#[async_trait]
impl MetricStorage for SqliteStorage {
    async fn update_metric(&self, metric: Metric) -> Result<Metric, CoreError> {
        metric.validate()?;

        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or_else(closed)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| classify("트랜잭션 시작", e))?;

        let merged = merge_with_stored(&tx, &metric)?;
        upsert(&tx, &merged)?;
        tx.commit().map_err(|e| classify("커밋", e))?;

        debug!("메트릭 갱신: {} = {}", merged.id, merged.render());
        Ok(merged)
    }

    async fn update_metric_batch(&self, metrics: Vec<Metric>) -> Result<Vec<Metric>, CoreError> {
        self.apply_batch(metrics).await
    }

    async fn get_metric(&self, id: &str) -> Result<Metric, CoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(closed)?;
        read_metric(conn, id)?.ok_or_else(|| CoreError::metric_not_found(id))
    }

    async fn get_all_metrics(&self) -> Result<HashMap<String, Metric>, CoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(closed)?;

        let mut stmt = conn
            .prepare("SELECT id, kind, value, delta FROM metrics")
            .map_err(|e| classify("메트릭 목록 쿼리 준비", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            })
            .map_err(|e| classify("메트릭 목록 조회", e))?;

        let mut metrics = HashMap::new();
        for row in rows {
            let (id, kind, value, delta) = row.map_err(|e| classify("메트릭 행 읽기", e))?;
            let metric = row_to_metric(id, &kind, value, delta)?;
            metrics.insert(metric.id.clone(), metric);
        }
        Ok(metrics)
    }

    async fn ping(&self) -> Result<(), CoreError> {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(closed)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| classify("ping", e))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        let mut guard = self.lock()?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| classify("연결 종료", e))?;
            info!("SQLite 연결 종료");
        }
        Ok(())
    }
}
