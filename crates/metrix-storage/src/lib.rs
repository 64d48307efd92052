//! # metrix-storage
//!
//! 메트릭 저장소 어댑터.
//! 인메모리 맵, JSON 파일 스냅샷, SQLite 백엔드를 같은 `MetricStorage` 포트로 제공한다.
//!
//! ## 모듈
//! - `memory`: 뮤텍스 보호 인메모리 저장소
//! - `file`: 인메모리 저장소 + 파일 스냅샷 (주기/동기 저장, 시작 시 복원)
//! - `sqlite`: SQLite 저장소 (배치 트랜잭션 + 재시도)
//! - `migration`: 스키마 마이그레이션

pub mod file;
pub mod memory;
pub mod migration;
pub mod sqlite;

use metrix_core::config::StorageConfig;
use metrix_core::error::CoreError;
use metrix_core::ports::storage::MetricStorage;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::file::FileStorage;
use crate::memory::MemoryStorage;
use crate::sqlite::SqliteStorage;

/// 설정에 따라 저장소 생성
///
/// 우선순위: DSN → SQLite만 사용, 아니면 파일 경로 → 파일 스냅샷, 아니면 인메모리.
/// 파일 백엔드의 주기 저장 태스크는 `shutdown_rx` 신호로 종료된다.
pub fn open_storage(
    config: &StorageConfig,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<Arc<dyn MetricStorage>, CoreError> {
    if let Some(dsn) = config.database_dsn.as_deref().filter(|d| !d.is_empty()) {
        info!("저장소 선택: SQLite");
        return Ok(Arc::new(SqliteStorage::open(dsn)?));
    }

    if let Some(path) = config
        .file_path
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty())
    {
        let interval = config.store_interval();
        info!(
            "저장소 선택: 파일 스냅샷 {} (복원={}, 간격={:?})",
            path.display(),
            config.restore,
            interval
        );
        let storage = Arc::new(FileStorage::open(path, config.restore, interval.is_none())?);
        if let Some(period) = interval {
            storage.clone().spawn_snapshot_task(period, shutdown_rx);
        }
        return Ok(storage);
    }

    info!("저장소 선택: 인메모리");
    Ok(Arc::new(MemoryStorage::new()))
}
