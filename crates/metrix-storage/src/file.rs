//! 파일 스냅샷 저장소.
//!
//! 인메모리 저장소를 감싸고 전체 맵을 JSON 문서 하나로 저장/복원한다.
//! 스냅샷은 갱신과 같은 잠금 안에서 직렬화하고, 파일 쓰기는 블로킹 스레드에서
//! 임시 파일 + rename으로 수행한다. 세대 번호가 더 오래된 스냅샷은 쓰지 않는다.

use async_trait::async_trait;
use metrix_core::error::CoreError;
use metrix_core::models::metric::Metric;
use metrix_core::ports::storage::MetricStorage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::memory::{apply_batch, apply_update, MemoryStorage, MetricMap};

/// 직렬화된 스냅샷 (세대 번호, JSON)
type EncodedSnapshot = (u64, Vec<u8>);

/// 파일 스냅샷 저장소 — `MetricStorage` 포트 구현
#[derive(Debug)]
pub struct FileStorage {
    inner: MemoryStorage,
    path: PathBuf,
    /// true면 매 갱신 직후 동기 저장
    sync_writes: bool,
    /// 마지막으로 직렬화한 스냅샷 세대
    generation: AtomicU64,
    /// 마지막으로 파일에 쓴 세대 (파일 쓰기 직렬화)
    written: Mutex<u64>,
}

impl FileStorage {
    /// 빈 저장소 생성 (파일을 읽지 않음)
    pub fn new(path: impl Into<PathBuf>, sync_writes: bool) -> Self {
        Self {
            inner: MemoryStorage::new(),
            path: path.into(),
            sync_writes,
            generation: AtomicU64::new(0),
            written: Mutex::new(0),
        }
    }

    /// 저장소 생성 후 `restore`가 true면 파일에서 복원
    ///
    /// 파일이 없으면 빈 저장소, 읽기/파싱 실패는 에러.
    pub fn open(
        path: impl Into<PathBuf>,
        restore: bool,
        sync_writes: bool,
    ) -> Result<Self, CoreError> {
        let storage = Self::new(path, sync_writes);
        if restore {
            let count = storage.load_from_file()?;
            info!("스냅샷 복원: {} ({count}건)", storage.path.display());
        }
        Ok(storage)
    }

    /// 스냅샷 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 현재 맵을 파일에 저장
    pub async fn save_to_file(&self) -> Result<(), CoreError> {
        let (snapshot, count) = {
            let metrics = self.inner.lock();
            (self.encode(&metrics)?, metrics.len())
        };
        if self.write_encoded(snapshot).await? {
            debug!("스냅샷 저장: {} ({count}건)", self.path.display());
        }
        Ok(())
    }

    /// 파일 내용으로 맵 전체를 교체, 복원된 건수 반환
    pub fn load_from_file(&self) -> Result<usize, CoreError> {
        let mut metrics = self.inner.lock();
        let loaded = read_snapshot(&self.path)?;
        let count = loaded.len();
        *metrics = loaded;
        Ok(count)
    }

    /// 주기적 스냅샷 태스크 시작 (shutdown 신호 시 종료)
    pub fn spawn_snapshot_task(
        self: Arc<Self>,
        period: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            info!("스냅샷 루프 시작: {}초 간격", period.as_secs());

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.save_to_file().await {
                            error!("주기적 스냅샷 저장 실패: {e}");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("스냅샷 루프 종료");
                        break;
                    }
                }
            }
        })
    }

    /// 맵 잠금 안에서 호출 — 세대 번호는 갱신 순서와 같다
    fn encode(&self, metrics: &MetricMap) -> Result<EncodedSnapshot, CoreError> {
        let json = serde_json::to_vec_pretty(metrics)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((generation, json))
    }

    /// 직렬화된 스냅샷을 파일에 쓴다 (더 새 세대가 이미 있으면 false)
    async fn write_encoded(&self, (generation, json): EncodedSnapshot) -> Result<bool, CoreError> {
        let mut written = self.written.lock().await;
        if *written >= generation {
            return Ok(false);
        }

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&path, &json))
            .await
            .map_err(|e| CoreError::Internal(format!("스냅샷 쓰기 태스크 실패: {e}")))??;
        *written = generation;
        Ok(true)
    }

    async fn persist_if_sync(&self, snapshot: Option<Result<EncodedSnapshot, CoreError>>) {
        let result = match snapshot {
            Some(Ok(snapshot)) => self.write_encoded(snapshot).await.map(|_| ()),
            Some(Err(e)) => Err(e),
            None => return,
        };
        if let Err(e) = result {
            error!("동기 스냅샷 저장 실패: {e}");
        }
    }
}

/// 임시 파일에 쓴 뒤 rename
fn write_snapshot(path: &Path, json: &[u8]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// 스냅샷 읽기 (파일이 없으면 빈 맵)
fn read_snapshot(path: &Path) -> Result<MetricMap, CoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MetricMap::new()),
        Err(e) => return Err(e.into()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(MetricMap::new());
    }

    let metrics: MetricMap = serde_json::from_slice(&bytes)?;
    if let Some((key, metric)) = metrics.iter().find(|(key, metric)| **key != metric.id) {
        return Err(CoreError::validation(
            "id",
            format!("스냅샷 키 '{key}'와 메트릭 id '{}' 불일치", metric.id),
        ));
    }
    Ok(metrics)
}

#[async_trait]
impl MetricStorage for FileStorage {
    async fn update_metric(&self, metric: Metric) -> Result<Metric, CoreError> {
        let (merged, snapshot) = {
            let mut metrics = self.inner.lock();
            let merged = apply_update(&mut metrics, metric)?;
            (merged, self.sync_writes.then(|| self.encode(&metrics)))
        };
        self.persist_if_sync(snapshot).await;
        Ok(merged)
    }

    async fn update_metric_batch(&self, batch: Vec<Metric>) -> Result<Vec<Metric>, CoreError> {
        let (merged, snapshot) = {
            let mut metrics = self.inner.lock();
            let merged = apply_batch(&mut metrics, batch)?;
            (merged, self.sync_writes.then(|| self.encode(&metrics)))
        };
        self.persist_if_sync(snapshot).await;
        debug!("메트릭 배치 반영: {}건", merged.len());
        Ok(merged)
    }

    async fn get_metric(&self, id: &str) -> Result<Metric, CoreError> {
        self.inner.get_metric(id).await
    }

    async fn get_all_metrics(&self) -> Result<MetricMap, CoreError> {
        self.inner.get_all_metrics().await
    }

    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        self.save_to_file().await?;
        info!("최종 스냅샷 저장 완료: {}", self.path.display());
        Ok(())
    }
}
