//! 주기 전송기.
//!
//! report 간격마다 큐에 쌓인 스냅샷을 모두 꺼내 하나의 배치로 병합하고,
//! 워커 풀(세마포어)에서 슬롯을 얻어 전송 태스크를 띄운다.
//! 전송 실패는 재시도 후 버린다. 재전송 큐는 없다.

use metrix_core::models::batch::coalesce;
use metrix_core::models::metric::Metric;
use metrix_core::ports::api_client::MetricsApi;
use metrix_core::retry::{retry_with_backoff, RetryError, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, error, info, warn};

/// 종료 시 진행 중인 전송을 기다리는 최대 시간
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 주기 전송기
pub struct Sender {
    api: Arc<dyn MetricsApi>,
    report_interval: Duration,
    workers: u32,
    retry: RetryPolicy,
    drain_timeout: Duration,
}

impl Sender {
    /// 새 전송기 생성 (`rate_limit`은 동시 전송 워커 수, 최소 1)
    pub fn new(api: Arc<dyn MetricsApi>, report_interval: Duration, rate_limit: usize) -> Self {
        Self {
            api,
            report_interval,
            workers: u32::try_from(rate_limit.max(1)).unwrap_or(u32::MAX),
            retry: RetryPolicy::default(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// 재시도 정책 교체
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 종료 대기 시간 교체
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// 전송 루프 (shutdown 신호 시 진행 중 전송을 기다린 뒤 반환)
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<Vec<Metric>>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(
            "전송 루프 시작: {}ms 간격, 워커 {}개",
            self.report_interval.as_millis(),
            self.workers
        );
        let pool = Arc::new(Semaphore::new(self.workers as usize));
        let start = tokio::time::Instant::now() + self.report_interval;
        let mut interval = tokio::time::interval_at(start, self.report_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let Some(batch) = drain_queue(&mut rx) else {
                        debug!("전송할 스냅샷 없음");
                        continue;
                    };

                    // 풀이 가득 차면 슬롯이 빌 때까지 대기
                    let permit = tokio::select! {
                        permit = pool.clone().acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break,
                        },
                        _ = shutdown_rx.changed() => break,
                    };

                    let api = self.api.clone();
                    let retry = self.retry;
                    tokio::spawn(async move {
                        send_with_retry(api.as_ref(), &retry, &batch).await;
                        drop(permit);
                    });
                }
                _ = shutdown_rx.changed() => break,
            }
        }

        info!("전송 루프 종료, 진행 중 전송 대기");
        let drained =
            tokio::time::timeout(self.drain_timeout, pool.acquire_many(self.workers)).await;
        match drained {
            Ok(_) => info!("진행 중 전송 완료"),
            Err(_) => warn!(
                "진행 중 전송 대기 시간 초과 ({:?}), 남은 배치 포기",
                self.drain_timeout
            ),
        }
    }
}

/// 큐의 스냅샷을 모두 꺼내 병합 (비어 있으면 None)
///
/// 카운터는 합산, 게이지는 가장 최근 스냅샷의 값.
pub fn drain_queue(rx: &mut mpsc::Receiver<Vec<Metric>>) -> Option<Vec<Metric>> {
    let mut pending = Vec::new();
    let mut snapshots = 0;
    loop {
        match rx.try_recv() {
            Ok(snapshot) => {
                snapshots += 1;
                pending.extend(snapshot);
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
        }
    }
    if pending.is_empty() {
        return None;
    }

    match coalesce(pending) {
        Ok(batch) => {
            debug!("스냅샷 {snapshots}개 → 배치 {}건", batch.len());
            Some(batch)
        }
        Err(e) => {
            error!("스냅샷 병합 실패, 배치 폐기: {e}");
            None
        }
    }
}

/// 재시도 포함 전송 (성공 여부 반환)
///
/// 연결 실패와 5xx는 재시도, 4xx는 즉시 포기. 소진 시 배치를 버린다.
pub async fn send_with_retry(api: &dyn MetricsApi, retry: &RetryPolicy, batch: &[Metric]) -> bool {
    let result = retry_with_backoff(
        retry,
        "배치 전송",
        |e: &metrix_core::error::CoreError| e.is_retryable_transport(),
        || api.send_batch(batch),
    )
    .await;

    match result {
        Ok(()) => {
            debug!("배치 전송 성공: {}건", batch.len());
            true
        }
        Err(RetryError::Fatal(e)) => {
            error!("배치 전송 거부, {}건 폐기: {e}", batch.len());
            false
        }
        Err(RetryError::Exhausted { attempts, last }) => {
            error!("배치 전송 {attempts}회 실패, {}건 폐기: {last}", batch.len());
            false
        }
    }
}
