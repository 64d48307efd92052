//! 수집 루프.
//!
//! poll 간격마다 샘플러 값에 `PollCount`(카운터)와 `RandomValue`(게이지)를 붙여
//! 전송 큐(bounded mpsc)로 보낸다. 큐가 가득 차면 전송이 대기한다.

use metrix_core::models::metric::Metric;
use metrix_core::ports::monitor::MetricCollector;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// 전송 큐 용량
pub const QUEUE_CAPACITY: usize = 100;

/// 수집 스냅샷 (한 번의 poll 결과)
pub type Snapshot = Vec<Metric>;

/// 전송 큐 생성
pub fn snapshot_queue() -> (mpsc::Sender<Snapshot>, mpsc::Receiver<Snapshot>) {
    mpsc::channel(QUEUE_CAPACITY)
}

/// 주기 수집기
pub struct Collector {
    sampler: Arc<dyn MetricCollector>,
    poll_interval: Duration,
}

impl Collector {
    /// 새 수집기 생성
    pub fn new(sampler: Arc<dyn MetricCollector>, poll_interval: Duration) -> Self {
        Self {
            sampler,
            poll_interval,
        }
    }

    /// 한 번 수집 (샘플 + 에이전트 로컬 메트릭)
    pub async fn poll_once(&self) -> Option<Snapshot> {
        let mut snapshot = match self.sampler.sample().await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("메트릭 샘플링 실패: {e}");
                return None;
            }
        };
        snapshot.retain(|metric| match metric.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("잘못된 샘플 제외: {e}");
                false
            }
        });
        snapshot.push(Metric::counter("PollCount", 1));
        snapshot.push(Metric::gauge("RandomValue", rand::random::<f64>()));
        Some(snapshot)
    }

    /// 수집 루프 (shutdown 신호 또는 수신측 종료 시 반환)
    pub async fn run(&self, tx: mpsc::Sender<Snapshot>, mut shutdown_rx: watch::Receiver<bool>) {
        info!("수집 루프 시작: {}ms 간격", self.poll_interval.as_millis());
        let mut interval = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let Some(snapshot) = self.poll_once().await else {
                        continue;
                    };
                    debug!("스냅샷 수집: {}건", snapshot.len());

                    tokio::select! {
                        sent = tx.send(snapshot) => {
                            if sent.is_err() {
                                info!("전송 큐 닫힘, 수집 루프 종료");
                                break;
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            info!("수집 루프 종료");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    info!("수집 루프 종료");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use metrix_core::error::CoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedSampler;

    #[async_trait]
    impl MetricCollector for FixedSampler {
        async fn sample(&self) -> Result<Vec<Metric>, CoreError> {
            Ok(vec![Metric::gauge("TotalMemory", 1024.0)])
        }
    }

    struct NanSampler;

    #[async_trait]
    impl MetricCollector for NanSampler {
        async fn sample(&self) -> Result<Vec<Metric>, CoreError> {
            Ok(vec![
                Metric::gauge("ProcessCpuUsage", f64::NAN),
                Metric::gauge("TotalMemory", 1024.0),
            ])
        }
    }

    /// 홀수 번째 호출은 실패
    struct FlakySampler {
        calls: AtomicU32,
    }

    #[async_trait]
    impl MetricCollector for FlakySampler {
        async fn sample(&self) -> Result<Vec<Metric>, CoreError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(CoreError::Internal("sampler down".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn snapshot_contains_agent_metrics() {
        let collector = Collector::new(Arc::new(FixedSampler), Duration::from_secs(2));
        let snapshot = collector.poll_once().await.unwrap();

        assert_eq!(snapshot.len(), 3);
        let poll = snapshot.iter().find(|m| m.id == "PollCount").unwrap();
        assert_eq!(poll.counter_delta(), Some(1));
        let random = snapshot
            .iter()
            .find(|m| m.id == "RandomValue")
            .and_then(Metric::gauge_value)
            .unwrap();
        assert!((0.0..1.0).contains(&random));
    }

    #[tokio::test]
    async fn non_finite_samples_are_dropped() {
        let collector = Collector::new(Arc::new(NanSampler), Duration::from_secs(2));
        let snapshot = collector.poll_once().await.unwrap();

        assert!(snapshot.iter().all(|m| m.id != "ProcessCpuUsage"));
        assert!(snapshot.iter().any(|m| m.id == "TotalMemory"));
        assert_eq!(snapshot.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn run_emits_one_snapshot_per_tick() {
        let collector = Arc::new(Collector::new(Arc::new(FixedSampler), Duration::from_secs(2)));
        let (tx, mut rx) = snapshot_queue();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = {
            let collector = collector.clone();
            tokio::spawn(async move { collector.run(tx, shutdown_rx).await })
        };

        // 0s, 2s, 4s 틱
        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sampling_failure_skips_tick() {
        let sampler = Arc::new(FlakySampler {
            calls: AtomicU32::new(0),
        });
        let collector = Collector::new(sampler, Duration::from_secs(1));
        let (tx, mut rx) = snapshot_queue();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = tokio::spawn(async move { collector.run(tx, shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();

        // 0s 실패, 1s 성공, 2s 실패, 3s 성공
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_blocks_until_shutdown() {
        let collector = Collector::new(Arc::new(FixedSampler), Duration::from_secs(1));
        let (tx, mut rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = tokio::spawn(async move { collector.run(tx, shutdown_rx).await });
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!runner.is_finished());

        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();

        // 큐에는 첫 스냅샷만 남는다
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
