//! 재시도 + 백오프 유틸리티.
//!
//! DB 배치 트랜잭션과 에이전트 HTTP 전송이 같은 정책을 공유한다.
//! 기본 정책: 최대 4회 시도, 시도 사이 대기 1s → 3s → 5s (`(attempt-1)*2+1`초).

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 기본 최대 시도 횟수 (최초 시도 포함)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// 선형 백오프: 1s, 3s, 5s, ...
pub fn linear_backoff(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt.saturating_sub(1)) * 2 + 1)
}

/// 재시도 정책
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (최소 1)
    pub max_attempts: u32,
    /// `attempt`번째 시도가 실패한 뒤의 대기 시간
    pub delay: fn(u32) -> Duration,
}

impl RetryPolicy {
    /// 새 정책 생성
    pub fn new(max_attempts: u32, delay: fn(u32) -> Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// 모든 대기 시간의 합 (시도 사이 구간만)
    pub fn total_delay(&self) -> Duration {
        (1..self.max_attempts).map(self.delay).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, linear_backoff)
    }
}

/// 재시도 실패 결과
#[derive(Debug)]
pub enum RetryError<E> {
    /// 재시도 불가능한 에러 — 즉시 중단
    Fatal(E),
    /// 시도 횟수 소진 — 마지막 에러 포함
    Exhausted {
        /// 수행한 시도 횟수
        attempts: u32,
        /// 마지막 에러
        last: E,
    },
}

impl<E> RetryError<E> {
    /// 내부 에러 꺼내기
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Fatal(e) => write!(f, "{e}"),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "{attempts}회 시도 후 실패: {last}")
            }
        }
    }
}

/// 정책에 따라 `operation`을 재시도
///
/// `is_retryable`이 false를 반환하는 에러는 바로 `Fatal`로 돌려준다.
/// 마지막 시도 뒤에는 대기하지 않는다.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => return Err(RetryError::Fatal(e)),
            Err(e) if attempt >= policy.max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                })
            }
            Err(e) => {
                let delay = (policy.delay)(attempt);
                warn!(
                    "{label} 실패 (시도 {attempt}/{}): {e}, {delay:?} 후 재시도",
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn linear_backoff_schedule() {
        assert_eq!(linear_backoff(1), Duration::from_secs(1));
        assert_eq!(linear_backoff(2), Duration::from_secs(3));
        assert_eq!(linear_backoff(3), Duration::from_secs(5));
        assert_eq!(RetryPolicy::default().total_delay(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_last_attempt() {
        let calls = &AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<u32, RetryError<String>> =
            retry_with_backoff(&RetryPolicy::default(), "test", |_| true, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 4 {
                    Err(format!("attempt {n}"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_stops_immediately() {
        let calls = &AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), RetryError<String>> =
            retry_with_backoff(&RetryPolicy::default(), "test", |_| false, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("constraint".to_string())
            })
            .await;

        assert_matches!(result, Err(RetryError::Fatal(ref e)) if e == "constraint");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_error() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), RetryError<String>> =
            retry_with_backoff(&RetryPolicy::default(), "test", |_| true, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {n}"))
            })
            .await;

        assert_matches!(
            result,
            Err(RetryError::Exhausted { attempts: 4, ref last }) if last == "attempt 4"
        );
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(0, linear_backoff);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.total_delay(), Duration::ZERO);
    }
}
