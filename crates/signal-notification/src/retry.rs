//! 알림 재시도.
//!
//! 전송 실패 시 고정 간격 또는 상한이 있는 지수 간격으로 다시 보냅니다.
//! `max_attempts`가 없으면 성공할 때까지 재시도하므로 게시된 시그널이 누락되지
//! 않습니다.

use crate::types::{NotificationError, NotificationResult, NotificationSink};
use async_trait::async_trait;
use signal_core::{BackoffKind, MessageId, RetryConfig, RunMode};
use std::time::Duration;
use tracing::{debug, warn};

/// 재시도 정책.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: BackoffKind,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// 설정과 실행 모드에서 정책을 만듭니다.
    pub fn from_config(config: &RetryConfig, mode: RunMode) -> Self {
        Self {
            backoff: config.backoff,
            initial_delay: config.delay(mode),
            max_delay: config.max_delay(),
            max_attempts: config.max_attempts,
        }
    }

    /// 고정 간격 정책.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            backoff: BackoffKind::Fixed,
            initial_delay: delay,
            max_delay: delay,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// `attempt`번째 실패 후 대기 시간 (1부터 시작).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffKind::Fixed => self.initial_delay,
            BackoffKind::Exponential => {
                let exponent = attempt.saturating_sub(1).min(31);
                let delay = self.initial_delay.saturating_mul(1u32 << exponent);
                delay.min(self.max_delay)
            }
        }
    }

    /// 시도 횟수를 다 썼는지 확인합니다.
    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// 재시도 정책을 적용하는 싱크 래퍼.
pub struct RetryingSink<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: NotificationSink> RetryingSink<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// 감싼 싱크.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<S: NotificationSink> NotificationSink for RetryingSink<S> {
    async fn post(&self, text: &str, reply_to: Option<MessageId>) -> NotificationResult<MessageId> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.inner.post(text, reply_to).await {
                Ok(message_id) => {
                    if attempt > 1 {
                        debug!(sink = self.inner.name(), attempt, "재시도 후 전송 성공");
                    }
                    return Ok(message_id);
                }
                Err(e) if !e.is_retryable() || self.policy.exhausted(attempt) => {
                    warn!(
                        sink = self.inner.name(),
                        attempt,
                        error = %e,
                        "알림 전송 최종 실패"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = match &e {
                        NotificationError::RateLimited(secs) => Duration::from_secs(*secs),
                        _ => self.policy.delay_for(attempt),
                    };
                    warn!(
                        sink = self.inner.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "알림 전송 실패, 재시도 예정"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// 지정된 횟수만큼 실패한 뒤 성공하는 싱크
    struct FlakySink {
        failures: Vec<NotificationError>,
        calls: AtomicU32,
        call_times: Mutex<Vec<Instant>>,
    }

    impl FlakySink {
        fn new(failures: Vec<NotificationError>) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                call_times: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn post(&self, _text: &str, _reply_to: Option<MessageId>) -> NotificationResult<MessageId> {
            self.call_times.lock().unwrap().push(Instant::now());
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match self.failures.get(call) {
                Some(NotificationError::RateLimited(secs)) => {
                    Err(NotificationError::RateLimited(*secs))
                }
                Some(NotificationError::InvalidConfig(msg)) => {
                    Err(NotificationError::InvalidConfig(msg.clone()))
                }
                Some(_) => Err(NotificationError::SendFailed("boom".to_string())),
                None => Ok(100 + call as MessageId),
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn send_failed() -> NotificationError {
        NotificationError::SendFailed("boom".to_string())
    }

    // ========================================================================
    // 정책
    // ========================================================================

    #[test]
    fn test_policy_from_config_uses_mode_defaults() {
        let config = RetryConfig::default();
        let dev = RetryPolicy::from_config(&config, RunMode::Dev);
        let prod = RetryPolicy::from_config(&config, RunMode::Prod);

        assert_eq!(dev.initial_delay, Duration::from_secs(1));
        assert_eq!(prod.initial_delay, Duration::from_secs(5));
        assert_eq!(dev.max_attempts, None);
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::fixed(Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            backoff: BackoffKind::Exponential,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_attempts: None,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for(5), Duration::from_secs(10));
        assert_eq!(policy.delay_for(100), Duration::from_secs(10));
    }

    // ========================================================================
    // 래퍼
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let sink = RetryingSink::new(
            FlakySink::new(vec![send_failed(), send_failed()]),
            RetryPolicy::fixed(Duration::from_secs(5)),
        );

        let started = Instant::now();
        let message_id = sink.post("hello", None).await.unwrap();

        assert_eq!(message_id, 102);
        assert_eq!(sink.inner().calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_retry_after() {
        let sink = RetryingSink::new(
            FlakySink::new(vec![NotificationError::RateLimited(30)]),
            RetryPolicy::fixed(Duration::from_secs(1)),
        );

        sink.post("hello", Some(7)).await.unwrap();

        let times = sink.inner().call_times.lock().unwrap().clone();
        assert_eq!(times.len(), 2);
        assert!(times[1] - times[0] >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let sink = RetryingSink::new(
            FlakySink::new(vec![send_failed(), send_failed(), send_failed()]),
            RetryPolicy::fixed(Duration::from_secs(1)).with_max_attempts(2),
        );

        let result = sink.post("hello", None).await;
        assert!(matches!(result, Err(NotificationError::SendFailed(_))));
        assert_eq!(sink.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_error_is_not_retried() {
        let sink = RetryingSink::new(
            FlakySink::new(vec![NotificationError::InvalidConfig("no token".into())]),
            RetryPolicy::fixed(Duration::from_secs(1)),
        );

        let result = sink.post("hello", None).await;
        assert!(matches!(result, Err(NotificationError::InvalidConfig(_))));
        assert_eq!(sink.inner().calls.load(Ordering::SeqCst), 1);
    }
}
