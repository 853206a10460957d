//! 알림 타입 및 trait 정의.

use async_trait::async_trait;
use signal_core::{MessageId, SignalError};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::info;

/// 알림 작업용 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림 에러.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("알림 전송 실패: {0}")]
    SendFailed(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("요청 한도 초과: {0}초 후 재시도")]
    RateLimited(u64),

    #[error("API 응답 에러: {0}")]
    ApiError(String),

    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl NotificationError {
    /// 다시 보내면 성공할 수 있는 에러인지 확인합니다.
    ///
    /// 설정 에러는 재시도해도 바뀌지 않습니다.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, NotificationError::InvalidConfig(_))
    }
}

impl From<NotificationError> for SignalError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::InvalidConfig(msg) => SignalError::Config(msg),
            other => SignalError::DeliveryFailure(other.to_string()),
        }
    }
}

/// 알림 채널.
///
/// `post`는 채널이 게시를 확인하고 메시지 ID를 돌려줄 때만 성공합니다.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// 메시지를 게시합니다. `reply_to`가 있으면 해당 메시지에 답장합니다.
    async fn post(&self, text: &str, reply_to: Option<MessageId>) -> NotificationResult<MessageId>;

    /// 싱크 이름을 반환합니다.
    fn name(&self) -> &str;
}

/// 메시지를 로그로만 남기는 싱크.
///
/// 채널 설정 없이 실행할 때 사용하며 1부터 증가하는 메시지 ID를 부여합니다.
#[derive(Debug, Default)]
pub struct LogSink {
    next_id: AtomicI64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn post(&self, text: &str, reply_to: Option<MessageId>) -> NotificationResult<MessageId> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        info!(message_id, ?reply_to, "드라이런 메시지:\n{}", text);
        Ok(message_id)
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_assigns_increasing_ids() {
        let sink = LogSink::new();
        assert_eq!(sink.post("first", None).await.unwrap(), 1);
        assert_eq!(sink.post("Cancel", Some(1)).await.unwrap(), 2);
    }

    #[test]
    fn test_error_conversion() {
        let err: SignalError = NotificationError::RateLimited(5).into();
        assert!(matches!(err, SignalError::DeliveryFailure(_)));

        let err: SignalError = NotificationError::InvalidConfig("token".into()).into();
        assert!(err.is_fatal());
        assert!(!NotificationError::InvalidConfig("token".into()).is_retryable());
    }
}
