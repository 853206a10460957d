//! 시그널 시스템의 에러 타입.
//!
//! 이 모듈은 시그널 엔진 전반에서 사용되는 에러 분류 체계를 정의합니다.
//! 각 변형은 복구 방식이 다릅니다:
//! - 데이터 없음/구조 미완성: 이번 사이클만 건너뛰고 다음 사이클에 재시도
//! - 잘못된 시드: 설정이 수정될 때까지 해당 페어 건너뜀
//! - 전송 실패: 재시도 정책에 따라 계속 재시도
//! - 불변식 위반: 상태 머신 버그이므로 반드시 호출자에게 전달

use thiserror::Error;

/// 핵심 시그널 에러.
#[derive(Debug, Error)]
pub enum SignalError {
    /// 캔들 조회 실패 또는 빈 시리즈
    #[error("데이터 없음: {0}")]
    DataUnavailable(String),

    /// 설정된 시작 피벗 유형/시간이 실제 캔들과 맞지 않음
    #[error("잘못된 시드: {0}")]
    SeedInvalid(String),

    /// 완성된 세그먼트나 돌파된 기준이 아직 없음
    #[error("구조 미완성: {0}")]
    StructureIncomplete(String),

    /// 알림 전송 실패
    #[error("전송 실패: {0}")]
    DeliveryFailure(String),

    /// 상태 머신 불변식 위반 (예: 진입한 포지션 취소 시도)
    #[error("불변식 위반: {0}")]
    InvariantViolation(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

/// 시그널 작업을 위한 Result 타입.
pub type SignalResult<T> = Result<T, SignalError>;

impl SignalError {
    /// 다음 폴링 사이클에서 자연히 복구되는 에러인지 확인합니다.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SignalError::DataUnavailable(_)
                | SignalError::StructureIncomplete(_)
                | SignalError::DeliveryFailure(_)
        )
    }

    /// 치명적인 에러인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SignalError::InvariantViolation(_) | SignalError::Config(_)
        )
    }
}

impl From<config::ConfigError> for SignalError {
    fn from(err: config::ConfigError) -> Self {
        SignalError::Config(err.to_string())
    }
}
