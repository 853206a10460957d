//! 시장 데이터 소스 trait 정의.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use signal_core::CandleSeries;

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 캔들 시리즈 제공자.
///
/// 구현체는 거래소의 요청당 캔들 수 제한을 내부에서 페이지 단위로 처리하고,
/// `start_time`부터 현재까지의 캔들을 이어 붙여 반환해야 합니다.
/// 여러 페어를 동시에 조회할 수 있도록 `Send + Sync`여야 합니다.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 소스 이름 반환.
    fn name(&self) -> &str;

    /// `start_time`부터 현재까지의 캔들을 조회합니다.
    async fn fetch(&self, pair: &str, start_time: DateTime<Utc>) -> ExchangeResult<CandleSeries>;
}
