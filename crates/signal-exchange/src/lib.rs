//! 시장 데이터 조회.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - MarketDataSource trait: 페어별 캔들 시리즈 조회 인터페이스
//! - Binance USDⓈ-M 선물 kline 커넥터 (페이지 자동 처리)

pub mod connector;
pub mod error;
pub mod traits;

pub use connector::BinanceFuturesClient;
pub use error::*;
pub use traits::*;
