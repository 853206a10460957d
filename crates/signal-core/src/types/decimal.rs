//! 정밀한 가격 계산을 위한 Decimal 유틸리티.

use rust_decimal::{Decimal, RoundingStrategy};

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 비율 타입 (0.1 = 박스 높이의 10%).
pub type Ratio = Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 지정된 소수점 자릿수로 반올림하고 불필요한 0을 제거합니다.
    fn round_price(&self, dp: u32) -> Decimal;

    /// 두 값 사이의 절대 거리를 반환합니다.
    fn distance_to(&self, other: Decimal) -> Decimal;
}

impl DecimalExt for Decimal {
    fn round_price(&self, dp: u32) -> Decimal {
        self.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
    }

    fn distance_to(&self, other: Decimal) -> Decimal {
        (*self - other).abs()
    }
}
