//! 지그재그 피벗 타입.

use crate::types::Price;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 피벗 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotType {
    /// 고점
    Peak,
    /// 저점
    Valley,
}

impl PivotType {
    /// 반대 유형을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            PivotType::Peak => PivotType::Valley,
            PivotType::Valley => PivotType::Peak,
        }
    }
}

impl fmt::Display for PivotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotType::Peak => write!(f, "peak"),
            PivotType::Valley => write!(f, "valley"),
        }
    }
}

/// 확정된 피벗.
///
/// 피벗 시퀀스에서 연속된 피벗은 유형이 번갈아 나타나고 인덱스는 엄격히 증가합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pivot {
    /// 피벗 캔들 인덱스
    pub index: usize,
    /// 피벗 유형
    pub pivot_type: PivotType,
    /// 극값 (고점은 고가, 저점은 저가)
    pub value: Price,
}

impl Pivot {
    pub fn peak(index: usize, value: Price) -> Self {
        Self {
            index,
            pivot_type: PivotType::Peak,
            value,
        }
    }

    pub fn valley(index: usize, value: Price) -> Self {
        Self {
            index,
            pivot_type: PivotType::Valley,
            value,
        }
    }

    pub fn is_peak(&self) -> bool {
        self.pivot_type == PivotType::Peak
    }

    pub fn is_valley(&self) -> bool {
        self.pivot_type == PivotType::Valley
    }

    /// 같은 유형 기준으로 다른 피벗보다 더 극단적인지 확인합니다.
    ///
    /// 고점은 더 높을 때, 저점은 더 낮을 때 참입니다. 동일 값은 거짓입니다.
    pub fn is_beyond(&self, other: &Pivot) -> bool {
        match self.pivot_type {
            PivotType::Peak => self.value > other.value,
            PivotType::Valley => self.value < other.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pivot_type_opposite() {
        assert_eq!(PivotType::Peak.opposite(), PivotType::Valley);
        assert_eq!(PivotType::Valley.opposite(), PivotType::Peak);
    }

    #[test]
    fn test_is_beyond() {
        assert!(Pivot::peak(5, dec!(110)).is_beyond(&Pivot::peak(2, dec!(100))));
        assert!(!Pivot::peak(5, dec!(100)).is_beyond(&Pivot::peak(2, dec!(100))));
        assert!(Pivot::valley(5, dec!(90)).is_beyond(&Pivot::valley(2, dec!(95))));
    }
}
