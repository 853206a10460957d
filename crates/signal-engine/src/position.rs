//! 포지션 가격 산출.
//!
//! [`PositionFactory`]는 오더블록 후보에서 진입가, 손절가, 익절 목표를 계산해
//! 완성된 [`Position`] 값을 만듭니다. 게시 후 상태 변경은 [`Position`]의
//! 메서드로만 일어납니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use signal_core::{
    MessageId, PositionConfig, Price, Side, SignalError, SignalResult, StoplossMode,
};
use std::fmt;

use crate::order_block::OrderBlockCandidate;

/// 포지션 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    /// 게시되어 진입 대기 중
    Active,
    /// 진입됨
    Entered,
    /// 취소됨
    Canceled,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Active => write!(f, "ACTIVE"),
            PositionStatus::Entered => write!(f, "ENTERED"),
            PositionStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// 시그널 포지션.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// 방향
    pub side: Side,
    /// 진입가
    pub entry_price: Price,
    /// 손절가
    pub stoploss: Price,
    /// 익절 목표 (진입가에서 멀어지는 순서)
    pub target_list: Vec<Price>,
    /// 상태
    pub status: PositionStatus,
    /// 게시된 메시지 ID
    pub message_id: Option<MessageId>,
    /// 진입 여부
    pub has_been_entered: bool,
    /// 생성한 오더블록 ID
    pub order_block_id: String,
}

impl Position {
    /// 진입가와 손절가 사이 거리.
    pub fn height(&self) -> Price {
        (self.entry_price - self.stoploss).abs()
    }

    /// 게시된 메시지 ID를 기록합니다.
    pub fn mark_posted(&mut self, message_id: MessageId) {
        self.message_id = Some(message_id);
    }

    /// 진입을 기록합니다. 이후 취소는 불가능합니다.
    pub fn register_entered(&mut self) {
        self.has_been_entered = true;
        self.status = PositionStatus::Entered;
    }

    /// 취소 메시지를 보낼 답장 대상 ID를 반환하고 상태를 취소로 바꿉니다.
    ///
    /// # Errors
    /// 이미 진입했거나 게시된 적이 없으면 `SignalError::InvariantViolation`을 반환하며
    /// 상태는 바뀌지 않습니다.
    pub fn cancel_reply_target(&mut self, repost_offset: i64) -> SignalResult<MessageId> {
        if self.has_been_entered {
            return Err(SignalError::InvariantViolation(format!(
                "진입한 포지션은 취소할 수 없습니다: {}",
                self.order_block_id
            )));
        }
        let Some(message_id) = self.message_id else {
            return Err(SignalError::InvariantViolation(format!(
                "게시되지 않은 포지션은 취소할 수 없습니다: {}",
                self.order_block_id
            )));
        };

        self.status = PositionStatus::Canceled;
        Ok(message_id + repost_offset)
    }
}

/// 포지션 생성기.
#[derive(Debug, Clone)]
pub struct PositionFactory {
    config: PositionConfig,
}

impl PositionFactory {
    pub fn new(config: &PositionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 오더블록 후보에서 포지션을 만듭니다.
    ///
    /// # Errors
    /// 진입가와 손절가가 같아 리스크 높이가 0이면 `SignalError::InvariantViolation`.
    pub fn from_order_block(&self, candidate: &OrderBlockCandidate) -> SignalResult<Position> {
        let side = candidate.side;
        let entry_price = match side {
            Side::Long => candidate.top,
            Side::Short => candidate.bottom,
        };

        let stoploss = match self.config.stoploss_mode {
            StoplossMode::BaseCandle => match side {
                Side::Long => candidate.bottom,
                Side::Short => candidate.top,
            },
            StoplossMode::LiquidityDistance => {
                let distance = self.config.stoploss_coeff
                    * (entry_price - candidate.initial_reference_liquidity).abs();
                match side {
                    Side::Long => entry_price - distance,
                    Side::Short => entry_price + distance,
                }
            }
        };

        let height = (entry_price - stoploss).abs();
        if height <= Decimal::ZERO {
            return Err(SignalError::InvariantViolation(format!(
                "포지션 높이가 0입니다: {}",
                candidate.id
            )));
        }

        let target_list = self
            .config
            .risk_multiples
            .iter()
            .map(|m| match side {
                Side::Long => entry_price + *m * height,
                Side::Short => entry_price - *m * height,
            })
            .collect();

        Ok(Position {
            side,
            entry_price,
            stoploss,
            target_list,
            status: PositionStatus::Active,
            message_id: None,
            has_been_entered: false,
            order_block_id: candidate.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use signal_core::Candle;

    fn candidate(side: Side, top: Decimal, bottom: Decimal, liquidity: Decimal) -> OrderBlockCandidate {
        OrderBlockCandidate {
            id: format!("TESTUSDT-0-{side}"),
            base_candle: Candle {
                index: 44,
                time: Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
                open: top,
                high: top,
                low: bottom,
                close: bottom,
            },
            initial_reference_liquidity: liquidity,
            side,
            top,
            bottom,
            exit_index: Some(46),
            reentry_ok: true,
            imbalance_ok: true,
            invalidation_ok: true,
        }
    }

    #[test]
    fn test_long_from_base_candle() {
        let factory = PositionFactory::new(&PositionConfig::default());
        let position = factory
            .from_order_block(&candidate(Side::Long, dec!(137), dec!(130), dec!(130)))
            .unwrap();

        assert_eq!(position.entry_price, dec!(137));
        assert_eq!(position.stoploss, dec!(130));
        assert_eq!(position.target_list, vec![dec!(158), dec!(172), dec!(186)]);
        assert_eq!(position.status, PositionStatus::Active);
        assert!(position.message_id.is_none());
    }

    #[test]
    fn test_short_from_base_candle() {
        let factory = PositionFactory::new(&PositionConfig::default());
        let position = factory
            .from_order_block(&candidate(Side::Short, dec!(21), dec!(19), dec!(21)))
            .unwrap();

        assert_eq!(position.entry_price, dec!(19));
        assert_eq!(position.stoploss, dec!(21));
        assert_eq!(position.target_list, vec![dec!(13), dec!(9), dec!(5)]);
    }

    #[test]
    fn test_liquidity_distance_stoploss() {
        let config = PositionConfig {
            stoploss_mode: StoplossMode::LiquidityDistance,
            stoploss_coeff: dec!(1.5),
            ..PositionConfig::default()
        };
        let factory = PositionFactory::new(&config);
        let position = factory
            .from_order_block(&candidate(Side::Long, dec!(137), dec!(130), dec!(133)))
            .unwrap();

        // 거리 4 × 1.5 = 6
        assert_eq!(position.stoploss, dec!(131));
        assert_eq!(position.target_list[0], dec!(155));
    }

    #[test]
    fn test_zero_height_is_invariant_violation() {
        let config = PositionConfig {
            stoploss_mode: StoplossMode::LiquidityDistance,
            ..PositionConfig::default()
        };
        let factory = PositionFactory::new(&config);
        let result = factory.from_order_block(&candidate(Side::Long, dec!(137), dec!(130), dec!(137)));

        assert!(matches!(result, Err(SignalError::InvariantViolation(_))));
    }

    // ==================== 취소 ====================

    #[test]
    fn test_cancel_reply_target_applies_offset() {
        let factory = PositionFactory::new(&PositionConfig::default());
        let mut position = factory
            .from_order_block(&candidate(Side::Long, dec!(137), dec!(130), dec!(130)))
            .unwrap();
        position.mark_posted(501);

        assert_eq!(position.clone().cancel_reply_target(0).unwrap(), 501);
        assert_eq!(position.cancel_reply_target(1).unwrap(), 502);
        assert_eq!(position.status, PositionStatus::Canceled);
    }

    #[test]
    fn test_cancel_entered_position_fails() {
        let factory = PositionFactory::new(&PositionConfig::default());
        let mut position = factory
            .from_order_block(&candidate(Side::Long, dec!(137), dec!(130), dec!(130)))
            .unwrap();
        position.mark_posted(501);
        position.register_entered();

        let result = position.cancel_reply_target(0);
        assert!(matches!(result, Err(SignalError::InvariantViolation(_))));
        assert_eq!(position.status, PositionStatus::Entered);
    }

    #[test]
    fn test_cancel_unposted_position_fails() {
        let factory = PositionFactory::new(&PositionConfig::default());
        let mut position = factory
            .from_order_block(&candidate(Side::Long, dec!(137), dec!(130), dec!(130)))
            .unwrap();

        assert!(position.cancel_reply_target(0).is_err());
    }
}
