//! 오더블록 후보 스캔.
//!
//! 탐색 구간 안의 베이스 유형 피벗마다 베이스 캔들을 앞에서부터 교체해 가며
//! 네 가지 조건(이탈, 재진입, 임밸런스, 무효화 없음)을 검사합니다.
//! 조건을 모두 만족하는 첫 베이스 캔들이 후보가 됩니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use signal_core::{Candle, CandleSeries, Pivot, Price, PriceBasis, ScannerConfig, Side};
use tracing::{debug, trace};

use crate::segment::SearchWindow;

/// 오더블록 후보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBlockCandidate {
    /// `{pair}-{베이스 캔들 시간(ms)}-{side}`
    pub id: String,
    /// 베이스 캔들
    pub base_candle: Candle,
    /// 기준 피벗 값
    pub initial_reference_liquidity: Price,
    /// 방향
    pub side: Side,
    /// 베이스 캔들 고가
    pub top: Price,
    /// 베이스 캔들 저가
    pub bottom: Price,
    /// 이탈 캔들 인덱스
    pub exit_index: Option<usize>,
    pub reentry_ok: bool,
    pub imbalance_ok: bool,
    pub invalidation_ok: bool,
}

impl OrderBlockCandidate {
    /// 모든 조건을 만족하는지 확인합니다.
    pub fn is_valid(&self) -> bool {
        self.exit_index.is_some() && self.reentry_ok && self.imbalance_ok && self.invalidation_ok
    }

    /// 베이스 캔들 높이.
    pub fn height(&self) -> Price {
        self.top - self.bottom
    }
}

/// 오더블록 스캐너.
#[derive(Debug, Clone)]
pub struct OrderBlockScanner {
    config: ScannerConfig,
}

impl OrderBlockScanner {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 탐색 구간의 적격 피벗을 인덱스 순서로 검사해 첫 유효 후보를 반환합니다.
    pub fn scan(
        &self,
        series: &CandleSeries,
        pivots: &[Pivot],
        window: &SearchWindow,
    ) -> Option<OrderBlockCandidate> {
        for pivot in window.eligible_pivots(pivots) {
            if let Some(candidate) =
                self.scan_pivot(series, pivots, pivot, window.activation_threshold)
            {
                debug!(
                    pair = %series.pair,
                    pivot = pivot.index,
                    base = candidate.base_candle.index,
                    side = %candidate.side,
                    "오더블록 후보 발견"
                );
                return Some(candidate);
            }
        }

        debug!(
            pair = %series.pair,
            start = window.start_index,
            end = window.end_index,
            "구간 내 유효한 오더블록 없음"
        );
        None
    }

    /// 피벗 하나에 대해 베이스 캔들을 교체해 가며 첫 유효 후보를 찾습니다.
    ///
    /// 베이스 캔들은 피벗 인덱스부터 교체 기준(다음 반대 유형 피벗 또는 마지막
    /// 인덱스) 직전까지입니다.
    pub fn scan_pivot(
        &self,
        series: &CandleSeries,
        pivots: &[Pivot],
        pivot: &Pivot,
        activation_threshold: usize,
    ) -> Option<OrderBlockCandidate> {
        let last_index = series.last_index()?;
        let replacement_threshold = pivots
            .iter()
            .find(|p| p.index > pivot.index && p.pivot_type != pivot.pivot_type)
            .map(|p| p.index)
            .unwrap_or(last_index);

        let side = if pivot.is_valley() { Side::Long } else { Side::Short };

        (pivot.index..replacement_threshold)
            .filter_map(|base| series.get(base))
            .filter(|base| base.range() > Decimal::ZERO)
            .map(|base| self.evaluate(series, base, pivot.value, side, activation_threshold))
            .find(|candidate| {
                trace!(
                    pair = %series.pair,
                    base = candidate.base_candle.index,
                    exit = ?candidate.exit_index,
                    reentry = candidate.reentry_ok,
                    imbalance = candidate.imbalance_ok,
                    invalidation = candidate.invalidation_ok,
                    "베이스 캔들 검사"
                );
                candidate.is_valid()
            })
    }

    fn evaluate(
        &self,
        series: &CandleSeries,
        base: &Candle,
        liquidity: Price,
        side: Side,
        activation: usize,
    ) -> OrderBlockCandidate {
        let mut candidate = OrderBlockCandidate {
            id: format!("{}-{}-{}", series.pair, base.time.timestamp_millis(), side),
            base_candle: base.clone(),
            initial_reference_liquidity: liquidity,
            side,
            top: base.high,
            bottom: base.low,
            exit_index: None,
            reentry_ok: false,
            imbalance_ok: false,
            invalidation_ok: false,
        };

        let candles = series.candles();
        let activation = activation.min(candles.len());
        if base.index + 1 >= activation {
            return candidate;
        }
        let after_base = &candles[base.index + 1..activation];

        candidate.exit_index = after_base
            .iter()
            .find(|c| self.exits(c, &candidate))
            .map(|c| c.index);

        // 이탈이 없으면 나머지 조건은 보지 않습니다
        let Some(exit) = candidate.exit_index else {
            return candidate;
        };

        candidate.reentry_ok = candles[exit + 1..activation]
            .iter()
            .any(|c| self.touches(c, &candidate));

        candidate.imbalance_ok = candles[base.index..activation]
            .windows(3)
            .any(|w| self.has_gap(&w[0], &w[2], &candidate));

        candidate.invalidation_ok = !after_base.iter().any(|c| self.breaks(c, &candidate));

        candidate
    }

    fn exits(&self, candle: &Candle, ob: &OrderBlockCandidate) -> bool {
        match (ob.side, self.config.exit_basis) {
            (Side::Long, PriceBasis::Wick) => candle.low > ob.top,
            (Side::Long, PriceBasis::Close) => candle.close > ob.top,
            (Side::Short, PriceBasis::Wick) => candle.high < ob.bottom,
            (Side::Short, PriceBasis::Close) => candle.close < ob.bottom,
        }
    }

    fn touches(&self, candle: &Candle, ob: &OrderBlockCandidate) -> bool {
        let tolerance = self.config.touch_tolerance * ob.height();
        match ob.side {
            Side::Long => candle.low <= ob.top + tolerance,
            Side::Short => candle.high >= ob.bottom - tolerance,
        }
    }

    fn has_gap(&self, first: &Candle, third: &Candle, ob: &OrderBlockCandidate) -> bool {
        let min_gap = self.config.min_gap_ratio * ob.height();
        match ob.side {
            Side::Long => third.low - first.high > min_gap,
            Side::Short => first.low - third.high > min_gap,
        }
    }

    fn breaks(&self, candle: &Candle, ob: &OrderBlockCandidate) -> bool {
        let tolerance = self.config.break_tolerance * ob.height();
        match (ob.side, self.config.break_basis) {
            (Side::Long, PriceBasis::Close) => candle.close < ob.bottom - tolerance,
            (Side::Long, PriceBasis::Wick) => candle.low < ob.bottom - tolerance,
            (Side::Short, PriceBasis::Close) => candle.close > ob.top + tolerance,
            (Side::Short, PriceBasis::Wick) => candle.high > ob.top + tolerance,
        }
    }
}
