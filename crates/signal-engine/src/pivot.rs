//! 지그재그 피벗 탐지.
//!
//! 시작 인덱스의 캔들을 지정된 유형의 확정 피벗으로 간주하고 앞으로 스캔합니다.
//! 마지막 확정 피벗의 반대 유형을 찾는 동안 극값 캔들을 추적하다가, 이후 캔들의
//! 종가가 극값 캔들의 반대쪽 끝을 넘으면 그 극값 캔들을 피벗으로 확정합니다.
//!
//! - 고점: 가장 높은 고가 캔들. 이후 종가가 그 캔들의 저가 아래로 마감하면 확정
//! - 저점: 가장 낮은 저가 캔들. 이후 종가가 그 캔들의 고가 위로 마감하면 확정
//!
//! 같은 극값이 여러 캔들에 나타나면 가장 이른 캔들을 피벗으로 봅니다.

use signal_core::{CandleSeries, Pivot, PivotType, SignalError, SignalResult};
use tracing::trace;

/// 캔들 시리즈에서 교대하는 피벗 시퀀스를 추출합니다.
///
/// 반환 시퀀스의 첫 원소는 시드 피벗입니다. 확정된 반전이 하나도 없으면
/// 빈 시퀀스를 반환합니다.
///
/// # Errors
/// `start_index`가 시리즈 범위를 벗어나면 `SignalError::SeedInvalid`를 반환합니다.
pub fn detect(
    series: &CandleSeries,
    start_index: usize,
    initial_pivot_type: PivotType,
) -> SignalResult<Vec<Pivot>> {
    let Some(seed_candle) = series.get(start_index) else {
        return Err(SignalError::SeedInvalid(format!(
            "{}: 시작 인덱스 {}가 시리즈 길이 {}를 벗어납니다",
            series.pair,
            start_index,
            series.len()
        )));
    };

    let seed = match initial_pivot_type {
        PivotType::Peak => Pivot::peak(start_index, seed_candle.high),
        PivotType::Valley => Pivot::valley(start_index, seed_candle.low),
    };

    let mut pivots = vec![seed];
    let mut cursor = start_index + 1;

    while let Some(pivot) = find_next_pivot(series, cursor, pivots[pivots.len() - 1].pivot_type) {
        trace!(
            pair = %series.pair,
            index = pivot.index,
            pivot_type = %pivot.pivot_type,
            value = %pivot.value,
            "피벗 확정"
        );
        cursor = pivot.index + 1;
        pivots.push(pivot);
    }

    if pivots.len() < 2 {
        return Ok(Vec::new());
    }

    Ok(pivots)
}

/// `cursor`부터 `last_type`의 반대 유형 피벗 하나를 찾습니다.
fn find_next_pivot(series: &CandleSeries, cursor: usize, last_type: PivotType) -> Option<Pivot> {
    let seeking = last_type.opposite();
    let candles = series.candles();
    let mut extreme: Option<usize> = None;

    for candle in candles.iter().skip(cursor) {
        let Some(ext) = extreme else {
            extreme = Some(candle.index);
            continue;
        };
        let ext_candle = &candles[ext];

        match seeking {
            PivotType::Peak => {
                if candle.high > ext_candle.high {
                    extreme = Some(candle.index);
                } else if candle.close < ext_candle.low {
                    return Some(Pivot::peak(ext, ext_candle.high));
                }
            }
            PivotType::Valley => {
                if candle.low < ext_candle.low {
                    extreme = Some(candle.index);
                } else if candle.close > ext_candle.high {
                    return Some(Pivot::valley(ext, ext_candle.low));
                }
            }
        }
    }

    None
}
