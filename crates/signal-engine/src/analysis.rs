//! 사이클별 구조 분석.
//!
//! 매 사이클마다 전체 캔들 시리즈와 시드에서 피벗, 상위 피벗, 세그먼트를
//! 처음부터 다시 계산합니다. 이전 사이클의 구조는 재사용하지 않습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_core::{Candle, CandleSeries, PairSeed, Pivot, SignalError, SignalResult};
use tracing::debug;

use crate::higher_order::aggregate;
use crate::order_block::OrderBlockCandidate;
use crate::pivot::detect;
use crate::segment::{SearchWindow, Segment, SegmentBuilder};

/// 한 번의 구조 분석 결과.
#[derive(Debug, Clone, Default)]
pub struct StructureAnalysis {
    /// 하위 피벗 시퀀스
    pub pivots: Vec<Pivot>,
    /// 상위 피벗 (`pivots` 인덱스)
    pub higher_order: Vec<usize>,
    /// 완성된 세그먼트
    pub segments: Vec<Segment>,
}

impl StructureAnalysis {
    /// 시드 시간의 캔들에서 시작해 구조를 계산합니다.
    ///
    /// # Errors
    /// 시드 시간이 시리즈의 어떤 캔들 시작 시간과도 일치하지 않으면
    /// `SignalError::SeedInvalid`.
    pub fn run(series: &CandleSeries, seed: &PairSeed) -> SignalResult<Self> {
        let start_index = series.index_of_time(seed.start_time).ok_or_else(|| {
            SignalError::SeedInvalid(format!(
                "{}: 시드 시간 {}에 해당하는 캔들이 없습니다",
                series.pair, seed.start_time
            ))
        })?;

        let pivots = detect(series, start_index, seed.pivot_type)?;
        let Some(first) = pivots.first() else {
            debug!(pair = %series.pair, "확정된 피벗 없음");
            return Ok(Self::default());
        };

        let higher_order = aggregate(&pivots);
        let segments = SegmentBuilder::new(series, &pivots).build(&higher_order, first.index);

        debug!(
            pair = %series.pair,
            pivots = pivots.len(),
            higher_order = higher_order.len(),
            segments = segments.len(),
            "구조 분석 완료"
        );

        Ok(Self {
            pivots,
            higher_order,
            segments,
        })
    }

    /// 시작 인덱스가 가장 큰 세그먼트. 시작이 같으면 종료가 늦은 것.
    pub fn latest_segment(&self) -> Option<&Segment> {
        self.segments
            .iter()
            .max_by_key(|s| (s.start_index, s.end_index))
    }

    /// 상위 피벗을 순서대로 반환합니다.
    pub fn higher_order_pivots(&self) -> impl Iterator<Item = &Pivot> {
        self.higher_order.iter().filter_map(|&i| self.pivots.get(i))
    }

    /// 주어진 캔들 인덱스 이후에 상위 피벗이 있는지 확인합니다.
    pub fn has_higher_order_after(&self, index: usize) -> bool {
        self.higher_order_pivots().any(|p| p.index > index)
    }

    /// 최신 세그먼트의 포지션 탐색 구간.
    pub fn latest_search_window(&self, series: &CandleSeries) -> Option<SearchWindow> {
        let segment = self.latest_segment()?;
        SegmentBuilder::new(series, &self.pivots).find_position_search_window(segment)
    }
}

/// 검증 모드에서 메시지에 덧붙이는 진단 정보.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalDiagnostics {
    /// 오더블록 베이스 캔들 (OHLC)
    pub base_candle: Option<Candle>,
    pub activation_time: Option<DateTime<Utc>>,
    pub broken_reference_time: Option<DateTime<Utc>>,
    pub window_start_time: Option<DateTime<Utc>>,
    pub window_end_time: Option<DateTime<Utc>>,
    pub segment_start_time: Option<DateTime<Utc>>,
    pub segment_end_time: Option<DateTime<Utc>>,
    /// 최신 세그먼트 범위 안의 상위 피벗 시간
    pub higher_order_pivot_times: Vec<DateTime<Utc>>,
}

impl SignalDiagnostics {
    /// 분석 결과와 후보에서 진단 정보를 모읍니다.
    pub fn collect(
        series: &CandleSeries,
        analysis: &StructureAnalysis,
        window: &SearchWindow,
        candidate: &OrderBlockCandidate,
    ) -> Self {
        let segment = analysis.latest_segment();

        Self {
            base_candle: Some(candidate.base_candle.clone()),
            activation_time: series.time_at(window.activation_threshold),
            broken_reference_time: series.time_at(window.broken_reference.index),
            window_start_time: series.time_at(window.start_index),
            window_end_time: series.time_at(window.end_index),
            segment_start_time: segment.and_then(|s| series.time_at(s.start_index)),
            segment_end_time: segment.and_then(|s| series.time_at(s.end_index)),
            higher_order_pivot_times: segment
                .map(|s| {
                    analysis
                        .higher_order_pivots()
                        .filter(|p| p.index >= s.start_index && p.index <= s.end_index)
                        .filter_map(|p| series.time_at(p.index))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
