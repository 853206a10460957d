//! 방향성 세그먼트(레그) 구성.
//!
//! 상위 피벗을 앞으로 걸으며 `origin = ho[k]`에서 `extreme = ho[k+1]`로 향하는
//! 레그를 만듭니다. `extreme` 이후 캔들을 순서대로 보며 먼저 일어난 사건이
//! 레그의 종료 방식을 결정합니다.
//!
//! - 추세 방향으로 `extreme`을 넘어 마감: 추세 지속(continuation). 방향 유지, `ho[k+2]`에서 재개
//! - 반대 방향으로 `origin`을 넘어 마감: 반전(reversal). 방향 전환, `ho[k+1]`에서 재개
//!
//! 어느 쪽도 일어나지 않으면 레그는 미완성이며 구성이 멈춥니다.

use serde::{Deserialize, Serialize};
use signal_core::{CandleSeries, Pivot, PivotType, Side};
use std::fmt;
use tracing::debug;

/// 세그먼트 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentDirection {
    /// 상승
    Ascending,
    /// 하락
    Descending,
}

impl SegmentDirection {
    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            SegmentDirection::Ascending => SegmentDirection::Descending,
            SegmentDirection::Descending => SegmentDirection::Ascending,
        }
    }

    /// 이 방향에서 진입하는 시그널 방향.
    pub fn side(&self) -> Side {
        match self {
            SegmentDirection::Ascending => Side::Long,
            SegmentDirection::Descending => Side::Short,
        }
    }

    /// 레그가 시작되는 피벗 유형 (상승은 저점).
    pub fn origin_type(&self) -> PivotType {
        match self {
            SegmentDirection::Ascending => PivotType::Valley,
            SegmentDirection::Descending => PivotType::Peak,
        }
    }

    fn from_origin(origin: &Pivot) -> Self {
        match origin.pivot_type {
            PivotType::Valley => SegmentDirection::Ascending,
            PivotType::Peak => SegmentDirection::Descending,
        }
    }
}

impl fmt::Display for SegmentDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentDirection::Ascending => write!(f, "ascending"),
            SegmentDirection::Descending => write!(f, "descending"),
        }
    }
}

/// 세그먼트 종료 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormationMethod {
    /// 추세 방향 고점/저점 돌파 (BOS)
    Continuation,
    /// 레그 시작점 반대 돌파
    Reversal,
}

impl fmt::Display for FormationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormationMethod::Continuation => write!(f, "continuation"),
            FormationMethod::Reversal => write!(f, "reversal"),
        }
    }
}

/// 완성된 세그먼트.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// 시작 캔들 인덱스
    pub start_index: usize,
    /// 종료 조건을 만족한 캔들 인덱스 (`start_index`보다 큼)
    pub end_index: usize,
    /// 방향
    pub direction: SegmentDirection,
    /// 종료 방식
    pub formation_method: FormationMethod,
    /// 오더블록 탐색 시작 인덱스
    pub order_block_search_start_index: usize,
    /// 돌파된 기준 피벗 인덱스
    pub broken_reference_index: usize,
}

/// 포지션 탐색 구간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    /// 시그널 방향
    pub side: Side,
    /// 탐색 시작 인덱스 (포함)
    pub start_index: usize,
    /// 탐색 종료 인덱스 (제외)
    pub end_index: usize,
    /// 기준을 돌파한 캔들 인덱스. 조건 검사는 이 인덱스 직전까지
    pub activation_threshold: usize,
    /// 돌파된 기준 피벗
    pub broken_reference: Pivot,
}

impl SearchWindow {
    /// 베이스 피벗 유형 (롱은 저점).
    pub fn base_pivot_type(&self) -> PivotType {
        match self.side {
            Side::Long => PivotType::Valley,
            Side::Short => PivotType::Peak,
        }
    }

    /// 구간 안의 베이스 유형 피벗을 인덱스 순서로 반환합니다.
    pub fn eligible_pivots<'a>(&'a self, pivots: &'a [Pivot]) -> impl Iterator<Item = &'a Pivot> {
        let base_type = self.base_pivot_type();
        pivots.iter().filter(move |p| {
            p.pivot_type == base_type && p.index >= self.start_index && p.index < self.end_index
        })
    }
}

/// 세그먼트 구성기.
pub struct SegmentBuilder<'a> {
    series: &'a CandleSeries,
    pivots: &'a [Pivot],
}

impl<'a> SegmentBuilder<'a> {
    pub fn new(series: &'a CandleSeries, pivots: &'a [Pivot]) -> Self {
        Self { series, pivots }
    }

    /// `starting_point` 이후의 상위 피벗으로 세그먼트 목록을 만듭니다.
    pub fn build(&self, higher_order_indices: &[usize], starting_point: usize) -> Vec<Segment> {
        let ho: Vec<&Pivot> = higher_order_indices
            .iter()
            .filter_map(|&i| self.pivots.get(i))
            .filter(|p| p.index >= starting_point)
            .collect();

        let mut segments = Vec::new();
        let mut k = 0;

        while k + 1 < ho.len() {
            let origin = ho[k];
            let extreme = ho[k + 1];
            let direction = SegmentDirection::from_origin(origin);

            let Some((end_index, method)) = self.find_leg_end(origin, extreme, direction) else {
                break;
            };

            let segment = match method {
                FormationMethod::Continuation => Segment {
                    start_index: origin.index,
                    end_index,
                    direction,
                    formation_method: method,
                    order_block_search_start_index: extreme.index,
                    broken_reference_index: extreme.index,
                },
                FormationMethod::Reversal => Segment {
                    start_index: extreme.index,
                    end_index,
                    direction: direction.opposite(),
                    formation_method: method,
                    order_block_search_start_index: extreme.index,
                    broken_reference_index: origin.index,
                },
            };

            debug!(
                pair = %self.series.pair,
                start = segment.start_index,
                end = segment.end_index,
                direction = %segment.direction,
                method = %segment.formation_method,
                "세그먼트 확정"
            );

            segments.push(segment);
            k += match method {
                FormationMethod::Continuation => 2,
                FormationMethod::Reversal => 1,
            };
        }

        segments
    }

    fn find_leg_end(
        &self,
        origin: &Pivot,
        extreme: &Pivot,
        direction: SegmentDirection,
    ) -> Option<(usize, FormationMethod)> {
        self.series
            .candles()
            .iter()
            .skip(extreme.index + 1)
            .find_map(|candle| match direction {
                SegmentDirection::Ascending if candle.close > extreme.value => {
                    Some((candle.index, FormationMethod::Continuation))
                }
                SegmentDirection::Ascending if candle.close < origin.value => {
                    Some((candle.index, FormationMethod::Reversal))
                }
                SegmentDirection::Descending if candle.close < extreme.value => {
                    Some((candle.index, FormationMethod::Continuation))
                }
                SegmentDirection::Descending if candle.close > origin.value => {
                    Some((candle.index, FormationMethod::Reversal))
                }
                _ => None,
            })
    }

    /// 기준 피벗 이후 처음으로 그 값을 종가로 돌파한 캔들을 찾습니다.
    ///
    /// 상승은 종가가 기준 위, 하락은 종가가 기준 아래일 때 돌파입니다.
    /// `reference_pivot_index`가 피벗이 아니거나 시리즈 끝까지 돌파가 없으면 `None`입니다.
    pub fn detect_first_break(
        &self,
        reference_pivot_index: usize,
        direction: SegmentDirection,
    ) -> Option<(Pivot, usize)> {
        let reference = self
            .pivots
            .binary_search_by_key(&reference_pivot_index, |p| p.index)
            .ok()
            .map(|i| self.pivots[i])?;

        self.series
            .candles()
            .iter()
            .skip(reference.index + 1)
            .find(|candle| match direction {
                SegmentDirection::Ascending => candle.close > reference.value,
                SegmentDirection::Descending => candle.close < reference.value,
            })
            .map(|candle| (reference, candle.index))
    }

    /// 완성된 세그먼트의 포지션 탐색 구간을 구합니다.
    ///
    /// 시작은 세그먼트의 오더블록 탐색 시작 인덱스, 끝은 세그먼트 종료 이전의 가장
    /// 최근 추세 방향 피벗(상승은 고점)입니다. 그 피벗을 종가로 돌파한 캔들이
    /// 활성화 기준이 됩니다. 기준 피벗이 탐색 시작 이전이면(탐색 시작과 돌파 사이에
    /// 하위 피벗이 없으면) 끝은 활성화 캔들입니다. 돌파가 없거나 돌파 캔들이 아직
    /// 진행 중인 마지막 캔들이면 구간이 정의되지 않으며, 호출자는 다음 사이클로
    /// 미뤄야 합니다.
    pub fn find_position_search_window(&self, segment: &Segment) -> Option<SearchWindow> {
        let reference_type = segment.direction.origin_type().opposite();
        let reference = self
            .pivots
            .iter()
            .rev()
            .find(|p| p.pivot_type == reference_type && p.index <= segment.end_index)?;

        let (broken, activation) = self.detect_first_break(reference.index, segment.direction)?;

        let last_index = self.series.last_index()?;
        if activation >= last_index {
            debug!(
                pair = %self.series.pair,
                activation,
                "활성화 캔들이 아직 마감되지 않아 탐색을 미룹니다"
            );
            return None;
        }

        let start_index = segment.order_block_search_start_index;
        let end_index = if broken.index > start_index {
            broken.index
        } else {
            activation
        };

        Some(SearchWindow {
            side: segment.direction.side(),
            start_index,
            end_index,
            activation_threshold: activation,
            broken_reference: broken,
        })
    }
}
