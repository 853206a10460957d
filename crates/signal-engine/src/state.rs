//! 페어별 시그널 상태 머신.
//!
//! 매 폴링 사이클마다 최신 세그먼트를 기록된 세그먼트와 비교해 다음 중 하나를 정합니다.
//!
//! | 상태 | 조건 | 결정 |
//! |------|------|------|
//! | FRESH | 기록된 세그먼트 없음 | 기록 후 탐색 |
//! | TRACKING | 같은 세그먼트이고 이미 탐색함 | 건너뜀 |
//! | TRACKING | 추세 지속 세그먼트이고 종료 이후 상위 피벗 없음 | 건너뜀 |
//! | TRACKING | 그 외 | 탐색 |
//! | 새 세그먼트 | 시작 시간이 더 늦거나, 시작이 같고 종료가 더 늦음 | 기존 포지션 취소 후 탐색 |
//!
//! 반전 직후 같은 피벗에서 시작하는 추세 지속 세그먼트가 나올 수 있으므로
//! 세그먼트는 (시작, 종료) 시간 쌍으로 구분합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_core::{CandleSeries, MessageId, SignalError, SignalResult};
use std::fmt;

use crate::position::Position;
use crate::segment::{FormationMethod, Segment};

/// 탐색을 건너뛰는 이유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// 현재 세그먼트에서 이미 탐색함
    AlreadySearched,
    /// 추세 지속 이후 다음 상위 피벗 대기 중
    AwaitingStructure,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadySearched => write!(f, "already searched"),
            SkipReason::AwaitingStructure => write!(f, "awaiting structure"),
        }
    }
}

/// 사이클 결정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDecision {
    /// 탐색 진행
    Search,
    /// 탐색 생략
    Skip(SkipReason),
    /// 새 세그먼트: 기존 포지션 취소 후 탐색
    CancelAndSearch,
}

/// 세그먼트 식별 시간. 시작 시간 우선, 같으면 종료 시간으로 비교합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentSpan {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl SegmentSpan {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// 시리즈에서 세그먼트의 시작/종료 캔들 시간을 구합니다.
    ///
    /// # Errors
    /// 인덱스가 시리즈 범위를 벗어나면 `SignalError::InvariantViolation`.
    pub fn of(series: &CandleSeries, segment: &Segment) -> SignalResult<Self> {
        let time_at = |index: usize| {
            series.time_at(index).ok_or_else(|| {
                SignalError::InvariantViolation(format!(
                    "세그먼트 인덱스 {}가 시리즈 범위를 벗어남",
                    index
                ))
            })
        };
        Ok(Self::new(time_at(segment.start_index)?, time_at(segment.end_index)?))
    }
}

impl fmt::Display for SegmentSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start_time, self.end_time)
    }
}

/// 한 페어의 상태.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairState {
    /// 게시된 포지션 (게시 순서)
    pub positions: Vec<Position>,
    /// 기록된 최신 세그먼트
    pub latest_segment: Option<SegmentSpan>,
    /// 기록된 세그먼트에서 탐색 구간을 이미 검사했는지
    pub has_been_searched: bool,
}

impl PairState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 최신 세그먼트에 대한 이번 사이클의 결정을 반환합니다.
    ///
    /// `has_higher_order_after_end`는 세그먼트 종료 이후 상위 피벗이 나타났는지 여부입니다.
    pub fn decide(
        &self,
        segment: &Segment,
        span: SegmentSpan,
        has_higher_order_after_end: bool,
    ) -> CycleDecision {
        let Some(recorded) = self.latest_segment else {
            return CycleDecision::Search;
        };

        if span > recorded {
            return CycleDecision::CancelAndSearch;
        }

        if self.has_been_searched {
            return CycleDecision::Skip(SkipReason::AlreadySearched);
        }

        if segment.formation_method == FormationMethod::Continuation && !has_higher_order_after_end
        {
            return CycleDecision::Skip(SkipReason::AwaitingStructure);
        }

        CycleDecision::Search
    }

    /// 세그먼트를 기록합니다.
    pub fn record_segment(&mut self, span: SegmentSpan) {
        self.latest_segment = Some(span);
    }

    /// 새 세그먼트로 전환합니다.
    ///
    /// 모든 포지션을 취소 상태로 바꿔 답장 대상 ID와 함께 반환하고, 포지션 목록을
    /// 비우고, 탐색 플래그를 초기화한 뒤 새 세그먼트를 기록합니다.
    ///
    /// # Errors
    /// 진입했거나 게시되지 않은 포지션이 있으면 `SignalError::InvariantViolation`을
    /// 반환하며 상태는 바뀌지 않습니다.
    pub fn begin_new_segment(
        &mut self,
        span: SegmentSpan,
        repost_offset: i64,
    ) -> SignalResult<Vec<(Position, MessageId)>> {
        if let Some(position) = self
            .positions
            .iter()
            .find(|p| p.has_been_entered || p.message_id.is_none())
        {
            return Err(SignalError::InvariantViolation(format!(
                "취소할 수 없는 포지션이 있습니다: {} (entered={}, message_id={:?})",
                position.order_block_id, position.has_been_entered, position.message_id
            )));
        }

        let mut canceled = Vec::with_capacity(self.positions.len());
        for mut position in self.positions.drain(..) {
            let reply_to = position.cancel_reply_target(repost_offset)?;
            canceled.push((position, reply_to));
        }

        self.has_been_searched = false;
        self.record_segment(span);
        Ok(canceled)
    }

    /// 현재 세그먼트 탐색 완료를 기록합니다.
    pub fn mark_searched(&mut self) {
        self.has_been_searched = true;
    }

    /// 게시된 포지션을 추가합니다.
    pub fn add_position(&mut self, position: Position) {
        self.positions.push(position);
    }
}
