//! 폴링 사이클 통계.

use std::time::Duration;

/// 한 사이클의 처리 통계
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    /// 사이클 번호 (1부터)
    pub cycle: u64,
    /// 대상 페어 수
    pub pairs: usize,
    /// 캔들 조회 성공
    pub fetched: usize,
    /// 캔들 조회 실패
    pub fetch_failures: usize,
    /// 이번 사이클에 분석 또는 게시 에러가 난 페어
    pub errors: usize,
    /// 시드 오류로 제외된 페어
    pub excluded: usize,
    /// 상태 머신이 탐색을 생략한 페어
    pub skipped: usize,
    /// 세그먼트나 탐색 구간이 아직 없는 페어
    pub awaiting: usize,
    /// 탐색 구간 검사 횟수
    pub searches: usize,
    /// 게시한 시그널 수
    pub signals: usize,
    /// 게시한 취소 메시지 수
    pub cancellations: usize,
    /// 소요 시간
    pub elapsed: Duration,
}

impl CycleStats {
    pub fn new(cycle: u64, pairs: usize) -> Self {
        Self {
            cycle,
            pairs,
            ..Default::default()
        }
    }

    /// 조회 성공률 (%)
    pub fn fetch_success_rate(&self) -> f64 {
        if self.pairs == 0 {
            0.0
        } else {
            (self.fetched as f64 / self.pairs as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        tracing::info!(
            cycle = self.cycle,
            pairs = self.pairs,
            fetched = self.fetched,
            fetch_failures = self.fetch_failures,
            errors = self.errors,
            excluded = self.excluded,
            skipped = self.skipped,
            awaiting = self.awaiting,
            searches = self.searches,
            signals = self.signals,
            cancellations = self.cancellations,
            fetch_success_rate = format!("{:.1}%", self.fetch_success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "사이클 완료"
        );
    }
}
