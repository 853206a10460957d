//! 오더블록 시그널 봇.
//!
//! 이 crate는 시그널 봇 바이너리의 구성 요소를 제공합니다:
//! - 폴링 오케스트레이터 (병렬 캔들 조회 → 페어별 순차 분석/게시)
//! - 페어 목록 로드 (설정 또는 CSV 파일)
//! - 사이클 통계

pub mod orchestrator;
pub mod pairs;
pub mod stats;

pub use orchestrator::Orchestrator;
pub use pairs::{load_pair_list, read_pairs, resolve_pairs};
pub use stats::CycleStats;
