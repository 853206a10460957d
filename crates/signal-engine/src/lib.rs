//! 오더블록 시그널 탐지 엔진.
//!
//! 이 크레이트가 제공하는 기능:
//! - 지그재그 피벗 탐지 ([`pivot`])
//! - 상위 피벗 집계 ([`higher_order`])
//! - 방향성 세그먼트 구성 및 기준 돌파 탐지 ([`segment`])
//! - 오더블록 후보 스캔 ([`order_block`])
//! - 진입가/손절가/익절 목표 산출 ([`position`])
//! - 페어별 시그널 상태 머신 ([`state`])
//!
//! 모든 탐지 함수는 순수 함수입니다. 피벗과 세그먼트는 매 사이클 전체 캔들
//! 시리즈에서 처음부터 다시 계산하며, 사이클 간에 유지되는 것은
//! [`PairState`]뿐입니다.
//!
//! # 예제
//!
//! ```rust,ignore
//! use signal_engine::{StructureAnalysis, OrderBlockScanner, PositionFactory};
//!
//! let analysis = StructureAnalysis::run(&series, &seed)?;
//! if let Some(window) = analysis.latest_search_window(&series) {
//!     let scanner = OrderBlockScanner::new(&config.scanner);
//!     if let Some(candidate) = scanner.scan(&series, &analysis.pivots, &window) {
//!         let position = PositionFactory::new(&config.position).from_order_block(&candidate)?;
//!     }
//! }
//! ```

pub mod analysis;
pub mod higher_order;
pub mod order_block;
pub mod pivot;
pub mod position;
pub mod segment;
pub mod state;

// 주요 타입 재내보내기
pub use analysis::{SignalDiagnostics, StructureAnalysis};
pub use higher_order::aggregate;
pub use order_block::{OrderBlockCandidate, OrderBlockScanner};
pub use pivot::detect;
pub use position::{Position, PositionFactory, PositionStatus};
pub use segment::{FormationMethod, SearchWindow, Segment, SegmentBuilder, SegmentDirection};
pub use state::{CycleDecision, PairState, SegmentSpan, SkipReason};
