//! # Signal Core
//!
//! 오더블록 시그널 봇의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 캔들 및 캔들 시리즈
//! - 피벗(고점/저점) 및 페어별 시드 설정
//! - 심볼 및 타임프레임 정의
//! - 설정 관리
//! - 로깅 인프라
//! - 에러 분류 체계

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
