//! 시스템 전반에서 사용되는 공통 타입.

mod decimal;
mod symbol;
mod timeframe;

pub use decimal::*;
pub use symbol::*;
pub use timeframe::*;

/// 알림 채널에 게시된 메시지 식별자.
pub type MessageId = i64;
