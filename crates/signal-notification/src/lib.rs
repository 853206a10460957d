//! # Signal Notification
//!
//! 시그널 알림 채널.
//!
//! 제공 기능:
//! - `NotificationSink` trait: 메시지 게시 후 메시지 ID 반환
//! - Telegram Bot API 싱크 (답장, 채널 이름 조회)
//! - 로그 전용 싱크 (텔레그램 비활성 시 드라이런)
//! - 재시도 정책 래퍼 (고정/지수 간격)
//! - 시그널/취소 메시지 작성기

pub mod message;
pub mod retry;
pub mod telegram;
pub mod types;

pub use message::*;
pub use retry::*;
pub use telegram::*;
pub use types::*;
