//! 시그널 엔진을 위한 도메인 모델.

mod candle;
mod pivot;
mod seed;
mod side;

pub use candle::*;
pub use pivot::*;
pub use seed::*;
pub use side::*;
