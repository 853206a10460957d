//! 거래 페어 심볼 정의.
//!
//! 거래소 형식(`BTCUSDT`)과 메시지 표시 형식(`BTC/USDT`) 사이를 변환합니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 알려진 호가 자산 (긴 것부터 검사).
const KNOWN_QUOTES: [&str; 6] = ["USDT", "BUSD", "USDC", "BTC", "ETH", "BNB"];

/// 거래 페어 심볼.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// 기준 자산 (예: BTC)
    pub base: String,
    /// 호가 자산 (예: USDT)
    pub quote: String,
}

impl Symbol {
    /// 새 심볼을 생성합니다.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// 거래소 형식 문자열(`BTCUSDT` 또는 `BTC/USDT`)에서 심볼을 파싱합니다.
    ///
    /// 호가 자산을 알 수 없으면 USDT로 가정합니다.
    pub fn from_exchange(pair: &str) -> Self {
        let upper = pair.trim().to_uppercase();

        if let Some((base, quote)) = upper.split_once('/') {
            return Self::new(base, quote);
        }

        for quote in KNOWN_QUOTES {
            if let Some(base) = upper.strip_suffix(quote) {
                if !base.is_empty() {
                    return Self::new(base, quote);
                }
            }
        }

        Self::new(upper, "USDT")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
