//! 캔들 및 캔들 시리즈.
//!
//! 시리즈는 시간순으로 정렬되며 인덱스로 접근합니다. 조회 시작 시간이
//! 고정되어 있는 한 이미 본 캔들의 시간→인덱스 매핑은 변하지 않습니다.

use crate::types::{Price, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// 캔들 색상.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleColor {
    /// 양봉 (종가 > 시가)
    Green,
    /// 음봉 또는 보합
    Red,
}

/// 단일 캔들.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 시리즈 내 위치
    pub index: usize,
    /// 캔들 시작 시간
    pub time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
}

impl Candle {
    /// 캔들 색상을 반환합니다.
    pub fn color(&self) -> CandleColor {
        if self.close > self.open {
            CandleColor::Green
        } else {
            CandleColor::Red
        }
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Price {
        self.high - self.low
    }
}

/// 한 페어의 캔들 시리즈.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeries {
    /// 거래소 형식 페어 (예: BTCUSDT)
    pub pair: String,
    /// 타임프레임
    pub timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// 빈 시리즈를 생성합니다.
    pub fn new(pair: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            pair: pair.into(),
            timeframe,
            candles: Vec::new(),
        }
    }

    /// OHLC 행에서 시리즈를 생성합니다. 인덱스는 순서대로 부여됩니다.
    pub fn from_ohlc<I>(pair: impl Into<String>, timeframe: Timeframe, rows: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, Price, Price, Price, Price)>,
    {
        let mut series = Self::new(pair, timeframe);
        for (time, open, high, low, close) in rows {
            series.push(time, open, high, low, close);
        }
        series
    }

    /// 캔들을 뒤에 추가하고 부여된 인덱스를 반환합니다.
    pub fn push(
        &mut self,
        time: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
    ) -> usize {
        let index = self.candles.len();
        self.candles.push(Candle {
            index,
            time,
            open,
            high,
            low,
            close,
        });
        index
    }

    /// 전체 캔들 슬라이스를 반환합니다.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// 인덱스의 캔들을 반환합니다.
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 마지막 캔들을 반환합니다.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// 마지막 인덱스를 반환합니다.
    pub fn last_index(&self) -> Option<usize> {
        self.candles.len().checked_sub(1)
    }

    /// 인덱스의 캔들 시간을 반환합니다.
    pub fn time_at(&self, index: usize) -> Option<DateTime<Utc>> {
        self.candles.get(index).map(|c| c.time)
    }

    /// 주어진 시간에 시작하는 캔들의 인덱스를 찾습니다.
    pub fn index_of_time(&self, time: DateTime<Utc>) -> Option<usize> {
        self.candles
            .binary_search_by(|c| c.time.cmp(&time))
            .ok()
    }
}

impl Index<usize> for CandleSeries {
    type Output = Candle;

    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}
