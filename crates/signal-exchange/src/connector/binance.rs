//! Binance USDⓈ-M 선물 kline 커넥터.
//!
//! 공개 REST API `/fapi/v1/klines`만 사용하므로 인증이 필요 없습니다.
//! 요청당 캔들 수 제한을 넘는 구간은 마지막 캔들의 시작 시간 다음 밀리초부터
//! 다시 요청해 이어 붙이며, 제한보다 짧은 페이지가 오면 현재까지 따라잡은 것으로 봅니다.

#![allow(dead_code)] // kline 응답 필드 전체 매핑 (일부만 사용)

use crate::traits::{ExchangeResult, MarketDataSource};
use crate::ExchangeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use signal_core::{CandleSeries, ExchangeConfig, Timeframe};
use tracing::{debug, error};

const KLINES_ENDPOINT: &str = "/fapi/v1/klines";

// ============================================================================
// 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct BinanceKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceError {
    code: i32,
    msg: String,
}

// ============================================================================
// Binance 선물 클라이언트
// ============================================================================

/// Binance 선물 캔들 조회 클라이언트.
pub struct BinanceFuturesClient {
    config: ExchangeConfig,
    timeframe: Timeframe,
    client: Client,
}

impl BinanceFuturesClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: ExchangeConfig, timeframe: Timeframe) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e))
            })?;

        Ok(Self {
            config,
            timeframe,
            client,
        })
    }

    /// 조회 타임프레임.
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 공개 API 요청.
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!(
            "{}{}",
            self.config.rest_base_url.trim_end_matches('/'),
            endpoint
        );
        let query = Self::build_query(params);

        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", full_url);

        let response = self
            .client
            .get(&full_url)
            .send()
            .await
            .map_err(ExchangeError::from)?;

        self.handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            return Err(ExchangeError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            })
        } else if let Ok(error) = serde_json::from_str::<BinanceError>(&body) {
            Err(Self::map_error_code(error.code, &error.msg))
        } else {
            Err(ExchangeError::ApiError {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// Binance 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: i32, msg: &str) -> ExchangeError {
        match code {
            -1003 => ExchangeError::RateLimited,
            -1121 => ExchangeError::SymbolNotFound(msg.to_string()),
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// 문자열에서 Decimal 파싱.
    fn parse_decimal(s: &str) -> ExchangeResult<Decimal> {
        s.parse()
            .map_err(|e| ExchangeError::ParseError(format!("가격 파싱 실패 '{}': {}", s, e)))
    }

    /// 한 페이지를 조회합니다.
    async fn fetch_page(&self, pair: &str, start_ms: i64) -> ExchangeResult<Vec<BinanceKline>> {
        self.public_get(
            KLINES_ENDPOINT,
            &[
                ("symbol", pair.to_uppercase()),
                ("interval", self.timeframe.to_binance_interval().to_string()),
                ("startTime", start_ms.to_string()),
                ("limit", self.config.page_limit.to_string()),
            ],
        )
        .await
    }

    /// kline을 시리즈에 추가합니다.
    fn append(series: &mut CandleSeries, kline: &BinanceKline) -> ExchangeResult<()> {
        let time = DateTime::from_timestamp_millis(kline.0).ok_or_else(|| {
            ExchangeError::ParseError(format!("잘못된 시작 시간: {}", kline.0))
        })?;

        series.push(
            time,
            Self::parse_decimal(&kline.1)?,
            Self::parse_decimal(&kline.2)?,
            Self::parse_decimal(&kline.3)?,
            Self::parse_decimal(&kline.4)?,
        );
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for BinanceFuturesClient {
    fn name(&self) -> &str {
        "binance-futures"
    }

    async fn fetch(&self, pair: &str, start_time: DateTime<Utc>) -> ExchangeResult<CandleSeries> {
        let mut series = CandleSeries::new(pair, self.timeframe);
        let mut cursor = start_time.timestamp_millis();
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(pair, cursor).await?;
            pages += 1;

            let Some(last_open) = page.last().map(|k| k.0) else {
                break;
            };
            for kline in &page {
                Self::append(&mut series, kline)?;
            }

            if page.len() < self.config.page_limit as usize {
                break;
            }
            cursor = last_open + 1;
        }

        if series.is_empty() {
            return Err(ExchangeError::EmptySeries(format!(
                "{} {} 이후 캔들이 없습니다",
                pair, start_time
            )));
        }

        debug!(
            pair = %pair,
            candles = series.len(),
            pages,
            "캔들 조회 완료"
        );
        Ok(series)
    }
}
