//! Binance 선물 kline 조회 통합 테스트
//!
//! mockito 서버로 페이지 처리, 에러 매핑, 빈 응답 처리를 검증합니다.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mockito::{Matcher, Server};
use rust_decimal_macros::dec;
use signal_core::{ExchangeConfig, Timeframe};
use signal_exchange::{BinanceFuturesClient, ExchangeError, MarketDataSource};

// ================================================================================================
// 테스트 헬퍼
// ================================================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn open_ms(index: i64) -> i64 {
    (t0() + Duration::minutes(15 * index)).timestamp_millis()
}

/// kline 배열 한 줄 (가격은 인덱스 기준)
fn kline_json(index: i64) -> String {
    let open = 100 + index;
    format!(
        r#"[{},"{}.0","{}.5","{}.5","{}.0","12.5",{},"1250.0",42,"6.0","600.0","0"]"#,
        open_ms(index),
        open,
        open + 1,
        open - 1,
        open + 1,
        open_ms(index + 1) - 1
    )
}

fn page_json(indices: std::ops::Range<i64>) -> String {
    let rows: Vec<String> = indices.map(kline_json).collect();
    format!("[{}]", rows.join(","))
}

fn client(server: &Server, page_limit: u32) -> BinanceFuturesClient {
    let config = ExchangeConfig {
        rest_base_url: server.url(),
        page_limit,
        timeout_secs: 5,
    };
    BinanceFuturesClient::new(config, Timeframe::M15).unwrap()
}

// ================================================================================================
// 페이지 처리
// ================================================================================================

#[tokio::test]
async fn test_fetch_single_page() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            Matcher::UrlEncoded("interval".into(), "15m".into()),
            Matcher::UrlEncoded("startTime".into(), open_ms(0).to_string()),
            Matcher::UrlEncoded("limit".into(), "1500".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_json(0..3))
        .expect(1)
        .create_async()
        .await;

    let series = client(&server, 1500).fetch("BTCUSDT", t0()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(series.pair, "BTCUSDT");
    assert_eq!(series.len(), 3);
    assert_eq!(series[0].time, t0());
    assert_eq!(series[0].open, dec!(100));
    assert_eq!(series[0].high, dec!(101.5));
    assert_eq!(series[0].low, dec!(99.5));
    assert_eq!(series[0].close, dec!(101));
    assert_eq!(series[2].index, 2);
}

#[tokio::test]
async fn test_fetch_pages_until_short_page() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::UrlEncoded(
            "startTime".into(),
            open_ms(0).to_string(),
        ))
        .with_status(200)
        .with_body(page_json(0..2))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::UrlEncoded(
            "startTime".into(),
            (open_ms(1) + 1).to_string(),
        ))
        .with_status(200)
        .with_body(page_json(2..3))
        .expect(1)
        .create_async()
        .await;

    let series = client(&server, 2).fetch("BTCUSDT", t0()).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(series.len(), 3);
    assert_eq!(series.index_of_time(t0() + Duration::minutes(30)), Some(2));
}

#[tokio::test]
async fn test_fetch_stops_on_empty_page() {
    let mut server = Server::new_async().await;
    let _first = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::UrlEncoded(
            "startTime".into(),
            open_ms(0).to_string(),
        ))
        .with_status(200)
        .with_body(page_json(0..2))
        .create_async()
        .await;
    let _second = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::UrlEncoded(
            "startTime".into(),
            (open_ms(1) + 1).to_string(),
        ))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let series = client(&server, 2).fetch("BTCUSDT", t0()).await.unwrap();
    assert_eq!(series.len(), 2);
}

// ================================================================================================
// 에러 처리
// ================================================================================================

#[tokio::test]
async fn test_empty_series_is_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let result = client(&server, 1500).fetch("BTCUSDT", t0()).await;
    assert!(matches!(result, Err(ExchangeError::EmptySeries(_))));
}

#[tokio::test]
async fn test_invalid_symbol_maps_error_code() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"code":-1121,"msg":"Invalid symbol."}"#)
        .create_async()
        .await;

    let result = client(&server, 1500).fetch("FOOUSDT", t0()).await;
    assert!(matches!(result, Err(ExchangeError::SymbolNotFound(_))));
}

#[tokio::test]
async fn test_rate_limit_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let err = client(&server, 1500)
        .fetch("BTCUSDT", t0())
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::RateLimited));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/fapi/v1/klines")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"unexpected":true}"#)
        .create_async()
        .await;

    let result = client(&server, 1500).fetch("BTCUSDT", t0()).await;
    assert!(matches!(result, Err(ExchangeError::ParseError(_))));
}
