//! 설정 관리.
//!
//! 설정은 TOML 파일과 `SIGNAL` 접두사 환경 변수(구분자 `__`)에서 로드합니다.
//! 자격 증명을 제외한 모든 섹션에 기본값이 있습니다.

use crate::domain::PairSeed;
use crate::error::{SignalError, SignalResult};
use crate::types::{Ratio, Timeframe};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 실행 모드.
///
/// 알림 대상의 재게시 오프셋, 재시도 간격, 콘솔 로그 레벨, 시작 확인 여부에 영향을 줍니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// 개발 모드
    #[default]
    Dev,
    /// 운영 모드
    Prod,
}

impl RunMode {
    pub fn is_prod(&self) -> bool {
        matches!(self, RunMode::Prod)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Dev => write!(f, "dev"),
            RunMode::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            _ => Err(format!("Unknown run mode: {}", s)),
        }
    }
}

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 실행 설정
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// 페어 목록 및 시드
    #[serde(default)]
    pub pairs: PairsConfig,
    /// 오더블록 스캐너 허용 오차
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// 포지션 가격 설정
    #[serde(default)]
    pub position: PositionConfig,
    /// 메시지 포맷 설정
    #[serde(default)]
    pub message: MessageConfig,
    /// 알림 설정
    #[serde(default)]
    pub notification: NotificationConfig,
    /// 거래소 설정
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 실행 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// 실행 모드
    #[serde(default)]
    pub mode: RunMode,
    /// 폴링 사이클 간격 (초)
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,
    /// 동시 캔들 조회 수
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// 분석 타임프레임
    #[serde(default)]
    pub timeframe: Timeframe,
}

fn default_polling_interval() -> u64 {
    60
}
fn default_fetch_concurrency() -> usize {
    8
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Dev,
            polling_interval_secs: default_polling_interval(),
            fetch_concurrency: default_fetch_concurrency(),
            timeframe: Timeframe::default(),
        }
    }
}

impl RuntimeConfig {
    /// 폴링 간격을 Duration으로 반환
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }
}

/// 페어 목록 및 시드 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PairsConfig {
    /// 페어 심볼 (순서 유지)
    #[serde(default)]
    pub symbols: Vec<String>,
    /// `pairs` 헤더를 가진 CSV 페어 목록 파일
    #[serde(default)]
    pub list_file: Option<PathBuf>,
    /// 페어 → 시드 문자열 (예: `L2024-03-01 00:00`)
    #[serde(default)]
    pub seeds: HashMap<String, String>,
}

/// 가격 비교 기준.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    /// 종가 비교
    #[default]
    Close,
    /// 꼬리(고가/저가) 비교
    Wick,
}

/// 오더블록 스캐너 허용 오차.
///
/// 모든 비율은 베이스 캔들 높이(고가 - 저가) 대비 값입니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// 이탈 판정 기준
    #[serde(default = "default_exit_basis")]
    pub exit_basis: PriceBasis,
    /// 무효화(손절 쪽 돌파) 판정 기준
    #[serde(default)]
    pub break_basis: PriceBasis,
    /// 재진입 터치 허용 오차
    #[serde(default)]
    pub touch_tolerance: Ratio,
    /// 임밸런스 최소 갭 비율
    #[serde(default)]
    pub min_gap_ratio: Ratio,
    /// 무효화 돌파 허용 오차
    #[serde(default)]
    pub break_tolerance: Ratio,
}

fn default_exit_basis() -> PriceBasis {
    PriceBasis::Wick
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            exit_basis: default_exit_basis(),
            break_basis: PriceBasis::Close,
            touch_tolerance: Decimal::ZERO,
            min_gap_ratio: Decimal::ZERO,
            break_tolerance: Decimal::ZERO,
        }
    }
}

/// 손절가 산출 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoplossMode {
    /// 베이스 캔들의 반대쪽 극값
    #[default]
    BaseCandle,
    /// 진입가와 초기 기준 유동성 사이 거리 × 계수
    LiquidityDistance,
}

/// 포지션 가격 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionConfig {
    /// 손절가 산출 방식
    #[serde(default)]
    pub stoploss_mode: StoplossMode,
    /// 유동성 거리 방식의 계수
    #[serde(default = "default_stoploss_coeff")]
    pub stoploss_coeff: Decimal,
    /// 익절 목표 리스크 배수 (오름차순)
    #[serde(default = "default_risk_multiples")]
    pub risk_multiples: Vec<Decimal>,
}

fn default_stoploss_coeff() -> Decimal {
    Decimal::ONE
}
fn default_risk_multiples() -> Vec<Decimal> {
    vec![Decimal::from(3), Decimal::from(5), Decimal::from(7)]
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            stoploss_mode: StoplossMode::BaseCandle,
            stoploss_coeff: default_stoploss_coeff(),
            risk_multiples: default_risk_multiples(),
        }
    }
}

/// 메시지 포맷 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageConfig {
    /// 가격 반올림 자릿수
    #[serde(default = "default_rounding")]
    pub price_rounding_precision: u32,
    /// 레버리지 유형 표기 (예: Cross, Isolated)
    #[serde(default = "default_leverage_type")]
    pub leverage_type: String,
    /// 레버리지 배수
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// 거래소 표기
    #[serde(default = "default_exchange_label")]
    pub exchange_label: String,
    /// 검증 모드 (진단 정보를 메시지에 첨부)
    #[serde(default)]
    pub validation_mode: bool,
}

fn default_rounding() -> u32 {
    4
}
fn default_leverage_type() -> String {
    "Cross".to_string()
}
fn default_leverage() -> u32 {
    10
}
fn default_exchange_label() -> String {
    "Binance Futures".to_string()
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            price_rounding_precision: default_rounding(),
            leverage_type: default_leverage_type(),
            leverage: default_leverage(),
            exchange_label: default_exchange_label(),
            validation_mode: false,
        }
    }
}

/// 재시도 간격 증가 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// 고정 간격
    #[default]
    Fixed,
    /// 지수 증가 (상한 있음)
    Exponential,
}

/// 알림 재시도 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RetryConfig {
    /// 간격 증가 방식
    #[serde(default)]
    pub backoff: BackoffKind,
    /// 첫 재시도 간격 (밀리초). 없으면 실행 모드 기본값
    #[serde(default)]
    pub delay_ms: Option<u64>,
    /// 지수 방식의 최대 간격 (밀리초)
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    /// 최대 시도 횟수. 없으면 성공할 때까지 재시도
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl RetryConfig {
    /// 실행 모드를 반영한 첫 재시도 간격.
    pub fn delay(&self, mode: RunMode) -> Duration {
        let default_ms = match mode {
            RunMode::Dev => 1_000,
            RunMode::Prod => 5_000,
        };
        Duration::from_millis(self.delay_ms.unwrap_or(default_ms))
    }

    /// 지수 방식의 최대 간격.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.unwrap_or(60_000))
    }
}

/// 텔레그램 채널 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramSettings {
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 봇 토큰 (비어 있으면 TELEGRAM_BOT_TOKEN 환경 변수)
    #[serde(default)]
    pub bot_token: String,
    /// 채널 ID (비어 있으면 TELEGRAM_CHAT_ID 환경 변수)
    #[serde(default)]
    pub chat_id: String,
    /// API 기본 URL
    #[serde(default)]
    pub api_base_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: String::new(),
            chat_id: String::new(),
            api_base_url: None,
        }
    }
}

/// 알림 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// 텔레그램 설정
    #[serde(default)]
    pub telegram: TelegramSettings,
    /// 취소 메시지 답장 대상 오프셋. 없으면 실행 모드 기본값
    #[serde(default)]
    pub repost_offset: Option<i64>,
    /// 재시도 설정
    #[serde(default)]
    pub retry: RetryConfig,
}

impl NotificationConfig {
    /// 실행 모드를 반영한 재게시 오프셋.
    ///
    /// 운영 채널에서는 외부 미러링 봇이 시그널을 다시 게시해 메시지 ID가 1 증가합니다.
    pub fn repost_offset(&self, mode: RunMode) -> i64 {
        self.repost_offset.unwrap_or(match mode {
            RunMode::Dev => 0,
            RunMode::Prod => 1,
        })
    }
}

/// 거래소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// REST API 기본 URL
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
    /// 요청당 최대 캔들 수
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_rest_base_url() -> String {
    "https://fapi.binance.com".to_string()
}
fn default_page_limit() -> u32 {
    1500
}
fn default_timeout() -> u64 {
    30
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rest_base_url: default_rest_base_url(),
            page_limit: default_page_limit(),
            timeout_secs: default_timeout(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨 필터. 없으면 실행 모드 기본값
    #[serde(default)]
    pub level: Option<String>,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default)]
    pub format: Option<String>,
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("SIGNAL")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// 페어의 시드를 파싱합니다.
    ///
    /// 설정 소스에 따라 키의 대소문자가 바뀔 수 있어 대소문자를 구분하지 않고 찾습니다.
    pub fn seed_for(&self, pair: &str) -> SignalResult<PairSeed> {
        self.pairs
            .seeds
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(pair))
            .map(|(_, seed)| seed)
            .ok_or_else(|| SignalError::SeedInvalid(format!("{} 시드가 설정되지 않았습니다", pair)))?
            .parse()
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> SignalResult<()> {
        if self.runtime.polling_interval_secs == 0 {
            return Err(SignalError::Config(
                "polling_interval_secs는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.runtime.fetch_concurrency == 0 {
            return Err(SignalError::Config(
                "fetch_concurrency는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.exchange.page_limit == 0 {
            return Err(SignalError::Config("page_limit는 0보다 커야 합니다".to_string()));
        }

        let multiples = &self.position.risk_multiples;
        if multiples.is_empty() || multiples.iter().any(|m| *m <= Decimal::ZERO) {
            return Err(SignalError::Config(
                "risk_multiples는 양수여야 합니다".to_string(),
            ));
        }
        if multiples.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SignalError::Config(
                "risk_multiples는 엄격히 오름차순이어야 합니다".to_string(),
            ));
        }
        if self.position.stoploss_coeff <= Decimal::ZERO {
            return Err(SignalError::Config(
                "stoploss_coeff는 0보다 커야 합니다".to_string(),
            ));
        }

        let scanner = &self.scanner;
        if [
            scanner.touch_tolerance,
            scanner.min_gap_ratio,
            scanner.break_tolerance,
        ]
        .iter()
        .any(|r| r.is_sign_negative())
        {
            return Err(SignalError::Config(
                "스캐너 허용 오차는 음수일 수 없습니다".to_string(),
            ));
        }

        Ok(())
    }
}
