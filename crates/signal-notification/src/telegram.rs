//! 텔레그램 알림 싱크.
//!
//! Telegram Bot API `sendMessage`로 시그널을 게시하고, 취소는 원래 메시지에 대한
//! 답장으로 보냅니다.

use crate::types::{NotificationError, NotificationResult, NotificationSink};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use signal_core::{MessageId, TelegramSettings};
use std::fmt;
use tracing::{debug, error, info, warn};

const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// 요청 한도 초과 응답에 대기 시간이 없을 때 사용하는 값 (초).
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 텔레그램 싱크 설정.
///
/// `Debug` 구현은 봇 토큰을 마스킹합니다.
#[derive(Clone)]
pub struct TelegramConfig {
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: String,
    /// 메시지를 보낼 채널 ID
    pub chat_id: String,
    /// 전송 활성화 여부
    pub enabled: bool,
    /// Bot API 기본 URL
    pub api_base_url: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_token = match self.bot_token.split_once(':') {
            Some((bot_id, _)) => format!("{}:***REDACTED***", bot_id),
            None => "***REDACTED***".to_string(),
        };

        f.debug_struct("TelegramConfig")
            .field("bot_token", &masked_token)
            .field("chat_id", &self.chat_id)
            .field("enabled", &self.enabled)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            enabled: true,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        let enabled = std::env::var("TELEGRAM_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self {
            enabled,
            ..Self::new(bot_token, chat_id)
        })
    }

    /// 설정 파일 값에서 생성합니다. 비어 있는 자격 증명은 환경 변수로 채웁니다.
    pub fn from_settings(settings: &TelegramSettings) -> Option<Self> {
        let bot_token = non_empty(&settings.bot_token)
            .or_else(|| std::env::var("TELEGRAM_BOT_TOKEN").ok())?;
        let chat_id =
            non_empty(&settings.chat_id).or_else(|| std::env::var("TELEGRAM_CHAT_ID").ok())?;

        Some(Self {
            bot_token,
            chat_id,
            enabled: settings.enabled,
            api_base_url: settings
                .api_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        })
    }

    /// Bot API 기본 URL을 바꿉니다.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.bot_token,
            method
        )
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ============================================================================
// Bot API 타입
// ============================================================================

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<MessageId>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

#[derive(Debug, Deserialize)]
struct ChatInfo {
    title: Option<String>,
}

// ============================================================================
// 싱크
// ============================================================================

/// 텔레그램 알림 싱크.
pub struct TelegramSink {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSink {
    /// 새 텔레그램 싱크를 생성합니다.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 싱크를 생성합니다.
    pub fn from_env() -> Option<Self> {
        TelegramConfig::from_env().map(Self::new)
    }

    /// 전송 가능한 설정인지 확인합니다.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    /// 채널 제목을 조회합니다.
    pub async fn get_channel_name(&self) -> NotificationResult<String> {
        let response = self
            .client
            .get(self.config.endpoint("getChat"))
            .query(&[("chat_id", self.config.chat_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: TelegramResponse<ChatInfo> = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse getChat response: {} - {}", status, body);
            NotificationError::SerializationError(e)
        })?;

        if !parsed.ok {
            return Err(NotificationError::ApiError(
                parsed.description.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        parsed
            .result
            .and_then(|chat| chat.title)
            .ok_or_else(|| NotificationError::ApiError("채널 제목이 없습니다".to_string()))
    }

    /// 429 응답 본문에서 대기 시간을 읽습니다.
    fn retry_after(body: &str) -> u64 {
        serde_json::from_str::<TelegramResponse<serde_json::Value>>(body)
            .ok()
            .and_then(|r| r.parameters)
            .and_then(|p| p.retry_after)
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn post(&self, text: &str, reply_to: Option<MessageId>) -> NotificationResult<MessageId> {
        if !self.is_enabled() {
            return Err(NotificationError::InvalidConfig(
                "텔레그램 전송이 비활성화되어 있습니다".to_string(),
            ));
        }

        let request = SendMessageRequest {
            chat_id: &self.config.chat_id,
            text,
            reply_to_message_id: reply_to,
            disable_web_page_preview: true,
        };

        debug!(
            chat_id = %self.config.chat_id,
            ?reply_to,
            "Sending Telegram message"
        );

        let response = self
            .client
            .post(self.config.endpoint("sendMessage"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // 요청 한도 제한 확인
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = Self::retry_after(&body);
            warn!(retry_after, "Telegram rate limited");
            return Err(NotificationError::RateLimited(retry_after));
        }

        if !status.is_success() {
            error!("Failed to send Telegram message: {} - {}", status, body);
            return Err(NotificationError::SendFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let parsed: TelegramResponse<SentMessage> = serde_json::from_str(&body)?;
        match parsed.result {
            Some(sent) if parsed.ok => {
                info!(message_id = sent.message_id, "Telegram message posted");
                Ok(sent.message_id)
            }
            _ => Err(NotificationError::ApiError(
                parsed
                    .description
                    .unwrap_or_else(|| "message_id 없는 응답".to_string()),
            )),
        }
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
