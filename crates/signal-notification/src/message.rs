//! 채널 메시지 작성.
//!
//! 시그널 메시지는 채널 구독자의 복사 매매 봇이 파싱하는 형식을 따르므로
//! 줄 구성과 라벨을 바꾸면 안 됩니다.

use chrono::{DateTime, Utc};
use signal_core::{Candle, DecimalExt, MessageConfig, Price, Symbol};
use signal_engine::{Position, SignalDiagnostics};
use std::fmt::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 시그널/취소 메시지 작성기.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    config: MessageConfig,
}

impl MessageComposer {
    pub fn new(config: &MessageConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 검증 모드 여부.
    pub fn validation_mode(&self) -> bool {
        self.config.validation_mode
    }

    /// 포지션 시그널 메시지를 작성합니다.
    ///
    /// 검증 모드에서는 `diagnostics`의 구조 정보를 메시지 끝에 덧붙입니다.
    pub fn signal(
        &self,
        pair: &str,
        position: &Position,
        diagnostics: Option<&SignalDiagnostics>,
    ) -> String {
        let symbol = Symbol::from_exchange(pair);
        let mut message = String::new();

        // String에 쓰는 write!는 실패하지 않음
        let _ = writeln!(message, "⚡️⚡️ #{} ⚡️⚡️", symbol);
        let _ = writeln!(message, "Exchanges: {}", self.config.exchange_label);
        let _ = writeln!(message, "Signal Type: Regular ({})", position.side);
        let _ = writeln!(
            message,
            "Leverage: {} ({}.0X)",
            self.config.leverage_type, self.config.leverage
        );

        message.push_str("\nEntry Targets:\n");
        let _ = writeln!(message, "1) {}", self.price(position.entry_price));

        message.push_str("\nTake-Profit Targets:\n");
        for (i, target) in position.target_list.iter().enumerate() {
            let _ = writeln!(message, "{}) {}", i + 1, self.price(*target));
        }

        message.push_str("\nStop Targets:\n");
        let _ = writeln!(message, "1) {}", self.price(position.stoploss));

        if self.config.validation_mode {
            if let Some(diagnostics) = diagnostics {
                self.append_diagnostics(&mut message, diagnostics);
            }
        }

        message
    }

    /// 개별 포지션 취소 메시지 (원래 시그널에 대한 답장으로 보냄).
    pub fn cancel(&self) -> String {
        "Cancel".to_string()
    }

    /// 페어 전체 취소 메시지.
    pub fn cancel_pair(&self, pair: &str) -> String {
        format!("Cancel #{}", Symbol::from_exchange(pair))
    }

    fn price(&self, value: Price) -> String {
        value
            .round_price(self.config.price_rounding_precision)
            .to_string()
    }

    fn append_diagnostics(&self, message: &mut String, diagnostics: &SignalDiagnostics) {
        let ho_times = diagnostics
            .higher_order_pivot_times
            .iter()
            .map(|t| t.format(TIME_FORMAT).to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let _ = write!(
            message,
            "\nBase candle:\n{}\n\
             \nSignal activation time:\n{}\n\
             \nBroken LPL time:\n{}\n\
             \nSearch window:\n{} to {}\n\
             \nLatest segment:\n{} to {}\n\
             \nLatest segment HO pivots:\n[{}]\n",
            self.format_candle(diagnostics.base_candle.as_ref()),
            format_time(diagnostics.activation_time),
            format_time(diagnostics.broken_reference_time),
            format_time(diagnostics.window_start_time),
            format_time(diagnostics.window_end_time),
            format_time(diagnostics.segment_start_time),
            format_time(diagnostics.segment_end_time),
            ho_times,
        );
    }
}

impl MessageComposer {
    /// `시간 | O 시가 H 고가 L 저가 C 종가`
    fn format_candle(&self, candle: Option<&Candle>) -> String {
        match candle {
            Some(c) => format!(
                "{} | O {} H {} L {} C {}",
                c.time.format(TIME_FORMAT),
                self.price(c.open),
                self.price(c.high),
                self.price(c.low),
                self.price(c.close)
            ),
            None => "-".to_string(),
        }
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use signal_core::Side;
    use signal_engine::PositionStatus;

    fn long_position() -> Position {
        Position {
            side: Side::Long,
            entry_price: dec!(137.123456),
            stoploss: dec!(130),
            target_list: vec![dec!(158), dec!(172), dec!(186.5)],
            status: PositionStatus::Active,
            message_id: None,
            has_been_entered: false,
            order_block_id: "BTCUSDT-0-long".to_string(),
        }
    }

    #[test]
    fn test_signal_message_layout() {
        let composer = MessageComposer::new(&MessageConfig::default());
        let message = composer.signal("BTCUSDT", &long_position(), None);

        let expected = "⚡️⚡️ #BTC/USDT ⚡️⚡️\n\
                        Exchanges: Binance Futures\n\
                        Signal Type: Regular (long)\n\
                        Leverage: Cross (10.0X)\n\
                        \n\
                        Entry Targets:\n\
                        1) 137.1235\n\
                        \n\
                        Take-Profit Targets:\n\
                        1) 158\n\
                        2) 172\n\
                        3) 186.5\n\
                        \n\
                        Stop Targets:\n\
                        1) 130\n";
        assert_eq!(message, expected);
    }

    #[test]
    fn test_short_signal_type() {
        let composer = MessageComposer::new(&MessageConfig::default());
        let mut position = long_position();
        position.side = Side::Short;
        let message = composer.signal("ETHUSDT", &position, None);

        assert!(message.starts_with("⚡️⚡️ #ETH/USDT ⚡️⚡️"));
        assert!(message.contains("Signal Type: Regular (short)"));
    }

    #[test]
    fn test_diagnostics_only_in_validation_mode() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap();
        let diagnostics = SignalDiagnostics {
            base_candle: Some(Candle {
                index: 44,
                time: t,
                open: dec!(136),
                high: dec!(137),
                low: dec!(130),
                close: dec!(131.25),
            }),
            activation_time: None,
            broken_reference_time: Some(t),
            window_start_time: Some(t),
            window_end_time: Some(t),
            segment_start_time: Some(t),
            segment_end_time: Some(t),
            higher_order_pivot_times: vec![t, t],
        };

        let plain = MessageComposer::new(&MessageConfig::default());
        assert!(!plain
            .signal("BTCUSDT", &long_position(), Some(&diagnostics))
            .contains("Base candle:"));

        let config = MessageConfig {
            validation_mode: true,
            ..MessageConfig::default()
        };
        let message =
            MessageComposer::new(&config).signal("BTCUSDT", &long_position(), Some(&diagnostics));
        assert!(message.contains("\nBase candle:\n2024-03-01 11:00:00 | O 136 H 137 L 130 C 131.25\n"));
        assert!(message.contains("\nSignal activation time:\n-\n"));
        assert!(message.contains("\nSearch window:\n2024-03-01 11:00:00 to 2024-03-01 11:00:00\n"));
        assert!(message.ends_with("[2024-03-01 11:00:00, 2024-03-01 11:00:00]\n"));
    }

    #[test]
    fn test_cancel_messages() {
        let composer = MessageComposer::new(&MessageConfig::default());
        assert_eq!(composer.cancel(), "Cancel");
        assert_eq!(composer.cancel_pair("BTCUSDT"), "Cancel #BTC/USDT");
    }
}
