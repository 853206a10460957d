//! 오더블록 시그널 봇 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 설정 파일 기준으로 폴링 시작
//! signal-bot --config config/default.toml run
//!
//! # 한 사이클만 실행 (기록된 시그널 검증용)
//! signal-bot run --once
//!
//! # 운영 모드로 확인 없이 시작
//! signal-bot --mode prod run --yes
//!
//! # 모든 페어에 취소 메시지 게시
//! signal-bot cancel-all
//! ```

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use signal_bot::{resolve_pairs, Orchestrator};
use signal_core::{init_logging, AppConfig, LogConfig, RunMode};
use signal_exchange::BinanceFuturesClient;
use signal_notification::{
    LogSink, NotificationSink, RetryPolicy, RetryingSink, TelegramConfig, TelegramSink,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "signal-bot")]
#[command(about = "Order-block signal bot - Binance 선물 구조 분석 후 텔레그램 시그널 게시", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// 실행 모드 (dev, prod). 설정 파일 값보다 우선
    #[arg(short, long)]
    mode: Option<RunMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 폴링 루프 실행
    Run {
        /// 한 사이클만 실행하고 종료
        #[arg(long)]
        once: bool,

        /// 운영 모드 시작 확인 생략
        #[arg(short, long)]
        yes: bool,
    },

    /// 모든 페어에 `Cancel #PAIR` 게시
    CancelAll {
        /// 운영 모드 시작 확인 생략
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config.display()))?;
    if let Some(mode) = cli.mode {
        config.runtime.mode = mode;
    }
    let mode = config.runtime.mode;

    init_logging(LogConfig::for_mode(mode).with_overrides(&config.logging))
        .map_err(|e| anyhow!("로깅 초기화 실패: {}", e))?;

    config.validate()?;
    let pairs = resolve_pairs(&config)?;

    info!(mode = %mode, pairs = pairs.len(), "Signal Bot 시작");

    let telegram = TelegramConfig::from_settings(&config.notification.telegram)
        .filter(|c| c.enabled)
        .map(TelegramSink::new);

    let yes = match cli.command {
        Commands::Run { yes, .. } | Commands::CancelAll { yes } => yes,
    };
    if !confirm_start(telegram.as_ref(), mode, yes).await? {
        info!("시작 취소됨");
        return Ok(());
    }

    let sink: Arc<dyn NotificationSink> = match telegram {
        Some(telegram) => Arc::new(RetryingSink::new(
            telegram,
            RetryPolicy::from_config(&config.notification.retry, mode),
        )),
        None => {
            warn!("텔레그램 설정 없음, 메시지를 로그로만 출력합니다");
            Arc::new(LogSink::new())
        }
    };
    let source = Arc::new(BinanceFuturesClient::new(
        config.exchange.clone(),
        config.runtime.timeframe,
    )?);

    let mut orchestrator = Orchestrator::new(config, pairs, source, sink);

    match cli.command {
        Commands::Run { once: true, .. } => {
            orchestrator.run_cycle().await?;
        }
        Commands::Run { once: false, .. } => {
            orchestrator.run().await?;
        }
        Commands::CancelAll { .. } => {
            let posted = orchestrator.cancel_all().await?;
            info!(posted, "전체 취소 완료");
        }
    }

    info!("Signal Bot 종료");
    Ok(())
}

/// 게시 대상 채널을 확인합니다.
///
/// 운영 모드에서는 채널 제목을 보여 주고 사용자 확인을 받습니다. 텔레그램 없이
/// 운영 모드로 시작할 수 없습니다.
async fn confirm_start(
    telegram: Option<&TelegramSink>,
    mode: RunMode,
    yes: bool,
) -> anyhow::Result<bool> {
    let Some(telegram) = telegram else {
        if mode.is_prod() {
            bail!("운영 모드에는 텔레그램 봇 토큰과 채널 ID가 필요합니다");
        }
        return Ok(true);
    };

    let channel = telegram
        .get_channel_name()
        .await
        .context("텔레그램 채널 조회 실패")?;

    if !mode.is_prod() || yes {
        info!(channel = %channel, mode = %mode, "게시 채널 확인");
        return Ok(true);
    }

    print!(
        "운영 모드로 '{}' 채널에 시그널을 게시합니다. 계속할까요? (y/N): ",
        channel
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();

    Ok(answer == "y" || answer == "yes")
}
