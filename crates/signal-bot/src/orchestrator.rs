//! 폴링 오케스트레이터.
//!
//! 매 사이클마다 모든 페어의 캔들을 병렬로 조회한 뒤 페어 순서대로 하나씩
//! 구조를 분석하고 상태 머신 결정에 따라 취소/시그널을 게시합니다.
//! 페어 상태는 이 구조체만 소유하며 분석 단계는 동시에 실행되지 않습니다.
//!
//! 시드가 잘못된 페어는 설정을 고쳐 다시 시작할 때까지 조회하지 않습니다.

use futures::stream::{self, StreamExt};
use signal_core::{pair_span, AppConfig, CandleSeries, PairSeed, SignalError, SignalResult};
use signal_engine::{
    CycleDecision, OrderBlockScanner, PairState, PositionFactory, SegmentSpan,
    SignalDiagnostics, StructureAnalysis,
};
use signal_exchange::{ExchangeResult, MarketDataSource};
use signal_notification::{MessageComposer, NotificationSink};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn, Instrument};

use crate::stats::CycleStats;

/// 시그널 봇 오케스트레이터.
pub struct Orchestrator {
    config: AppConfig,
    pairs: Vec<String>,
    source: Arc<dyn MarketDataSource>,
    sink: Arc<dyn NotificationSink>,
    composer: MessageComposer,
    scanner: OrderBlockScanner,
    factory: PositionFactory,
    seeds: HashMap<String, PairSeed>,
    excluded: HashSet<String>,
    states: HashMap<String, PairState>,
    repost_offset: i64,
    cycle: u64,
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        pairs: Vec<String>,
        source: Arc<dyn MarketDataSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let repost_offset = config.notification.repost_offset(config.runtime.mode);

        let mut seeds = HashMap::with_capacity(pairs.len());
        let mut excluded = HashSet::new();
        for pair in &pairs {
            match config.seed_for(pair) {
                Ok(seed) => {
                    seeds.insert(pair.clone(), seed);
                }
                Err(e) => {
                    warn!(pair = %pair, error = %e, "시드 오류, 설정을 수정할 때까지 페어를 제외합니다");
                    excluded.insert(pair.clone());
                }
            }
        }

        Self {
            composer: MessageComposer::new(&config.message),
            scanner: OrderBlockScanner::new(&config.scanner),
            factory: PositionFactory::new(&config.position),
            seeds,
            excluded,
            states: HashMap::new(),
            repost_offset,
            cycle: 0,
            config,
            pairs,
            source,
            sink,
        }
    }

    /// 처리 대상 페어.
    pub fn pairs(&self) -> &[String] {
        &self.pairs
    }

    /// 시드 오류로 제외된 페어인지 확인합니다.
    pub fn is_excluded(&self, pair: &str) -> bool {
        self.excluded.contains(pair)
    }

    /// 페어 상태.
    pub fn state(&self, pair: &str) -> Option<&PairState> {
        self.states.get(pair)
    }

    /// 페어 상태 (진입 기록 등 외부 갱신용).
    pub fn state_mut(&mut self, pair: &str) -> Option<&mut PairState> {
        self.states.get_mut(pair)
    }

    /// 폴링 간격마다 사이클을 실행합니다. Ctrl+C를 받으면 종료합니다.
    ///
    /// # Errors
    /// 사이클에서 치명적인 에러(불변식 위반)가 나면 즉시 반환합니다.
    pub async fn run(&mut self) -> SignalResult<()> {
        let polling_interval = self.config.runtime.polling_interval();
        info!(
            pairs = self.pairs.len(),
            interval_secs = polling_interval.as_secs(),
            mode = %self.config.runtime.mode,
            "폴링 시작"
        );

        let mut interval = tokio::time::interval(polling_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("종료 신호 수신, 폴링 종료");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.run_cycle().await?;
                }
            }
        }
    }

    /// 한 사이클을 실행합니다.
    ///
    /// 페어별 복구 가능한 에러는 기록 후 넘어가고, 시드 오류는 그 페어를 이후
    /// 사이클에서 제외하며, 치명적인 에러는 나머지 페어를 모두 처리한 뒤 첫 번째
    /// 것을 반환합니다.
    pub async fn run_cycle(&mut self) -> SignalResult<CycleStats> {
        let started = Instant::now();
        self.cycle += 1;
        let mut stats = CycleStats::new(self.cycle, self.pairs.len());

        let mut seeded = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            match self.seeds.get(pair) {
                Some(seed) if !self.excluded.contains(pair) => {
                    seeded.push((pair.clone(), *seed));
                }
                _ => stats.excluded += 1,
            }
        }

        let fetched = self.fetch_all(seeded).await;
        let mut fatal: Option<SignalError> = None;

        for (pair, seed, result) in fetched {
            let series = match result {
                Ok(series) => {
                    stats.fetched += 1;
                    series
                }
                Err(e) => {
                    warn!(pair = %pair, error = %e, "캔들 조회 실패, 다음 사이클에 재시도");
                    stats.fetch_failures += 1;
                    continue;
                }
            };

            let span = pair_span!("process_pair", pair, self.cycle);
            let outcome = self
                .process_pair(&series, &seed, &mut stats)
                .instrument(span)
                .await;

            if let Err(e) = outcome {
                stats.errors += 1;
                if e.is_fatal() {
                    error!(pair = %pair, error = %e, "치명적 에러");
                    fatal.get_or_insert(e);
                } else if e.is_recoverable() {
                    warn!(pair = %pair, error = %e, "페어 처리 실패, 다음 사이클에 재시도");
                } else {
                    warn!(pair = %pair, error = %e, "시드 오류, 설정을 수정할 때까지 페어를 제외합니다");
                    self.excluded.insert(pair);
                }
            }
        }

        stats.elapsed = started.elapsed();
        stats.log_summary();

        match fatal {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// 모든 페어의 캔들을 제한된 동시성으로 조회합니다. 결과는 페어 순서를 따릅니다.
    async fn fetch_all(
        &self,
        seeded: Vec<(String, PairSeed)>,
    ) -> Vec<(String, PairSeed, ExchangeResult<CandleSeries>)> {
        let concurrency = self.config.runtime.fetch_concurrency.max(1);

        let mut results: Vec<(usize, String, PairSeed, ExchangeResult<CandleSeries>)> =
            stream::iter(seeded.into_iter().enumerate())
                .map(|(order, (pair, seed))| {
                    let source = Arc::clone(&self.source);
                    async move {
                        let result = source.fetch(&pair, seed.start_time).await;
                        (order, pair, seed, result)
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        results.sort_by_key(|(order, ..)| *order);
        results
            .into_iter()
            .map(|(_, pair, seed, result)| (pair, seed, result))
            .collect()
    }

    /// 한 페어를 처리합니다.
    async fn process_pair(
        &mut self,
        series: &CandleSeries,
        seed: &PairSeed,
        stats: &mut CycleStats,
    ) -> SignalResult<()> {
        let analysis = StructureAnalysis::run(series, seed)?;

        let Some(segment) = analysis.latest_segment().copied() else {
            debug!("완성된 세그먼트 없음");
            stats.awaiting += 1;
            return Ok(());
        };
        let span = SegmentSpan::of(series, &segment)?;
        let has_higher_order_after_end = analysis.has_higher_order_after(segment.end_index);

        let state = self.states.entry(series.pair.clone()).or_default();

        match state.decide(&segment, span, has_higher_order_after_end) {
            CycleDecision::Skip(reason) => {
                debug!(%reason, segment = %span, "탐색 생략");
                stats.skipped += 1;
                return Ok(());
            }
            CycleDecision::CancelAndSearch => {
                let canceled = state.begin_new_segment(span, self.repost_offset)?;
                info!(
                    segment = %span,
                    canceled = canceled.len(),
                    "새 세그먼트, 기존 포지션 취소"
                );
                for (position, reply_to) in canceled {
                    self.sink.post(&self.composer.cancel(), Some(reply_to)).await?;
                    debug!(order_block = %position.order_block_id, reply_to, "취소 게시");
                    stats.cancellations += 1;
                }
            }
            CycleDecision::Search => {
                state.record_segment(span);
            }
        }

        let Some(window) = analysis.latest_search_window(series) else {
            debug!(segment = %span, "탐색 구간 미정");
            stats.awaiting += 1;
            return Ok(());
        };
        stats.searches += 1;

        let Some(candidate) = self.scanner.scan(series, &analysis.pivots, &window) else {
            debug!(
                window_start = window.start_index,
                window_end = window.end_index,
                "유효한 오더블록 없음"
            );
            state.mark_searched();
            return Ok(());
        };

        let mut position = self.factory.from_order_block(&candidate)?;
        let diagnostics = self
            .composer
            .validation_mode()
            .then(|| SignalDiagnostics::collect(series, &analysis, &window, &candidate));
        let text = self
            .composer
            .signal(&series.pair, &position, diagnostics.as_ref());

        let message_id = self.sink.post(&text, None).await?;
        position.mark_posted(message_id);
        info!(
            side = %position.side,
            entry = %position.entry_price,
            stoploss = %position.stoploss,
            message_id,
            order_block = %candidate.id,
            "시그널 게시"
        );

        state.mark_searched();
        state.add_position(position);
        stats.signals += 1;
        Ok(())
    }

    /// 모든 페어에 페어 단위 취소 메시지를 게시합니다.
    pub async fn cancel_all(&self) -> SignalResult<usize> {
        let mut posted = 0;
        for pair in &self.pairs {
            let text = self.composer.cancel_pair(pair);
            let message_id = self.sink.post(&text, None).await?;
            info!(pair = %pair, message_id, "페어 취소 게시");
            posted += 1;
        }
        Ok(posted)
    }

    /// 현재 사이클 번호.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}
