//! 구조 탐지 속성 테스트
//!
//! 임의의 랜덤 워크 캔들 시리즈에서 피벗, 세그먼트, 기준 돌파, 포지션 가격의
//! 불변 조건을 검증합니다.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use signal_core::{
    Candle, CandleSeries, PivotType, PositionConfig, ScannerConfig, Side, Timeframe,
};
use signal_engine::{
    aggregate, detect, FormationMethod, OrderBlockCandidate, OrderBlockScanner, PositionFactory,
    SegmentBuilder, SegmentDirection,
};

/// (종가 변화, 윗꼬리, 아랫꼬리) 목록으로 랜덤 워크 시리즈 생성
fn random_walk(steps: &[(i64, i64, i64)]) -> CandleSeries {
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let mut series = CandleSeries::new("PROPUSDT", Timeframe::M15);
    let mut close = 1_000i64;

    for (i, (delta, upper, lower)) in steps.iter().enumerate() {
        let open = close;
        close = open + delta;
        let high = open.max(close) + upper;
        let low = open.min(close) - lower;
        series.push(
            t0 + Duration::minutes(15 * i as i64),
            Decimal::from(open),
            Decimal::from(high),
            Decimal::from(low),
            Decimal::from(close),
        );
    }
    series
}

fn steps_strategy() -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
    prop::collection::vec((-8i64..=8, 0i64..=4, 0i64..=4), 2..200)
}

fn pivot_type_strategy() -> impl Strategy<Value = PivotType> {
    prop_oneof![Just(PivotType::Peak), Just(PivotType::Valley)]
}

proptest! {
    #[test]
    fn pivots_alternate_and_increase(steps in steps_strategy(), seed_type in pivot_type_strategy()) {
        let series = random_walk(&steps);
        let pivots = detect(&series, 0, seed_type).unwrap();

        for pair in pivots.windows(2) {
            prop_assert!(pair[0].index < pair[1].index);
            prop_assert_ne!(pair[0].pivot_type, pair[1].pivot_type);
        }
        if let Some(first) = pivots.first() {
            prop_assert_eq!(first.index, 0);
            prop_assert_eq!(first.pivot_type, seed_type);
        }
    }

    #[test]
    fn pivot_detection_is_deterministic(steps in steps_strategy(), start in 0usize..10) {
        let series = random_walk(&steps);
        prop_assume!(start < series.len());

        let first = detect(&series, start, PivotType::Valley).unwrap();
        let second = detect(&series, start, PivotType::Valley).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn higher_order_alternates(steps in steps_strategy(), seed_type in pivot_type_strategy()) {
        let series = random_walk(&steps);
        let pivots = detect(&series, 0, seed_type).unwrap();
        let ho = aggregate(&pivots);

        for pair in ho.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            prop_assert_ne!(pivots[pair[0]].pivot_type, pivots[pair[1]].pivot_type);
        }
    }

    #[test]
    fn higher_order_pivot_is_extreme_between_neighbours(
        steps in steps_strategy(),
        seed_type in pivot_type_strategy(),
    ) {
        let series = random_walk(&steps);
        let pivots = detect(&series, 0, seed_type).unwrap();
        let ho = aggregate(&pivots);

        // 연속한 두 상위 저점 사이의 고점 중 상위 고점이 가장 높음 (저점은 대칭)
        for triple in ho.windows(3) {
            let (left, middle, right) = (triple[0], triple[1], triple[2]);
            let anchor = pivots[middle];
            for pivot in &pivots[left + 1..right] {
                if pivot.pivot_type == anchor.pivot_type {
                    prop_assert!(
                        !pivot.is_beyond(&anchor),
                        "{:?}가 상위 피벗 {:?}보다 극단적",
                        pivot,
                        anchor
                    );
                }
            }
        }
    }

    #[test]
    fn segments_sharing_start_follow_same_leg(
        steps in steps_strategy(),
        seed_type in pivot_type_strategy(),
    ) {
        let series = random_walk(&steps);
        let pivots = detect(&series, 0, seed_type).unwrap();
        let ho = aggregate(&pivots);
        let segments = SegmentBuilder::new(&series, &pivots).build(&ho, 0);

        for pair in segments.windows(2) {
            prop_assert!(pair[0].start_index <= pair[1].start_index);
            if pair[0].start_index == pair[1].start_index {
                prop_assert_eq!(pair[0].formation_method, FormationMethod::Reversal);
                prop_assert_eq!(pair[0].direction, pair[1].direction);
            }
        }
    }

    #[test]
    fn segments_end_after_start(steps in steps_strategy(), seed_type in pivot_type_strategy()) {
        let series = random_walk(&steps);
        let pivots = detect(&series, 0, seed_type).unwrap();
        let ho = aggregate(&pivots);
        let builder = SegmentBuilder::new(&series, &pivots);

        let segments = builder.build(&ho, 0);
        for segment in &segments {
            prop_assert!(segment.end_index > segment.start_index);
        }
        prop_assert_eq!(segments, builder.build(&ho, 0));
    }

    #[test]
    fn first_break_is_earliest_close_beyond(steps in steps_strategy(), seed_type in pivot_type_strategy()) {
        let series = random_walk(&steps);
        let pivots = detect(&series, 0, seed_type).unwrap();
        let builder = SegmentBuilder::new(&series, &pivots);

        for pivot in &pivots {
            let direction = match pivot.pivot_type {
                PivotType::Peak => SegmentDirection::Ascending,
                PivotType::Valley => SegmentDirection::Descending,
            };
            let beyond = |c: &Candle| match direction {
                SegmentDirection::Ascending => c.close > pivot.value,
                SegmentDirection::Descending => c.close < pivot.value,
            };
            let expected = series
                .candles()
                .iter()
                .skip(pivot.index + 1)
                .find(|c| beyond(*c))
                .map(|c| c.index);

            let result = builder.detect_first_break(pivot.index, direction);
            prop_assert_eq!(result.map(|(_, i)| i), expected);
            if let Some((broken, _)) = result {
                prop_assert_eq!(broken, *pivot);
            }
        }
    }

    #[test]
    fn scanner_returns_only_valid_candidates(steps in steps_strategy()) {
        let series = random_walk(&steps);
        let pivots = detect(&series, 0, PivotType::Valley).unwrap();
        let ho = aggregate(&pivots);
        let builder = SegmentBuilder::new(&series, &pivots);
        let scanner = OrderBlockScanner::new(&ScannerConfig::default());

        for segment in builder.build(&ho, 0) {
            if let Some(window) = builder.find_position_search_window(&segment) {
                prop_assert!(window.activation_threshold < series.len() - 1);
                if let Some(candidate) = scanner.scan(&series, &pivots, &window) {
                    prop_assert!(candidate.exit_index.is_some());
                    prop_assert!(candidate.invalidation_ok);
                    prop_assert!(candidate.is_valid());
                    prop_assert_eq!(candidate.side, window.side);
                }
            }
        }
    }

    #[test]
    fn targets_ordered_by_risk(
        bottom in 1i64..10_000,
        height in 1i64..500,
        long in any::<bool>(),
    ) {
        let bottom = Decimal::from(bottom);
        let top = bottom + Decimal::from(height);
        let side = if long { Side::Long } else { Side::Short };
        let candidate = OrderBlockCandidate {
            id: "PROPUSDT-0".to_string(),
            base_candle: Candle {
                index: 0,
                time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                open: top,
                high: top,
                low: bottom,
                close: bottom,
            },
            initial_reference_liquidity: bottom,
            side,
            top,
            bottom,
            exit_index: Some(1),
            reentry_ok: true,
            imbalance_ok: true,
            invalidation_ok: true,
        };

        let position = PositionFactory::new(&PositionConfig::default())
            .from_order_block(&candidate)
            .unwrap();

        prop_assert_eq!(position.target_list.len(), 3);
        let distances: Vec<Decimal> = position
            .target_list
            .iter()
            .map(|t| (*t - position.entry_price).abs())
            .collect();
        prop_assert!(distances.windows(2).all(|d| d[0] < d[1]));

        match side {
            Side::Long => {
                prop_assert!(position.entry_price > position.stoploss);
                prop_assert!(position.target_list.iter().all(|t| *t > position.entry_price));
            }
            Side::Short => {
                prop_assert!(position.entry_price < position.stoploss);
                prop_assert!(position.target_list.iter().all(|t| *t < position.entry_price));
            }
        }
    }
}
