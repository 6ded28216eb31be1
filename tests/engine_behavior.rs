//! Behavior tests for the aggregation engine over fake providers.
//!
//! These exercise the dispatch strategies end to end: fallback ordering,
//! race timing independence, mover ranking, cache behavior, and the
//! aggregate-only error taxonomy.

use std::sync::atomic::Ordering;
use std::time::Duration;

use marketmux_core::{
    AssetClass, Direction, EngineError, Interval, MarketEngine, ProviderId, RacePolicy, Symbol,
};
use marketmux_tests::{candle_run, mover, stats_with_last, FakeSource};

fn btc() -> Symbol {
    Symbol::parse("BTCUSDT").expect("valid symbol")
}

fn eth() -> Symbol {
    Symbol::parse("ETHUSDT").expect("valid symbol")
}

// =============================================================================
// Price: sequential fallback
// =============================================================================

#[tokio::test]
async fn when_first_provider_succeeds_second_is_never_invoked() {
    let binance = FakeSource::new(ProviderId::Binance).with_spot(65_000.5).into_arc();
    let bybit = FakeSource::new(ProviderId::Bybit).with_spot(64_990.0).into_arc();

    let engine = MarketEngine::builder()
        .register(binance.clone())
        .register(bybit.clone())
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let price = engine.price(AssetClass::Crypto, &btc()).await.expect("price");

    assert_eq!(price, 65_000.5);
    assert_eq!(binance.spot_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bybit.spot_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn when_first_provider_fails_fallback_resolves_from_second() {
    let binance = FakeSource::new(ProviderId::Binance)
        .with_spot_failure("scripted outage")
        .into_arc();
    let bybit = FakeSource::new(ProviderId::Bybit).with_spot(3_200.0).into_arc();

    let engine = MarketEngine::builder()
        .register(binance.clone())
        .register(bybit.clone())
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let price = engine.price(AssetClass::Crypto, &eth()).await.expect("price");

    assert_eq!(price, 3_200.0);
    assert_eq!(binance.spot_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bybit.spot_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn when_first_provider_returns_invalid_value_fallback_advances() {
    let binance = FakeSource::new(ProviderId::Binance).with_spot(0.0).into_arc();
    let bybit = FakeSource::new(ProviderId::Bybit).with_spot(42.5).into_arc();

    let engine = MarketEngine::builder()
        .register(binance.clone())
        .register(bybit)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let price = engine.price(AssetClass::Crypto, &btc()).await.expect("price");

    assert_eq!(price, 42.5);
    assert_eq!(binance.spot_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn when_every_provider_fails_caller_sees_only_the_aggregate_error() {
    let binance = FakeSource::new(ProviderId::Binance)
        .with_spot_failure("transport down")
        .into_arc();
    let bybit = FakeSource::new(ProviderId::Bybit).with_spot(-1.0).into_arc();

    let engine = MarketEngine::builder()
        .register(binance)
        .register(bybit)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let error = engine
        .price(AssetClass::Crypto, &btc())
        .await
        .expect_err("must exhaust");
    assert!(matches!(error, EngineError::NoPriceAvailable { .. }));
}

#[tokio::test]
async fn unmapped_symbol_fails_before_any_provider_call() {
    let binance = FakeSource::new(ProviderId::Binance).with_spot(1.0).into_arc();

    let engine = MarketEngine::builder()
        .register(binance.clone())
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance])
        .build();

    let unknown = Symbol::parse("NOPEUSDT").expect("valid symbol");
    let error = engine
        .price(AssetClass::Crypto, &unknown)
        .await
        .expect_err("must fail");

    assert!(matches!(error, EngineError::UnsupportedSymbol { .. }));
    assert_eq!(binance.spot_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Candles: race to first valid
// =============================================================================

#[tokio::test(start_paused = true)]
async fn race_winner_is_independent_of_slow_loser_outcome() {
    let slow_failing = FakeSource::new(ProviderId::Binance)
        .with_candles_failure("eventually fails")
        .with_delay(Duration::from_secs(8))
        .into_arc();
    let fast = FakeSource::new(ProviderId::Bybit)
        .with_candles(candle_run(5, Interval::OneHour))
        .with_delay(Duration::from_millis(20))
        .into_arc();

    let engine = MarketEngine::builder()
        .register(slow_failing)
        .register(fast)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let series = engine
        .candles(AssetClass::Crypto, &btc(), Interval::OneHour, 5)
        .await
        .expect("series");

    assert_eq!(series.candles.len(), 5);
    assert!(series.is_well_formed());
}

#[tokio::test(start_paused = true)]
async fn race_ignores_fast_but_empty_results() {
    let fast_empty = FakeSource::new(ProviderId::Binance)
        .with_candles(Vec::new())
        .into_arc();
    let slower_valid = FakeSource::new(ProviderId::Bybit)
        .with_candles(candle_run(3, Interval::OneDay))
        .with_delay(Duration::from_millis(50))
        .into_arc();

    let engine = MarketEngine::builder()
        .register(fast_empty)
        .register(slower_valid)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let series = engine
        .candles(AssetClass::Crypto, &btc(), Interval::OneDay, 3)
        .await
        .expect("series");
    assert_eq!(series.candles.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn candles_exhaustion_yields_no_data_available() {
    let binance = FakeSource::new(ProviderId::Binance)
        .with_candles_failure("down")
        .into_arc();
    let bybit = FakeSource::new(ProviderId::Bybit)
        .with_candles_failure("also down")
        .into_arc();

    let engine = MarketEngine::builder()
        .register(binance)
        .register(bybit)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let error = engine
        .candles(AssetClass::Crypto, &btc(), Interval::OneHour, 5)
        .await
        .expect_err("must exhaust");
    assert!(matches!(error, EngineError::NoDataAvailable { .. }));
}

#[tokio::test(start_paused = true)]
async fn slow_provider_beyond_timeout_does_not_block_the_race() {
    let hung = FakeSource::new(ProviderId::Binance)
        .with_candles(candle_run(5, Interval::OneHour))
        .with_delay(Duration::from_secs(600))
        .into_arc();
    let healthy = FakeSource::new(ProviderId::Bybit)
        .with_candles(candle_run(5, Interval::OneHour))
        .with_delay(Duration::from_millis(5))
        .into_arc();

    let engine = MarketEngine::builder()
        .register(hung)
        .register(healthy)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .with_default_timeout(Duration::from_secs(10))
        .build();

    let series = engine
        .candles(AssetClass::Crypto, &btc(), Interval::OneHour, 5)
        .await
        .expect("series");
    assert_eq!(series.candles.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn cancel_on_win_returns_the_same_winner() {
    let slow = FakeSource::new(ProviderId::Binance)
        .with_candles(candle_run(5, Interval::OneHour))
        .with_delay(Duration::from_secs(5))
        .into_arc();
    let fast = FakeSource::new(ProviderId::Bybit)
        .with_candles(candle_run(4, Interval::OneHour))
        .into_arc();

    let engine = MarketEngine::builder()
        .register(slow)
        .register(fast)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .with_race_policy(RacePolicy::CancelOnWin)
        .build();

    let series = engine
        .candles(AssetClass::Crypto, &btc(), Interval::OneHour, 4)
        .await
        .expect("series");
    assert_eq!(series.candles.len(), 4);
}

#[tokio::test]
async fn zero_limit_is_rejected_up_front() {
    let engine = MarketEngine::builder().build();

    let error = engine
        .candles(AssetClass::Crypto, &btc(), Interval::OneHour, 0)
        .await
        .expect_err("must fail");
    assert!(matches!(error, EngineError::Validation(_)));
}

// =============================================================================
// 24h stats
// =============================================================================

#[tokio::test(start_paused = true)]
async fn stats_race_rejects_zero_last_price() {
    let broken = FakeSource::new(ProviderId::Binance)
        .with_stats(stats_with_last(0.0))
        .into_arc();
    let healthy = FakeSource::new(ProviderId::Bybit)
        .with_stats(stats_with_last(65_000.0))
        .with_delay(Duration::from_millis(30))
        .into_arc();

    let engine = MarketEngine::builder()
        .register(broken)
        .register(healthy)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let stats = engine.day_stats(&btc()).await.expect("stats");
    assert_eq!(stats.last_price, 65_000.0);
}

#[tokio::test]
async fn stats_exhaustion_yields_no_data_available() {
    let engine = MarketEngine::builder()
        .register(FakeSource::new(ProviderId::Binance).into_arc())
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance])
        .build();

    let error = engine.day_stats(&btc()).await.expect_err("must exhaust");
    assert!(matches!(error, EngineError::NoDataAvailable { .. }));
}

// =============================================================================
// Movers
// =============================================================================

#[tokio::test]
async fn gainers_are_ranked_descending_and_truncated() {
    let snapshot = vec![
        mover("AUSDT", 10.0),
        mover("BUSDT", -2.0),
        mover("CUSDT", 7.0),
        mover("DUSDT", 15.0),
        mover("EUSDT", 3.0),
    ];
    let binance = FakeSource::new(ProviderId::Binance)
        .with_snapshot(snapshot)
        .into_arc();

    let engine = MarketEngine::builder()
        .register(binance)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance])
        .build();

    let movers = engine
        .top_movers(AssetClass::Crypto, Direction::Gainers, 3)
        .await
        .expect("movers");

    let changes: Vec<f64> = movers.iter().map(|m| m.change_percent).collect();
    assert_eq!(changes, vec![15.0, 10.0, 7.0]);
}

#[tokio::test]
async fn losers_are_ranked_ascending() {
    let snapshot = vec![mover("AUSDT", 4.0), mover("BUSDT", -9.0), mover("CUSDT", 0.5)];
    let bybit = FakeSource::new(ProviderId::Bybit)
        .with_snapshot(snapshot)
        .into_arc();

    let engine = MarketEngine::builder()
        .register(bybit)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Bybit])
        .build();

    let movers = engine
        .top_movers(AssetClass::Crypto, Direction::Losers, 2)
        .await
        .expect("movers");

    let changes: Vec<f64> = movers.iter().map(|m| m.change_percent).collect();
    assert_eq!(changes, vec![-9.0, 0.5]);
}

#[tokio::test(start_paused = true)]
async fn crypto_movers_survive_one_broken_snapshot_source() {
    let broken = FakeSource::new(ProviderId::Binance)
        .with_snapshot_failure("snapshot down")
        .into_arc();
    let healthy = FakeSource::new(ProviderId::Bybit)
        .with_snapshot(vec![mover("AUSDT", 1.0), mover("BUSDT", 2.0)])
        .with_delay(Duration::from_millis(40))
        .into_arc();

    let engine = MarketEngine::builder()
        .register(broken)
        .register(healthy)
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance, ProviderId::Bybit])
        .build();

    let movers = engine
        .top_movers(AssetClass::Crypto, Direction::Gainers, 10)
        .await
        .expect("movers");
    assert_eq!(movers.len(), 2);
    assert_eq!(movers[0].change_percent, 2.0);
}

#[tokio::test]
async fn forex_movers_rank_the_rate_comparisons() {
    // One rising series shared by every pair: +2% over the window.
    let frankfurter = FakeSource::new(ProviderId::Frankfurter)
        .with_history(vec![1.00, 1.01, 1.02])
        .into_arc();

    let engine = MarketEngine::builder()
        .register(frankfurter)
        .with_chain(AssetClass::Forex, vec![ProviderId::Frankfurter])
        .build();

    let movers = engine
        .top_movers(AssetClass::Forex, Direction::Gainers, 3)
        .await
        .expect("movers");

    assert_eq!(movers.len(), 3);
    for mover in &movers {
        assert!((mover.change_percent - 2.0).abs() < 1e-9);
        assert_eq!(mover.price, 1.02);
    }
}

#[tokio::test]
async fn forex_movers_exhaust_when_every_pair_fails() {
    let frankfurter = FakeSource::new(ProviderId::Frankfurter)
        .with_history_failure("rate service down")
        .into_arc();

    let engine = MarketEngine::builder()
        .register(frankfurter)
        .with_chain(AssetClass::Forex, vec![ProviderId::Frankfurter])
        .build();

    let error = engine
        .top_movers(AssetClass::Forex, Direction::Gainers, 5)
        .await
        .expect_err("must exhaust");
    assert!(matches!(error, EngineError::NoDataAvailable { .. }));
}

#[tokio::test]
async fn equity_movers_have_no_eligible_provider() {
    let engine = MarketEngine::builder().build();

    let error = engine
        .top_movers(AssetClass::Equity, Direction::Gainers, 5)
        .await
        .expect_err("must exhaust");
    assert!(matches!(error, EngineError::NoDataAvailable { .. }));
}

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn cached_price_skips_the_provider_within_ttl() {
    let binance = FakeSource::new(ProviderId::Binance).with_spot(100.0).into_arc();

    let engine = MarketEngine::builder()
        .register(binance.clone())
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance])
        .with_cache_ttl(Duration::from_secs(60))
        .build();

    let first = engine.price(AssetClass::Crypto, &btc()).await.expect("price");
    let second = engine.price(AssetClass::Crypto, &btc()).await.expect("price");

    assert_eq!(first, second);
    assert_eq!(binance.spot_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_cache_entry_triggers_re_resolution() {
    let binance = FakeSource::new(ProviderId::Binance).with_spot(100.0).into_arc();

    let engine = MarketEngine::builder()
        .register(binance.clone())
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance])
        .with_cache_ttl(Duration::from_millis(40))
        .build();

    engine.price(AssetClass::Crypto, &btc()).await.expect("price");
    tokio::time::sleep(Duration::from_millis(80)).await;
    engine.price(AssetClass::Crypto, &btc()).await.expect("price");

    assert_eq!(binance.spot_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_resolutions_never_write_the_cache() {
    let binance = FakeSource::new(ProviderId::Binance)
        .with_spot_failure("down")
        .into_arc();

    let engine = MarketEngine::builder()
        .register(binance.clone())
        .with_chain(AssetClass::Crypto, vec![ProviderId::Binance])
        .with_cache_ttl(Duration::from_secs(60))
        .build();

    let _ = engine.price(AssetClass::Crypto, &btc()).await;
    let _ = engine.price(AssetClass::Crypto, &btc()).await;

    // Both calls hit the provider; nothing was memoized.
    assert_eq!(binance.spot_calls.load(Ordering::SeqCst), 2);
}
