//! Integration tests for the tick scheduler and spawn cadence.
//!
//! Time-driven tests run with `start_paused = true`, so Tokio auto-advances
//! the clock whenever every task is idle and `sleep_until` resolves
//! instantly.

use std::time::Duration;

use coinrush_tick::{Cadence, TickConfig, TickScheduler};

// =========================================================================
// Helpers
// =========================================================================

fn config_20hz() -> TickConfig {
    TickConfig::with_rate(20)
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_with_rate_sets_duration() {
    let cfg = TickConfig::with_rate(20);
    assert_eq!(cfg.tick_duration(), Duration::from_millis(50));
}

#[test]
fn test_validated_clamps_zero_and_excessive_rates() {
    assert_eq!(TickConfig::with_rate(0).validated().tick_rate_hz, 1);
    assert_eq!(
        TickConfig::with_rate(10_000).validated().tick_rate_hz,
        TickConfig::MAX_TICK_RATE_HZ
    );
}

#[test]
fn test_validated_orders_thresholds() {
    let cfg = TickConfig {
        budget_warn_threshold: 0.9,
        budget_critical_threshold: 0.5,
        ..config_20hz()
    }
    .validated();
    assert_eq!(cfg.budget_warn_threshold, 0.5);
}

// =========================================================================
// Scheduler creation and accessors
// =========================================================================

#[test]
fn test_scheduler_initial_state() {
    let s = TickScheduler::new(config_20hz());
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.tick_rate_hz(), 20);
    assert!(!s.is_paused());
    assert_eq!(s.tick_duration(), Duration::from_millis(50));
}

#[test]
fn test_start_paused_config() {
    let s = TickScheduler::new(TickConfig {
        start_paused: true,
        ..config_20hz()
    });
    assert!(s.is_paused());
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_and_increments() {
    let mut s = TickScheduler::new(config_20hz());

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert_eq!(info.dt, Duration::from_millis(50));
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(s.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_multiple_ticks_increment_monotonically() {
    let mut s = TickScheduler::new(config_20hz());

    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert_eq!(info.dt, Duration::from_millis(50));
    }
    assert_eq!(s.metrics().total_ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn test_late_wake_up_is_reported_as_skipped() {
    let mut s = TickScheduler::new(config_20hz());
    s.wait_for_tick().await;

    // Block the scheduler for 4 tick budgets before polling again.
    tokio::time::advance(Duration::from_millis(200)).await;

    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert!(info.ticks_skipped >= 2);
    // dt stays fixed even when late.
    assert_eq!(info.dt, Duration::from_millis(50));
    assert_eq!(s.metrics().total_overruns, 1);
}

// =========================================================================
// Pause / Resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_prevents_ticks() {
    let mut s = TickScheduler::new(config_20hz());

    s.wait_for_tick().await;
    s.pause();
    assert!(s.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(1), s.wait_for_tick()).await;
    assert!(result.is_err(), "paused scheduler should pend");
}

#[tokio::test(start_paused = true)]
async fn test_resume_allows_ticks_again() {
    let mut s = TickScheduler::new(TickConfig {
        start_paused: true,
        ..config_20hz()
    });

    s.resume();
    assert!(!s.is_paused());

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert!(!info.overrun);
}

#[tokio::test(start_paused = true)]
async fn test_resume_after_long_pause_does_not_burst() {
    let mut s = TickScheduler::new(config_20hz());
    s.pause();
    tokio::time::advance(Duration::from_secs(5)).await;
    s.resume();

    let info = s.wait_for_tick().await;
    assert_eq!(info.ticks_skipped, 0);
}

#[test]
fn test_pause_resume_idempotent() {
    let mut s = TickScheduler::new(config_20hz());

    s.pause();
    s.pause();
    assert!(s.is_paused());

    s.resume();
    s.resume();
    assert!(!s.is_paused());
}

// =========================================================================
// Metrics
// =========================================================================

#[test]
fn test_record_tick_end_without_wait_is_noop() {
    let mut s = TickScheduler::new(config_20hz());
    s.record_tick_end();
    assert_eq!(s.metrics().total_ticks, 0);
    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_max_tick_time_tracked() {
    let mut s = TickScheduler::new(config_20hz());

    // record_tick_end measures wall-clock time, not Tokio time.
    s.wait_for_tick().await;
    std::thread::sleep(Duration::from_micros(50));
    s.record_tick_end();

    assert!(s.metrics().max_tick_time > Duration::ZERO);
}

// =========================================================================
// Cadence
// =========================================================================

#[test]
fn test_cadence_starts_stopped() {
    let mut c = Cadence::new(Duration::from_secs(1));
    assert!(!c.is_running());
    assert_eq!(c.advance(Duration::from_secs(3)), 0);
}

#[test]
fn test_cadence_fires_immediately_on_start() {
    let mut c = Cadence::new(Duration::from_secs(1));
    assert_eq!(c.start(), 1);
    assert!(c.is_running());
}

#[test]
fn test_cadence_accumulates_partial_intervals() {
    let mut c = Cadence::new(Duration::from_secs(1));
    c.start();

    assert_eq!(c.advance(Duration::from_millis(600)), 0);
    assert_eq!(c.advance(Duration::from_millis(600)), 1);
    // 200ms carried over.
    assert_eq!(c.advance(Duration::from_millis(800)), 1);
}

#[test]
fn test_cadence_large_step_fires_multiple_times() {
    let mut c = Cadence::new(Duration::from_millis(250));
    c.start();
    assert_eq!(c.advance(Duration::from_secs(1)), 4);
}

#[test]
fn test_cadence_cancel_stops_firing_and_is_idempotent() {
    let mut c = Cadence::new(Duration::from_secs(1));
    c.start();
    c.advance(Duration::from_millis(900));
    c.cancel();
    c.cancel();

    assert!(!c.is_running());
    assert_eq!(c.advance(Duration::from_secs(5)), 0);
}

#[test]
fn test_cadence_zero_interval_never_fires_from_advance() {
    let mut c = Cadence::new(Duration::ZERO);
    c.start();
    assert_eq!(c.advance(Duration::from_secs(1)), 0);
}

// =========================================================================
// Integration: select! loop pattern (mirrors the authority actor)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_drives_cadence() {
    let mut s = TickScheduler::new(config_20hz());
    let mut cadence = Cadence::new(Duration::from_millis(100));
    let mut spawned = cadence.start();

    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(10);
    tokio::spawn(async move {
        // 10 ticks at 20Hz, plus a little slack.
        tokio::time::sleep(Duration::from_millis(520)).await;
        tx.send("stop").await.ok();
    });

    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            info = s.wait_for_tick() => {
                spawned += cadence.advance(info.dt);
                s.record_tick_end();
            }
        }
    }

    // One immediate firing, then one every two ticks.
    assert!(spawned >= 5, "expected at least 5 firings, got {spawned}");
}
