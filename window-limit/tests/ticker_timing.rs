use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use more_asserts::assert_ge;
use more_asserts::assert_le;
use quanta::Clock;
use quanta::Instant;

use window_limit::Ticker;
use window_limit::TimingPolicy;

static SERIAL: Mutex<()> = Mutex::new(());

fn record_ticks(policy: TimingPolicy, interval: Duration, run_for: Duration) -> Vec<Instant> {
    let clock = Clock::new();
    let stamps = Arc::new(Mutex::new(Vec::new()));

    let tick_clock = clock.clone();
    let seen = Arc::clone(&stamps);
    let mut ticker = Ticker::new(interval, move || {
        seen.lock().unwrap().push(tick_clock.now());
    })
    .unwrap()
    .with_policy(policy)
    .with_clock(clock);

    ticker.start().unwrap();
    thread::sleep(run_for);
    ticker.deactivate();

    let stamps = stamps.lock().unwrap().clone();
    assert_eq!(stamps.len() as u64, ticker.tick_count());
    stamps
}

fn assert_spacing(stamps: &[Instant], interval: Duration) {
    for pair in stamps.windows(2) {
        assert_ge!(pair[1].duration_since(pair[0]), interval);
    }
}

#[test]
fn spinning_ticks_match_the_elapsed_time() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let interval = Duration::from_millis(10);
    let stamps = record_ticks(TimingPolicy::Spin, interval, Duration::from_millis(500));

    let expected = 50;
    assert_ge!(stamps.len(), expected - 1);
    assert_le!(stamps.len(), expected + 1);
    assert_spacing(&stamps, interval);
}

#[test]
fn sleeping_ticks_never_fire_early() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let interval = Duration::from_millis(10);
    let stamps = record_ticks(
        TimingPolicy::Sleep {
            slack: Duration::from_micros(500),
        },
        interval,
        Duration::from_millis(500),
    );

    // Sleeping trades precision for CPU, so only the upper bound is strict.
    assert_le!(stamps.len(), 51);
    assert_ge!(stamps.len(), 40);
    assert_spacing(&stamps, interval);
}

#[test]
fn slow_actions_push_later_ticks_back() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let interval = Duration::from_millis(5);
    let clock = Clock::new();
    let stamps = Arc::new(Mutex::new(Vec::new()));

    let tick_clock = clock.clone();
    let seen = Arc::clone(&stamps);
    let mut ticker = Ticker::new(interval, move || {
        seen.lock().unwrap().push(tick_clock.now());
        thread::sleep(Duration::from_millis(15));
    })
    .unwrap()
    .with_clock(clock);

    ticker.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    ticker.deactivate();

    let stamps = stamps.lock().unwrap();
    assert_le!(stamps.len(), 15);
    assert_spacing(&stamps, Duration::from_millis(20));
}
