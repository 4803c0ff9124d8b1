use super::*;
use chrono::TimeZone;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn fake_clock_advances_both_clocks() {
    let start = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
    let clock = FakeClock::at(start);
    let t1 = clock.now();

    clock.advance(Duration::from_secs(90));

    assert!(clock.now().duration_since(t1) >= Duration::from_secs(90));
    assert_eq!(clock.utc(), start + chrono::Duration::seconds(90));
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let before = clock1.utc();
    clock2.advance(Duration::from_secs(30));
    assert_eq!(clock1.utc() - before, chrono::Duration::seconds(30));
}
