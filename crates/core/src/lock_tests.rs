use super::*;
use crate::clock::FakeClock;

fn lease_lock() -> LeaseLock {
    LeaseLock::new(Duration::from_secs(60))
}

fn acquire(lock: &LeaseLock, holder: &str, clock: &FakeClock) -> (LeaseLock, LeaseOutcome) {
    lock.transition(
        LeaseInput::Acquire {
            holder: HolderId::new(holder),
        },
        clock,
    )
}

fn release(lock: &LeaseLock, holder: &str, clock: &FakeClock) -> (LeaseLock, LeaseOutcome) {
    lock.transition(
        LeaseInput::Release {
            holder: HolderId::new(holder),
        },
        clock,
    )
}

#[test]
fn new_lock_is_free() {
    let lock = lease_lock();
    assert!(lock.is_free());
    assert!(lock.holder().is_none());
}

#[test]
fn acquire_free_lock_succeeds() {
    let clock = FakeClock::new();
    let (lock, outcome) = acquire(&lease_lock(), "a/1", &clock);

    assert_eq!(outcome, LeaseOutcome::Acquired);
    assert!(lock.is_held_by(&HolderId::new("a/1")));
}

#[test]
fn acquire_held_lock_is_denied() {
    let clock = FakeClock::new();
    let (lock, _) = acquire(&lease_lock(), "a/1", &clock);
    let (lock, outcome) = acquire(&lock, "b/1", &clock);

    assert_eq!(
        outcome,
        LeaseOutcome::Denied {
            current: HolderId::new("a/1")
        }
    );
    assert!(lock.is_held_by(&HolderId::new("a/1")));
}

#[test]
fn same_holder_reenters_and_releases_per_level() {
    let clock = FakeClock::new();
    let (lock, _) = acquire(&lease_lock(), "a/1", &clock);
    let (lock, outcome) = acquire(&lock, "a/1", &clock);
    assert_eq!(outcome, LeaseOutcome::Reentered { count: 2 });

    let (lock, outcome) = release(&lock, "a/1", &clock);
    assert_eq!(outcome, LeaseOutcome::StillHeld { count: 1 });
    assert!(!lock.is_free());

    let (lock, outcome) = release(&lock, "a/1", &clock);
    assert_eq!(outcome, LeaseOutcome::Released);
    assert!(lock.is_free());
}

#[test]
fn release_by_wrong_holder_is_ignored() {
    let clock = FakeClock::new();
    let (lock, _) = acquire(&lease_lock(), "a/1", &clock);
    let (lock, outcome) = release(&lock, "b/1", &clock);

    assert_eq!(outcome, LeaseOutcome::NotHeld);
    assert!(lock.is_held_by(&HolderId::new("a/1")));
}

#[test]
fn expired_lease_can_be_reclaimed() {
    let clock = FakeClock::new();
    let (lock, _) = acquire(&lease_lock(), "crashed/1", &clock);

    clock.advance(Duration::from_secs(59));
    let (lock, outcome) = acquire(&lock, "b/1", &clock);
    assert!(matches!(outcome, LeaseOutcome::Denied { .. }));

    clock.advance(Duration::from_secs(2));
    assert!(lock.is_expired(&clock));
    let (lock, outcome) = acquire(&lock, "b/1", &clock);
    assert_eq!(
        outcome,
        LeaseOutcome::Reclaimed {
            previous: HolderId::new("crashed/1")
        }
    );
    assert!(lock.is_held_by(&HolderId::new("b/1")));
}

#[test]
fn reentry_extends_the_lease() {
    let clock = FakeClock::new();
    let (lock, _) = acquire(&lease_lock(), "a/1", &clock);
    clock.advance(Duration::from_secs(50));
    let (lock, _) = acquire(&lock, "a/1", &clock);
    clock.advance(Duration::from_secs(50));

    assert!(!lock.is_expired(&clock));
}

#[test]
fn holder_member_strips_thread_suffix() {
    assert_eq!(HolderId::new("agent-1/ThreadId(4)").member(), "agent-1");
    assert_eq!(HolderId::new("bare").member(), "bare");
    assert_eq!(HolderId::current_thread("m").member(), "m");
}
